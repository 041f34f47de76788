/// Errors that end a script invocation.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::lifecycle::State;
use crate::options::{ParseError, RegistryError, ValidationError};
use crate::store::StoreError;

/// Environment or setup problems. Fatal, reported without help text.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Started from a web gateway instead of a terminal or scheduler.
    #[error("This script must be run from the command line")]
    WrongContext,

    /// The argument vector did not even carry a program name.
    #[error("Cannot get command line arguments, the argument vector is empty")]
    NoCommandLine,

    /// `MAINT_INSTALL_PATH` is missing or empty.
    #[error("MAINT_INSTALL_PATH not set, aborting!")]
    MissingInstallRoot,

    #[error(
        "A copy of your installation's settings file ({})\nmust exist and be readable.\nUse --conf to specify it.",
        path.display()
    )]
    UnreadableSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings file {}: {message}", path.display())]
    InvalidSettings { path: PathBuf, message: String },

    #[error("Invalid --memory-limit value '{0}', expected \"max\", \"default\" or a size like 512M")]
    InvalidMemoryLimit(String),

    #[error("Invalid --batch-size value '{0}', expected a positive integer")]
    InvalidBatchSize(String),

    #[error(
        "The following extensions are required to be installed for this script to run: {}. Please enable them and then try again.",
        .0.join(", ")
    )]
    MissingExtensions(Vec<String>),
}

/// Everything that can stop a script invocation.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// The script declared its options incorrectly.
    #[error("Invalid option declaration: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{}", format_violations(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Setup(#[from] SetupError),

    /// `--help` was given; help has been printed.
    #[error("Help requested")]
    HelpRequested,

    /// A lifecycle step was called out of order.
    #[error("Cannot {action} while {state:?}")]
    InvalidState { action: &'static str, state: State },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The job body failed.
    #[error(transparent)]
    Job(#[from] anyhow::Error),
}

impl MaintenanceError {
    /// Process exit code. Uniform across error kinds.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether usage text accompanies this error.
    #[must_use]
    pub fn shows_help(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::Validation(_) | Self::HelpRequested
        )
    }
}

fn format_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
