/// Process environment captured once per invocation.
use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Install root of the application.
pub const INSTALL_PATH_VAR: &str = "MAINT_INSTALL_PATH";
/// Settings file override, consulted when `--conf` is absent.
pub const CONFIG_FILE_VAR: &str = "MAINT_CONFIG_FILE";
/// Comma-separated names of the extensions loaded by the host.
pub const EXTENSIONS_VAR: &str = "MAINT_EXTENSIONS";

#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// `None` when the install root variable is unset or empty.
    pub install_root: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    /// Errors go to stderr when set, to stdout otherwise.
    pub interactive: bool,
    /// Running under a web gateway (CGI-style variables present).
    pub web_gateway: bool,
    pub extensions: BTreeSet<String>,
}

impl Environment {
    /// Read the real process environment.
    #[must_use]
    pub fn capture() -> Self {
        let non_empty = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty());
        let extensions = std::env::var(EXTENSIONS_VAR)
            .map(|v| parse_list(&v))
            .unwrap_or_default();
        Self {
            install_root: non_empty(INSTALL_PATH_VAR).map(PathBuf::from),
            config_file: non_empty(CONFIG_FILE_VAR).map(PathBuf::from),
            interactive: std::io::stderr().is_terminal() || std::io::stdin().is_terminal(),
            web_gateway: non_empty("GATEWAY_INTERFACE").is_some()
                || non_empty("REQUEST_METHOD").is_some(),
            extensions,
        }
    }

    /// A command-line environment rooted at `install_root`.
    #[must_use]
    pub fn with_install_root(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: Some(install_root.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_extension(mut self, name: impl Into<String>) -> Self {
        self.extensions.insert(name.into());
        self
    }
}

fn parse_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
