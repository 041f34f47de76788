/// Script catalog and runner dispatch.
pub mod list_updates;
pub mod reset_update;
pub mod show_options;
pub mod touch_update;

use std::path::Path;

use log::debug;
use nucleo_matcher::{
    Matcher, Utf32Str,
    pattern::{CaseMatching, Normalization, Pattern},
};
use thiserror::Error;

use crate::cli::Cli;
use crate::cli::args::{Command, RunArgs};
use crate::cli::output::write_scripts;
use crate::output::Console;
use crate::script::{Environment, Job, Runtime, run_script};
use crate::store::{JsonFileStore, StoreError};
use crate::types::ScriptInfoOutput;

/// Store file used when `--store` is not given.
pub const DEFAULT_STORE_FILE: &str = "maint-store.json";

/// How many suggestions accompany an unknown script name.
const SUGGESTION_LIMIT: usize = 3;

/// Errors raised by the runner itself, before a script takes over.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("No script named '{name}'")]
    UnknownScript {
        name: String,
        /// Closest catalogued names, best first.
        candidates: Vec<String>,
    },

    #[error("Cannot open datastore: {0}")]
    Store(#[from] StoreError),
}

impl RunnerError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownScript { .. } => 4,
            Self::Store(_) => 1,
        }
    }
}

/// A bundled script.
pub struct ScriptEntry {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> Box<dyn Job>,
}

impl ScriptEntry {
    #[must_use]
    pub fn build(&self) -> Box<dyn Job> {
        (self.build)()
    }
}

/// Every script `maint run` knows, sorted by name.
pub const SCRIPTS: &[ScriptEntry] = &[
    ScriptEntry {
        name: "list-updates",
        description: "List updates logged as completed",
        build: list_updates::job,
    },
    ScriptEntry {
        name: "reset-update",
        description: "Remove an update from the completion log",
        build: reset_update::job,
    },
    ScriptEntry {
        name: "show-options",
        description: "Echo parsed options and arguments as JSON",
        build: show_options::job,
    },
    ScriptEntry {
        name: "touch-update",
        description: "Log a key as completed, once",
        build: touch_update::job,
    },
];

/// Look up a script by exact name.
///
/// # Errors
///
/// [`RunnerError::UnknownScript`] with fuzzy suggestions.
pub fn find_script(name: &str) -> Result<&'static ScriptEntry, RunnerError> {
    SCRIPTS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| RunnerError::UnknownScript {
            name: name.to_owned(),
            candidates: suggest(name, SUGGESTION_LIMIT),
        })
}

/// Catalogued names that fuzzy-match `query`, best first.
#[must_use]
pub fn suggest(query: &str, limit: usize) -> Vec<String> {
    let pattern = Pattern::parse(query, CaseMatching::Smart, Normalization::Smart);
    let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);

    let mut scored: Vec<(u32, &str)> = SCRIPTS
        .iter()
        .filter_map(|script| {
            let mut buf = Vec::new();
            let haystack = Utf32Str::new(script.name, &mut buf);
            pattern
                .score(haystack, &mut matcher)
                .map(|score| (score, script.name))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.truncate(limit);
    scored.into_iter().map(|(_, name)| name.to_owned()).collect()
}

/// Dispatch a parsed runner command. Returns the process exit code.
///
/// # Errors
///
/// Returns `RunnerError` when no script could be started. Script failures
/// are reported by the script lifecycle and only show up in the exit code.
pub fn dispatch(cli: &Cli, env: Environment) -> Result<i32, RunnerError> {
    match &cli.command {
        Command::List(args) => {
            let scripts: Vec<ScriptInfoOutput> = SCRIPTS
                .iter()
                .map(|s| ScriptInfoOutput {
                    name: s.name,
                    description: s.description,
                })
                .collect();
            write_scripts(&scripts, args.json);
            Ok(0)
        }
        Command::Run(args) => run(args, cli.store.as_deref(), env),
    }
}

fn run(args: &RunArgs, store: Option<&Path>, env: Environment) -> Result<i32, RunnerError> {
    let entry = find_script(args.script())?;
    let runtime = open_runtime(store, &env)?;
    let mut job = entry.build();
    debug!(script = entry.name, args:? = args.args(); "Starting script");
    let argv = std::iter::once(entry.name.to_owned()).chain(args.args().iter().cloned());
    Ok(run_script(job.as_mut(), env, runtime, argv))
}

/// Console on stdio plus the JSON datastore, when a location is known.
///
/// # Errors
///
/// Fails if an existing store file cannot be read or parsed.
pub fn open_runtime(store: Option<&Path>, env: &Environment) -> Result<Runtime, RunnerError> {
    let path = store
        .map(Path::to_path_buf)
        .or_else(|| env.install_root.as_ref().map(|root| root.join(DEFAULT_STORE_FILE)));
    let mut runtime = Runtime::new(Console::stdio(env.interactive));
    if let Some(path) = path {
        runtime = runtime.with_datastore(Box::new(JsonFileStore::open(path)?));
    }
    Ok(runtime)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fs;

    use tempfile::tempdir;

    use crate::output::{Console, SharedBuffer};
    use crate::script::settings::DEFAULT_SETTINGS_FILE;
    use crate::script::{Environment, Job, Lifecycle, Runtime};
    use crate::store::{Datastore, MemoryStore};

    pub(crate) struct Captured {
        pub code: i32,
        pub out: String,
        pub db: Option<Box<dyn Datastore>>,
    }

    /// Run `job` against `db` with output captured; errors share the buffer.
    pub(crate) fn run_captured(job: &mut dyn Job, db: MemoryStore, argv: &[&str]) -> Captured {
        let root = tempdir().unwrap();
        fs::write(root.path().join(DEFAULT_SETTINGS_FILE), "").unwrap();
        let out = SharedBuffer::new();
        let runtime =
            Runtime::new(Console::new(Box::new(out.clone()), None)).with_datastore(Box::new(db));
        let mut lifecycle =
            Lifecycle::new(&*job, Environment::with_install_root(root.path()), runtime).unwrap();
        let code = match lifecycle.run(job, argv.iter().copied()) {
            Ok(outcome) => outcome.exit_code(),
            Err(err) => err.exit_code(),
        };
        let db = lifecycle.into_runtime().and_then(|mut rt| rt.take_datastore());
        Captured {
            code,
            out: out.contents(),
            db,
        }
    }
}
