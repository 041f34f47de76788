/// Script runtime: lifecycle, job capability, settings and run-once updates.
pub mod env;
pub mod errors;
pub mod job;
pub mod lifecycle;
pub mod logged;
pub mod settings;

pub use env::Environment;
pub use errors::{MaintenanceError, SetupError};
pub use job::{DbType, Invocation, Job, JobContext, Outcome, REPLICATION_WAIT_TIMEOUT, Runtime};
pub use lifecycle::{Lifecycle, State, run_script};
pub use logged::{
    CompletionRecord, LoggedUpdate, UPDATE_LOG_KEY, UPDATE_LOG_TABLE, Update, is_completed,
    list_completions, record_completion,
};
pub use settings::{Config, MemoryLimit, Settings, WikiId, load_settings, settings_path};
