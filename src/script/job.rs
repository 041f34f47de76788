/// The `Job` capability and the context a running job sees.
use std::time::{Duration, SystemTime};

use log::warn;

use super::env::Environment;
use super::errors::MaintenanceError;
use super::lifecycle::Lifecycle;
use super::settings::{Config, Settings};
use crate::options::{OptionRegistry, OptionValue, ParsedOptions, RegistryError};
use crate::output::Console;
use crate::store::{Datastore, NoReplication, ReplicationWaiter, StoreError};

/// How long a commit waits for replicas before giving up.
pub const REPLICATION_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// What a script needs from the datastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbType {
    /// No datastore; datastore options are not declared.
    None,
    #[default]
    Standard,
    /// Command-line credentials replace the configured ones.
    Admin,
}

/// Advisory result of a job body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Nothing to do; counts as success.
    Skipped,
    Failed,
}

impl Outcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }

    #[must_use]
    pub fn exit_code(self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl From<bool> for Outcome {
    fn from(ok: bool) -> Self {
        if ok { Self::Completed } else { Self::Failed }
    }
}

impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Self::Completed
    }
}

/// A maintenance script.
pub trait Job {
    /// Declare description, options and positionals. Runs once, before parsing.
    ///
    /// # Errors
    ///
    /// Propagates registry misuse such as duplicate names.
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        let _ = registry;
        Ok(())
    }

    fn db_type(&self) -> DbType {
        DbType::Standard
    }

    /// Extensions that must be loaded by the host.
    fn required_extensions(&self) -> Vec<String> {
        Vec::new()
    }

    /// The script body.
    ///
    /// # Errors
    ///
    /// Any error is reported as a failed run.
    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome>;
}

/// Program name, options and arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub options: ParsedOptions,
    pub args: Vec<String>,
    /// Options exactly as given on the command line.
    pub ordered: Vec<(String, OptionValue)>,
}

/// Process-wide collaborators shared by a script and its children.
pub struct Runtime {
    pub(crate) console: Console,
    pub(crate) db: Option<Box<dyn Datastore>>,
    pub(crate) replication: Box<dyn ReplicationWaiter>,
    pub(crate) last_replication_wait: Option<SystemTime>,
}

impl Runtime {
    #[must_use]
    pub fn new(console: Console) -> Self {
        Self {
            console,
            db: None,
            replication: Box::new(NoReplication),
            last_replication_wait: None,
        }
    }

    #[must_use]
    pub fn with_datastore(mut self, db: Box<dyn Datastore>) -> Self {
        self.db = Some(db);
        self
    }

    #[must_use]
    pub fn with_replication(mut self, waiter: Box<dyn ReplicationWaiter>) -> Self {
        self.replication = waiter;
        self
    }

    pub fn console(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Take the datastore back, e.g. to inspect it after a run.
    pub fn take_datastore(&mut self) -> Option<Box<dyn Datastore>> {
        self.db.take()
    }
}

/// Everything a job body can reach.
pub struct JobContext<'a> {
    pub(crate) invocation: &'a Invocation,
    pub(crate) registry: &'a OptionRegistry,
    pub(crate) settings: Option<&'a Settings>,
    pub(crate) env: &'a Environment,
    pub(crate) batch_size: Option<usize>,
    pub(crate) runtime: &'a mut Runtime,
}

impl JobContext<'_> {
    #[must_use]
    pub fn program(&self) -> &str {
        &self.invocation.program
    }

    #[must_use]
    pub fn options(&self) -> &ParsedOptions {
        &self.invocation.options
    }

    #[must_use]
    pub fn has_option(&self, name: &str) -> bool {
        self.invocation.options.contains(name)
    }

    #[must_use]
    pub fn option(&self, name: &str) -> Option<&str> {
        self.invocation.options.value(name)
    }

    #[must_use]
    pub fn option_or<'s>(&'s self, name: &str, default: &'s str) -> &'s str {
        self.option(name).unwrap_or(default)
    }

    #[must_use]
    pub fn option_values(&self, name: &str) -> Vec<&str> {
        self.invocation.options.values(name)
    }

    /// Options in command-line order, duplicates included.
    #[must_use]
    pub fn ordered_options(&self) -> &[(String, OptionValue)] {
        &self.invocation.ordered
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.invocation.args
    }

    #[must_use]
    pub fn has_arg(&self, index: usize) -> bool {
        index < self.invocation.args.len()
    }

    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.invocation.args.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn arg_or<'s>(&'s self, index: usize, default: &'s str) -> &'s str {
        self.arg(index).unwrap_or(default)
    }

    #[must_use]
    pub fn registry(&self) -> &OptionRegistry {
        self.registry
    }

    /// Effective batch size: `--batch-size`, else the declared default.
    #[must_use]
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    #[must_use]
    pub fn settings(&self) -> Option<&Settings> {
        self.settings
    }

    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.settings.map(|s| &s.config)
    }

    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.runtime.console.is_quiet()
    }

    /// Unchanneled output, written verbatim.
    pub fn output(&mut self, text: &str) {
        self.runtime.console.output(text, None);
    }

    /// Output on a named channel.
    pub fn output_channel(&mut self, text: &str, channel: &str) {
        self.runtime.console.output(text, Some(channel));
    }

    pub fn error(&mut self, text: &str) {
        self.runtime.console.error(text);
    }

    /// One-second countdown, e.g. before a destructive step.
    pub fn count_down(&mut self, seconds: u64) {
        self.runtime
            .console
            .count_down(seconds, Duration::from_secs(1));
    }

    pub fn db(&mut self) -> Option<&mut dyn Datastore> {
        match &mut self.runtime.db {
            Some(db) => {
                let db: &mut dyn Datastore = &mut **db;
                Some(db)
            }
            None => None,
        }
    }

    /// The datastore, or an error if none was provided.
    ///
    /// # Errors
    ///
    /// Fails when the runtime has no datastore.
    pub fn require_db(&mut self) -> anyhow::Result<&mut dyn Datastore> {
        Ok(self.db().ok_or(StoreError::Unavailable)?)
    }

    /// # Errors
    ///
    /// Propagates datastore failures; fails without a datastore.
    pub fn begin_transaction(&mut self, fname: &str) -> Result<(), StoreError> {
        self.store_or_err()?.begin(fname)
    }

    /// Commit, then wait for replicas.
    ///
    /// Returns `Ok(false)` when replicas did not catch up in time; the
    /// transaction is committed either way.
    ///
    /// # Errors
    ///
    /// Propagates datastore failures; fails without a datastore.
    pub fn commit_transaction(&mut self, fname: &str) -> Result<bool, StoreError> {
        self.store_or_err()?.commit(fname)?;
        let since = self.runtime.last_replication_wait;
        match self
            .runtime
            .replication
            .wait_for_replication(REPLICATION_WAIT_TIMEOUT, since)
        {
            Ok(()) => {
                self.runtime.last_replication_wait = Some(SystemTime::now());
                Ok(true)
            }
            Err(timeout) => {
                warn!(fname, error = timeout.to_string(); "Replication wait failed after commit");
                Ok(false)
            }
        }
    }

    /// # Errors
    ///
    /// Propagates datastore failures; fails without a datastore.
    pub fn rollback_transaction(&mut self, fname: &str) -> Result<(), StoreError> {
        self.store_or_err()?.rollback(fname)
    }

    /// Run another job with this invocation's program name, options and
    /// arguments, sharing the console and datastore.
    ///
    /// # Errors
    ///
    /// Returns the child's fatal or job error, already reported.
    pub fn run_child(&mut self, child: &mut dyn Job) -> Result<Outcome, MaintenanceError> {
        let mut lifecycle = Lifecycle::delegated(
            &*child,
            self.env.clone(),
            self.invocation.clone(),
            self.settings.cloned(),
            &mut *self.runtime,
        )?;
        lifecycle.validate()?;
        lifecycle.execute(child)
    }

    fn store_or_err(&mut self) -> Result<&mut dyn Datastore, StoreError> {
        self.db().ok_or(StoreError::Unavailable)
    }
}
