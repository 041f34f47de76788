/// Run-once jobs backed by the completion log.
///
/// A [`LoggedUpdate`] wraps an [`Update`] and records its key in the
/// `update_log` table after a successful run. Later runs skip the body unless
/// `--force` is given.
use log::{info, warn};
use serde::Serialize;

use super::job::{DbType, Job, JobContext, Outcome};
use crate::options::{OptionRegistry, OptionSpec, RegistryError};
use crate::store::{Datastore, InsertMode, StoreError, row};

pub const UPDATE_LOG_TABLE: &str = "update_log";
pub const UPDATE_LOG_KEY: &str = "ul_key";

/// Batch size declared for every logged update.
pub const DEFAULT_LOGGED_BATCH_SIZE: usize = 200;

/// One row of the completion log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    pub key: String,
}

/// Whether `key` is already logged as completed.
///
/// # Errors
///
/// Propagates datastore read failures.
pub fn is_completed(db: &dyn Datastore, key: &str) -> Result<bool, StoreError> {
    Ok(db
        .select_row(UPDATE_LOG_TABLE, &row([(UPDATE_LOG_KEY, key)]))?
        .is_some())
}

/// Log `key` as completed. Recording an existing key is not an error.
///
/// # Errors
///
/// Propagates datastore write failures.
pub fn record_completion(db: &mut dyn Datastore, key: &str) -> Result<(), StoreError> {
    db.insert(UPDATE_LOG_TABLE, row([(UPDATE_LOG_KEY, key)]), InsertMode::Ignore)?;
    Ok(())
}

/// Every logged completion, sorted by key.
///
/// # Errors
///
/// Propagates datastore read failures.
pub fn list_completions(db: &dyn Datastore) -> Result<Vec<CompletionRecord>, StoreError> {
    let mut records: Vec<CompletionRecord> = db
        .select(UPDATE_LOG_TABLE, &row([]))?
        .into_iter()
        .filter_map(|mut r| r.remove(UPDATE_LOG_KEY))
        .map(|key| CompletionRecord { key })
        .collect();
    records.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(records)
}

/// The body of a run-once job.
pub trait Update {
    /// Unique key under which completion is logged. May depend on the
    /// invocation's arguments.
    fn update_key(&self, ctx: &JobContext<'_>) -> String;

    /// Declare additional options. `--force` and the batch size are
    /// already declared when this runs.
    ///
    /// # Errors
    ///
    /// Propagates registry misuse.
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        let _ = registry;
        Ok(())
    }

    fn db_type(&self) -> DbType {
        DbType::Standard
    }

    fn required_extensions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Perform the update. `Ok(false)` means it did not succeed and must not
    /// be logged.
    ///
    /// # Errors
    ///
    /// Any error fails the run without logging it.
    fn do_db_updates(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<bool>;

    fn skipped_message(&self, key: &str) -> String {
        format!("Update '{key}' already logged as completed.")
    }

    fn log_failed_message(&self, key: &str) -> String {
        format!("Unable to log update '{key}' as completed.")
    }
}

/// Adapts an [`Update`] into a [`Job`] that runs at most once.
pub struct LoggedUpdate<U> {
    inner: U,
}

impl<U: Update> LoggedUpdate<U> {
    #[must_use]
    pub fn new(inner: U) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &U {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> U {
        self.inner
    }
}

impl<U: Update> Job for LoggedUpdate<U> {
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        registry.declare_option(OptionSpec::flag(
            "force",
            "Run the update even if it was completed already",
        ))?;
        registry.set_batch_size(DEFAULT_LOGGED_BATCH_SIZE);
        self.inner.configure(registry)
    }

    fn db_type(&self) -> DbType {
        self.inner.db_type()
    }

    fn required_extensions(&self) -> Vec<String> {
        self.inner.required_extensions()
    }

    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
        let key = self.inner.update_key(ctx);
        if !ctx.has_option("force") && is_completed(ctx.require_db()?, &key)? {
            info!(key = key.as_str(); "Update already completed");
            ctx.output(&format!("...{}\n", self.inner.skipped_message(&key)));
            return Ok(Outcome::Skipped);
        }

        if !self.inner.do_db_updates(ctx)? {
            return Ok(Outcome::Failed);
        }

        match record_completion(ctx.require_db()?, &key) {
            Ok(()) => {
                info!(key = key.as_str(); "Update logged as completed");
                Ok(Outcome::Completed)
            }
            Err(err) => {
                warn!(key = key.as_str(), error = err.to_string(); "Could not log update");
                ctx.output(&format!("{}\n", self.inner.log_failed_message(&key)));
                Ok(Outcome::Failed)
            }
        }
    }
}
