/// `reset-update <key>`: forget a completion so the update runs again.
use crate::options::{OptionRegistry, OptionSpec, PositionalSpec, RegistryError};
use crate::script::{Job, JobContext, Outcome, UPDATE_LOG_KEY, UPDATE_LOG_TABLE, is_completed};
use crate::store::row;

const FNAME: &str = "reset-update";

pub struct ResetUpdate;

#[must_use]
pub fn job() -> Box<dyn Job> {
    Box::new(ResetUpdate)
}

impl Job for ResetUpdate {
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        registry.set_description(
            "Remove an update from the completion log so that it runs again next time.",
        )?;
        registry.declare_option(OptionSpec::flag(
            "dry-run",
            "Report what would be removed without removing it",
        ))?;
        registry.declare_positional(PositionalSpec::new("key", "Update key to forget", true))
    }

    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
        let key = ctx.arg_or(0, "").to_owned();
        if !is_completed(ctx.require_db()?, &key)? {
            ctx.output(&format!("Update '{key}' is not logged as completed.\n"));
            return Ok(Outcome::Skipped);
        }
        if ctx.has_option("dry-run") {
            ctx.output(&format!("Would remove update '{key}'.\n"));
            return Ok(Outcome::Skipped);
        }

        ctx.begin_transaction(FNAME)?;
        let deleted = ctx
            .require_db()?
            .delete(UPDATE_LOG_TABLE, &row([(UPDATE_LOG_KEY, key.as_str())]));
        if let Err(err) = deleted {
            ctx.rollback_transaction(FNAME)?;
            return Err(err.into());
        }
        if !ctx.commit_transaction(FNAME)? {
            ctx.error("Replicas did not catch up in time; the removal may not be visible everywhere yet.");
        }
        ctx.output(&format!("Removed update '{key}'.\n"));
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::run_captured;
    use crate::script::record_completion;
    use crate::store::MemoryStore;

    fn logged(key: &str) -> MemoryStore {
        let mut db = MemoryStore::new();
        record_completion(&mut db, key).unwrap();
        db
    }

    #[test]
    fn test_removes_logged_key() {
        let run = run_captured(&mut ResetUpdate, logged("populate"), &["reset-update", "populate"]);
        assert_eq!(run.code, 0);
        assert_eq!(run.out, "Removed update 'populate'.\n");
        assert!(!is_completed(run.db.unwrap().as_ref(), "populate").unwrap());
    }

    #[test]
    fn test_dry_run_keeps_key() {
        let run = run_captured(
            &mut ResetUpdate,
            logged("populate"),
            &["reset-update", "--dry-run", "populate"],
        );
        assert_eq!(run.code, 0);
        assert_eq!(run.out, "Would remove update 'populate'.\n");
        assert!(is_completed(run.db.unwrap().as_ref(), "populate").unwrap());
    }

    #[test]
    fn test_unknown_key_is_skipped() {
        let run = run_captured(&mut ResetUpdate, MemoryStore::new(), &["reset-update", "nope"]);
        assert_eq!(run.code, 0);
        assert_eq!(run.out, "Update 'nope' is not logged as completed.\n");
    }

    #[test]
    fn test_missing_key_fails_validation() {
        let run = run_captured(&mut ResetUpdate, MemoryStore::new(), &["reset-update"]);
        assert_eq!(run.code, 1);
        assert!(run.out.starts_with("Argument <key> required!\n"));
        assert!(run.out.contains("Usage: reset-update"));
    }
}
