/// `touch-update <key>`: a logged update whose only effect is its log entry.
use anyhow::bail;
use log::debug;

use crate::options::{OptionRegistry, PositionalSpec, RegistryError};
use crate::script::{Job, JobContext, LoggedUpdate, Update};

pub struct TouchUpdate;

#[must_use]
pub fn job() -> Box<dyn Job> {
    Box::new(LoggedUpdate::new(TouchUpdate))
}

impl Update for TouchUpdate {
    fn update_key(&self, ctx: &JobContext<'_>) -> String {
        ctx.arg_or(0, "").to_owned()
    }

    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        registry.set_description(
            "Log <key> as completed. Later runs are skipped unless --force is given.",
        )?;
        registry.declare_positional(PositionalSpec::new("key", "Update key to log", true))
    }

    fn do_db_updates(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<bool> {
        let key = ctx.arg_or(0, "").to_owned();
        if key.trim().is_empty() {
            bail!("Update key must not be empty");
        }
        debug!(key = key.as_str(), batch_size:? = ctx.batch_size(); "Touching update");
        ctx.output(&format!("Touching update '{key}'.\n"));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::run_captured;
    use crate::script::is_completed;
    use crate::store::MemoryStore;

    #[test]
    fn test_logs_key_once() {
        let mut job = LoggedUpdate::new(TouchUpdate);
        let first = run_captured(&mut job, MemoryStore::new(), &["touch-update", "k1"]);
        assert_eq!(first.code, 0);
        assert_eq!(first.out, "Touching update 'k1'.\n");
        let db = first.db.unwrap();
        assert!(is_completed(db.as_ref(), "k1").unwrap());
    }

    #[test]
    fn test_blank_key_fails() {
        let mut job = LoggedUpdate::new(TouchUpdate);
        let run = run_captured(&mut job, MemoryStore::new(), &["touch-update", " "]);
        assert_eq!(run.code, 1);
        assert_eq!(run.out, "Update key must not be empty\n");
    }
}
