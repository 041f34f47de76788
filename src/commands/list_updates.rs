/// `list-updates`: show the completion log.
use crate::cli::output::{completions_table, to_json_line};
use crate::options::{OptionRegistry, OptionSpec, RegistryError};
use crate::script::{Job, JobContext, Outcome, list_completions};

pub struct ListUpdates;

#[must_use]
pub fn job() -> Box<dyn Job> {
    Box::new(ListUpdates)
}

impl Job for ListUpdates {
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        registry.set_description("List the updates that are logged as completed.")?;
        registry.declare_option(OptionSpec::flag("json", "Print JSON instead of a table"))
    }

    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
        let records = list_completions(ctx.require_db()?)?;
        let text = if ctx.has_option("json") {
            to_json_line(&records)?
        } else if records.is_empty() {
            "No updates are logged as completed.\n".to_owned()
        } else {
            completions_table(&records) + "\n"
        };
        ctx.output(&text);
        Ok(Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::run_captured;
    use crate::script::record_completion;
    use crate::store::MemoryStore;

    fn store_with(keys: &[&str]) -> MemoryStore {
        let mut db = MemoryStore::new();
        for key in keys {
            record_completion(&mut db, key).unwrap();
        }
        db
    }

    #[test]
    fn test_empty_log() {
        let run = run_captured(&mut ListUpdates, MemoryStore::new(), &["list-updates"]);
        assert_eq!(run.code, 0);
        assert_eq!(run.out, "No updates are logged as completed.\n");
    }

    #[test]
    fn test_json_listing() {
        let run = run_captured(&mut ListUpdates, store_with(&["b", "a"]), &["list-updates", "--json"]);
        assert_eq!(run.code, 0);
        let value: serde_json::Value = serde_json::from_str(&run.out).unwrap();
        assert_eq!(value, serde_json::json!([{"key": "a"}, {"key": "b"}]));
    }

    #[test]
    fn test_table_listing() {
        let run = run_captured(&mut ListUpdates, store_with(&["populate"]), &["list-updates"]);
        assert!(run.out.contains("KEY"));
        assert!(run.out.contains("populate"));
    }

    #[test]
    fn test_quiet_suppresses_listing() {
        let run = run_captured(&mut ListUpdates, store_with(&["populate"]), &["list-updates", "-q"]);
        assert_eq!(run.code, 0);
        assert_eq!(run.out, "");
    }
}
