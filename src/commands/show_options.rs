/// `show-options`: echo the parsed invocation as JSON.
use crate::cli::output::to_json_line;
use crate::options::{OptionRegistry, OptionSpec, PositionalSpec, RegistryError};
use crate::script::{DbType, Job, JobContext, Outcome};
use crate::types::{OptionsReport, OrderedOptionOutput};

const PROGRESS: &str = "progress";

pub struct ShowOptions;

#[must_use]
pub fn job() -> Box<dyn Job> {
    Box::new(ShowOptions)
}

impl Job for ShowOptions {
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        registry.set_description(
            "Print the parsed options, arguments and the ordered option log as JSON. \
             Any option is accepted.",
        )?;
        registry.set_allow_unregistered(true)?;
        registry.declare_option(OptionSpec::flag(
            "channels",
            "Print a channeled progress line before the report",
        ))?;
        registry.declare_positional(PositionalSpec::new("args", "Anything", false))
    }

    fn db_type(&self) -> DbType {
        DbType::None
    }

    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
        if ctx.has_option("channels") {
            show_progress(ctx);
        }
        let report = OptionsReport {
            program: ctx.program(),
            options: ctx.options(),
            args: ctx.args(),
            ordered: ctx
                .ordered_options()
                .iter()
                .map(|(name, value)| OrderedOptionOutput { name, value })
                .collect(),
        };
        let json = to_json_line(&report)?;
        ctx.output(&json);
        Ok(Outcome::Completed)
    }
}

/// One dot per argument (at least three) on a single channeled line.
fn show_progress(ctx: &mut JobContext<'_>) {
    let steps = ctx.args().len().max(3);
    ctx.output_channel("Scanning", PROGRESS);
    for _ in 0..steps {
        ctx.output_channel(".", PROGRESS);
    }
    ctx.output_channel(" done\n", PROGRESS);
}
