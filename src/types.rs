/// Shared serializable output types.
///
/// These are what gets written to stdout, either as JSON or rendered as a
/// table. They borrow from the lifecycle's internal state instead of copying it.
use serde::Serialize;

use crate::options::{OptionValue, ParsedOptions};
use crate::script::Config;

/// A catalogued script, as shown by `maint list`.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptInfoOutput {
    pub name: &'static str,
    pub description: &'static str,
}

/// Effective state dumped by `--globals` after a run.
#[derive(Debug, Serialize)]
pub struct GlobalsReport<'a> {
    pub program: &'a str,
    pub options: &'a ParsedOptions,
    pub args: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    /// `max`, `default` or a byte count.
    pub memory_limit: String,
    /// Null when settings were never loaded.
    pub config: Option<&'a Config>,
}

/// Parsed input as echoed by `show-options`.
#[derive(Debug, Serialize)]
pub struct OptionsReport<'a> {
    pub program: &'a str,
    pub options: &'a ParsedOptions,
    pub args: &'a [String],
    /// Options in command-line order, duplicates included.
    pub ordered: Vec<OrderedOptionOutput<'a>>,
}

#[derive(Debug, Serialize)]
pub struct OrderedOptionOutput<'a> {
    pub name: &'a str,
    pub value: &'a OptionValue,
}
