/// Runner argument definitions via clap derive.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// maint — run bundled maintenance scripts.
#[derive(Debug, Parser)]
#[command(
    name = "maint",
    about = "Run maintenance scripts against the application's datastore",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Log level for diagnostics on stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// JSON datastore file. Defaults to `maint-store.json` under the install root.
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// All subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the bundled scripts.
    List(ListArgs),
    /// Run a script. Everything after the script name is handed to it verbatim.
    Run(RunArgs),
}

/// Arguments for `maint list`.
#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `maint run`.
///
/// The script name is the first value of a trailing list so that clap stops
/// interpreting tokens as soon as it is seen. `--help` and `--` after it reach
/// the script untouched.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Script name (see `maint list`), then its options and arguments.
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "SCRIPT"
    )]
    pub command_line: Vec<String>,
}

impl RunArgs {
    #[must_use]
    pub fn script(&self) -> &str {
        self.command_line.first().map_or("", String::as_str)
    }

    /// Tokens after the script name, verbatim.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.command_line.get(1..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        run
    }

    #[test]
    fn test_run_passes_hyphenated_tokens_through() {
        let run = run_args(&["maint", "run", "show-options", "--x=1", "-q", "pos"]);
        assert_eq!(run.script(), "show-options");
        assert_eq!(run.args(), ["--x=1", "-q", "pos"]);
    }

    #[test]
    fn test_script_help_flags_reach_script() {
        let run = run_args(&["maint", "run", "show-options", "--help"]);
        assert_eq!(run.args(), ["--help"]);
        let run = run_args(&["maint", "run", "show-options", "-h"]);
        assert_eq!(run.args(), ["-h"]);
    }

    #[test]
    fn test_leading_double_dash_is_kept() {
        let run = run_args(&["maint", "run", "show-options", "--", "--raw"]);
        assert_eq!(run.script(), "show-options");
        assert_eq!(run.args(), ["--", "--raw"]);
        let run = run_args(&["maint", "run", "show-options", "x", "--", "--raw"]);
        assert_eq!(run.args(), ["x", "--", "--raw"]);
    }

    #[test]
    fn test_script_name_without_args() {
        let run = run_args(&["maint", "run", "list-updates"]);
        assert_eq!(run.script(), "list-updates");
        assert!(run.args().is_empty());
    }

    #[test]
    fn test_run_requires_script_name() {
        assert!(Cli::try_parse_from(["maint", "run"]).is_err());
    }

    #[test]
    fn test_global_options_before_subcommand() {
        let cli = Cli::try_parse_from(["maint", "--log-level", "debug", "--store", "s.json", "list"])
            .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.store, Some(PathBuf::from("s.json")));
        assert!(matches!(cli.command, Command::List(ListArgs { json: false })));
    }
}
