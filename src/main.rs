#![deny(clippy::all, clippy::pedantic)]
//! maint: run bundled maintenance scripts.

use std::str::FromStr;

use clap::Parser;
use log::{LevelFilter, debug};

use maintkit::cli::{Cli, write_error};
use maintkit::commands;
use maintkit::script::Environment;

fn main() {
    let cli = Cli::parse();

    let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });
    // The logger accepts everything; the global max level does the filtering so
    // that `--devmode` can raise it for a script run.
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(LevelFilter::Trace)
        .init();
    log::set_max_level(log_level);
    debug!(cli:?; "Parsed arguments");

    match commands::dispatch(&cli, Environment::capture()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            write_error(&err);
            std::process::exit(err.exit_code());
        }
    }
}
