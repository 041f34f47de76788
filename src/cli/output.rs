/// Output formatting for the runner and bundled scripts: tables and JSON.
use std::io::Write;

use comfy_table::{Table, presets::UTF8_BORDERS_ONLY};
use serde::Serialize;

use crate::commands::RunnerError;
use crate::script::CompletionRecord;
use crate::types::ScriptInfoOutput;

/// Write the script catalog to stdout.
pub fn write_scripts(scripts: &[ScriptInfoOutput], json: bool) {
    if json {
        print_json(scripts);
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(["NAME", "DESCRIPTION"]);
    for script in scripts {
        table.add_row([script.name, script.description]);
    }
    println!("{table}");
}

/// Render completion records as a table, one key per row.
#[must_use]
pub fn completions_table(records: &[CompletionRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(["KEY"]);
    for record in records {
        table.add_row([record.key.as_str()]);
    }
    table.to_string()
}

/// Pretty JSON with a trailing newline.
///
/// # Errors
///
/// Propagates serialization failures.
pub fn to_json_line<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value).map(|s| s + "\n")
}

/// Write a runner error to stderr.
pub fn write_error(err: &RunnerError) {
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    let _ = writeln!(out, "Error: {err}");
    if let RunnerError::UnknownScript { candidates, .. } = err {
        if !candidates.is_empty() {
            let _ = writeln!(out, "  Did you mean:");
            for c in candidates {
                let _ = writeln!(out, "    {c}");
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}
