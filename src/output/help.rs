/// Usage text rendered from a registry.
use std::fmt::Write as _;
use std::path::Path;

use crate::options::{OptionGroup, OptionRegistry, OptionSpec};

/// Total line width of rendered help.
pub const SCREEN_WIDTH: usize = 80;

const TAB: &str = "    ";

/// Render help for `registry` as invoked through `program`.
///
/// Pure: the same registry and program always yield the same text.
#[must_use]
pub fn render_help(registry: &OptionRegistry, program: &str) -> String {
    let desc_width = SCREEN_WIDTH - 2 * TAB.len();
    let continuation = format!("\n{TAB}{TAB}");
    let mut out = String::new();

    if !registry.description().is_empty() {
        let _ = writeln!(out, "\n{}", wordwrap(registry.description(), SCREEN_WIDTH, "\n"));
    }

    let _ = write!(out, "\nUsage: {}", program_name(program));
    let names: Vec<&str> = registry.names_sorted().collect();
    if !names.is_empty() {
        let _ = write!(out, " [--{}]", names.join("|--"));
    }
    let positionals: Vec<String> = registry
        .positionals()
        .iter()
        .map(|p| {
            if p.required {
                format!("<{}>", p.name)
            } else {
                format!("[{}]", p.name)
            }
        })
        .collect();
    if !positionals.is_empty() {
        let _ = write!(out, " {}", positionals.join(" "));
    }
    out.push_str("\n\n");

    let sections = [
        ("Generic maintenance parameters:", OptionGroup::Generic),
        ("Script dependent parameters:", OptionGroup::Dependent),
        ("Script specific parameters:", OptionGroup::Specific),
    ];
    for (title, group) in sections {
        let specs: Vec<&OptionSpec> = registry.options_in(group).collect();
        // The generic header is always shown, even when every default was retracted.
        if specs.is_empty() && group != OptionGroup::Generic {
            continue;
        }
        let _ = writeln!(out, "{title}");
        for spec in specs {
            let mut label = spec.name.clone();
            if let Some(alias) = spec.short_alias {
                let _ = write!(label, " (-{alias})");
            }
            let line = format!("{TAB}--{label}: {}", spec.description);
            let _ = writeln!(out, "{}", wordwrap(&line, desc_width, &continuation));
        }
        out.push('\n');
    }

    if !registry.positionals().is_empty() {
        out.push_str("Arguments:\n");
        for p in registry.positionals() {
            let (open, close) = if p.required { ('<', '>') } else { ('[', ']') };
            let line = format!("{TAB}{open}{}{close}: {}", p.name, p.description);
            let _ = writeln!(out, "{}", wordwrap(&line, desc_width, &continuation));
        }
        out.push('\n');
    }

    out
}

fn program_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}

/// Greedy word wrap at spaces. Words longer than `width` are never cut.
/// Existing newlines are kept and restart the line count.
#[must_use]
pub fn wordwrap(text: &str, width: usize, line_break: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, source_line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut current = 0;
        for (j, word) in source_line.split(' ').enumerate() {
            if j > 0 {
                if current + 1 + word.len() > width {
                    out.push_str(line_break);
                    current = 0;
                } else {
                    out.push(' ');
                    current += 1;
                }
            }
            out.push_str(word);
            current += word.len();
        }
    }
    out
}
