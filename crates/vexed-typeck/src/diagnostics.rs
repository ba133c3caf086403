//! Ariadne-based diagnostic rendering for type errors.
//!
//! Renders [`TypeError`] values as labeled reports, or as one-line JSON for
//! tooling. Output is terse: one headline, one primary label and a help
//! line when a plausible fix exists.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde_json::json;

use crate::error::{ConstraintOrigin, TypeError};

/// How diagnostics are rendered.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    /// Plain text without ANSI escapes. Used by tests for stable output.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::UnknownType { .. } => "E0002",
        TypeError::ArityMismatch { .. } => "E0003",
        TypeError::NoSuchMember { .. } => "E0004",
        TypeError::InvalidOperator { .. } => "E0005",
        TypeError::DuplicateType { .. } => "E0006",
    }
}

// ── Labels and fixes ───────────────────────────────────────────────────

fn primary_label(err: &TypeError) -> String {
    match err {
        TypeError::Mismatch {
            expected,
            found,
            origin,
        } => match origin {
            ConstraintOrigin::Argument { index, .. } => {
                format!("argument {} expected {}, found {}", index + 1, expected, found)
            }
            ConstraintOrigin::Initializer { property, .. } => {
                format!("`{}` is declared as {}, found {}", property, expected, found)
            }
            ConstraintOrigin::Return { .. } => {
                format!("returns {}, method declares {}", found, expected)
            }
            ConstraintOrigin::Assignment { .. } => {
                format!("expected {}, found {}", expected, found)
            }
        },
        TypeError::UnknownType { .. } => "not found in this scope".to_string(),
        TypeError::ArityMismatch { found, .. } => format!("called with {} argument(s)", found),
        TypeError::NoSuchMember { ty, .. } => format!("on a value of type {}", ty),
        TypeError::InvalidOperator { lhs, rhs, .. } => match rhs {
            Some(rhs) => format!("{} and {}", lhs, rhs),
            None => lhs.clone(),
        },
        TypeError::DuplicateType { .. } => "declared again here".to_string(),
    }
}

fn fix_suggestion(err: &TypeError) -> Option<String> {
    match err {
        TypeError::Mismatch {
            expected, found, ..
        } => {
            if expected == "string" && (found == "int" || found == "float" || found == "bool") {
                return Some("call `toString()` on the value".to_string());
            }
            if expected == "float" && found == "int" {
                return Some("write the literal with a decimal point".to_string());
            }
            None
        }
        TypeError::UnknownType { name, .. } => {
            let base = name.trim_end_matches("[]");
            Some(format!("declare `class {}` or check the spelling", base))
        }
        TypeError::InvalidOperator { rhs: Some(rhs), lhs, .. } if lhs != rhs => {
            Some("operands must have the same type".to_string())
        }
        TypeError::DuplicateType { .. } => Some("rename one of the declarations".to_string()),
        _ => None,
    }
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Render a type error as a report string (or one line of JSON).
pub fn render_diagnostic(
    error: &TypeError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    let loc = error.location();
    let span = loc.span.to_range(source.len());
    let file = loc.file.as_deref().unwrap_or(filename);

    if options.json {
        return render_json(error, file, span);
    }

    let code = error_code(error);
    let config = Config::default().with_color(options.color);

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(code)
        .with_message(error.to_string())
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(primary_label(error))
                .with_color(Color::Red),
        );
    if let Some(fix) = fix_suggestion(error) {
        builder.set_help(fix);
    }
    let report = builder.finish();

    let mut buf = Vec::new();
    report
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

fn render_json(error: &TypeError, file: &str, span: Range<usize>) -> String {
    let value = json!({
        "code": error_code(error),
        "severity": "error",
        "message": error.to_string(),
        "file": file,
        "spans": [{
            "start": span.start,
            "end": span.end,
            "label": primary_label(error),
        }],
        "fix": fix_suggestion(error),
    });
    value.to_string()
}
