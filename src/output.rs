//! Output rendering for check results.
//!
//! Supports `json` (default, the editor contract: a flat array of
//! diagnostics) and `human` outputs.

use crate::check::CheckResult;
use crate::models::{Diagnostic, Severity};
use owo_colors::OwoColorize;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Print check results in the requested format. Load errors go to stderr.
pub fn print_check(res: &CheckResult, output: &str, line_prefix: bool, errors: &[String]) {
    for e in errors {
        eprintln!("{} {}", crate::utils::error_prefix(), e);
    }
    match output {
        "json" => match serde_json::to_string(&compose_check_json(&res.diagnostics)) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("{} {}", crate::utils::error_prefix(), e),
        },
        _ => {
            let color = use_colors(output);
            for d in &res.diagnostics {
                println!("{}", human_line(d, color, line_prefix));
            }
            let s = &res.summary;
            let summary = format!(
                "— Summary — errors={} warnings={} infos={} hints={} files={}",
                s.errors, s.warnings, s.infos, s.hints, s.files
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

fn human_line(d: &Diagnostic, color: bool, line_prefix: bool) -> String {
    let icon = plain_icon(d.severity);
    let tag = format!("⟦{}⟧", d.severity);
    let (icon, tag) = if !color {
        (icon.to_string(), tag)
    } else {
        match d.severity {
            Severity::Error => (icon.red().to_string(), tag.red().bold().to_string()),
            Severity::Warning => (icon.yellow().to_string(), tag.yellow().bold().to_string()),
            Severity::Info => (icon.blue().to_string(), tag.blue().bold().to_string()),
            Severity::Hint => (icon.bright_black().to_string(), tag.bright_black().to_string()),
        }
    };
    let location = if d.line == 0 {
        String::new()
    } else if line_prefix {
        format!("Line {} at position {}: ", d.line, d.position)
    } else {
        format!("{}:{} ", d.line, d.position)
    };
    let file = if color {
        d.file.clone().bold().to_string()
    } else {
        d.file.clone()
    };
    format!(
        "{} {} {} ❲{}❳ {}{}",
        icon, tag, file, d.category, location, d.message
    )
}

fn plain_icon(sev: Severity) -> &'static str {
    match sev {
        Severity::Error => "✖",
        Severity::Warning => "▲",
        Severity::Info => "◆",
        Severity::Hint => "·",
    }
}

/// Compose the JSON array handed to editor integrations.
pub fn compose_check_json(diags: &[Diagnostic]) -> JsonVal {
    serde_json::to_value(diags).unwrap_or(JsonVal::Array(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn diag(line: u32) -> Diagnostic {
        Diagnostic {
            file: "m.py".into(),
            line,
            position: 4,
            severity: Severity::Warning,
            message: "E501 line too long".into(),
            category: Category::StyleConventions,
            code: Some("E501".into()),
        }
    }

    #[test]
    fn test_compose_check_json_shape() {
        let out = compose_check_json(&[diag(7)]);
        let first = &out[0];
        assert_eq!(first["file"], "m.py");
        assert_eq!(first["line"], 7);
        assert_eq!(first["position"], 4);
        assert_eq!(first["severity"], "warning");
        assert_eq!(first["category"], "style_conventions");
        assert_eq!(first["message"], "E501 line too long");
    }

    #[test]
    fn test_human_line_variants() {
        let plain = human_line(&diag(7), false, false);
        assert_eq!(plain, "▲ ⟦warning⟧ m.py ❲style_conventions❳ 7:4 E501 line too long");
        let verbose = human_line(&diag(7), false, true);
        assert!(verbose.contains("Line 7 at position 4: E501"));
        let opaque = human_line(&diag(0), false, true);
        assert!(opaque.ends_with("❳ E501 line too long"));
    }
}
