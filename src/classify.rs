//! Diagnostic classification: raw backend lines -> severity buckets.
//!
//! Severity precedence per diagnostic:
//! 1. policy override for the code (`set.severity`, last one declared wins);
//! 2. `warning` when the rulebook lists the code as a warning;
//! 3. `error`.
//!
//! Lines outside the grammar are kept verbatim and classified as `error`.
//! Buckets follow the canonical severity order and are never empty.

use crate::backend::RawResult;
use crate::grammar;
use crate::models::{Category, Severity};
use crate::resolve::{CategoryRules, SeverityOverride};
use crate::rulebook;
use serde_yaml::Value as Yaml;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityGroup {
    pub severity: Severity,
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Formatting switches read from the policy `output` section.
pub struct OutputOptions {
    /// Order each bucket by line, then column.
    pub sort_by_line: bool,
    /// Keep the leading error code in messages.
    pub show_error_code: bool,
    /// Human output as `Line <l> at position <p>: <message>`.
    pub line_prefix: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            sort_by_line: false,
            show_error_code: true,
            line_prefix: false,
        }
    }
}

impl OutputOptions {
    pub fn from_directives(directives: &[(String, Yaml)]) -> OutputOptions {
        let mut opts = OutputOptions::default();
        for (key, value) in directives {
            let flag = value.as_bool();
            match (key.as_str(), flag) {
                ("sort_by_line", Some(b)) => opts.sort_by_line = b,
                ("show_error_code", Some(b)) => opts.show_error_code = b,
                ("line_prefix", Some(b)) => opts.line_prefix = b,
                _ => debug!("ignoring output directive '{}'", key),
            }
        }
        opts
    }
}

/// Severity for a diagnostic code (`None` for unparsable lines).
pub fn severity_for(code: Option<&str>, overrides: &[SeverityOverride]) -> Severity {
    let Some(code) = code else {
        return Severity::Error;
    };
    if let Some(o) = overrides.iter().rev().find(|o| o.code == code) {
        return o.severity;
    }
    if rulebook::is_warning(code) {
        return Severity::Warning;
    }
    Severity::Error
}

/// Classify one category's raw output into ordered severity buckets.
pub fn classify(
    category: Category,
    raw: &RawResult,
    rules: &CategoryRules,
    overrides: &[SeverityOverride],
    opts: &OutputOptions,
) -> Vec<SeverityGroup> {
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); Severity::ORDERED.len()];
    for entry in raw.entries() {
        let code = grammar::parse(entry).and_then(|p| p.code);
        if category == Category::NamingConventions {
            if let Some(c) = code {
                if rules.is_blacklisted(c) {
                    continue;
                }
            }
        }
        let severity = severity_for(code, overrides);
        buckets[(severity.rank() - 1) as usize].push(entry.to_string());
    }

    Severity::ORDERED
        .iter()
        .zip(buckets)
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(severity, mut entries)| {
            if opts.sort_by_line {
                sort_by_position(&mut entries);
            }
            SeverityGroup {
                severity: *severity,
                entries,
            }
        })
        .collect()
}

/// Stable sort by (line, column). Leaves the bucket untouched when any entry
/// is outside the grammar.
fn sort_by_position(entries: &mut [String]) {
    let keys: Option<Vec<(u32, u32)>> = entries
        .iter()
        .map(|e| grammar::parse(e).map(|p| (p.line, p.position)))
        .collect();
    let Some(keys) = keys else {
        return;
    };
    let mut indexed: Vec<((u32, u32), String)> = keys
        .into_iter()
        .zip(entries.iter_mut().map(std::mem::take))
        .collect();
    indexed.sort_by_key(|(k, _)| *k);
    for (slot, (_, e)) in entries.iter_mut().zip(indexed) {
        *slot = e;
    }
}
