//! The diagnostic line grammar shared by backend output stripping, the
//! classifier and pipeline flattening.
//!
//! After the file path is stripped, flake8 lines look like
//! `:<line>:<col>: <CODE> <message>` where `<CODE>` is one letter followed by
//! three digits. Anything else is opaque text.

use regex::Regex;
use std::sync::OnceLock;

static LINE_PATTERN: OnceLock<Regex> = OnceLock::new();
static CODE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn line_pattern() -> &'static Regex {
    LINE_PATTERN.get_or_init(|| Regex::new(r"^:(\d+):(\d+): (.+)$").expect("valid regex"))
}

fn code_pattern() -> &'static Regex {
    CODE_PATTERN.get_or_init(|| Regex::new(r"^([A-Za-z]\d{3})(?:\s|$)").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A line that matched the grammar. `message` still starts with the code.
pub struct ParsedLine<'a> {
    pub line: u32,
    pub position: u32,
    pub message: &'a str,
    pub code: Option<&'a str>,
}

/// Parse a stripped diagnostic line; `None` when it does not match.
pub fn parse(raw: &str) -> Option<ParsedLine<'_>> {
    let caps = line_pattern().captures(raw.trim_end())?;
    let line = caps.get(1)?.as_str().parse().ok()?;
    let position = caps.get(2)?.as_str().parse().ok()?;
    let message = caps.get(3)?.as_str();
    Some(ParsedLine {
        line,
        position,
        message,
        code: code_of_message(message),
    })
}

/// Leading error code of a message, e.g. `E501` in `E501 line too long`.
pub fn code_of_message(message: &str) -> Option<&str> {
    code_pattern()
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Drop the leading error code from a message, if any.
pub fn strip_code(message: &str) -> &str {
    match code_of_message(message) {
        Some(code) => message[code.len()..].trim_start(),
        None => message,
    }
}

/// Remove the analysis-target path from a raw backend line.
///
/// The prefix is cut by the exact byte length of `path`, keeping every
/// character after it. Lines that do not start with the path are returned
/// unchanged.
pub fn strip_path_prefix<'a>(raw: &'a str, path: &str) -> &'a str {
    if raw.starts_with(path) {
        &raw[path.len()..]
    } else {
        raw
    }
}
