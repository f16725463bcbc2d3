//! Shared data models: policy schema, categories and caller-facing
//! diagnostics.

pub mod policy;

pub use crate::rulebook::Severity;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Top-level policy domain. Declaration order is the processing order.
pub enum Category {
    NamingConventions,
    StyleConventions,
    Security,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::NamingConventions,
        Category::StyleConventions,
        Category::Security,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::NamingConventions => "naming_conventions",
            Category::StyleConventions => "style_conventions",
            Category::Security => "security",
        }
    }

    /// flake8 code-class filter covering the whole category.
    pub fn code_class(self) -> &'static str {
        match self {
            Category::NamingConventions => "N",
            Category::StyleConventions => "E,W,F,C",
            Category::Security => "S",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single classified diagnostic, as handed to editor integrations.
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub position: u32,
    pub severity: Severity,
    pub message: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
/// Per-severity counts used by the human printer.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hints: usize,
    pub files: usize,
}

impl Summary {
    pub fn from_diagnostics(diags: &[Diagnostic], files: usize) -> Summary {
        let mut s = Summary {
            files,
            ..Summary::default()
        };
        for d in diags {
            match d.severity {
                Severity::Error => s.errors += 1,
                Severity::Warning => s.warnings += 1,
                Severity::Info => s.infos += 1,
                Severity::Hint => s.hints += 1,
            }
        }
        s
    }
}
