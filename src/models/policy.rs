//! Policy schema consumed by the rule resolver.
//!
//! Key components:
//! - `meta`: global switches (`blocklist` flips declared codes from
//!   "selected" to "suppressed").
//! - `naming_conventions`, `security`: ordered rule entries.
//! - `style_conventions`: rule entries keyed by sub-aspect; declaration order
//!   is kept so resolved codes follow the document.
//! - `output`: opaque formatting directives.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value as Yaml;
use std::fmt;

#[derive(Debug, Default, Deserialize, Clone)]
/// Root policy document loaded from YAML.
pub struct PolicyDocument {
    #[serde(default)]
    pub meta: Option<Meta>,
    #[serde(default)]
    pub naming_conventions: Option<Vec<RuleEntry>>,
    #[serde(default)]
    pub style_conventions: Option<StyleConventions>,
    #[serde(default)]
    pub security: Option<Vec<RuleEntry>>,
    #[serde(default)]
    pub output: Option<serde_yaml::Mapping>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Meta {
    #[serde(default)]
    pub blocklist: bool,
}

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
/// One rule toggle. Either `error_code` or `type` names the check.
pub struct RuleEntry {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, rename = "set.severity")]
    pub severity: Option<String>,
    #[serde(default)]
    pub max_line_length: Option<u32>,
    /// Complexity threshold; only read under `code_complexity`.
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Sub-aspects of `style_conventions`, each backed by a rulebook table.
pub enum StyleAspect {
    Indentation,
    Whitespaces,
    BlankLines,
    Import,
    LineLength,
    Statement,
    Runtime,
    LineBreak,
    Deprecation,
    FlowControl,
    LogicalIssues,
    CodeQuality,
    LogicalOperations,
    CodeComplexity,
}

impl StyleAspect {
    pub fn from_key(key: &str) -> Option<StyleAspect> {
        let a = match key {
            "indentation" => StyleAspect::Indentation,
            "whitespaces" | "whitespace" => StyleAspect::Whitespaces,
            "blank_lines" => StyleAspect::BlankLines,
            "import" => StyleAspect::Import,
            "line_length" => StyleAspect::LineLength,
            "statement" => StyleAspect::Statement,
            "runtime" => StyleAspect::Runtime,
            "line_break" => StyleAspect::LineBreak,
            "deprecation" => StyleAspect::Deprecation,
            "flow_control" => StyleAspect::FlowControl,
            "logical_issues" => StyleAspect::LogicalIssues,
            "code_quality" => StyleAspect::CodeQuality,
            "logical_operations" => StyleAspect::LogicalOperations,
            "code_complexity" => StyleAspect::CodeComplexity,
            _ => return None,
        };
        Some(a)
    }

    /// Canonical key, also the rulebook group name.
    pub fn key(self) -> &'static str {
        match self {
            StyleAspect::Indentation => "indentation",
            StyleAspect::Whitespaces => "whitespaces",
            StyleAspect::BlankLines => "blank_lines",
            StyleAspect::Import => "import",
            StyleAspect::LineLength => "line_length",
            StyleAspect::Statement => "statement",
            StyleAspect::Runtime => "runtime",
            StyleAspect::LineBreak => "line_break",
            StyleAspect::Deprecation => "deprecation",
            StyleAspect::FlowControl => "flow_control",
            StyleAspect::LogicalIssues => "logical_issues",
            StyleAspect::CodeQuality => "code_quality",
            StyleAspect::LogicalOperations => "logical_operations",
            StyleAspect::CodeComplexity => "code_complexity",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
/// Ordered `(sub-aspect key, entries)` pairs as written in the document.
/// Keys are kept verbatim; unknown keys are filtered by the resolver.
pub struct StyleConventions(pub Vec<(String, Vec<RuleEntry>)>);

impl StyleConventions {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RuleEntry])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<'de> Deserialize<'de> for StyleConventions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AspectsVisitor;

        impl<'de> Visitor<'de> for AspectsVisitor {
            type Value = StyleConventions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of style sub-aspects to rule lists")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(StyleConventions::default())
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut out = Vec::new();
                while let Some((key, entries)) =
                    map.next_entry::<String, Option<Vec<RuleEntry>>>()?
                {
                    out.push((key, entries.unwrap_or_default()));
                }
                Ok(StyleConventions(out))
            }
        }

        deserializer.deserialize_any(AspectsVisitor)
    }
}

impl PolicyDocument {
    pub fn blocklist(&self) -> bool {
        self.meta.as_ref().map(|m| m.blocklist).unwrap_or(false)
    }

    /// `output` pairs in document order; non-string keys are rendered as YAML.
    pub fn output_pairs(&self) -> Vec<(String, Yaml)> {
        let Some(map) = self.output.as_ref() else {
            return Vec::new();
        };
        map.iter()
            .map(|(k, v)| {
                let key = match k {
                    Yaml::String(s) => s.clone(),
                    other => serde_yaml::to_string(other)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default(),
                };
                (key, v.clone())
            })
            .collect()
    }
}
