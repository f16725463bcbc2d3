//! Rule resolution: policy document -> per-category code sets, blacklists,
//! severity overrides, numeric extras and output directives.
//!
//! Resolution is permissive. Disabled entries and entries whose code cannot
//! be determined are skipped (the latter logged at debug level).
//!
//! Blacklist semantics depend on `ListMode`:
//! - `Allow` (default): blacklist = rulebook codes of the group that the
//!   policy did not enable.
//! - `Block` (`meta.blocklist: true`): the declared codes themselves are the
//!   blacklist.

use crate::models::policy::{PolicyDocument, RuleEntry, StyleAspect};
use crate::models::Category;
use crate::rulebook::{self, RuleTable, Severity};
use serde_yaml::Value as Yaml;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMode {
    #[default]
    Allow,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Codes resolved for one rulebook group and the derived blacklist.
pub struct RuleGroup {
    pub name: String,
    pub codes: Vec<String>,
    pub blacklist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Resolved rule set for one category. Naming and security carry a single
/// group; style carries one group per declared sub-aspect.
pub struct CategoryRules {
    pub category: Category,
    pub groups: Vec<RuleGroup>,
}

impl CategoryRules {
    pub fn codes(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.codes.iter().map(String::as_str))
            .collect()
    }

    pub fn blacklist(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.blacklist.iter().map(String::as_str))
            .collect()
    }

    pub fn is_blacklisted(&self, code: &str) -> bool {
        self.groups
            .iter()
            .any(|g| g.blacklist.iter().any(|b| b == code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityOverride {
    pub code: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Numeric thresholds collected outside the code path.
pub enum ExtraRule {
    LineLength(u32),
    CodeComplexity(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Extras reduced to one value per kind; the last declared value wins.
pub struct EffectiveExtras {
    pub line_length: Option<u32>,
    pub code_complexity: Option<i64>,
}

impl EffectiveExtras {
    pub fn from_rules(extras: &[ExtraRule]) -> EffectiveExtras {
        let mut eff = EffectiveExtras::default();
        for extra in extras {
            match *extra {
                ExtraRule::LineLength(n) => eff.line_length = Some(n),
                ExtraRule::CodeComplexity(n) => eff.code_complexity = Some(n),
            }
        }
        eff
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Everything the invoker and classifier need for one run.
pub struct Resolution {
    pub mode: ListMode,
    pub rules: Vec<CategoryRules>,
    pub severities: Vec<SeverityOverride>,
    pub extras: Vec<ExtraRule>,
    pub directives: Vec<(String, Yaml)>,
}

impl Resolution {
    pub fn rules_for(&self, category: Category) -> Option<&CategoryRules> {
        self.rules.iter().find(|r| r.category == category)
    }

    /// Explicit severity for `code`; the last override declared wins.
    pub fn severity_override(&self, code: &str) -> Option<Severity> {
        self.severities
            .iter()
            .rev()
            .find(|o| o.code == code)
            .map(|o| o.severity)
    }

    pub fn effective_extras(&self) -> EffectiveExtras {
        EffectiveExtras::from_rules(&self.extras)
    }
}

/// Resolve `policy` with a fresh resolver.
pub fn resolve(policy: &PolicyDocument) -> Resolution {
    RuleResolver::default().resolve(policy)
}

#[derive(Default)]
/// Accumulates overrides and extras while walking one policy document.
pub struct RuleResolver {
    mode: ListMode,
    severities: Vec<SeverityOverride>,
    extras: Vec<ExtraRule>,
}

impl RuleResolver {
    pub fn resolve(mut self, policy: &PolicyDocument) -> Resolution {
        if policy.blocklist() {
            self.mode = ListMode::Block;
        }
        let mut rules = Vec::new();

        if let Some(entries) = policy.naming_conventions.as_ref() {
            let group = self.resolve_group(rulebook::NAMING_GROUP, entries);
            rules.push(CategoryRules {
                category: Category::NamingConventions,
                groups: vec![group],
            });
        }

        if let Some(style) = policy.style_conventions.as_ref() {
            let mut groups: Vec<RuleGroup> = Vec::new();
            for (key, entries) in style.iter() {
                let Some(aspect) = StyleAspect::from_key(key) else {
                    debug!("ignoring unknown style sub-aspect '{}'", key);
                    continue;
                };
                let group = self.resolve_group(aspect.key(), entries);
                if aspect == StyleAspect::CodeComplexity {
                    self.collect_complexity(entries);
                }
                // Repeated or aliased keys accumulate into one group
                match groups.iter_mut().find(|g| g.name == group.name) {
                    Some(existing) => {
                        existing.codes.extend(group.codes);
                        existing.blacklist = self.blacklist_for(&existing.name, &existing.codes);
                    }
                    None => groups.push(group),
                }
            }
            rules.push(CategoryRules {
                category: Category::StyleConventions,
                groups,
            });
        }

        if let Some(entries) = policy.security.as_ref() {
            let group = self.resolve_group(rulebook::SECURITY_GROUP, entries);
            rules.push(CategoryRules {
                category: Category::Security,
                groups: vec![group],
            });
        }

        Resolution {
            mode: self.mode,
            rules,
            severities: self.severities,
            extras: self.extras,
            directives: policy.output_pairs(),
        }
    }

    fn resolve_group(&mut self, name: &str, entries: &[RuleEntry]) -> RuleGroup {
        let table = rulebook::table(name).unwrap_or(&[]);
        let codes: Vec<String> = entries
            .iter()
            .filter(|e| e.enabled)
            .filter_map(|e| self.resolve_entry(name, table, e))
            .collect();
        let blacklist = self.blacklist_for(name, &codes);
        RuleGroup {
            name: name.to_string(),
            codes,
            blacklist,
        }
    }

    fn resolve_entry(&mut self, group: &str, table: RuleTable, entry: &RuleEntry) -> Option<String> {
        let code = match (entry.error_code.as_deref(), entry.kind.as_deref()) {
            (Some(code), _) if !code.trim().is_empty() => code.trim().to_string(),
            (_, Some(kind)) => match rulebook::lookup(table, kind) {
                Some(code) => code.to_string(),
                None => {
                    debug!("{}: unknown rule type '{}', entry skipped", group, kind);
                    return None;
                }
            },
            _ => {
                debug!("{}: entry has neither error_code nor type, skipped", group);
                return None;
            }
        };

        if let Some(raw) = entry.severity.as_deref() {
            match Severity::parse(raw) {
                Some(severity) => self.severities.push(SeverityOverride {
                    code: code.clone(),
                    severity,
                }),
                None => debug!("{}: ignoring invalid severity '{}' for {}", group, raw, code),
            }
        }

        if code == rulebook::LINE_TOO_LONG {
            let n = entry
                .max_line_length
                .unwrap_or(rulebook::DEFAULT_MAX_LINE_LENGTH);
            self.extras.push(ExtraRule::LineLength(n));
        }
        Some(code)
    }

    fn collect_complexity(&mut self, entries: &[RuleEntry]) {
        for value in entries.iter().filter_map(|e| e.value) {
            self.extras.push(ExtraRule::CodeComplexity(value));
        }
    }

    fn blacklist_for(&self, group: &str, resolved: &[String]) -> Vec<String> {
        match self.mode {
            ListMode::Block => resolved.to_vec(),
            ListMode::Allow => rulebook::table(group)
                .unwrap_or(&[])
                .iter()
                .map(|(_, code)| *code)
                .filter(|code| !resolved.iter().any(|r| r == code))
                .map(str::to_string)
                .collect(),
        }
    }
}
