//! Analysis pipeline: resolve -> invoke per category -> classify -> flatten.
//!
//! An `Engine` owns the state of one run (resolution, raw and grouped
//! results, scratch directory) and clears it after every run. Engines are
//! not shared between concurrent runs; create one per unit instead.

use crate::backend::{Backend, BackendInvoker, BackendParams, RawResult};
use crate::classify::{classify, OutputOptions, SeverityGroup};
use crate::error::{GuardError, Result};
use crate::grammar;
use crate::models::policy::PolicyDocument;
use crate::models::{Category, Diagnostic};
use crate::resolve::{resolve, Resolution};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
/// The unit under analysis: display name plus source text.
pub struct SourceUnit {
    pub name: String,
    pub source: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Read `path`; the display name is the file name without directories.
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    pub fn from_path(path: &Path) -> Result<SourceUnit> {
        let bytes = fs::read(path)?;
        let source = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                debug!("{}: not valid UTF-8, decoding lossily", path.display());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(SourceUnit { name, source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: Category,
    pub groups: Vec<SeverityGroup>,
}

#[derive(Debug, Default)]
/// Run-scoped accumulators; empty between runs.
pub struct RunState {
    pub resolution: Option<Resolution>,
    pub raw: Vec<(Category, RawResult)>,
    pub grouped: Vec<CategoryReport>,
    scratch: Option<TempDir>,
}

impl RunState {
    pub fn is_empty(&self) -> bool {
        self.resolution.is_none()
            && self.raw.is_empty()
            && self.grouped.is_empty()
            && self.scratch.is_none()
    }
}

pub struct Engine<'a> {
    backend: &'a dyn Backend,
    state: RunState,
}

impl<'a> Engine<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            state: RunState::default(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Analyze `unit` under `policy` and return flattened diagnostics.
    ///
    /// Backend failures degrade into per-category messages; the run itself
    /// never fails. State is reset before returning.
    pub fn run(&mut self, unit: &SourceUnit, policy: &PolicyDocument) -> Vec<Diagnostic> {
        let out = self.analyze(unit, policy);
        if let Err(e) = self.reset() {
            warn!("{}", e);
        }
        out
    }

    fn analyze(&mut self, unit: &SourceUnit, policy: &PolicyDocument) -> Vec<Diagnostic> {
        let state = &mut self.state;
        state.scratch = match tempfile::Builder::new().prefix("pyguardian-run-").tempdir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!("cannot create scratch dir, using system temp: {}", e);
                None
            }
        };
        state.resolution = Some(resolve(policy));
        let Some(resolution) = state.resolution.as_ref() else {
            return Vec::new();
        };
        let opts = OutputOptions::from_directives(&resolution.directives);
        let extras = resolution.effective_extras();
        let invoker = BackendInvoker::new(self.backend, state.scratch.as_ref().map(|d| d.path()));

        for rules in &resolution.rules {
            let Some(params) = BackendParams::for_category(rules, resolution.mode, &extras) else {
                debug!("{}: nothing selected, skipping backend", rules.category);
                continue;
            };
            let raw = invoker.invoke(rules.category, &unit.source, &params);
            state.raw.push((rules.category, raw));
        }

        for (category, raw) in &state.raw {
            let Some(rules) = resolution.rules_for(*category) else {
                continue;
            };
            let groups = classify(*category, raw, rules, &resolution.severities, &opts);
            state.grouped.push(CategoryReport {
                category: *category,
                groups,
            });
        }

        flatten(&state.grouped, &unit.name, &opts)
    }

    /// Clear all run state and remove the scratch directory.
    pub fn reset(&mut self) -> Result<()> {
        let state = std::mem::take(&mut self.state);
        if let Some(dir) = state.scratch {
            dir.close().map_err(|e| GuardError::Reset(e.to_string()))?;
        }
        Ok(())
    }
}

/// Turn grouped reports into records in category, severity, arrival order.
///
/// Entries outside the grammar are kept with line and position 0 and the raw
/// text as message.
pub fn flatten(reports: &[CategoryReport], file: &str, opts: &OutputOptions) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for report in reports {
        for group in &report.groups {
            for entry in &group.entries {
                let d = match grammar::parse(entry) {
                    Some(p) => Diagnostic {
                        file: file.to_string(),
                        line: p.line,
                        position: p.position,
                        severity: group.severity,
                        message: if opts.show_error_code {
                            p.message.to_string()
                        } else {
                            grammar::strip_code(p.message).to_string()
                        },
                        category: report.category,
                        code: p.code.map(str::to_string),
                    },
                    None => Diagnostic {
                        file: file.to_string(),
                        line: 0,
                        position: 0,
                        severity: group.severity,
                        message: entry.clone(),
                        category: report.category,
                        code: None,
                    },
                };
                out.push(d);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ProcessOutput;
    use crate::models::Severity;
    use std::sync::Mutex;

    /// Answers by `--select` value with canned lines prefixed by the target path.
    struct Canned {
        calls: Mutex<Vec<Vec<String>>>,
        missing: bool,
    }

    impl Canned {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                missing: false,
            }
        }
    }

    impl Backend for Canned {
        fn program(&self) -> &str {
            "flake8"
        }

        fn execute(&self, args: &[String]) -> Result<ProcessOutput> {
            self.calls.lock().unwrap().push(args.to_vec());
            if self.missing {
                return Err(GuardError::BackendMissing {
                    program: "flake8".into(),
                });
            }
            let target = args.last().unwrap();
            let body: &[&str] = match args[0].as_str() {
                "--select=N" => &[
                    ":1:7: N801 class name 'foo' should use CapWords convention",
                    ":4:5: N802 function name 'Bar' should be lowercase",
                ],
                "--select=E501" => &[":3:101: E501 line too long (101 > 100 characters)"],
                "--select=S101" | "--select=S" => &[":2:5: S101 Use of assert detected."],
                _ => &[],
            };
            let stdout = body
                .iter()
                .map(|l| format!("{}{}\n", target, l))
                .collect::<String>();
            Ok(ProcessOutput {
                stdout,
                stderr: String::new(),
                status: Some(1),
            })
        }
    }

    fn policy(yaml: &str) -> PolicyDocument {
        serde_yaml::from_str(yaml).unwrap()
    }

    const LINE_LENGTH: &str = r#"
style_conventions:
  line_length:
    - enabled: true
      error_code: E501
      max_line_length: 100
"#;

    #[test]
    fn test_line_length_end_to_end() {
        let backend = Canned::new();
        let mut engine = Engine::new(&backend);
        let doc = policy(LINE_LENGTH);
        let out = engine.run(&SourceUnit::new("mod.py", "x = 1\n"), &doc);
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "--select=E501");
        assert_eq!(calls[0][1], "--max-line-length=100");
        assert_eq!(calls[0][2], "--isolated");
        assert_eq!(
            out,
            vec![Diagnostic {
                file: "mod.py".into(),
                line: 3,
                position: 101,
                severity: Severity::Warning,
                message: "E501 line too long (101 > 100 characters)".into(),
                category: Category::StyleConventions,
                code: Some("E501".into()),
            }]
        );
    }

    const MULTI: &str = r#"
naming_conventions:
  - enabled: true
    type: invalid_class_name
    set.severity: hint
security:
  - enabled: true
    error_code: S101
output:
  show_error_code: false
"#;

    #[test]
    fn test_categories_in_order_with_naming_blacklist() {
        let backend = Canned::new();
        let mut engine = Engine::new(&backend);
        let out = engine.run(&SourceUnit::new("m.py", "assert x\n"), &policy(MULTI));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].category, Category::NamingConventions);
        assert_eq!(out[0].code.as_deref(), Some("N801"));
        assert_eq!(out[0].severity, Severity::Hint);
        assert_eq!(out[0].message, "class name 'foo' should use CapWords convention");
        assert_eq!(out[1].category, Category::Security);
        assert_eq!(out[1].severity, Severity::Warning);
        assert_eq!(out[1].line, 2);
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[1][0], "--select=S");
        assert!(calls[1][1].starts_with("--ignore=S102,"));
    }

    #[test]
    fn test_state_is_reset_and_runs_are_repeatable() {
        let backend = Canned::new();
        let mut engine = Engine::new(&backend);
        let doc = policy(MULTI);
        let unit = SourceUnit::new("m.py", "assert x\n");
        let first = engine.run(&unit, &doc);
        assert!(engine.state().is_empty());
        let second = engine.run(&unit, &doc);
        assert_eq!(first, second);
        assert!(engine.state().is_empty());
    }

    #[test]
    fn test_missing_backend_degrades_per_category() {
        let backend = Canned {
            calls: Mutex::new(Vec::new()),
            missing: true,
        };
        let mut engine = Engine::new(&backend);
        let out = engine.run(&SourceUnit::new("m.py", ""), &policy(MULTI));
        assert_eq!(out.len(), 2);
        for d in &out {
            assert_eq!(d.severity, Severity::Error);
            assert_eq!(d.line, 0);
            assert!(d.message.contains("not installed"));
            assert!(d.code.is_none());
        }
        assert_eq!(out[0].category, Category::NamingConventions);
        assert_eq!(out[1].category, Category::Security);
    }

    #[test]
    fn test_flatten_keeps_unparsable_entries() {
        let reports = vec![CategoryReport {
            category: Category::StyleConventions,
            groups: vec![SeverityGroup {
                severity: Severity::Error,
                entries: vec!["Flake8 Errors:".into(), ":1:2: E111 bad indent".into()],
            }],
        }];
        let out = flatten(&reports, "a.py", &OutputOptions::default());
        assert_eq!(out[0].message, "Flake8 Errors:");
        assert_eq!((out[0].line, out[0].position), (0, 0));
        assert_eq!(out[1].message, "E111 bad indent");
    }

    #[test]
    fn test_source_unit_from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sample.py");
        fs::write(&p, "print('hi')\n").unwrap();
        let unit = SourceUnit::from_path(&p).unwrap();
        assert_eq!(unit.name, "sample.py");
        assert_eq!(unit.source, "print('hi')\n");
    }

    #[test]
    fn test_source_unit_from_path_accepts_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("legacy.py");
        fs::write(&p, b"# -*- coding: latin-1 -*-\nname = 'caf\xe9'\n").unwrap();
        let unit = SourceUnit::from_path(&p).unwrap();
        assert_eq!(unit.name, "legacy.py");
        assert!(unit.source.starts_with("# -*- coding: latin-1 -*-\n"));
        assert!(unit.source.contains("caf\u{FFFD}"));
    }

    #[test]
    fn test_reset_failure_is_reported_and_state_cleared() {
        let backend = Canned::new();
        let mut engine = Engine::new(&backend);
        let out = engine.analyze(&SourceUnit::new("m.py", ""), &policy(LINE_LENGTH));
        assert_eq!(out.len(), 1);
        let scratch = engine.state.scratch.as_ref().unwrap().path().to_path_buf();
        fs::remove_dir_all(&scratch).unwrap();
        let err = engine.reset().unwrap_err();
        assert!(matches!(err, GuardError::Reset(_)));
        assert!(engine.state().is_empty());
    }

    /// Removes the run's scratch directory while the backend runs.
    struct Vanishing;

    impl Backend for Vanishing {
        fn program(&self) -> &str {
            "flake8"
        }
        fn execute(&self, args: &[String]) -> Result<ProcessOutput> {
            let target = Path::new(args.last().unwrap());
            fs::remove_dir_all(target.parent().unwrap()).unwrap();
            Ok(ProcessOutput {
                stdout: format!("{}:3:101: E501 line too long (101 > 100 characters)\n", target.display()),
                stderr: String::new(),
                status: Some(1),
            })
        }
    }

    #[test]
    fn test_run_returns_result_when_reset_fails() {
        let mut engine = Engine::new(&Vanishing);
        let out = engine.run(&SourceUnit::new("m.py", ""), &policy(LINE_LENGTH));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].line, 3);
        assert_eq!(out[0].severity, Severity::Warning);
        assert!(engine.state().is_empty());
    }
}
