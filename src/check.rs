//! Check runner for one or more source units.
//!
//! Expands file arguments (plain paths or glob patterns), analyzes every
//! unit with its own `Engine` in parallel and returns the diagnostics in
//! input order, plus per-target load errors.

use crate::backend::Backend;
use crate::models::policy::PolicyDocument;
use crate::models::{Diagnostic, Summary};
use crate::pipeline::{Engine, SourceUnit};
use glob::glob;
use rayon::prelude::*;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

pub struct CheckResult {
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl CheckResult {
    /// Process exit status for a finished check. JSON output always exits 0;
    /// human output exits 1 on error diagnostics or unreadable targets.
    pub fn exit_code(&self, output: &str, load_errors: &[String]) -> i32 {
        if output == "json" {
            return 0;
        }
        if self.summary.errors > 0 || !load_errors.is_empty() {
            1
        } else {
            0
        }
    }
}

/// Expand arguments relative to `root`. Arguments containing glob
/// metacharacters are matched; others are taken as paths. Duplicates are
/// dropped keeping the first occurrence.
pub fn expand_targets(root: &Path, args: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let mut targets: Vec<PathBuf> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    for arg in args {
        let joined = root.join(arg);
        if !arg.contains(['*', '?', '[']) {
            push_unique(&mut targets, &joined);
            continue;
        }
        let pattern = joined.to_string_lossy().to_string();
        match glob(&pattern) {
            Ok(paths) => {
                let mut matched = 0usize;
                for p in paths.flatten() {
                    matched += 1;
                    if p.is_file() {
                        push_unique(&mut targets, &p);
                    }
                }
                if matched == 0 {
                    errors.push(format!("pattern matched no files: {}", arg));
                }
            }
            Err(e) => errors.push(format!("bad glob pattern '{}': {}", arg, e)),
        }
    }
    (targets, errors)
}

/// Drop `.` components so `./a.py` and the glob match `a.py` compare equal.
fn normalize(p: &Path) -> PathBuf {
    let out: PathBuf = p
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

fn push_unique(targets: &mut Vec<PathBuf>, p: &Path) {
    let p = normalize(p);
    if !targets.contains(&p) {
        targets.push(p);
    }
}

/// Analyze `targets` under `policy`. Unreadable targets are reported in the
/// returned error list and skipped.
pub fn run_check(
    targets: &[PathBuf],
    policy: &PolicyDocument,
    backend: &dyn Backend,
) -> (CheckResult, Vec<String>) {
    let per_unit: Vec<Result<Vec<Diagnostic>, String>> = targets
        .par_iter()
        .map(|path| -> Result<Vec<Diagnostic>, String> {
            let unit = SourceUnit::from_path(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            let mut engine = Engine::new(backend);
            Ok(engine.run(&unit, policy))
        })
        .collect();

    let mut diagnostics = Vec::new();
    let mut errors = Vec::new();
    let mut files = 0usize;
    for r in per_unit {
        match r {
            Ok(mut d) => {
                files += 1;
                diagnostics.append(&mut d);
            }
            Err(e) => {
                warn!("{}", e);
                errors.push(e);
            }
        }
    }
    info!("checked {} file(s), {} diagnostic(s)", files, diagnostics.len());
    let summary = Summary::from_diagnostics(&diagnostics, files);
    (
        CheckResult {
            diagnostics,
            summary,
        },
        errors,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ProcessOutput;
    use crate::error::Result;
    use crate::models::{Category, Severity};
    use std::fs;
    use tempfile::tempdir;

    struct Trailing;

    impl Backend for Trailing {
        fn program(&self) -> &str {
            "flake8"
        }
        fn execute(&self, args: &[String]) -> Result<ProcessOutput> {
            let target = args.last().unwrap();
            Ok(ProcessOutput {
                stdout: format!("{}:1:6: W291 trailing whitespace\n", target),
                stderr: String::new(),
                status: Some(1),
            })
        }
    }

    #[test]
    fn test_expand_targets_paths_and_globs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/a.py"), "").unwrap();
        fs::write(root.join("pkg/b.py"), "").unwrap();
        fs::write(root.join("pkg/c.txt"), "").unwrap();
        let (targets, errors) = expand_targets(
            root,
            &["pkg/b.py".into(), "pkg/*.py".into(), "none/*.py".into()],
        );
        assert_eq!(targets, vec![root.join("pkg/b.py"), root.join("pkg/a.py")]);
        assert_eq!(errors.len(), 1);
    }

    fn result_with(severity: Severity) -> CheckResult {
        let diagnostics = vec![Diagnostic {
            file: "m.py".into(),
            line: 1,
            position: 1,
            severity,
            message: "x".into(),
            category: Category::StyleConventions,
            code: None,
        }];
        let summary = Summary::from_diagnostics(&diagnostics, 1);
        CheckResult {
            diagnostics,
            summary,
        }
    }

    #[test]
    fn test_exit_code_by_output_mode() {
        let failing = result_with(Severity::Error);
        let clean = result_with(Severity::Warning);
        assert_eq!(failing.exit_code("json", &[]), 0);
        assert_eq!(failing.exit_code("json", &["cannot read x".into()]), 0);
        assert_eq!(failing.exit_code("human", &[]), 1);
        assert_eq!(clean.exit_code("human", &[]), 0);
        assert_eq!(clean.exit_code("human", &["cannot read x".into()]), 1);
    }

    #[test]
    fn test_expand_targets_dedupes_against_current_dir_root() {
        let (targets, errors) = expand_targets(
            Path::new("."),
            &["a.py".into(), "./a.py".into(), "b.py".into()],
        );
        assert!(errors.is_empty());
        assert_eq!(targets, vec![PathBuf::from("a.py"), PathBuf::from("b.py")]);

        // tests run from the package root, where the manifest lives
        let (targets, errors) = expand_targets(
            Path::new("."),
            &["Cargo.toml".into(), "Cargo.tom[l]".into()],
        );
        assert!(errors.is_empty());
        assert_eq!(targets, vec![PathBuf::from("Cargo.toml")]);
    }

    #[test]
    fn test_run_check_keeps_input_order_and_reports_unreadable() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("one.py"), "x = 1 \n").unwrap();
        fs::write(root.join("two.py"), "y = 2 \n").unwrap();
        let policy: PolicyDocument = serde_yaml::from_str(
            "style_conventions:\n  whitespaces:\n    - enabled: true\n      error_code: W291\n",
        )
        .unwrap();
        let targets = vec![root.join("two.py"), root.join("missing.py"), root.join("one.py")];
        let (res, errors) = run_check(&targets, &policy, &Trailing);
        assert_eq!(errors.len(), 1);
        assert_eq!(res.summary.files, 2);
        assert_eq!(res.summary.warnings, 2);
        let files: Vec<_> = res.diagnostics.iter().map(|d| d.file.as_str()).collect();
        assert_eq!(files, vec!["two.py", "one.py"]);
        assert!(res
            .diagnostics
            .iter()
            .all(|d| d.category == Category::StyleConventions));
    }
}
