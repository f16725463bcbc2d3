//! Backend invocation: flake8 parameters per category and process
//! execution against an isolated temp file.
//!
//! Per-category selection:
//! - naming: always `--select=N`; blacklisted codes are dropped later by the
//!   classifier.
//! - style / security: `--select=<class> --ignore=<blacklist>` when a
//!   blacklist is in effect (or blocklist mode), otherwise
//!   `--select=<codes>`.
//!
//! Execution failures never escape `BackendInvoker::invoke`; they become a
//! single descriptive line in the category's raw result.

use crate::error::{GuardError, Result};
use crate::grammar;
use crate::models::Category;
use crate::resolve::{CategoryRules, EffectiveExtras, ListMode};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_PROGRAM: &str = "flake8";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// flake8 options for one category (the target path is added at invoke time).
pub struct BackendParams {
    pub select: Vec<String>,
    pub ignore: Vec<String>,
    pub max_line_length: Option<u32>,
    pub complexity: Option<i64>,
}

impl BackendParams {
    /// Build parameters for `rules`; `None` when the category has nothing to
    /// check.
    pub fn for_category(
        rules: &CategoryRules,
        mode: ListMode,
        extras: &EffectiveExtras,
    ) -> Option<BackendParams> {
        let class = rules.category.code_class().to_string();
        let mut params = match rules.category {
            Category::NamingConventions => BackendParams {
                select: vec![class],
                ..Default::default()
            },
            Category::StyleConventions | Category::Security => {
                let blacklist: Vec<String> =
                    rules.blacklist().into_iter().map(str::to_string).collect();
                if mode == ListMode::Block || !blacklist.is_empty() {
                    BackendParams {
                        select: vec![class],
                        ignore: blacklist,
                        ..Default::default()
                    }
                } else {
                    let codes: Vec<String> =
                        rules.codes().into_iter().map(str::to_string).collect();
                    if codes.is_empty() {
                        return None;
                    }
                    BackendParams {
                        select: codes,
                        ..Default::default()
                    }
                }
            }
        };
        if rules.category == Category::StyleConventions {
            params.max_line_length = extras.line_length;
            params.complexity = extras.code_complexity.filter(|c| *c != 0);
        }
        Some(params)
    }

    /// Command-line options, excluding `--isolated` and the target.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![format!("--select={}", self.select.join(","))];
        if !self.ignore.is_empty() {
            args.push(format!("--ignore={}", self.ignore.join(",")));
        }
        if let Some(n) = self.max_line_length {
            args.push(format!("--max-line-length={}", n));
        }
        match self.complexity {
            Some(n) if n < 0 => args.push(format!("--min-complexity={}", n.unsigned_abs())),
            Some(n) if n > 0 => args.push(format!("--max-complexity={}", n)),
            _ => {}
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Raw per-category backend output with the target path stripped.
pub struct RawResult {
    pub lines: Vec<String>,
    pub stderr: String,
}

impl RawResult {
    pub fn from_failure(message: String) -> RawResult {
        RawResult {
            lines: vec![message],
            stderr: String::new(),
        }
    }

    /// Stdout lines followed by stderr (under a `Flake8 Errors:` header).
    pub fn entries(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        let err = self.stderr.trim();
        if !err.is_empty() {
            out.push("Flake8 Errors:");
            out.extend(err.lines());
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

/// An executable analysis backend.
pub trait Backend: Send + Sync {
    fn program(&self) -> &str;
    fn execute(&self, args: &[String]) -> Result<ProcessOutput>;
}

/// flake8 run as a subprocess with a bounded wait.
pub struct Flake8 {
    program: String,
    timeout: Duration,
}

impl Flake8 {
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for Flake8 {
    fn default() -> Self {
        Flake8::new(DEFAULT_PROGRAM, DEFAULT_TIMEOUT_SECS)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl Backend for Flake8 {
    fn program(&self) -> &str {
        &self.program
    }

    fn execute(&self, args: &[String]) -> Result<ProcessOutput> {
        debug!("running {} {:?}", self.program, args);
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GuardError::BackendMissing {
                        program: self.program.clone(),
                    }
                } else {
                    GuardError::BackendFault {
                        program: self.program.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        // Drain pipes concurrently so a chatty child cannot block on a full pipe
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!("{} timed out after {}s", self.program, self.timeout.as_secs());
                        return Err(GuardError::BackendTimeout {
                            program: self.program.clone(),
                            secs: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(GuardError::BackendFault {
                        program: self.program.clone(),
                        message: e.to_string(),
                    })
                }
            }
        };

        let join = |h: Option<JoinHandle<String>>| h.and_then(|h| h.join().ok()).unwrap_or_default();
        Ok(ProcessOutput {
            stdout: join(stdout),
            stderr: join(stderr),
            status: status.code(),
        })
    }
}

/// Runs one category against the unit under analysis.
pub struct BackendInvoker<'a> {
    backend: &'a dyn Backend,
    scratch: Option<&'a Path>,
}

impl<'a> BackendInvoker<'a> {
    /// `scratch` is the directory for temp targets; the system temp dir when
    /// `None`.
    pub fn new(backend: &'a dyn Backend, scratch: Option<&'a Path>) -> Self {
        Self { backend, scratch }
    }

    pub fn invoke(&self, category: Category, source: &str, params: &BackendParams) -> RawResult {
        match self.try_invoke(source, params) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}: backend failed: {}", category, e);
                RawResult::from_failure(describe_failure(&e))
            }
        }
    }

    fn try_invoke(&self, source: &str, params: &BackendParams) -> Result<RawResult> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pyguardian-").suffix(".py");
        let mut file = match self.scratch {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(source.as_bytes())?;
        file.flush()?;
        // Handle closed here; the path is removed when `target` drops
        let target = file.into_temp_path();
        let target_str = target.to_string_lossy().to_string();

        let mut args = params.args();
        args.push("--isolated".to_string());
        args.push(target_str.clone());

        let out = self.backend.execute(&args)?;
        let lines = out
            .stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| grammar::strip_path_prefix(l, &target_str).to_string())
            .collect();
        Ok(RawResult {
            lines,
            stderr: out.stderr,
        })
    }
}

fn describe_failure(e: &GuardError) -> String {
    match e {
        GuardError::BackendMissing { program } => format!(
            "Error: {} is not installed. Install it using `pip install flake8`.",
            program
        ),
        other => format!("An unexpected error occurred: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::RuleGroup;
    use std::sync::Mutex;

    fn group(name: &str, codes: &[&str], blacklist: &[&str]) -> RuleGroup {
        RuleGroup {
            name: name.into(),
            codes: codes.iter().map(|s| s.to_string()).collect(),
            blacklist: blacklist.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_style_select_with_line_length() {
        let rules = CategoryRules {
            category: Category::StyleConventions,
            groups: vec![group("line_length", &["E501"], &[])],
        };
        let extras = EffectiveExtras {
            line_length: Some(100),
            code_complexity: None,
        };
        let p = BackendParams::for_category(&rules, ListMode::Allow, &extras).unwrap();
        assert_eq!(p.args(), vec!["--select=E501", "--max-line-length=100"]);
    }

    #[test]
    fn test_ignore_mode_and_complexity_sign() {
        let rules = CategoryRules {
            category: Category::StyleConventions,
            groups: vec![group("blank_lines", &["E301"], &["E302", "E303"])],
        };
        let neg = EffectiveExtras {
            line_length: None,
            code_complexity: Some(-7),
        };
        let p = BackendParams::for_category(&rules, ListMode::Allow, &neg).unwrap();
        assert_eq!(
            p.args(),
            vec!["--select=E,W,F,C", "--ignore=E302,E303", "--min-complexity=7"]
        );
        let pos = EffectiveExtras {
            line_length: None,
            code_complexity: Some(10),
        };
        let p = BackendParams::for_category(&rules, ListMode::Allow, &pos).unwrap();
        assert_eq!(p.args().last().unwrap(), "--max-complexity=10");
    }

    #[test]
    fn test_naming_selects_class_and_skips_empty_security() {
        let naming = CategoryRules {
            category: Category::NamingConventions,
            groups: vec![group("pep8-naming", &["N801"], &["N802"])],
        };
        let p = BackendParams::for_category(&naming, ListMode::Allow, &Default::default()).unwrap();
        assert_eq!(p.args(), vec!["--select=N"]);

        let security = CategoryRules {
            category: Category::Security,
            groups: vec![group("bandit", &[], &[])],
        };
        assert!(BackendParams::for_category(&security, ListMode::Allow, &Default::default()).is_none());
        let p = BackendParams::for_category(&security, ListMode::Block, &Default::default()).unwrap();
        assert_eq!(p.args(), vec!["--select=S"]);
    }

    #[test]
    fn test_extras_not_applied_outside_style() {
        let security = CategoryRules {
            category: Category::Security,
            groups: vec![group("bandit", &["S101"], &[])],
        };
        let extras = EffectiveExtras {
            line_length: Some(120),
            code_complexity: Some(5),
        };
        let p = BackendParams::for_category(&security, ListMode::Allow, &extras).unwrap();
        assert_eq!(p.args(), vec!["--select=S101"]);
    }

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl Backend for Recording {
        fn program(&self) -> &str {
            "fake"
        }
        fn execute(&self, args: &[String]) -> Result<ProcessOutput> {
            *self.seen.lock().unwrap() = args.to_vec();
            let target = args.last().unwrap();
            assert!(Path::new(target).exists());
            Ok(ProcessOutput {
                stdout: format!("{}:3:101: E501 line too long (101 > 100 characters)\n", target),
                stderr: String::new(),
                status: Some(1),
            })
        }
    }

    #[test]
    fn test_invoke_strips_path_and_removes_target() {
        let backend = Recording {
            seen: Mutex::new(Vec::new()),
        };
        let dir = tempfile::tempdir().unwrap();
        let invoker = BackendInvoker::new(&backend, Some(dir.path()));
        let params = BackendParams {
            select: vec!["E501".into()],
            ..Default::default()
        };
        let raw = invoker.invoke(Category::StyleConventions, "x = 1\n", &params);
        assert_eq!(raw.lines, vec![":3:101: E501 line too long (101 > 100 characters)"]);
        let seen = backend.seen.lock().unwrap().clone();
        assert_eq!(seen[1], "--isolated");
        assert!(!Path::new(&seen[2]).exists());
    }

    struct Missing;

    impl Backend for Missing {
        fn program(&self) -> &str {
            "flake8"
        }
        fn execute(&self, _args: &[String]) -> Result<ProcessOutput> {
            Err(GuardError::BackendMissing {
                program: "flake8".into(),
            })
        }
    }

    #[test]
    fn test_missing_backend_degrades_to_message() {
        let invoker = BackendInvoker::new(&Missing, None);
        let raw = invoker.invoke(Category::Security, "", &BackendParams::default());
        assert_eq!(raw.lines.len(), 1);
        assert!(raw.lines[0].starts_with("Error: flake8 is not installed"));
    }

    #[test]
    fn test_real_process_not_found() {
        let backend = Flake8::new("pyguardian-definitely-missing-binary", 5);
        let err = backend.execute(&["--version".to_string()]).unwrap_err();
        assert!(matches!(err, GuardError::BackendMissing { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_process_is_killed_on_timeout() {
        let backend = Flake8::new("sleep", 1);
        let start = Instant::now();
        let err = backend.execute(&["5".to_string()]).unwrap_err();
        assert!(matches!(err, GuardError::BackendTimeout { ref program, secs: 1 } if program == "sleep"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    struct Stalled;

    impl Backend for Stalled {
        fn program(&self) -> &str {
            "flake8"
        }
        fn execute(&self, _args: &[String]) -> Result<ProcessOutput> {
            Err(GuardError::BackendTimeout {
                program: "flake8".into(),
                secs: 30,
            })
        }
    }

    #[test]
    fn test_timeout_degrades_to_single_message() {
        let invoker = BackendInvoker::new(&Stalled, None);
        let raw = invoker.invoke(Category::StyleConventions, "x = 1\n", &BackendParams::default());
        assert_eq!(raw.lines.len(), 1);
        assert!(raw.lines[0].starts_with("An unexpected error occurred: "));
        assert!(raw.stderr.is_empty());
    }

    #[test]
    fn test_entries_append_stderr() {
        let raw = RawResult {
            lines: vec![":1:1: E101 x".into()],
            stderr: "boom\n".into(),
        };
        assert_eq!(raw.entries(), vec![":1:1: E101 x", "Flake8 Errors:", "boom"]);
    }
}
