//! Configuration discovery, effective settings and policy loading.
//!
//! pyguardian reads `pyguardian.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config. Defaults:
//! - `output`: `json`
//! - `backend.program`: `flake8`
//! - `backend.timeout_secs`: 30
//!
//! Overrides precedence: CLI > config file > defaults.
//!
//! The policy document is looked up in this order: explicit path (CLI or
//! config `policy`), `pipeguardian.yaml|yml` in the root, the installed
//! default under the user config dir, the embedded default policy.

use crate::backend::{DEFAULT_PROGRAM, DEFAULT_TIMEOUT_SECS};
use crate::error::{GuardError, Result};
use crate::models::policy::PolicyDocument;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Policy file name looked up in the repository root and the user config dir.
pub const POLICY_FILE: &str = "pipeguardian.yaml";

/// Policy used when no policy file is found anywhere.
pub const DEFAULT_POLICY: &str = include_str!("../policy/default.yaml");

const CONFIG_FILES: [&str; 3] = ["pyguardian.toml", "pyguardian.yaml", "pyguardian.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Backend section under `[backend]`.
pub struct BackendCfg {
    pub program: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `pyguardian.toml|yaml`.
pub struct GuardianConfig {
    pub policy: Option<String>,
    pub output: Option<String>,
    #[serde(default)]
    pub backend: Option<BackendCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub policy: Option<PathBuf>,
    pub output: String,
    pub program: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where the active policy came from.
pub enum PolicySource {
    File(PathBuf),
    Embedded,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a config file, a policy file or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists())
            || cur.join(POLICY_FILE).exists()
            || cur.join(".git").exists()
        {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `GuardianConfig` from `pyguardian.toml` or `pyguardian.yaml|yml`.
///
/// `Ok(None)` when no file exists.
pub fn load_config(root: &Path) -> Result<Option<GuardianConfig>> {
    for name in CONFIG_FILES {
        let p = root.join(name);
        if !p.exists() {
            continue;
        }
        let s = fs::read_to_string(&p)?;
        let parsed = if name.ends_with(".toml") {
            toml::from_str::<GuardianConfig>(&s).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<GuardianConfig>(&s).map_err(|e| e.to_string())
        };
        return parsed
            .map(Some)
            .map_err(|message| GuardError::ConfigParse { path: p, message });
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_policy: Option<&str>,
    cli_output: Option<&str>,
    cli_timeout: Option<u64>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root)?.unwrap_or_default();
    let backend = cfg.backend.unwrap_or_default();

    let policy = cli_policy
        .map(|s| s.to_string())
        .or(cfg.policy)
        .map(|p| repo_root.join(p));

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "json".to_string());

    let program = backend
        .program
        .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());

    let timeout_secs = cli_timeout
        .or(backend.timeout_secs)
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(Effective {
        repo_root,
        policy,
        output,
        program,
        timeout_secs,
    })
}

/// Location of the installed default policy (`add-policy` target).
pub fn installed_policy_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pyguardian").join(POLICY_FILE))
}

pub fn parse_policy(s: &str) -> Result<PolicyDocument> {
    let doc: Option<PolicyDocument> = serde_yaml::from_str(s)?;
    Ok(doc.unwrap_or_default())
}

fn read_policy(path: &Path) -> Result<PolicyDocument> {
    let s = fs::read_to_string(path)?;
    parse_policy(&s)
}

/// Load the active policy for `eff` following the discovery order.
pub fn load_policy(eff: &Effective) -> Result<(PolicyDocument, PolicySource)> {
    load_policy_with(eff, installed_policy_path().as_deref())
}

fn load_policy_with(
    eff: &Effective,
    installed: Option<&Path>,
) -> Result<(PolicyDocument, PolicySource)> {
    if let Some(p) = eff.policy.as_ref() {
        if !p.is_file() {
            return Err(GuardError::PolicyNotFound(p.clone()));
        }
        return Ok((read_policy(p)?, PolicySource::File(p.clone())));
    }
    for name in [POLICY_FILE, "pipeguardian.yml"] {
        let p = eff.repo_root.join(name);
        if p.is_file() {
            return Ok((read_policy(&p)?, PolicySource::File(p)));
        }
    }
    if let Some(p) = installed.filter(|p| p.is_file()) {
        return Ok((read_policy(p)?, PolicySource::File(p.to_path_buf())));
    }
    debug!("no policy file found, using embedded default");
    Ok((parse_policy(DEFAULT_POLICY)?, PolicySource::Embedded))
}

/// Install `custom` as the default policy; returns the destination path.
pub fn add_policy(custom: &Path) -> Result<PathBuf> {
    let dest = installed_policy_path().ok_or_else(|| {
        GuardError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no user configuration directory available",
        ))
    })?;
    add_policy_at(custom, &dest)?;
    Ok(dest)
}

fn add_policy_at(custom: &Path, dest: &Path) -> Result<()> {
    if !custom.exists() {
        return Err(GuardError::PolicyNotFound(custom.to_path_buf()));
    }
    let is_yaml = custom
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false);
    if !is_yaml {
        return Err(GuardError::InvalidPolicyExtension(custom.to_path_buf()));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if dest.exists() {
        warn!("overwriting existing policy at {}", dest.display());
    }
    fs::copy(custom, dest)?;
    Ok(())
}
