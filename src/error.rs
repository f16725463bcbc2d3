//! Error type shared by policy loading, backend execution and run cleanup.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("policy file not found: {}", .0.display())]
    PolicyNotFound(PathBuf),

    #[error("policy file is not a YAML file (.yaml/.yml): {}", .0.display())]
    InvalidPolicyExtension(PathBuf),

    #[error("policy is not valid YAML: {0}")]
    PolicyParse(#[from] serde_yaml::Error),

    #[error("config file {} is invalid: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} is not installed")]
    BackendMissing { program: String },

    #[error("failed to run {program}: {message}")]
    BackendFault { program: String, message: String },

    #[error("{program} timed out after {secs}s")]
    BackendTimeout { program: String, secs: u64 },

    #[error("failed to reset run state: {0}")]
    Reset(String),
}

pub type Result<T> = std::result::Result<T, GuardError>;
