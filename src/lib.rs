//! pyguardian core library.
//!
//! This crate turns a YAML code-quality policy into flake8 invocations, runs
//! them against Python source units and classifies the raw diagnostics into
//! severity-grouped, structured reports for editor integrations.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Config discovery, effective settings and policy loading.
//! - `rulebook`: Static rule tables, severity vocabulary, warning codes.
//! - `resolve`: Policy -> per-category codes, blacklists, overrides, extras.
//! - `backend`: flake8 parameter assembly and process execution.
//! - `grammar`: The diagnostic line grammar.
//! - `classify`: Severity assignment and grouping.
//! - `pipeline`: Per-unit engine sequencing resolve/invoke/classify.
//! - `check`: Multi-file runner.
//! - `models`: Policy schema and diagnostic records.
//! - `output`: Human/JSON printers.
//! - `error`: Error type.
//! - `utils`: Supporting helpers.
pub mod backend;
pub mod check;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod grammar;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod rulebook;
pub mod utils;
