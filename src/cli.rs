//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pyguardian-lt",
    version,
    about = "Policy-driven flake8 runner",
    long_about = "pyguardian — turn a YAML code-quality policy into flake8 checks and report severity-grouped diagnostics.\n\nConfiguration precedence: CLI > pyguardian.toml > defaults.",
    after_help = "Examples:\n  pyguardian-lt check app.py\n  pyguardian-lt check 'src/**/*.py' --output human\n  pyguardian-lt add-policy team-policy.yaml",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current pyguardian version.")]
    Version,
    /// Analyze Python files against the active policy
    #[command(
        about = "Analyze files",
        long_about = "Run flake8 per policy category on each file and print classified diagnostics. JSON output is a flat array for editor integrations.",
        after_help = "Examples:\n  pyguardian-lt check app.py\n  pyguardian-lt check 'pkg/*.py' --policy strict.yaml --output human"
    )]
    Check {
        #[arg(required = true, help = "Files or glob patterns to analyze")]
        files: Vec<String>,
        #[arg(long, help = "Repository root used for config discovery (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Policy YAML file (default: discovered pipeguardian.yaml)")]
        policy: Option<String>,
        #[arg(long, help = "Output mode: json|human (default: json)")]
        output: Option<String>,
        #[arg(long, help = "Backend timeout in seconds (default: 30)")]
        timeout: Option<u64>,
    },
    /// Install a policy file as the default policy
    #[command(
        about = "Install default policy",
        long_about = "Copy a .yaml/.yml policy file into the user configuration directory, replacing the current default policy."
    )]
    AddPolicy {
        #[arg(help = "Path to the policy YAML file")]
        path: String,
    },
}
