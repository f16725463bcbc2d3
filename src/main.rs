//! pyguardian CLI binary entry point.
//! Resolves configuration and policy, runs checks and prints results.

use clap::Parser;
use pyguardian::backend::Flake8;
use pyguardian::classify::OutputOptions;
use pyguardian::cli::{Cli, Commands};
use pyguardian::config::{self, PolicySource};
use pyguardian::{check, output, utils};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // stdout carries the JSON report; logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::AddPolicy { path } => match config::add_policy(Path::new(&path)) {
            Ok(dest) => println!(
                "Successfully added custom policy. The policy has been updated at '{}'",
                dest.display()
            ),
            Err(e) => {
                eprintln!("{} {}", utils::error_prefix(), e);
                std::process::exit(2);
            }
        },
        Commands::Check {
            files,
            repo_root,
            policy,
            output,
            timeout,
        } => {
            let eff = match config::resolve_effective(
                repo_root.as_deref(),
                policy.as_deref(),
                output.as_deref(),
                timeout,
            ) {
                Ok(eff) => eff,
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(2);
                }
            };
            let (doc, source) = match config::load_policy(&eff) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(2);
                }
            };
            if eff.output != "json" {
                match &source {
                    PolicySource::Embedded => eprintln!(
                        "{} No {} found; using the built-in policy.",
                        utils::note_prefix(),
                        config::POLICY_FILE
                    ),
                    PolicySource::File(p) => {
                        eprintln!("{} Using policy {}", utils::info_prefix(), p.display())
                    }
                }
            }

            let (targets, mut errors) = check::expand_targets(Path::new("."), &files);
            let backend = Flake8::new(eff.program.clone(), eff.timeout_secs);
            let (result, run_errors) = check::run_check(&targets, &doc, &backend);
            errors.extend(run_errors);

            let opts = OutputOptions::from_directives(&doc.output_pairs());
            output::print_check(&result, &eff.output, opts.line_prefix, &errors);
            let code = result.exit_code(&eff.output, &errors);
            if code != 0 {
                std::process::exit(code);
            }
        }
    }
}
