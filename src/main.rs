use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use rust_solutionpackage::{build_solution_into, BuildOptions, Diagnostics, VerificationStatus};

#[derive(Parser)]
#[command(name = "rust-solutionpackage")]
#[command(author, version, about = "Compile data-model specs into an importable solution package")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a spec tree into a solution .zip
    Build {
        /// Spec root containing solution.json
        #[arg(short, long)]
        specs: PathBuf,

        /// Output path for the .zip (defaults to <specs>/<uniqueName>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the external solution checker
        #[arg(long)]
        skip_check: bool,

        /// Region passed to the solution checker
        #[arg(long, default_value = "USGovernment")]
        geo: String,

        /// Solution checker executable
        #[arg(long, default_value = "pac")]
        checker: PathBuf,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            specs,
            output,
            skip_check,
            geo,
            checker,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(false)
                .init();

            let options = BuildOptions {
                specs,
                output,
                skip_check,
                geo,
                checker,
            };

            let mut diagnostics = Diagnostics::new();
            let outcome = match build_solution_into(&options, &mut diagnostics) {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Report what was recorded before the build failed
                    diagnostics.emit();
                    return Err(e);
                }
            };
            outcome.diagnostics.emit();

            match outcome.verification.as_ref().map(|v| &v.status) {
                None => tracing::info!("Package built; solution checker skipped"),
                Some(VerificationStatus::Passed) => {
                    tracing::info!("Solution checker passed; ready for import")
                }
                Some(VerificationStatus::IssuesFound) => tracing::warn!(
                    "Solution checker reported {} high-severity finding(s)",
                    outcome
                        .verification
                        .as_ref()
                        .map_or(0, |v| v.high_severity_count())
                ),
                Some(VerificationStatus::Unavailable(reason)) => {
                    tracing::warn!("Solution checker unavailable ({}); not ready for import", reason)
                }
            }

            if outcome.has_high_severity_findings() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
