//! rust-solutionpackage: a compiler for declarative data-model specs
//!
//! This library reads a tree of JSON table, choice, view and form specs and
//! compiles it into an importable solution .zip, then optionally hands the
//! archive to the external solution checker.

pub mod diagnostics;
pub mod error;
pub mod model;
pub mod project;
pub mod solution;
pub mod util;

use std::path::PathBuf;

use anyhow::Result;

pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::SolutionPackageError;
pub use solution::{FindingSeverity, VerificationReport, VerificationStatus};

/// Options for building a solution package
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Spec root, the directory containing solution.json
    pub specs: PathBuf,
    /// Output path for the .zip (defaults to `<specs>/<uniqueName>.zip`)
    pub output: Option<PathBuf>,
    /// Skip the external solution checker
    pub skip_check: bool,
    /// Region passed to the checker
    pub geo: String,
    /// Checker executable
    pub checker: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            specs: PathBuf::from("."),
            output: None,
            skip_check: false,
            geo: "USGovernment".to_string(),
            checker: PathBuf::from("pac"),
        }
    }
}

/// Result of a build: the archive always exists when this is returned
#[derive(Debug)]
pub struct BuildOutcome {
    pub archive_path: PathBuf,
    pub diagnostics: Diagnostics,
    /// `None` when the checker was skipped
    pub verification: Option<VerificationReport>,
}

impl BuildOutcome {
    /// True only when the checker ran and found nothing of high severity
    pub fn ready_for_import(&self) -> bool {
        matches!(
            self.verification.as_ref().map(|v| &v.status),
            Some(VerificationStatus::Passed)
        )
    }

    pub fn has_high_severity_findings(&self) -> bool {
        self.verification
            .as_ref()
            .is_some_and(|v| v.status == VerificationStatus::IssuesFound)
    }
}

/// Build a solution package from a spec tree
pub fn build_solution(options: &BuildOptions) -> Result<BuildOutcome> {
    build_solution_into(options, &mut Diagnostics::new())
}

/// Build a solution package, recording diagnostics into `diagnostics`.
///
/// On success the records move into the returned outcome. On failure the
/// records made before the error stay in `diagnostics` for the caller to
/// report.
pub fn build_solution_into(
    options: &BuildOptions,
    diagnostics: &mut Diagnostics,
) -> Result<BuildOutcome> {
    let manifest = options.specs.join("solution.json");
    tracing::info!("Building solution: {}", manifest.display());

    // Step 1: Parse the solution project
    let project = project::parse_solution_project(&manifest)?;

    // Step 2: Read every spec before generation starts
    let specs = project::read_specs(&project)?;
    tracing::info!(
        "Read {} tables, {} columns, {} views, {} forms ({} quick create)",
        specs.tables.len(),
        specs.column_count(),
        specs.views.len(),
        specs.forms.len(),
        specs.quick_create_form_count()
    );

    // Step 3: Determine output path
    let archive_path = options
        .output
        .clone()
        .unwrap_or_else(|| project.spec_root.join(format!("{}.zip", project.name)));

    // Step 4: Generate and archive the documents
    solution::create_solution_package(&specs, &project, &archive_path, diagnostics)?;
    tracing::info!("Created solution package: {}", archive_path.display());

    // Step 5: Verify
    let verification = if options.skip_check {
        tracing::info!("Skipping solution checker");
        None
    } else {
        let checker = solution::PacChecker::new(
            options.checker.clone(),
            options.geo.clone(),
            checker_output_dir(&archive_path),
        );
        Some(solution::run_verification(
            &checker,
            &archive_path,
            diagnostics,
        ))
    };

    Ok(BuildOutcome {
        archive_path,
        diagnostics: std::mem::take(diagnostics),
        verification,
    })
}

/// Checker result directory for an archive: `<dir>/<stem>_check`
fn checker_output_dir(archive_path: &std::path::Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("solution");
    archive_path
        .parent()
        .unwrap_or(std::path::Path::new("."))
        .join(format!("{}_check", stem))
}
