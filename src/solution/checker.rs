//! Bridge to the external solution checker
//!
//! The checker is an out-of-process oracle: it takes the archive path and
//! writes SARIF result files into an output directory. Its findings never
//! invalidate the archive, they only change the reported build status.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Deserialize;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::SolutionPackageError;

/// How long the checker may run before it is killed
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Finding severity, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingSeverity {
    Error,
    Warning,
    Note,
    None,
}

impl FindingSeverity {
    /// Map a SARIF `level`. A missing or unknown level ranks lowest.
    pub fn from_level(level: Option<&str>) -> Self {
        match level.map(|l| l.to_ascii_lowercase()).as_deref() {
            Some("error") => FindingSeverity::Error,
            Some("warning") => FindingSeverity::Warning,
            Some("note") => FindingSeverity::Note,
            _ => FindingSeverity::None,
        }
    }

    /// The two highest severities flip the build to "issues found"
    pub fn is_high(&self) -> bool {
        matches!(self, FindingSeverity::Error | FindingSeverity::Warning)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingSeverity::Error => "error",
            FindingSeverity::Warning => "warning",
            FindingSeverity::Note => "note",
            FindingSeverity::None => "none",
        }
    }
}

/// A single checker finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: FindingSeverity,
    pub rule_id: String,
    pub message: String,
    pub location: Option<String>,
}

/// Anything that can verify a packaged archive
pub trait SolutionVerifier {
    fn verify(&self, archive: &Path, diagnostics: &mut Diagnostics) -> Result<Vec<Finding>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Passed,
    IssuesFound,
    /// The checker could not produce a result
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub findings: Vec<Finding>,
    pub status: VerificationStatus,
}

impl VerificationReport {
    pub fn high_severity_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity.is_high()).count()
    }
}

/// Run a verifier and fold its result into a report.
///
/// Verifier failures become [`VerificationStatus::Unavailable`]; each finding
/// is also recorded as a diagnostic.
pub fn run_verification(
    verifier: &dyn SolutionVerifier,
    archive: &Path,
    diagnostics: &mut Diagnostics,
) -> VerificationReport {
    match verifier.verify(archive, diagnostics) {
        Ok(findings) => {
            for finding in &findings {
                let subject = finding
                    .location
                    .clone()
                    .unwrap_or_else(|| finding.rule_id.clone());
                let message = format!(
                    "[{}] {}: {}",
                    finding.severity.as_str(),
                    finding.rule_id,
                    finding.message
                );
                if finding.severity.is_high() {
                    diagnostics.warn(DiagnosticCode::VerificationFinding, subject, message);
                } else {
                    diagnostics.info(DiagnosticCode::VerificationFinding, subject, message);
                }
            }

            let status = if findings.iter().any(|f| f.severity.is_high()) {
                VerificationStatus::IssuesFound
            } else {
                VerificationStatus::Passed
            };
            VerificationReport { findings, status }
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            diagnostics.warn(
                DiagnosticCode::VerificationUnavailable,
                archive.display().to_string(),
                reason.clone(),
            );
            VerificationReport {
                findings: Vec::new(),
                status: VerificationStatus::Unavailable(reason),
            }
        }
    }
}

/// Power Platform CLI solution checker
#[derive(Debug, Clone)]
pub struct PacChecker {
    /// Checker executable, `pac` by default
    pub program: PathBuf,
    pub geo: String,
    /// Directory the checker writes its result files into
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl PacChecker {
    pub fn new(program: impl Into<PathBuf>, geo: impl Into<String>, output_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            geo: geo.into(),
            output_dir,
            timeout: CHECK_TIMEOUT,
        }
    }

    fn command(&self, archive: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("solution")
            .arg("check")
            .arg("--path")
            .arg(archive)
            .arg("--geo")
            .arg(&self.geo)
            .arg("--outputDirectory")
            .arg(&self.output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    /// Run the checker to completion or until the timeout expires
    fn run(&self, archive: &Path) -> Result<()> {
        let mut child = self.command(archive).spawn().map_err(|e| {
            SolutionPackageError::CheckerError {
                message: format!("failed to start {}: {}", self.program.display(), e),
            }
        })?;

        // Drain both pipes while polling so a chatty checker never blocks on a full pipe
        if let Some(out) = child.stdout.take() {
            forward_output(out, "stdout");
        }
        if let Some(err) = child.stderr.take() {
            forward_output(err, "stderr");
        }

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                if !status.success() {
                    tracing::debug!("Checker exited with {}", status);
                }
                return Ok(());
            }
            if started.elapsed() >= self.timeout {
                child.kill()?;
                child.wait()?;
                return Err(SolutionPackageError::CheckerError {
                    message: format!("timed out after {}s", self.timeout.as_secs()),
                }
                .into());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Log each line the checker prints at debug level. The reader thread ends
/// when the pipe closes.
fn forward_output<R: Read + Send + 'static>(stream: R, name: &'static str) {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines().map_while(std::result::Result::ok) {
            tracing::debug!("checker {}: {}", name, line);
        }
    });
}

impl SolutionVerifier for PacChecker {
    fn verify(&self, archive: &Path, diagnostics: &mut Diagnostics) -> Result<Vec<Finding>> {
        if self.output_dir.exists() {
            std::fs::remove_dir_all(&self.output_dir)?;
        }
        std::fs::create_dir_all(&self.output_dir)?;

        tracing::info!("Running solution checker (geo {})", self.geo);
        self.run(archive)?;

        let files = result_files(&self.output_dir)?;
        if files.is_empty() {
            return Err(SolutionPackageError::CheckerError {
                message: format!("no result files in {}", self.output_dir.display()),
            }
            .into());
        }

        let mut findings = Vec::new();
        for path in files {
            match read_sarif_file(&path) {
                Ok(found) => findings.extend(found),
                Err(e) => diagnostics.warn(
                    DiagnosticCode::VerificationUnavailable,
                    path.display().to_string(),
                    format!("unreadable result file: {:#}", e),
                ),
            }
        }
        Ok(findings)
    }
}

/// `*.sarif` and `*.json` files in the checker output directory, sorted
fn result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in ["*.sarif", "*.json"] {
        let full = dir.join(pattern);
        let full = full.to_string_lossy();
        for entry in glob::glob(&full).map_err(|e| SolutionPackageError::CheckerError {
            message: e.to_string(),
        })? {
            files.push(entry?);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Deserialize)]
struct SarifLog {
    #[serde(default)]
    runs: Vec<SarifRun>,
}

#[derive(Debug, Deserialize)]
struct SarifRun {
    #[serde(default)]
    results: Vec<SarifResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: Option<String>,
    level: Option<String>,
    message: Option<SarifMessage>,
    #[serde(default)]
    locations: Vec<SarifLocation>,
}

#[derive(Debug, Deserialize)]
struct SarifMessage {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: Option<SarifPhysicalLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: Option<SarifArtifactLocation>,
}

#[derive(Debug, Deserialize)]
struct SarifArtifactLocation {
    uri: Option<String>,
}

/// Parse SARIF text into findings
pub fn parse_sarif(content: &str) -> Result<Vec<Finding>> {
    let log: SarifLog = serde_json::from_str(content)?;
    Ok(log
        .runs
        .into_iter()
        .flat_map(|run| run.results)
        .map(|result| Finding {
            severity: FindingSeverity::from_level(result.level.as_deref()),
            rule_id: result.rule_id.unwrap_or_default(),
            message: result
                .message
                .and_then(|m| m.text)
                .unwrap_or_default(),
            location: result
                .locations
                .into_iter()
                .next()
                .and_then(|l| l.physical_location)
                .and_then(|p| p.artifact_location)
                .and_then(|a| a.uri),
        })
        .collect())
}

fn read_sarif_file(path: &Path) -> Result<Vec<Finding>> {
    let bytes = std::fs::read(path)?;
    let (content, _) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    parse_sarif(&content)
}
