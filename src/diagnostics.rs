//! Degrade-and-warn diagnostics collected during a generation pass.
//!
//! Every stage that skips, renames, or resolves something appends a record
//! here instead of printing. The binary forwards the collected records to
//! `tracing` once the pass is done; tests assert on them directly.

use std::fmt;

/// How serious a diagnostic is. Diagnostics never abort a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

/// What kind of decision a diagnostic records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    /// A column collided with the auto-generated primary key and was renamed.
    ColumnRenamed,
    /// A column type the serializer does not know; the attribute was omitted.
    UnknownColumnType,
    /// A GlobalChoice column names a choice that is not defined.
    ChoiceNotFound,
    /// A view column was dropped (unknown or linked-entity reference).
    ViewColumnSkipped,
    /// A view sort key was dropped.
    SortSkipped,
    /// A view filter condition was dropped.
    FilterSkipped,
    /// A subgrid's declared relationship was replaced by the derived one.
    RelationshipResolved,
    /// A subgrid kept its declared relationship name, which may not exist.
    RelationshipUnresolved,
    /// Two lookups derived the same relationship name; the later one got a suffix.
    RelationshipRenamed,
    /// A view or form names an entity that no table defines; it was not emitted.
    EntityNotFound,
    /// A form references a column the owning table does not define.
    FormFieldUnknown,
    /// A finding reported by the external solution checker.
    VerificationFinding,
    /// The external solution checker could not produce a result.
    VerificationUnavailable,
}

impl DiagnosticCode {
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticCode::ColumnRenamed => "RENAME",
            DiagnosticCode::UnknownColumnType => "SKIP TYPE",
            DiagnosticCode::ChoiceNotFound => "MISSING CHOICE",
            DiagnosticCode::ViewColumnSkipped => "SKIP COLUMN",
            DiagnosticCode::SortSkipped => "SKIP SORT",
            DiagnosticCode::FilterSkipped => "SKIP FILTER",
            DiagnosticCode::RelationshipResolved => "RESOLVE REL",
            DiagnosticCode::RelationshipUnresolved => "UNRESOLVED REL",
            DiagnosticCode::RelationshipRenamed => "RENAME REL",
            DiagnosticCode::EntityNotFound => "MISSING ENTITY",
            DiagnosticCode::FormFieldUnknown => "UNKNOWN FIELD",
            DiagnosticCode::VerificationFinding => "CHECK",
            DiagnosticCode::VerificationUnavailable => "CHECK UNAVAILABLE",
        }
    }
}

/// A single diagnostic record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// The thing the decision was about, e.g. `agency.agencyid`
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.code.label(), self.subject, self.message)
    }
}

/// Ordered collection of diagnostics for one generation pass
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(
        &mut self,
        code: DiagnosticCode,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Severity::Info, code, subject, message);
    }

    pub fn warn(
        &mut self,
        code: DiagnosticCode,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Severity::Warning, code, subject, message);
    }

    fn push(
        &mut self,
        severity: Severity,
        code: DiagnosticCode,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.records.push(Diagnostic {
            severity,
            code,
            subject: subject.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.records.extend(other.records);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All diagnostics carrying `code`, in emission order.
    pub fn with_code(&self, code: DiagnosticCode) -> Vec<&Diagnostic> {
        self.records.iter().filter(|d| d.code == code).collect()
    }

    pub fn warning_count(&self) -> usize {
        self.records
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Forward every record to the tracing subscriber.
    pub fn emit(&self) {
        for diagnostic in &self.records {
            match diagnostic.severity {
                Severity::Info => tracing::info!("  {}", diagnostic),
                Severity::Warning => tracing::warn!("  {}", diagnostic),
            }
        }
    }
}
