//! Error types for rust-solutionpackage

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a solution build.
///
/// Anything recoverable (unknown column types, invalid view references,
/// ambiguous subgrid relationships) is reported through
/// [`crate::diagnostics::Diagnostics`] instead.
#[derive(Error, Debug)]
pub enum SolutionPackageError {
    #[error("Failed to read spec file: {path}")]
    SpecReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse spec file: {path}")]
    SpecParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid spec: {message}")]
    InvalidSpec { message: String },

    #[error("Primary column {column} not found in {table}")]
    PrimaryColumnNotFound { table: String, column: String },

    #[error("Failed to write solution package to {path}")]
    PackageWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML generation error: {message}")]
    XmlGenerationError { message: String },

    #[error("ZIP creation error: {message}")]
    ZipError { message: String },

    #[error("Solution checker error: {message}")]
    CheckerError { message: String },
}

impl From<zip::result::ZipError> for SolutionPackageError {
    fn from(err: zip::result::ZipError) -> Self {
        SolutionPackageError::ZipError {
            message: err.to_string(),
        }
    }
}
