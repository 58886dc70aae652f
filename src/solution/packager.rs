//! Create the solution package ZIP

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::diagnostics::Diagnostics;
use crate::error::SolutionPackageError;
use crate::model::SpecSet;
use crate::project::SolutionProject;

use super::{customizations_xml, solution_xml};

/// Archive members, in the order the importer expects them
pub const PACKAGE_MEMBERS: [&str; 3] = ["[Content_Types].xml", "solution.xml", "customizations.xml"];

/// Generate the three package documents in member order.
///
/// Every document is rendered before anything touches the filesystem, so a
/// fatal spec error leaves no output behind.
pub fn generate_documents(
    specs: &SpecSet,
    project: &SolutionProject,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<(&'static str, Vec<u8>)>> {
    let mut customizations_buffer = Cursor::new(Vec::with_capacity(specs.tables.len() * 64_000));
    customizations_xml::generate_customizations_xml(
        &mut customizations_buffer,
        specs,
        project,
        diagnostics,
    )?;

    let mut solution_buffer = Cursor::new(Vec::with_capacity(8192));
    solution_xml::generate_solution_xml(&mut solution_buffer, specs, project)?;

    Ok(vec![
        (
            PACKAGE_MEMBERS[0],
            generate_content_types_xml().into_bytes(),
        ),
        (PACKAGE_MEMBERS[1], solution_buffer.into_inner()),
        (PACKAGE_MEMBERS[2], customizations_buffer.into_inner()),
    ])
}

/// Create a solution package from the spec set.
///
/// The documents are written to a clean staging directory next to the
/// archive, zipped in member order, and the staging directory is removed.
pub fn create_solution_package(
    specs: &SpecSet,
    project: &SolutionProject,
    output_path: &Path,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let documents = generate_documents(specs, project, diagnostics)?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_error(output_path, e))?;
    }

    let staging = staging_dir(output_path);
    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(|e| write_error(&staging, e))?;
    }
    std::fs::create_dir_all(&staging).map_err(|e| write_error(&staging, e))?;

    for (name, content) in &documents {
        let path = staging.join(name);
        std::fs::write(&path, content).map_err(|e| write_error(&path, e))?;
    }
    tracing::debug!("Staged package documents in {}", staging.display());

    write_archive(&staging, output_path)?;

    std::fs::remove_dir_all(&staging).map_err(|e| write_error(&staging, e))?;
    Ok(())
}

/// Zip the staged documents into the archive.
///
/// Members carry a fixed modification time so rebuilding the same specs
/// yields a byte-identical archive.
fn write_archive(staging: &Path, output_path: &Path) -> Result<()> {
    let file = File::create(output_path).map_err(|e| write_error(output_path, e))?;

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    for name in PACKAGE_MEMBERS {
        let path = staging.join(name);
        let content = std::fs::read(&path).map_err(|e| write_error(&path, e))?;
        zip.start_file(name, options)?;
        zip.write_all(&content)?;
    }

    zip.finish()?;
    Ok(())
}

/// Staging directory for an archive path: `<dir>/<stem>_staging`
pub fn staging_dir(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("solution");
    output_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{}_staging", stem))
}

fn write_error(path: &Path, source: std::io::Error) -> SolutionPackageError {
    SolutionPackageError::PackageWriteError {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn generate_content_types_xml() -> String {
    r#"<?xml version="1.0" encoding="utf-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/octet-stream" />
</Types>"#
        .to_string()
}
