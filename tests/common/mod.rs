//! Common test utilities for rust-solutionpackage tests

#![allow(dead_code)]

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use rust_solutionpackage::{build_solution, BuildOptions, BuildOutcome};
use tempfile::TempDir;
use zip::ZipArchive;

/// Test context with temporary directory for isolated test execution
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub spec_dir: PathBuf,
    fixture_name: String,
}

impl TestContext {
    /// Create a new test context by copying a fixture to a temp directory
    pub fn with_fixture(fixture_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(fixture_name);

        let spec_dir = temp_dir.path().join("specs");
        copy_dir_recursive(&fixture_path, &spec_dir).expect("Failed to copy fixture");

        Self {
            _temp_dir: temp_dir,
            spec_dir,
            fixture_name: fixture_name.to_string(),
        }
    }

    /// Path to the solution project manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.spec_dir.join("solution.json")
    }

    /// Build options with the checker skipped
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            specs: self.spec_dir.clone(),
            skip_check: true,
            ..BuildOptions::default()
        }
    }

    /// Build the fixture, returning the outcome or the error text
    pub fn build(&self) -> Result<BuildOutcome, String> {
        build_solution(&self.options()).map_err(|e| format!("{:#}", e))
    }

    /// Build the fixture, panicking if the build fails
    pub fn build_successfully(&self) -> BuildOutcome {
        match self.build() {
            Ok(outcome) => outcome,
            Err(e) => panic!("Build failed for fixture '{}': {}", self.fixture_name, e),
        }
    }

    /// Rewrite a JSON file of the copied fixture
    pub fn edit_json(&self, relative: &str, edit: impl FnOnce(&mut serde_json::Value)) {
        let path = self.spec_dir.join(relative);
        let content = fs::read_to_string(&path).expect("Failed to read fixture file");
        let mut value: serde_json::Value =
            serde_json::from_str(&content).expect("Fixture file is not JSON");
        edit(&mut value);
        fs::write(&path, serde_json::to_string_pretty(&value).unwrap())
            .expect("Failed to write fixture file");
    }
}

/// Documents extracted from a solution package
#[derive(Debug, Default)]
pub struct PackageInfo {
    /// Member names in archive order
    pub members: Vec<String>,
    pub content_types_xml: Option<String>,
    pub solution_xml: Option<String>,
    pub customizations_xml: Option<String>,
}

impl PackageInfo {
    /// Read a package archive and extract its documents
    pub fn from_package(path: &Path) -> Result<Self, String> {
        let file = fs::File::open(path).map_err(|e| format!("Failed to open package: {}", e))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| format!("Failed to read ZIP archive: {}", e))?;

        let mut info = PackageInfo::default();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| format!("Failed to read ZIP entry: {}", e))?;
            let name = file.name().to_string();

            let mut content = String::new();
            file.read_to_string(&mut content)
                .map_err(|e| format!("Failed to read {}: {}", name, e))?;

            match name.as_str() {
                "[Content_Types].xml" => info.content_types_xml = Some(content),
                "solution.xml" => info.solution_xml = Some(content),
                "customizations.xml" => info.customizations_xml = Some(content),
                _ => {}
            }
            info.members.push(name);
        }
        Ok(info)
    }

    pub fn customizations(&self) -> &str {
        self.customizations_xml
            .as_deref()
            .expect("Package has no customizations.xml")
    }

    pub fn solution(&self) -> &str {
        self.solution_xml
            .as_deref()
            .expect("Package has no solution.xml")
    }
}

/// Child elements of `node` with the given tag name
pub fn children<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.has_tag_name(tag))
}

/// First child element with the given tag name
pub fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    tag: &'a str,
) -> Option<roxmltree::Node<'a, 'input>> {
    children(node, tag).next()
}

/// Text of the first child element with the given tag name
pub fn child_text<'a>(node: roxmltree::Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.has_tag_name(tag))
        .and_then(|n| n.text())
}

/// The `<entity>` element of the customizations document for a logical name
pub fn find_entity<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    logical_name: &str,
) -> roxmltree::Node<'a, 'input> {
    doc.descendants()
        .find(|n| n.has_tag_name("entity") && n.attribute("Name") == Some(logical_name))
        .unwrap_or_else(|| panic!("entity {} not found", logical_name))
}

/// Recursively copy a directory
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
