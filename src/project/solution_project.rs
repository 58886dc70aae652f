//! Parser for solution.json project manifests

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use super::spec_reader::read_json_file;

/// Publisher identity stamped into the solution manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub unique_name: String,
    pub friendly_name: String,
    #[serde(default)]
    pub description: String,
    /// Customization prefix, e.g. `seo`
    pub prefix: String,
    #[serde(default = "default_option_value_prefix")]
    pub option_value_prefix: u32,
}

/// Parsed solution project
#[derive(Debug, Clone)]
pub struct SolutionProject {
    /// Solution unique name, also the default archive name
    pub name: String,
    pub friendly_name: String,
    pub description: String,
    /// Four-part solution version, e.g. `0.8.0.0`
    pub version: String,
    /// Language code for every localized label
    pub language_code: u32,
    pub publisher: Publisher,
    /// Root of the spec tree (the directory containing solution.json)
    pub spec_root: PathBuf,
    /// Directory holding view spec files
    pub views_dir: PathBuf,
    /// Directory holding form spec files
    pub forms_dir: PathBuf,
    /// Emit environment variable definitions into the package
    pub emit_environment_variables: bool,
}

impl SolutionProject {
    /// Language code rendered as an attribute value
    pub fn language(&self) -> String {
        self.language_code.to_string()
    }

    pub fn prefix(&self) -> &str {
        &self.publisher.prefix
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolutionProjectFile {
    unique_name: String,
    friendly_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_language_code")]
    language_code: u32,
    publisher: Publisher,
    #[serde(default = "default_views_dir")]
    views_dir: String,
    #[serde(default = "default_forms_dir")]
    forms_dir: String,
    #[serde(default)]
    emit_environment_variables: bool,
}

fn default_version() -> String {
    "1.0.0.0".to_string()
}

fn default_language_code() -> u32 {
    1033
}

fn default_option_value_prefix() -> u32 {
    10000
}

fn default_views_dir() -> String {
    "views".to_string()
}

fn default_forms_dir() -> String {
    "forms".to_string()
}

/// Parse a solution.json file
pub fn parse_solution_project(path: &Path) -> Result<SolutionProject> {
    let file: SolutionProjectFile = read_json_file(path)?;
    let spec_root = path.parent().unwrap_or(Path::new(".")).to_path_buf();

    Ok(SolutionProject {
        friendly_name: file
            .friendly_name
            .unwrap_or_else(|| file.unique_name.clone()),
        name: file.unique_name,
        description: file.description,
        version: file.version,
        language_code: file.language_code,
        publisher: file.publisher,
        views_dir: spec_root.join(file.views_dir.replace('\\', "/")),
        forms_dir: spec_root.join(file.forms_dir.replace('\\', "/")),
        spec_root,
        emit_environment_variables: file.emit_environment_variables,
    })
}
