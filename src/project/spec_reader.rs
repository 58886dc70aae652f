//! Reader for the JSON spec tree
//!
//! Layout, relative to the spec root:
//! - `datamodel/choices/global-choices.json`
//! - `datamodel/tables/*.json` (one table per file)
//! - `solution/environment-variables.json` (optional)
//! - view and form files under the directories named in solution.json
//!
//! Directories are walked in file-name order so table order, and therefore
//! the generated package, is stable across machines.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::SolutionPackageError;
use crate::model::{ChoiceOption, EnvironmentVariable, Form, GlobalChoice, SpecSet, Table, View};

use super::SolutionProject;

/// Read a JSON file, tolerating a UTF-8 byte order mark
pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| SolutionPackageError::SpecReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let (content, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(SolutionPackageError::SpecReadError {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "File contains invalid UTF-8",
            ),
        }
        .into());
    }

    let value = serde_json::from_str(&content).map_err(|e| SolutionPackageError::SpecParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(value)
}

#[derive(Debug, Deserialize)]
struct GlobalChoicesFile {
    #[serde(default)]
    choices: BTreeMap<String, GlobalChoiceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalChoiceEntry {
    display_name: String,
    description: Option<String>,
    #[serde(default)]
    options: Vec<ChoiceOption>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentVariablesFile {
    #[serde(default)]
    variables: Vec<EnvironmentVariable>,
}

#[derive(Debug, Deserialize)]
struct ViewsFile {
    #[serde(default)]
    entity: String,
    #[serde(default)]
    views: Vec<View>,
}

#[derive(Debug, Deserialize)]
struct FormsFile {
    #[serde(default)]
    forms: Vec<Form>,
}

/// Read every spec named by the project into a [`SpecSet`]
pub fn read_specs(project: &SolutionProject) -> Result<SpecSet> {
    let root = &project.spec_root;

    let choices_path = root
        .join("datamodel")
        .join("choices")
        .join("global-choices.json");
    let global_choices = if choices_path.exists() {
        read_global_choices(&choices_path)?
    } else {
        Vec::new()
    };

    let mut tables = Vec::new();
    for path in json_files(&root.join("datamodel").join("tables")) {
        let table: Table = read_json_file(&path)?;
        tables.push(table);
    }
    if tables.is_empty() {
        return Err(SolutionPackageError::InvalidSpec {
            message: format!(
                "no table specs found under {}",
                root.join("datamodel").join("tables").display()
            ),
        }
        .into());
    }

    let env_path = root.join("solution").join("environment-variables.json");
    let environment_variables = if env_path.exists() {
        read_json_file::<EnvironmentVariablesFile>(&env_path)?.variables
    } else {
        Vec::new()
    };

    let mut views = Vec::new();
    for path in json_files(&project.views_dir) {
        let file: ViewsFile = read_json_file(&path)?;
        for mut view in file.views {
            if view.entity.is_empty() {
                view.entity = file.entity.clone();
            }
            views.push(view);
        }
    }

    let mut forms = Vec::new();
    for path in json_files(&project.forms_dir) {
        let file: FormsFile = read_json_file(&path)?;
        forms.extend(file.forms);
    }

    Ok(SpecSet {
        tables,
        global_choices,
        environment_variables,
        views,
        forms,
    })
}

fn read_global_choices(path: &Path) -> Result<Vec<GlobalChoice>> {
    let file: GlobalChoicesFile = read_json_file(path)?;
    Ok(file
        .choices
        .into_iter()
        .map(|(schema_name, entry)| GlobalChoice {
            schema_name,
            display_name: entry.display_name,
            description: entry.description.filter(|d| !d.is_empty()),
            options: entry.options,
        })
        .collect())
}

/// All `*.json` files directly under `dir`, sorted by file name.
/// A missing directory yields nothing.
fn json_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect()
}
