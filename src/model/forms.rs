//! System form definitions: tabs, sections, fields and subgrids

use serde::Deserialize;

/// Form kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FormKind {
    Main,
    QuickCreate,
}

/// System form definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub schema_name: String,
    pub display_name: String,
    /// Schema name of the owning table
    pub entity: String,
    pub description: Option<String>,
    #[serde(rename = "formType")]
    pub kind: FormKind,
    #[serde(default)]
    pub header: Vec<FormField>,
    #[serde(default)]
    pub layout: FormLayout,
}

/// Layout tree. Main forms use `tabs`; quick create forms use a flat `sections` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormLayout {
    #[serde(default)]
    pub tabs: Vec<FormTab>,
    #[serde(default)]
    pub sections: Vec<FormSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormTab {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub sections: Vec<FormSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormSection {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub subgrids: Vec<Subgrid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub label: Option<String>,
    #[serde(default)]
    pub is_read_only: bool,
}

/// Related-records grid embedded in a form section
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subgrid {
    pub name: String,
    pub label: String,
    /// Schema name of the related (child) table
    pub entity: String,
    /// Relationship name as authored; resolved against derived relationships
    pub relationship: String,
    #[serde(default = "default_max_rows")]
    pub max_rows: u32,
}

fn default_max_rows() -> u32 {
    5
}
