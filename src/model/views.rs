//! View (saved query) definitions and their filter trees

use serde::Deserialize;

/// View definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub schema_name: String,
    pub display_name: String,
    /// Schema name of the owning table
    #[serde(default)]
    pub entity: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub columns: Vec<ViewColumn>,
    #[serde(default)]
    pub sort_order: Vec<SortOrder>,
    pub filter: Option<Filter>,
}

/// A projected view column and its display width
#[derive(Debug, Clone, Deserialize)]
pub struct ViewColumn {
    pub name: String,
    #[serde(default = "default_width")]
    pub width: u32,
}

fn default_width() -> u32 {
    100
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One sort key of a view
#[derive(Debug, Clone, Deserialize)]
pub struct SortOrder {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Boolean combinator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    And,
    Or,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::And => "and",
            FilterType::Or => "or",
        }
    }
}

/// Filter tree: a combinator over a list of conditions
#[derive(Debug, Clone, Deserialize)]
pub struct Filter {
    #[serde(rename = "type")]
    pub kind: FilterType,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A single filter condition
#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: String,
    #[serde(default)]
    pub value: Option<ConditionValue>,
    #[serde(default)]
    pub values: Vec<ConditionValue>,
}

/// Relative date descriptor, e.g. `{ "type": "relative", "unit": "days", "offset": 7 }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelativeDate {
    #[serde(default)]
    pub unit: String,
    pub offset: i64,
}

/// Scalar or structured condition value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Relative(RelativeDate),
}
