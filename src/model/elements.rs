//! Data model element types: tables, columns, choices, environment variables

use serde::Deserialize;

use crate::util::logical_name;

/// Built-in principal entities. Lookups to these are configured manually
/// after import and never generated.
pub const BUILTIN_PRINCIPAL_ENTITIES: &[&str] = &["systemuser"];

/// Check if an entity name refers to a built-in principal entity
pub fn is_builtin_principal(entity: &str) -> bool {
    BUILTIN_PRINCIPAL_ENTITIES
        .iter()
        .any(|&e| e.eq_ignore_ascii_case(entity))
}

/// Record ownership mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Ownership {
    User,
    #[default]
    Organization,
}

impl From<String> for Ownership {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("user") {
            Ownership::User
        } else {
            Ownership::Organization
        }
    }
}

impl Ownership {
    pub fn type_mask(&self) -> &'static str {
        match self {
            Ownership::User => "UserOwned",
            Ownership::Organization => "OrgOwned",
        }
    }
}

/// Table element
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub schema_name: String,
    pub display_name: String,
    pub plural_name: String,
    #[serde(default)]
    pub description: String,
    /// Schema name of the primary (name) column
    pub primary_column: String,
    #[serde(default)]
    pub ownership: Ownership,
    #[serde(default)]
    pub audit_enabled: bool,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    /// Lowercase logical name used throughout the generated documents
    pub fn logical_name(&self) -> String {
        logical_name(&self.schema_name)
    }

    /// Find the declared primary column
    pub fn primary(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.schema_name == self.primary_column)
    }

    /// Find a column by logical (case-insensitive) name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.schema_name.eq_ignore_ascii_case(name))
    }

    /// Lookup columns on this table that point at `target` (logical name)
    pub fn lookups_to<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Column> + 'a {
        self.columns.iter().filter(move |c| match &c.kind {
            ColumnType::Lookup { target: t } => t.eq_ignore_ascii_case(target),
            _ => false,
        })
    }
}

/// A label/value pair of a choice
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChoiceOption {
    pub value: i64,
    pub label: String,
}

/// Column type variants
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    String {
        max_length: Option<u32>,
    },
    AutoNumber {
        max_length: Option<u32>,
        format: Option<String>,
    },
    Memo,
    WholeNumber {
        default: Option<i64>,
    },
    Float {
        precision: Option<u8>,
    },
    Decimal {
        precision: Option<u8>,
    },
    Currency,
    Boolean {
        default: bool,
    },
    DateTime,
    DateOnly,
    GlobalChoice {
        choice_name: String,
    },
    Choice {
        options: Vec<ChoiceOption>,
    },
    Lookup {
        target: String,
    },
    Calculated,
    /// A type tag this compiler does not know; carried so it can be reported
    Unknown(String),
}

impl ColumnType {
    pub fn is_lookup(&self) -> bool {
        matches!(self, ColumnType::Lookup { .. })
    }
}

/// Column element
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ColumnSpec")]
pub struct Column {
    pub schema_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub required: bool,
    pub audit: bool,
    /// Protected health information; emitted as a secured attribute
    pub phi: bool,
    pub kind: ColumnType,
}

impl Column {
    pub fn logical_name(&self) -> String {
        logical_name(&self.schema_name)
    }
}

/// Flat column shape as authored in table spec files
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnSpec {
    schema_name: String,
    display_name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    audit: bool,
    #[serde(default)]
    phi: bool,
    description: Option<String>,
    max_length: Option<u32>,
    precision: Option<u8>,
    default: Option<serde_json::Value>,
    format: Option<String>,
    choice_name: Option<String>,
    local_options: Option<Vec<ChoiceOption>>,
    target: Option<String>,
}

impl From<ColumnSpec> for Column {
    fn from(spec: ColumnSpec) -> Self {
        let kind = match spec.type_name.as_str() {
            "String" => ColumnType::String {
                max_length: spec.max_length,
            },
            "AutoNumber" => ColumnType::AutoNumber {
                max_length: spec.max_length,
                format: spec.format,
            },
            "Memo" => ColumnType::Memo,
            "WholeNumber" => ColumnType::WholeNumber {
                default: spec.default.as_ref().and_then(|v| v.as_i64()),
            },
            "Float" => ColumnType::Float {
                precision: spec.precision,
            },
            "Decimal" => ColumnType::Decimal {
                precision: spec.precision,
            },
            "Currency" => ColumnType::Currency,
            "Boolean" => ColumnType::Boolean {
                default: spec.default.as_ref().and_then(|v| v.as_bool()) == Some(true),
            },
            "DateTime" => ColumnType::DateTime,
            "DateOnly" => ColumnType::DateOnly,
            "GlobalChoice" => ColumnType::GlobalChoice {
                choice_name: spec.choice_name.unwrap_or_default(),
            },
            "Choice" => ColumnType::Choice {
                options: spec.local_options.unwrap_or_default(),
            },
            "Lookup" => ColumnType::Lookup {
                target: spec.target.unwrap_or_default(),
            },
            "Calculated" => ColumnType::Calculated,
            other => ColumnType::Unknown(other.to_string()),
        };

        Column {
            schema_name: spec.schema_name,
            display_name: spec.display_name,
            description: spec.description.filter(|d| !d.is_empty()),
            required: spec.required,
            audit: spec.audit,
            phi: spec.phi,
            kind,
        }
    }
}

/// A reusable, named enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalChoice {
    pub schema_name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Options in display order
    pub options: Vec<ChoiceOption>,
}

/// Environment variable value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EnvironmentVariableType {
    #[default]
    String,
    Decimal,
    Boolean,
    #[serde(rename = "JSON")]
    Json,
}

impl EnvironmentVariableType {
    /// Platform type code
    pub fn type_code(&self) -> u32 {
        match self {
            EnvironmentVariableType::String => 100000000,
            EnvironmentVariableType::Decimal => 100000001,
            EnvironmentVariableType::Boolean => 100000002,
            EnvironmentVariableType::Json => 100000003,
        }
    }
}

/// Environment variable definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub schema_name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: EnvironmentVariableType,
    pub default_value: Option<String>,
}
