//! The complete, immutable input of one generation pass

use super::{EnvironmentVariable, Form, FormKind, GlobalChoice, Table, View};

/// Every spec read for a build. Nothing here is mutated during generation.
#[derive(Debug, Clone, Default)]
pub struct SpecSet {
    /// Tables in build order
    pub tables: Vec<Table>,
    pub global_choices: Vec<GlobalChoice>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub views: Vec<View>,
    pub forms: Vec<Form>,
}

impl SpecSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Views owned by a table, in authored order
    pub fn views_for(&self, table: &Table) -> Vec<&View> {
        self.views
            .iter()
            .filter(|v| v.entity.eq_ignore_ascii_case(&table.schema_name))
            .collect()
    }

    /// Forms owned by a table, in authored order
    pub fn forms_for(&self, table: &Table) -> Vec<&Form> {
        self.forms
            .iter()
            .filter(|f| f.entity.eq_ignore_ascii_case(&table.schema_name))
            .collect()
    }

    /// Column count, excluding calculated columns which are never generated
    pub fn column_count(&self) -> usize {
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter())
            .filter(|c| !matches!(c.kind, super::ColumnType::Calculated))
            .count()
    }

    pub fn quick_create_form_count(&self) -> usize {
        self.forms
            .iter()
            .filter(|f| f.kind == FormKind::QuickCreate)
            .count()
    }
}
