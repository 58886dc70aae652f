//! Collision resolution for column physical names
//!
//! The platform auto-creates a primary key attribute named `{entity}id` on
//! every table. A custom column with that physical name cannot be imported,
//! so it is renamed to `{entity}_name`. [`EffectiveNames`] is the single
//! source of truth for the renamed names during one generation pass: the
//! attribute, view and form writers all resolve column references through it.

use std::collections::HashMap;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{Column, Table};

/// Auto-generated primary key name for an entity
pub fn primary_key_name(entity_logical: &str) -> String {
    format!("{}id", entity_logical)
}

/// Substitute name for a column that collides with the auto-generated
/// primary key, or `None` when the name is free.
pub fn resolve_collision(physical_name: &str, entity_logical: &str) -> Option<String> {
    if physical_name == primary_key_name(entity_logical) {
        Some(format!("{}_name", entity_logical))
    } else {
        None
    }
}

/// Effective physical name of a column on an entity
pub fn effective_column_name(column: &Column, entity_logical: &str) -> String {
    let physical = column.logical_name();
    resolve_collision(&physical, entity_logical).unwrap_or(physical)
}

/// Effective names of every column of one table
#[derive(Debug, Clone)]
pub struct EffectiveNames {
    entity_logical: String,
    /// Maps a column's logical name to its effective physical name
    names: HashMap<String, String>,
    /// Effective name of the declared primary column, if it exists
    primary: Option<String>,
}

impl EffectiveNames {
    /// Resolve every column of `table`, recording a diagnostic per rename
    pub fn for_table(table: &Table, diagnostics: &mut Diagnostics) -> Self {
        let entity_logical = table.logical_name();
        let mut names = HashMap::with_capacity(table.columns.len());

        for column in &table.columns {
            let physical = column.logical_name();
            let effective = match resolve_collision(&physical, &entity_logical) {
                Some(renamed) => {
                    diagnostics.info(
                        DiagnosticCode::ColumnRenamed,
                        format!("{}.{}", entity_logical, column.schema_name),
                        format!(
                            "renamed to {} (collides with auto-generated primary key)",
                            renamed
                        ),
                    );
                    renamed
                }
                None => physical.clone(),
            };
            names.insert(physical, effective);
        }

        let primary = table
            .primary()
            .map(|c| effective_column_name(c, &entity_logical));

        Self {
            entity_logical,
            names,
            primary,
        }
    }

    pub fn entity_logical(&self) -> &str {
        &self.entity_logical
    }

    /// Auto-generated primary key attribute (`{entity}id`)
    pub fn primary_key(&self) -> String {
        primary_key_name(&self.entity_logical)
    }

    /// Effective name of the declared primary (name) column
    pub fn primary_column(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Effective name for a column reference.
    ///
    /// References to a column of this table resolve to its effective name;
    /// anything else (system columns, the real primary key) is lowercased
    /// and returned unchanged.
    pub fn resolve(&self, reference: &str) -> String {
        let logical = reference.to_lowercase();
        match self.names.get(&logical) {
            Some(effective) => effective.clone(),
            None => logical,
        }
    }

    /// Effective name of a column known to belong to this table
    pub fn of(&self, column: &Column) -> String {
        self.resolve(&column.schema_name)
    }

    /// Find the column whose effective name is `effective`
    pub fn column_for<'t>(&self, table: &'t Table, effective: &str) -> Option<&'t Column> {
        table.columns.iter().find(|c| self.of(c) == effective)
    }

    /// Iterate over the effective names of all table columns
    pub fn effective_names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(|s| s.as_str())
    }
}
