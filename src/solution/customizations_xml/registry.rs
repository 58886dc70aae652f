//! Registries built once per generation pass and passed into each writer
//!
//! - [`ChoiceRegistry`] maps global choice schema names to their definitions,
//!   so GlobalChoice columns can be inlined as local option sets.
//! - [`ChoiceValueIndex`] maps entity → column → label → numeric value, so
//!   view filters can be authored with human-readable labels.

use std::collections::HashMap;

use crate::model::{ChoiceOption, ColumnType, GlobalChoice, Table};

use crate::solution::collision::EffectiveNames;

/// Global choices by schema name
#[derive(Debug, Default)]
pub struct ChoiceRegistry<'a> {
    choices: HashMap<&'a str, &'a GlobalChoice>,
}

impl<'a> ChoiceRegistry<'a> {
    pub fn new(choices: &'a [GlobalChoice]) -> Self {
        Self {
            choices: choices
                .iter()
                .map(|c| (c.schema_name.as_str(), c))
                .collect(),
        }
    }

    pub fn get(&self, schema_name: &str) -> Option<&'a GlobalChoice> {
        self.choices.get(schema_name).copied()
    }
}

/// Label → value lookups for every choice-typed column
#[derive(Debug, Default)]
pub struct ChoiceValueIndex {
    /// Keyed by entity logical name, then effective column name, then label
    entities: HashMap<String, HashMap<String, HashMap<String, i64>>>,
}

impl ChoiceValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the choice columns of `table`, addressing columns by effective name
    pub fn add_table(&mut self, table: &Table, names: &EffectiveNames, registry: &ChoiceRegistry) {
        let mut columns = HashMap::new();

        for column in &table.columns {
            let options: Option<&[ChoiceOption]> = match &column.kind {
                ColumnType::GlobalChoice { choice_name } => {
                    registry.get(choice_name).map(|c| c.options.as_slice())
                }
                ColumnType::Choice { options } => Some(options.as_slice()),
                _ => None,
            };

            if let Some(options) = options {
                let labels = options
                    .iter()
                    .map(|o| (o.label.clone(), o.value))
                    .collect();
                columns.insert(names.of(column), labels);
            }
        }

        if !columns.is_empty() {
            self.entities.insert(names.entity_logical().to_string(), columns);
        }
    }

    /// Numeric value of `label` for a choice column, if the column is
    /// choice-typed and the label exists
    pub fn value_of(&self, entity_logical: &str, column: &str, label: &str) -> Option<i64> {
        self.entities
            .get(entity_logical)?
            .get(column)?
            .get(label)
            .copied()
    }
}
