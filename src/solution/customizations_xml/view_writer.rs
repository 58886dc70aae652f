//! View (saved query) compilation and XML writing.
//!
//! A view compiles to a display layout (one cell per retained column) and a
//! fetch query (attributes, orders and an optional filter). Every column
//! reference is validated against the owning table; invalid or linked-entity
//! references are dropped with a diagnostic and the rest of the view still
//! compiles.

use quick_xml::Writer;
use std::collections::HashSet;
use std::io::Write;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{Condition, ConditionValue, Filter, FilterType, SortDirection, Table, View};
use crate::solution::collision::EffectiveNames;
use crate::solution::identity::{seeded_id, StableId};

use super::registry::ChoiceValueIndex;
use super::xml_helpers::{
    end_element, start_element, write_element, write_empty_with, write_flag, write_localized,
};

/// Standard system columns every table exposes
const SYSTEM_COLUMNS: &[&str] = &[
    "createdon",
    "modifiedon",
    "statecode",
    "statuscode",
    "ownerid",
];

/// Operators that never carry a value
const VALUELESS_OPERATORS: &[&str] = &[
    "null",
    "not-null",
    "today",
    "yesterday",
    "tomorrow",
    "this-week",
    "last-week",
    "next-week",
    "this-month",
    "last-month",
    "next-month",
    "this-year",
    "last-year",
    "next-year",
    "eq-userid",
    "ne-userid",
    "eq-businessid",
    "ne-businessid",
];

/// Operators whose numeric value is a relative day or month count
const RELATIVE_OPERATORS: &[&str] = &[
    "last-x-days",
    "next-x-days",
    "last-x-months",
    "on-or-before",
    "on-or-after",
];

/// Column names a view of one table may reference
#[derive(Debug, Clone)]
pub struct ValidColumns {
    names: HashSet<String>,
}

impl ValidColumns {
    /// The table's own columns (by effective name), its primary key, its
    /// primary column, and the standard system columns
    pub fn for_table(names: &EffectiveNames) -> Self {
        let mut set: HashSet<String> = names.effective_names().map(str::to_string).collect();
        set.insert(names.primary_key());
        if let Some(primary) = names.primary_column() {
            set.insert(primary.to_string());
        }
        set.extend(SYSTEM_COLUMNS.iter().map(|c| c.to_string()));
        Self { names: set }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Display layout of a compiled view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutGrid {
    /// Column the grid row links through (the primary column)
    pub jump: String,
    /// Row identifier column (the primary key)
    pub row_id: String,
    /// Retained columns with their widths, in authored order
    pub cells: Vec<(String, u32)>,
}

/// Payload of a compiled condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionPayload {
    None,
    Single(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCondition {
    pub attribute: String,
    pub operator: String,
    pub payload: ConditionPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    pub kind: FilterType,
    pub conditions: Vec<CompiledCondition>,
}

/// Fetch query of a compiled view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    pub entity: String,
    /// Primary key first, then the retained view columns
    pub attributes: Vec<String>,
    /// (attribute, descending)
    pub orders: Vec<(String, bool)>,
    pub filter: Option<CompiledFilter>,
}

/// A fully compiled saved query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledView {
    pub id: StableId,
    pub display_name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub layout: LayoutGrid,
    pub fetch: FetchQuery,
}

/// Resolve a view's column reference, or explain why it is dropped
fn resolve_reference(
    reference: &str,
    names: &EffectiveNames,
    valid: &ValidColumns,
) -> Result<String, &'static str> {
    if reference.contains('.') {
        return Err("linked entity reference, configure manually");
    }
    let effective = names.resolve(reference);
    if valid.contains(&effective) {
        Ok(effective)
    } else {
        Err("column not found in table definition")
    }
}

/// Compile one view of `table`.
pub fn compile_view(
    view: &View,
    table: &Table,
    names: &EffectiveNames,
    valid: &ValidColumns,
    choice_values: &ChoiceValueIndex,
    diagnostics: &mut Diagnostics,
) -> CompiledView {
    let entity = names.entity_logical();
    let primary_key = names.primary_key();
    let subject = |reference: &str| format!("{}.{}", entity, reference);

    let mut cells = Vec::with_capacity(view.columns.len());
    for column in &view.columns {
        match resolve_reference(&column.name, names, valid) {
            Ok(name) => cells.push((name, column.width)),
            Err(reason) => {
                diagnostics.warn(
                    DiagnosticCode::ViewColumnSkipped,
                    subject(&column.name),
                    format!("{} (view {})", reason, view.schema_name),
                );
            }
        }
    }

    let mut attributes = vec![primary_key.clone()];
    for (name, _) in &cells {
        if !attributes.contains(name) {
            attributes.push(name.clone());
        }
    }

    let mut orders = Vec::with_capacity(view.sort_order.len());
    for sort in &view.sort_order {
        match resolve_reference(&sort.column, names, valid) {
            Ok(name) => orders.push((name, sort.direction == SortDirection::Descending)),
            Err(reason) => {
                diagnostics.warn(
                    DiagnosticCode::SortSkipped,
                    subject(&sort.column),
                    format!("{} (view {})", reason, view.schema_name),
                );
            }
        }
    }

    let filter = view
        .filter
        .as_ref()
        .map(|f| compile_filter(f, names, valid, choice_values, diagnostics));

    let jump = names
        .primary_column()
        .map(str::to_string)
        .unwrap_or_else(|| primary_key.clone());

    CompiledView {
        id: seeded_id("view", &[entity, &view.schema_name]),
        display_name: view.display_name.clone(),
        description: view.description.clone().filter(|d| !d.is_empty()),
        is_default: view.is_default,
        layout: LayoutGrid {
            jump,
            row_id: primary_key,
            cells,
        },
        fetch: FetchQuery {
            entity: table.logical_name(),
            attributes,
            orders,
            filter,
        },
    }
}

/// Compile a filter tree. Conditions that cannot be compiled are dropped
/// with a diagnostic; the filter element is kept even if all are dropped.
pub fn compile_filter(
    filter: &Filter,
    names: &EffectiveNames,
    valid: &ValidColumns,
    choice_values: &ChoiceValueIndex,
    diagnostics: &mut Diagnostics,
) -> CompiledFilter {
    let entity = names.entity_logical();
    let mut conditions = Vec::with_capacity(filter.conditions.len());

    for condition in &filter.conditions {
        let attribute = match resolve_reference(&condition.column, names, valid) {
            Ok(name) => name,
            Err(reason) => {
                diagnostics.warn(
                    DiagnosticCode::FilterSkipped,
                    format!("{}.{}", entity, condition.column),
                    reason,
                );
                continue;
            }
        };

        match compile_condition(condition, attribute, entity, choice_values) {
            Some(compiled) => conditions.push(compiled),
            None => diagnostics.warn(
                DiagnosticCode::FilterSkipped,
                format!("{}.{}", entity, condition.column),
                format!("operator {} requires a value", condition.operator),
            ),
        }
    }

    CompiledFilter {
        kind: filter.kind,
        conditions,
    }
}

/// Map a relative offset onto a window operator:
/// on-or-before looks forward, on-or-after with a zero offset is today,
/// on-or-after otherwise looks back, anything else looks forward.
fn relative_window(operator: &str, offset: String, is_zero: bool) -> (String, ConditionPayload) {
    match operator {
        "on-or-before" => ("next-x-days".to_string(), ConditionPayload::Single(offset)),
        "on-or-after" if is_zero => ("today".to_string(), ConditionPayload::None),
        "on-or-after" => ("last-x-days".to_string(), ConditionPayload::Single(offset)),
        _ => ("next-x-days".to_string(), ConditionPayload::Single(offset)),
    }
}

/// Compile one condition whose column is already validated. `None` when a
/// value-carrying operator has no value.
fn compile_condition(
    condition: &Condition,
    attribute: String,
    entity: &str,
    choice_values: &ChoiceValueIndex,
) -> Option<CompiledCondition> {
    let operator = condition.operator.as_str();

    if VALUELESS_OPERATORS.contains(&operator) {
        return Some(CompiledCondition {
            attribute,
            operator: operator.to_string(),
            payload: ConditionPayload::None,
        });
    }

    if let Some(ConditionValue::Relative(relative)) = &condition.value {
        let (operator, payload) =
            relative_window(operator, relative.offset.to_string(), relative.offset == 0);
        return Some(CompiledCondition {
            attribute,
            operator,
            payload,
        });
    }

    if operator == "in" || operator == "not-in" {
        let values = condition
            .values
            .iter()
            .map(|v| resolve_value(v, entity, &attribute, choice_values))
            .collect();
        return Some(CompiledCondition {
            attribute,
            operator: operator.to_string(),
            payload: ConditionPayload::List(values),
        });
    }

    let value = condition.value.as_ref()?;

    if RELATIVE_OPERATORS.contains(&operator) {
        if let ConditionValue::Number(n) = value {
            let (operator, payload) = match operator {
                "on-or-before" | "on-or-after" => {
                    relative_window(operator, n.to_string(), n.as_f64() == Some(0.0))
                }
                other => (other.to_string(), ConditionPayload::Single(n.to_string())),
            };
            return Some(CompiledCondition {
                attribute,
                operator,
                payload,
            });
        }
    }

    let resolved = resolve_value(value, entity, &attribute, choice_values);
    Some(CompiledCondition {
        attribute,
        operator: operator.to_string(),
        payload: ConditionPayload::Single(resolved),
    })
}

/// Resolve a scalar through the choice-value index: labels of choice columns
/// become their numeric value, booleans become 1/0, anything else passes
/// through.
fn resolve_value(
    value: &ConditionValue,
    entity: &str,
    attribute: &str,
    choice_values: &ChoiceValueIndex,
) -> String {
    match value {
        ConditionValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        ConditionValue::Number(n) => n.to_string(),
        ConditionValue::Text(label) => choice_values
            .value_of(entity, attribute, label)
            .map(|v| v.to_string())
            .unwrap_or_else(|| label.clone()),
        ConditionValue::Relative(relative) => relative.offset.to_string(),
    }
}

/// Write the `<SavedQueries>` block of an entity.
pub(crate) fn write_saved_queries<W: Write>(
    writer: &mut Writer<W>,
    views: &[CompiledView],
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    start_element(writer, "SavedQueries", &[])?;
    start_element(writer, "savedqueries", &[])?;
    for view in views {
        write_saved_query(writer, view, version, language)?;
    }
    end_element(writer, "savedqueries")?;
    end_element(writer, "SavedQueries")?;
    Ok(())
}

fn write_saved_query<W: Write>(
    writer: &mut Writer<W>,
    view: &CompiledView,
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    start_element(writer, "savedquery", &[])?;
    write_element(writer, "IsCustomizable", "1")?;
    write_element(writer, "CanBeDeleted", "1")?;
    write_element(writer, "isquickfindquery", "0")?;
    write_element(writer, "isprivate", "0")?;
    write_flag(writer, "isdefault", view.is_default)?;
    write_element(writer, "savedqueryid", &view.id.braced())?;

    start_element(writer, "layoutxml", &[])?;
    write_layout(writer, &view.layout)?;
    end_element(writer, "layoutxml")?;

    write_element(writer, "querytype", "0")?;

    start_element(writer, "fetchxml", &[])?;
    write_fetch(writer, &view.fetch)?;
    end_element(writer, "fetchxml")?;

    write_element(writer, "IntroducedVersion", version)?;
    write_localized(
        writer,
        "LocalizedNames",
        "LocalizedName",
        &view.display_name,
        language,
    )?;
    if let Some(ref description) = view.description {
        write_localized(writer, "Descriptions", "Description", description, language)?;
    }
    end_element(writer, "savedquery")?;
    Ok(())
}

fn write_layout<W: Write>(writer: &mut Writer<W>, layout: &LayoutGrid) -> anyhow::Result<()> {
    start_element(
        writer,
        "grid",
        &[
            ("name", "resultset"),
            ("jump", layout.jump.as_str()),
            ("select", "1"),
            ("icon", "1"),
            ("preview", "1"),
        ],
    )?;
    start_element(
        writer,
        "row",
        &[("name", "result"), ("id", layout.row_id.as_str())],
    )?;
    for (name, width) in &layout.cells {
        let width = width.to_string();
        write_empty_with(writer, "cell", &[("name", name.as_str()), ("width", width.as_str())])?;
    }
    end_element(writer, "row")?;
    end_element(writer, "grid")?;
    Ok(())
}

fn write_fetch<W: Write>(writer: &mut Writer<W>, fetch: &FetchQuery) -> anyhow::Result<()> {
    start_element(
        writer,
        "fetch",
        &[("version", "1.0"), ("mapping", "logical")],
    )?;
    start_element(writer, "entity", &[("name", fetch.entity.as_str())])?;

    for attribute in &fetch.attributes {
        write_empty_with(writer, "attribute", &[("name", attribute.as_str())])?;
    }
    for (attribute, descending) in &fetch.orders {
        write_empty_with(
            writer,
            "order",
            &[
                ("attribute", attribute.as_str()),
                ("descending", if *descending { "true" } else { "false" }),
            ],
        )?;
    }
    if let Some(ref filter) = fetch.filter {
        write_filter(writer, filter)?;
    }

    end_element(writer, "entity")?;
    end_element(writer, "fetch")?;
    Ok(())
}

fn write_filter<W: Write>(writer: &mut Writer<W>, filter: &CompiledFilter) -> anyhow::Result<()> {
    start_element(writer, "filter", &[("type", filter.kind.as_str())])?;
    for condition in &filter.conditions {
        let base = [
            ("attribute", condition.attribute.as_str()),
            ("operator", condition.operator.as_str()),
        ];
        match &condition.payload {
            ConditionPayload::None => write_empty_with(writer, "condition", &base)?,
            ConditionPayload::Single(value) => write_empty_with(
                writer,
                "condition",
                &[base[0], base[1], ("value", value.as_str())],
            )?,
            ConditionPayload::List(values) => {
                start_element(writer, "condition", &base)?;
                for value in values {
                    write_element(writer, "value", value)?;
                }
                end_element(writer, "condition")?;
            }
        }
    }
    end_element(writer, "filter")?;
    Ok(())
}
