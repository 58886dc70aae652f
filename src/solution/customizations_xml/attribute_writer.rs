//! Attribute XML writing for customizations.xml generation.
//!
//! A column is first serialized into an [`AttributeFragment`] (a pure
//! description of what the `<attribute>` element must contain) and then
//! written. Splitting the two keeps the type rules testable without parsing
//! XML back.

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{is_builtin_principal, ChoiceOption, Column, ColumnType};
use crate::solution::collision::EffectiveNames;

use super::registry::ChoiceRegistry;
use super::xml_helpers::{
    end_element, start_element, write_element, write_flag, write_labels, write_localized,
};

const DEFAULT_STRING_MAX_LENGTH: u32 = 200;
const MEMO_MAX_LENGTH: &str = "1048576";
const DEFAULT_PRECISION: u8 = 2;

/// Flags every custom attribute carries after `IntroducedVersion`, in document order
const TRAILING_PROPERTIES: &[(&str, &str)] = &[
    ("IsCustomizable", "1"),
    ("IsRenameable", "1"),
    ("CanModifySearchSettings", "1"),
    ("CanModifyRequirementLevelSettings", "1"),
    ("CanModifyAdditionalSettings", "1"),
    ("SourceType", "0"),
    ("IsGlobalFilterEnabled", "0"),
    ("IsSortableEnabled", "0"),
    ("CanModifyGlobalFilterSettings", "1"),
    ("CanModifyIsSortableSettings", "1"),
    ("IsDataSourceSecret", "0"),
    ("IsSearchable", "0"),
    ("IsFilterable", "0"),
    ("IsRetrievable", "0"),
    ("IsLocalizable", "0"),
];

/// Attribute requirement level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredLevel {
    None,
    ApplicationRequired,
}

impl RequiredLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredLevel::None => "none",
            RequiredLevel::ApplicationRequired => "ApplicationRequired",
        }
    }
}

/// Kind of inline option set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSetKind {
    /// Two-option set backing a Boolean column
    Bit,
    /// Local picklist backing a Choice or GlobalChoice column
    Picklist,
}

/// Inline option set emitted inside an attribute
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSetFragment {
    pub name: String,
    pub kind: OptionSetKind,
    pub display_name: String,
    pub description: Option<String>,
    pub options: Vec<ChoiceOption>,
}

/// Everything needed to write one `<attribute>` element
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeFragment {
    pub physical_name: String,
    /// Platform type name (`nvarchar`, `picklist`, ...)
    pub type_name: &'static str,
    pub required_level: RequiredLevel,
    pub display_mask: String,
    pub is_audit_enabled: bool,
    pub is_secured: bool,
    /// Type-specific properties, in document order
    pub type_properties: Vec<(&'static str, String)>,
    pub option_set: Option<OptionSetFragment>,
    pub display_name: String,
    pub description: Option<String>,
}

impl AttributeFragment {
    /// True when this attribute carries the primary-name display flag
    pub fn is_primary_name(&self) -> bool {
        self.display_mask.starts_with("PrimaryName")
    }
}

fn display_mask(is_primary: bool) -> String {
    if is_primary {
        "PrimaryName|ValidForAdvancedFind|ValidForForm|ValidForGrid|RequiredForForm".to_string()
    } else {
        "ValidForAdvancedFind|ValidForForm|ValidForGrid".to_string()
    }
}

fn required_level(column: &Column, is_primary: bool) -> RequiredLevel {
    if is_primary && matches!(column.kind, ColumnType::AutoNumber { .. }) {
        // The platform fills auto-number names on save
        RequiredLevel::None
    } else if column.required || is_primary {
        RequiredLevel::ApplicationRequired
    } else {
        RequiredLevel::None
    }
}

fn boolean_options() -> Vec<ChoiceOption> {
    vec![
        ChoiceOption {
            value: 1,
            label: "Yes".to_string(),
        },
        ChoiceOption {
            value: 0,
            label: "No".to_string(),
        },
    ]
}

/// Serialize one column into an attribute fragment.
///
/// Returns `None` for columns that are never generated: lookups to a
/// built-in principal and calculated columns are skipped silently, unknown
/// types with a warning.
pub fn serialize_column(
    column: &Column,
    is_primary: bool,
    names: &EffectiveNames,
    choices: &ChoiceRegistry,
    prefix: &str,
    diagnostics: &mut Diagnostics,
) -> Option<AttributeFragment> {
    let entity = names.entity_logical();
    let physical_name = names.of(column);
    let mut type_properties: Vec<(&'static str, String)> = Vec::new();
    let mut option_set = None;

    let type_name = match &column.kind {
        ColumnType::String { max_length } => {
            type_properties.push(("AutoNumberFormat", String::new()));
            type_properties.push(("Format", "text".to_string()));
            type_properties.push((
                "MaxLength",
                max_length.unwrap_or(DEFAULT_STRING_MAX_LENGTH).to_string(),
            ));
            "nvarchar"
        }
        ColumnType::AutoNumber { max_length, format } => {
            type_properties.push(("AutoNumberFormat", format.clone().unwrap_or_default()));
            type_properties.push(("Format", "text".to_string()));
            type_properties.push((
                "MaxLength",
                max_length.unwrap_or(DEFAULT_STRING_MAX_LENGTH).to_string(),
            ));
            "nvarchar"
        }
        ColumnType::Memo => {
            type_properties.push(("Format", "text".to_string()));
            type_properties.push(("MaxLength", MEMO_MAX_LENGTH.to_string()));
            "ntext"
        }
        ColumnType::WholeNumber { default } => {
            type_properties.push(("Format", "none".to_string()));
            type_properties.push(("MinValue", i32::MIN.to_string()));
            type_properties.push(("MaxValue", i32::MAX.to_string()));
            if let Some(value) = default {
                type_properties.push(("AppDefaultValue", value.to_string()));
            }
            "int"
        }
        ColumnType::Float { precision } | ColumnType::Decimal { precision } => {
            type_properties.push((
                "Precision",
                precision.unwrap_or(DEFAULT_PRECISION).to_string(),
            ));
            type_properties.push(("MinValue", "-100000000000".to_string()));
            type_properties.push(("MaxValue", "100000000000".to_string()));
            if matches!(column.kind, ColumnType::Float { .. }) {
                "float"
            } else {
                "decimal"
            }
        }
        ColumnType::Currency => {
            type_properties.push(("Precision", "2".to_string()));
            type_properties.push(("MinValue", "-922337203685477".to_string()));
            type_properties.push(("MaxValue", "922337203685477".to_string()));
            type_properties.push(("IsBaseCurrency", "0".to_string()));
            "money"
        }
        ColumnType::Boolean { default } => {
            type_properties.push(("AppDefaultValue", if *default { "1" } else { "0" }.to_string()));
            option_set = Some(OptionSetFragment {
                name: format!("{}_{}_{}", prefix, entity, physical_name),
                kind: OptionSetKind::Bit,
                display_name: column.display_name.clone(),
                description: Some(String::new()),
                options: boolean_options(),
            });
            "bit"
        }
        ColumnType::DateTime => {
            type_properties.push(("Format", "datetime".to_string()));
            type_properties.push(("CanChangeDateTimeBehavior", "1".to_string()));
            type_properties.push(("Behavior", "1".to_string()));
            "datetime"
        }
        ColumnType::DateOnly => {
            type_properties.push(("Format", "date".to_string()));
            type_properties.push(("CanChangeDateTimeBehavior", "1".to_string()));
            type_properties.push(("Behavior", "2".to_string()));
            "datetime"
        }
        ColumnType::GlobalChoice { choice_name } => {
            // Inlined as a local option set so two tables sharing a choice never
            // collide on import
            let global = choices.get(choice_name);
            if global.is_none() {
                diagnostics.warn(
                    DiagnosticCode::ChoiceNotFound,
                    format!("{}.{}", entity, column.schema_name),
                    format!("global choice \"{}\" is not defined", choice_name),
                );
            }
            option_set = Some(OptionSetFragment {
                name: format!("{}_{}", entity, physical_name),
                kind: OptionSetKind::Picklist,
                display_name: global
                    .map(|g| g.display_name.clone())
                    .unwrap_or_else(|| column.display_name.clone()),
                description: global.and_then(|g| g.description.clone()),
                options: global.map(|g| g.options.clone()).unwrap_or_default(),
            });
            "picklist"
        }
        ColumnType::Choice { options } => {
            option_set = Some(OptionSetFragment {
                name: format!("{}_{}", entity, physical_name),
                kind: OptionSetKind::Picklist,
                display_name: column.display_name.clone(),
                description: column.description.clone(),
                options: options.clone(),
            });
            "picklist"
        }
        ColumnType::Lookup { target } => {
            if is_builtin_principal(target) {
                return None;
            }
            type_properties.push(("LookupStyle", "single".to_string()));
            "lookup"
        }
        ColumnType::Calculated => return None,
        ColumnType::Unknown(type_name) => {
            diagnostics.warn(
                DiagnosticCode::UnknownColumnType,
                format!("{}.{}", entity, column.schema_name),
                format!("unknown column type \"{}\", attribute omitted", type_name),
            );
            return None;
        }
    };

    Some(AttributeFragment {
        physical_name,
        type_name,
        required_level: required_level(column, is_primary),
        display_mask: display_mask(is_primary),
        is_audit_enabled: column.audit,
        is_secured: column.phi,
        type_properties,
        option_set,
        display_name: column.display_name.clone(),
        description: column.description.clone(),
    })
}

/// Write an `<attribute>` element.
pub(crate) fn write_attribute<W: Write>(
    writer: &mut Writer<W>,
    fragment: &AttributeFragment,
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    start_element(
        writer,
        "attribute",
        &[("PhysicalName", fragment.physical_name.as_str())],
    )?;

    write_element(writer, "Type", fragment.type_name)?;

    write_element(writer, "Name", &fragment.physical_name)?;
    write_element(writer, "LogicalName", &fragment.physical_name)?;
    write_element(writer, "RequiredLevel", fragment.required_level.as_str())?;
    write_element(writer, "DisplayMask", &fragment.display_mask)?;
    write_element(writer, "ImeMode", "auto")?;
    write_element(writer, "ValidForUpdateApi", "1")?;
    write_element(writer, "ValidForReadApi", "1")?;
    write_element(writer, "ValidForCreateApi", "1")?;
    write_element(writer, "IsCustomField", "1")?;
    write_flag(writer, "IsAuditEnabled", fragment.is_audit_enabled)?;
    write_flag(writer, "IsSecured", fragment.is_secured)?;
    write_element(writer, "IntroducedVersion", version)?;
    for (name, value) in TRAILING_PROPERTIES {
        write_element(writer, name, value)?;
    }

    for (name, value) in &fragment.type_properties {
        write_element(writer, name, value)?;
    }
    if fragment.type_name == "lookup" {
        writer.write_event(Event::Empty(BytesStart::new("LookupTypes")))?;
    }

    if let Some(ref option_set) = fragment.option_set {
        write_option_set(writer, option_set, version, language)?;
    }

    write_localized(
        writer,
        "displaynames",
        "displayname",
        &fragment.display_name,
        language,
    )?;
    if let Some(ref description) = fragment.description {
        write_localized(writer, "Descriptions", "Description", description, language)?;
    }

    writer.write_event(Event::End(BytesEnd::new("attribute")))?;
    Ok(())
}

/// Write an inline `<optionset>`; the header element order differs between
/// bit and picklist sets.
fn write_option_set<W: Write>(
    writer: &mut Writer<W>,
    option_set: &OptionSetFragment,
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    start_element(writer, "optionset", &[("Name", option_set.name.as_str())])?;

    match option_set.kind {
        OptionSetKind::Bit => {
            write_element(writer, "OptionSetType", "bit")?;
            write_element(writer, "IntroducedVersion", version)?;
            write_element(writer, "IsCustomizable", "1")?;
        }
        OptionSetKind::Picklist => {
            write_element(writer, "IsGlobal", "0")?;
            write_element(writer, "IntroducedVersion", version)?;
            write_element(writer, "IsCustomizable", "1")?;
            write_element(writer, "OptionSetType", "picklist")?;
        }
    }
    write_element(writer, "ExternalTypeName", "")?;

    write_localized(
        writer,
        "displaynames",
        "displayname",
        &option_set.display_name,
        language,
    )?;
    if let Some(ref description) = option_set.description {
        write_localized(writer, "Descriptions", "Description", description, language)?;
    }

    start_element(writer, "options", &[])?;
    for option in &option_set.options {
        let value = option.value.to_string();
        start_element(
            writer,
            "option",
            &[
                ("value", value.as_str()),
                ("ExternalValue", ""),
                ("IsHidden", "0"),
            ],
        )?;
        write_labels(writer, &option.label, language)?;
        end_element(writer, "option")?;
    }
    end_element(writer, "options")?;

    end_element(writer, "optionset")?;
    Ok(())
}
