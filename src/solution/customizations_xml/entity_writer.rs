//! Entity assembly and XML writing.
//!
//! An entity document holds the table's attributes (primary column first),
//! its metadata flags, then the FormXml block, then the SavedQueries block.
//! The importer rejects any other order.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::diagnostics::Diagnostics;
use crate::error::SolutionPackageError;
use crate::model::{Form, FormKind, Table};
use crate::solution::collision::EffectiveNames;

use super::attribute_writer::{serialize_column, write_attribute, AttributeFragment};
use super::form_writer::write_form_xml;
use super::registry::ChoiceRegistry;
use super::view_writer::{write_saved_queries, CompiledView};
use super::xml_helpers::{end_element, start_element, write_element, write_flag, write_localized};
use super::TableContext;

/// Flags written before the ownership mask
const LEADING_FLAGS: &[(&str, &str)] = &[
    ("IsDuplicateCheckSupported", "0"),
    ("IsBusinessProcessEnabled", "0"),
    ("IsRequiredOffline", "0"),
    ("IsInteractionCentricEnabled", "0"),
    ("IsCollaboration", "0"),
    ("AutoRouteToOwnerQueue", "0"),
    ("IsConnectionsEnabled", "0"),
    ("EntityColor", ""),
    ("IsDocumentManagementEnabled", "0"),
    ("AutoCreateAccessTeams", "0"),
    ("IsOneNoteIntegrationEnabled", "0"),
    ("IsKnowledgeManagementEnabled", "0"),
    ("IsSLAEnabled", "0"),
    ("IsDocumentRecommendationsEnabled", "0"),
    ("IsBPFEntity", "0"),
];

/// Flags between the audit flag and the quick create flag
const MIDDLE_FLAGS: &[(&str, &str)] = &[
    ("IsRetrieveAuditEnabled", "0"),
    ("IsRetrieveMultipleAuditEnabled", "0"),
    ("IsActivity", "0"),
    ("ActivityTypeMask", ""),
    ("IsActivityParty", "0"),
    ("IsReplicated", "0"),
    ("IsReplicationUserFiltered", "0"),
    ("IsMailMergeEnabled", "0"),
    ("IsVisibleInMobile", "1"),
    ("IsVisibleInMobileClient", "1"),
    ("IsReadOnlyInMobileClient", "0"),
    ("IsOfflineInMobileClient", "0"),
    ("DaysSinceRecordLastModified", "0"),
    ("MobileOfflineFilters", ""),
    ("IsMapiGridEnabled", "0"),
    ("IsReadingPaneEnabled", "0"),
];

/// Customization flags after `IntroducedVersion`
const TRAILING_FLAGS: &[(&str, &str)] = &[
    ("IsCustomizable", "1"),
    ("IsRenameable", "1"),
    ("IsMappable", "1"),
    ("CanModifyAuditSettings", "1"),
    ("CanModifyMobileVisibility", "1"),
    ("CanModifyMobileClientVisibility", "1"),
    ("CanModifyMobileClientReadOnly", "1"),
    ("CanModifyMobileClientOffline", "1"),
    ("CanModifyConnectionSettings", "1"),
    ("CanModifyDuplicateDetectionSettings", "1"),
    ("CanModifyMailMergeSettings", "1"),
    ("CanModifyQueueSettings", "1"),
    ("CanCreateAttributes", "1"),
    ("CanCreateForms", "1"),
    ("CanCreateCharts", "1"),
    ("CanCreateViews", "1"),
    ("CanModifyAdditionalSettings", "1"),
    ("CanEnableSyncToExternalSearchIndex", "1"),
    ("EnforceStateTransitions", "0"),
    ("CanChangeHierarchicalRelationship", "1"),
    ("EntityHelpUrlEnabled", "0"),
    ("ChangeTrackingEnabled", "0"),
    ("CanChangeTrackingBeEnabled", "1"),
    ("IsEnabledForExternalChannels", "0"),
    ("IsSolutionAware", "0"),
    ("HasRelatedNotes", "True"),
];

/// The assembled attribute set and flags of one table
#[derive(Debug, Clone)]
pub struct EntityDocument {
    pub logical_name: String,
    /// Effective name of the primary (name) column
    pub primary_column: String,
    /// Primary attribute first, then the rest in declared order
    pub attributes: Vec<AttributeFragment>,
    pub is_quick_create_enabled: bool,
}

impl EntityDocument {
    /// `EntitySetName` used for Web API routing
    pub fn entity_set_name(&self) -> String {
        format!("{}s", self.logical_name)
    }
}

/// Assemble the entity document for a table.
///
/// Fails when the declared primary column does not exist; every other
/// problem degrades to a diagnostic.
pub fn assemble_entity(
    table: &Table,
    names: &EffectiveNames,
    choices: &ChoiceRegistry,
    prefix: &str,
    forms: &[&Form],
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<EntityDocument> {
    let primary = table
        .primary()
        .ok_or_else(|| SolutionPackageError::PrimaryColumnNotFound {
            table: table.schema_name.clone(),
            column: table.primary_column.clone(),
        })?;

    let mut attributes = Vec::with_capacity(table.columns.len());
    attributes.extend(serialize_column(
        primary,
        true,
        names,
        choices,
        prefix,
        diagnostics,
    ));
    for column in &table.columns {
        if column.schema_name == table.primary_column {
            continue;
        }
        attributes.extend(serialize_column(
            column,
            false,
            names,
            choices,
            prefix,
            diagnostics,
        ));
    }

    Ok(EntityDocument {
        logical_name: names.entity_logical().to_string(),
        primary_column: names.of(primary),
        attributes,
        is_quick_create_enabled: forms.iter().any(|f| f.kind == FormKind::QuickCreate),
    })
}

/// Write an `<Entity>` element with its forms and views.
pub(crate) fn write_entity<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    document: &EntityDocument,
    forms: &[&Form],
    views: &[CompiledView],
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let table = ctx.table;
    let language = ctx.language;

    start_element(writer, "Entity", &[])?;

    // The element text is the logical name; the importer keys on it
    let name = BytesStart::new("Name").with_attributes([
        ("LocalizedName", table.display_name.as_str()),
        ("OriginalName", table.display_name.as_str()),
    ]);
    writer.write_event(Event::Start(name))?;
    writer.write_event(Event::Text(BytesText::new(&document.logical_name)))?;
    writer.write_event(Event::End(BytesEnd::new("Name")))?;

    start_element(writer, "EntityInfo", &[])?;
    start_element(writer, "entity", &[("Name", document.logical_name.as_str())])?;
    write_localized(
        writer,
        "LocalizedNames",
        "LocalizedName",
        &table.display_name,
        language,
    )?;
    write_localized(
        writer,
        "LocalizedCollectionNames",
        "LocalizedCollectionName",
        &table.plural_name,
        language,
    )?;
    write_localized(
        writer,
        "Descriptions",
        "Description",
        &table.description,
        language,
    )?;

    start_element(writer, "attributes", &[])?;
    for attribute in &document.attributes {
        write_attribute(writer, attribute, ctx.version, language)?;
    }
    end_element(writer, "attributes")?;

    write_element(writer, "EntitySetName", &document.entity_set_name())?;
    for (name, value) in LEADING_FLAGS {
        write_element(writer, name, value)?;
    }
    write_element(writer, "OwnershipTypeMask", table.ownership.type_mask())?;
    write_flag(writer, "IsAuditEnabled", table.audit_enabled)?;
    for (name, value) in MIDDLE_FLAGS {
        write_element(writer, name, value)?;
    }
    write_flag(
        writer,
        "IsQuickCreateEnabled",
        document.is_quick_create_enabled,
    )?;
    write_element(writer, "SyncToExternalSearchIndex", "0")?;
    write_element(writer, "IntroducedVersion", ctx.version)?;
    for (name, value) in TRAILING_FLAGS {
        write_element(writer, name, value)?;
    }
    end_element(writer, "entity")?;
    end_element(writer, "EntityInfo")?;

    if !forms.is_empty() {
        write_form_xml(writer, ctx, forms, diagnostics)?;
    }
    if !views.is_empty() {
        write_saved_queries(writer, views, ctx.version, language)?;
    }

    end_element(writer, "Entity")?;
    Ok(())
}
