//! One-to-many relationship derivation and XML writing.
//!
//! Every lookup column defines exactly one relationship. Lookups to a
//! built-in principal are configured manually after import and never
//! derived.

use quick_xml::Writer;
use std::collections::HashSet;
use std::io::Write;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{is_builtin_principal, Column, ColumnType, Table};
use crate::solution::collision::effective_column_name;
use crate::util::{bare_name, logical_name};

use super::xml_helpers::{end_element, start_element, write_element, write_localized};

/// Cascade configuration shared by every derived relationship.
/// Deleting a parent removes the link but never the child record.
const CASCADES: &[(&str, &str)] = &[
    ("CascadeAssign", "NoCascade"),
    ("CascadeDelete", "RemoveLink"),
    ("CascadeArchive", "RemoveLink"),
    ("CascadeReparent", "NoCascade"),
    ("CascadeShare", "NoCascade"),
    ("CascadeUnshare", "NoCascade"),
    ("CascadeRollupView", "NoCascade"),
];

/// A derived one-to-many relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRecord {
    pub name: String,
    /// Child entity logical name (owner of the lookup)
    pub referencing_entity: String,
    /// Parent entity logical name (lookup target)
    pub referenced_entity: String,
    /// Effective name of the lookup attribute
    pub referencing_attribute: String,
}

/// Relationship name for a lookup: `{prefix}_{bareTable}_{bareLookup}`
pub fn relationship_name(prefix: &str, table_schema: &str, lookup_schema: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        bare_name(table_schema, prefix),
        bare_name(lookup_schema, prefix)
    )
}

/// Relationship for one lookup column, or `None` when the column is not a
/// generated lookup.
pub fn relationship_for(table: &Table, column: &Column, prefix: &str) -> Option<RelationshipRecord> {
    let ColumnType::Lookup { target } = &column.kind else {
        return None;
    };
    if is_builtin_principal(target) {
        return None;
    }

    let entity = table.logical_name();
    Some(RelationshipRecord {
        name: relationship_name(prefix, &table.schema_name, &column.schema_name),
        referencing_attribute: effective_column_name(column, &entity),
        referencing_entity: entity,
        referenced_entity: logical_name(target),
    })
}

/// Derive one relationship per lookup column, in table then column order.
///
/// Names are unique across the whole set, compared case-insensitively. A
/// name already taken (two lookups that only differ by prefix or case) gets
/// the first free `_2`, `_3`, ... suffix and a warning is recorded.
pub fn derive_relationships(
    tables: &[Table],
    prefix: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<RelationshipRecord> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut relationships = Vec::new();

    for table in tables {
        for column in &table.columns {
            let Some(mut relationship) = relationship_for(table, column, prefix) else {
                continue;
            };

            if !taken.insert(relationship.name.to_lowercase()) {
                let base = relationship.name.clone();
                let unique = (2..)
                    .map(|n| format!("{}_{}", base, n))
                    .find(|candidate| !taken.contains(&candidate.to_lowercase()))
                    .unwrap_or_default();
                taken.insert(unique.to_lowercase());
                diagnostics.warn(
                    DiagnosticCode::RelationshipRenamed,
                    format!("{}.{}", relationship.referencing_entity, column.schema_name),
                    format!("{} is already taken, renamed to {}", base, unique),
                );
                relationship.name = unique;
            }
            relationships.push(relationship);
        }
    }
    relationships
}

/// Write the `<EntityRelationships>` block, or `<EntityRelationships />`
/// when there are none.
pub(crate) fn write_relationships<W: Write>(
    writer: &mut Writer<W>,
    relationships: &[RelationshipRecord],
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    if relationships.is_empty() {
        return super::xml_helpers::write_empty(writer, "EntityRelationships");
    }

    start_element(writer, "EntityRelationships", &[])?;
    for relationship in relationships {
        write_relationship(writer, relationship, version, language)?;
    }
    end_element(writer, "EntityRelationships")?;
    Ok(())
}

fn write_relationship<W: Write>(
    writer: &mut Writer<W>,
    relationship: &RelationshipRecord,
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    start_element(
        writer,
        "EntityRelationship",
        &[("Name", relationship.name.as_str())],
    )?;

    write_element(writer, "EntityRelationshipType", "OneToMany")?;
    write_element(writer, "IsCustomizable", "1")?;
    write_element(writer, "IntroducedVersion", version)?;
    write_element(writer, "IsHierarchical", "0")?;
    write_element(
        writer,
        "ReferencingEntityName",
        &relationship.referencing_entity,
    )?;
    write_element(writer, "ReferencedEntityName", &relationship.referenced_entity)?;
    for (name, value) in CASCADES {
        write_element(writer, name, value)?;
    }
    write_element(writer, "IsValidForAdvancedFind", "1")?;
    write_element(
        writer,
        "ReferencingAttributeName",
        &relationship.referencing_attribute,
    )?;

    start_element(writer, "RelationshipDescription", &[])?;
    write_localized(writer, "Descriptions", "Description", "", language)?;
    end_element(writer, "RelationshipDescription")?;

    // Role 1 is the referencing side, role 0 the referenced side
    start_element(writer, "EntityRelationshipRoles", &[])?;
    start_element(writer, "EntityRelationshipRole", &[])?;
    write_element(writer, "NavPaneDisplayOption", "UseCollectionName")?;
    write_element(writer, "NavPaneArea", "Details")?;
    write_element(writer, "NavPaneOrder", "10000")?;
    write_element(
        writer,
        "NavigationPropertyName",
        &relationship.referencing_attribute,
    )?;
    write_element(writer, "RelationshipRoleType", "1")?;
    end_element(writer, "EntityRelationshipRole")?;
    start_element(writer, "EntityRelationshipRole", &[])?;
    write_element(writer, "NavigationPropertyName", &relationship.name)?;
    write_element(writer, "RelationshipRoleType", "0")?;
    end_element(writer, "EntityRelationshipRole")?;
    end_element(writer, "EntityRelationshipRoles")?;

    end_element(writer, "EntityRelationship")?;
    Ok(())
}
