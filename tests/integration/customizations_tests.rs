//! Integration tests for the generated customizations document

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use rust_solutionpackage::DiagnosticCode;

use crate::common::{child, child_text, children, find_entity, PackageInfo, TestContext};

fn build_customizations() -> String {
    let ctx = TestContext::with_fixture("emergency_response");
    let outcome = ctx.build_successfully();
    let info = PackageInfo::from_package(&outcome.archive_path).expect("Should read package");
    info.customizations().to_string()
}

/// Physical names of an entity's attributes, in document order
fn attribute_names(entity: roxmltree::Node) -> Vec<String> {
    let attributes = child(entity, "attributes").expect("entity has attributes");
    children(attributes, "attribute")
        .filter_map(|a| a.attribute("PhysicalName").map(str::to_string))
        .collect()
}

fn find_attribute<'a, 'input>(
    entity: roxmltree::Node<'a, 'input>,
    physical_name: &str,
) -> roxmltree::Node<'a, 'input> {
    entity
        .descendants()
        .find(|n| n.has_tag_name("attribute") && n.attribute("PhysicalName") == Some(physical_name))
        .unwrap_or_else(|| panic!("attribute {} not found", physical_name))
}

// ============================================================================
// Document Shape
// ============================================================================

#[test]
fn test_root_sequence() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).expect("customizations.xml should parse");

    let sequence: Vec<&str> = doc
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect();
    assert_eq!(
        sequence,
        vec![
            "optionsets",
            "Entities",
            "Roles",
            "Workflows",
            "FieldSecurityProfiles",
            "Templates",
            "EntityMaps",
            "EntityRelationships",
            "OrganizationSettings",
            "CustomControls",
            "EntityDataProviders",
            "Languages",
        ]
    );
}

#[test]
fn test_entities_in_file_name_order() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let entities: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("Entity"))
        .filter_map(|e| child_text(e, "Name"))
        .collect();
    assert_eq!(
        entities,
        vec!["seo_agency", "seo_call", "seo_incident", "seo_unit"]
    );
}

#[test]
fn test_exactly_one_primary_name_per_entity() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    for (entity, expected_primary) in [
        ("seo_agency", "seo_agency_name"),
        ("seo_call", "seo_name"),
        ("seo_incident", "seo_name"),
        ("seo_unit", "seo_name"),
    ] {
        let node = find_entity(&doc, entity);
        let primaries: Vec<&str> = node
            .descendants()
            .filter(|n| n.has_tag_name("attribute"))
            .filter(|a| {
                child_text(*a, "DisplayMask").is_some_and(|m| m.starts_with("PrimaryName"))
            })
            .filter_map(|a| a.attribute("PhysicalName"))
            .collect();
        assert_eq!(primaries, vec![expected_primary], "entity {}", entity);
        assert_eq!(attribute_names(node)[0], expected_primary);
    }
}

// ============================================================================
// Column Scenarios
// ============================================================================

#[test]
fn test_boolean_default_true_scenario() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let agency = find_entity(&doc, "seo_agency");
    let active = find_attribute(agency, "seo_isactive");

    assert_eq!(child_text(active, "Type"), Some("bit"));
    assert_eq!(child_text(active, "AppDefaultValue"), Some("1"));

    let option_set = child(active, "optionset").expect("inline option set");
    assert_eq!(option_set.attribute("Name"), Some("seo_seo_agency_seo_isactive"));
    let options: Vec<(&str, &str)> = option_set
        .descendants()
        .filter(|n| n.has_tag_name("option"))
        .map(|o| {
            let label = o
                .descendants()
                .find(|n| n.has_tag_name("label"))
                .and_then(|l| l.attribute("description"))
                .unwrap_or_default();
            (o.attribute("value").unwrap_or_default(), label)
        })
        .collect();
    assert_eq!(options, vec![("1", "Yes"), ("0", "No")]);
}

#[test]
fn test_primary_key_collision_renamed_everywhere() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let agency = find_entity(&doc, "seo_agency");

    let names = attribute_names(agency);
    assert!(names.contains(&"seo_agency_name".to_string()));
    assert!(!names.contains(&"seo_agencyid".to_string()));

    let form_fields: Vec<&str> = agency
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .descendants()
        .filter(|n| n.has_tag_name("control"))
        .filter_map(|c| c.attribute("datafieldname"))
        .collect();
    assert!(form_fields.contains(&"seo_agency_name"));
    assert!(!form_fields.contains(&"seo_agencyid"));
}

#[test]
fn test_skipped_columns_not_generated() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let incident = find_entity(&doc, "seo_incident");

    let names = attribute_names(incident);
    assert_eq!(
        names,
        vec!["seo_name", "seo_callid", "seo_unitid", "seo_casualties"]
    );
}

#[test]
fn test_global_choice_inlined_with_choice_metadata() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let call = find_entity(&doc, "seo_call");
    let priority = find_attribute(call, "seo_priority");

    assert_eq!(child_text(priority, "Type"), Some("picklist"));
    assert_eq!(child_text(priority, "RequiredLevel"), Some("ApplicationRequired"));
    let option_set = child(priority, "optionset").unwrap();
    assert_eq!(option_set.attribute("Name"), Some("seo_call_seo_priority"));
    assert_eq!(child_text(option_set, "IsGlobal"), Some("0"));
    assert_eq!(
        option_set
            .descendants()
            .filter(|n| n.has_tag_name("option"))
            .count(),
        4
    );
}

#[test]
fn test_phi_column_is_secured() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let call = find_entity(&doc, "seo_call");

    assert_eq!(
        child_text(find_attribute(call, "seo_callerphone"), "IsSecured"),
        Some("1")
    );
    assert_eq!(
        child_text(find_attribute(call, "seo_narrative"), "IsSecured"),
        Some("0")
    );
}

// ============================================================================
// Relationships
// ============================================================================

#[test]
fn test_relationships_unique_and_complete() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let relationships: Vec<(&str, &str, &str)> = doc
        .descendants()
        .filter(|n| n.has_tag_name("EntityRelationship"))
        .map(|r| {
            (
                r.attribute("Name").unwrap_or_default(),
                child_text(r, "ReferencingEntityName").unwrap_or_default(),
                child_text(r, "ReferencedEntityName").unwrap_or_default(),
            )
        })
        .collect();

    assert_eq!(
        relationships,
        vec![
            ("seo_Incident_CallId", "seo_incident", "seo_call"),
            ("seo_Incident_UnitId", "seo_incident", "seo_unit"),
            ("seo_Unit_AgencyId", "seo_unit", "seo_agency"),
        ]
    );

    let unique: HashSet<_> = relationships.iter().map(|r| r.0).collect();
    assert_eq!(unique.len(), relationships.len());
}

#[test]
fn test_colliding_lookups_get_unique_relationship_names() {
    let ctx = TestContext::with_fixture("emergency_response");
    // `CallId` precedes `seo_CallId`, so the prefixed lookup takes the suffix
    ctx.edit_json("datamodel/tables/incident.json", |table| {
        table["columns"].as_array_mut().unwrap().insert(
            1,
            serde_json::json!({
                "schemaName": "CallId", "displayName": "Original Call",
                "type": "Lookup", "target": "seo_Call"
            }),
        );
    });

    let outcome = ctx.build_successfully();
    let info = PackageInfo::from_package(&outcome.archive_path).unwrap();
    let doc = roxmltree::Document::parse(info.customizations()).unwrap();

    let names: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("EntityRelationship"))
        .filter_map(|r| r.attribute("Name"))
        .collect();
    assert_eq!(
        names,
        vec![
            "seo_Incident_CallId",
            "seo_Incident_CallId_2",
            "seo_Incident_UnitId",
            "seo_Unit_AgencyId",
        ]
    );
    assert_eq!(
        outcome
            .diagnostics
            .with_code(DiagnosticCode::RelationshipRenamed)
            .len(),
        1
    );

    // The call form subgrid follows `seo_CallId` to its renamed relationship
    let subgrid_relationships: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("RelationshipName"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(subgrid_relationships, vec!["seo_Incident_CallId_2"]);
}

#[test]
fn test_subgrid_resolves_to_derived_relationship() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let relationship_names: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("RelationshipName"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(relationship_names, vec!["seo_Incident_CallId"]);
    assert!(!xml.contains("seo_call_incidents<"));
}

// ============================================================================
// Views
// ============================================================================

fn saved_query<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    entity: &str,
) -> roxmltree::Node<'a, 'input> {
    doc.descendants()
        .filter(|n| n.has_tag_name("savedquery"))
        .find(|q| {
            q.descendants()
                .any(|n| n.has_tag_name("entity") && n.attribute("name") == Some(entity))
        })
        .unwrap_or_else(|| panic!("no saved query for {}", entity))
}

#[test]
fn test_invalid_filter_condition_dropped() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let query = saved_query(&doc, "seo_call");

    let attributes: Vec<&str> = query
        .descendants()
        .filter(|n| n.has_tag_name("condition"))
        .filter_map(|c| c.attribute("attribute"))
        .collect();
    assert_eq!(attributes, vec!["statecode", "seo_receivedon", "seo_priority"]);
    assert!(!xml.contains("seo_dispatcher"));
}

#[test]
fn test_on_or_after_zero_compiles_to_today() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let query = saved_query(&doc, "seo_call");

    let condition = query
        .descendants()
        .find(|n| n.has_tag_name("condition") && n.attribute("attribute") == Some("seo_receivedon"))
        .unwrap();
    assert_eq!(condition.attribute("operator"), Some("today"));
    assert_eq!(condition.attribute("value"), None);
}

#[test]
fn test_choice_labels_resolve_to_values() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let call_query = saved_query(&doc, "seo_call");
    let values: Vec<&str> = call_query
        .descendants()
        .filter(|n| n.has_tag_name("value"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(values, vec!["100000002", "100000003"]);

    let unit_query = saved_query(&doc, "seo_unit");
    let status = unit_query
        .descendants()
        .find(|n| n.has_tag_name("condition") && n.attribute("attribute") == Some("seo_status"))
        .unwrap();
    assert_eq!(status.attribute("value"), Some("1"));

    let in_service = unit_query
        .descendants()
        .find(|n| {
            n.has_tag_name("condition") && n.attribute("attribute") == Some("seo_inservicedate")
        })
        .unwrap();
    assert_eq!(in_service.attribute("operator"), Some("next-x-days"));
    assert_eq!(in_service.attribute("value"), Some("7"));
}

#[test]
fn test_view_layout_and_fetch_attributes() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let query = saved_query(&doc, "seo_call");

    let cells: Vec<&str> = query
        .descendants()
        .filter(|n| n.has_tag_name("cell"))
        .filter_map(|c| c.attribute("name"))
        .collect();
    assert_eq!(cells, vec!["seo_name", "seo_priority", "seo_receivedon"]);

    let fetch_attributes: Vec<&str> = query
        .descendants()
        .filter(|n| n.has_tag_name("attribute") && n.attribute("name").is_some())
        .filter_map(|a| a.attribute("name"))
        .collect();
    assert_eq!(
        fetch_attributes,
        vec!["seo_callid", "seo_name", "seo_priority", "seo_receivedon"]
    );

    let orders: Vec<(&str, &str)> = query
        .descendants()
        .filter(|n| n.has_tag_name("order"))
        .map(|o| {
            (
                o.attribute("attribute").unwrap_or_default(),
                o.attribute("descending").unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(orders, vec![("seo_receivedon", "true")]);
}

// ============================================================================
// Forms
// ============================================================================

#[test]
fn test_quick_create_form_and_flag() {
    let xml = build_customizations();
    let doc = roxmltree::Document::parse(&xml).unwrap();

    let incident = find_entity(&doc, "seo_incident");
    assert_eq!(child_text(incident, "IsQuickCreateEnabled"), Some("1"));
    let call = find_entity(&doc, "seo_call");
    assert_eq!(child_text(call, "IsQuickCreateEnabled"), Some("0"));

    let quick_forms: Vec<_> = doc
        .descendants()
        .filter(|n| n.has_tag_name("forms") && n.attribute("type") == Some("quick"))
        .collect();
    assert_eq!(quick_forms.len(), 1);
}
