//! Unit tests for the in-memory compile stages

use std::path::PathBuf;

use serde_json::json;

use rust_solutionpackage::model::{Form, SpecSet, Subgrid, Table, View};
use rust_solutionpackage::project::{Publisher, SolutionProject};
use rust_solutionpackage::solution::customizations_xml::{
    derive_relationships, generate_customizations_xml_string, resolve_subgrid_relationship,
};
use rust_solutionpackage::{DiagnosticCode, Diagnostics};

fn table(value: serde_json::Value) -> Table {
    serde_json::from_value(value).expect("valid table spec")
}

fn call() -> Table {
    table(json!({
        "schemaName": "seo_Call", "displayName": "Call", "pluralName": "Calls",
        "primaryColumn": "seo_Name",
        "columns": [
            { "schemaName": "seo_Name", "displayName": "Name", "type": "String" },
            { "schemaName": "seo_ReceivedOn", "displayName": "Received", "type": "DateTime" }
        ]
    }))
}

fn unit() -> Table {
    table(json!({
        "schemaName": "seo_Unit", "displayName": "Unit", "pluralName": "Units",
        "primaryColumn": "seo_Name",
        "columns": [{ "schemaName": "seo_Name", "displayName": "Name", "type": "String" }]
    }))
}

fn incident(extra_call_lookup: bool) -> Table {
    let mut columns = vec![
        json!({ "schemaName": "seo_Name", "displayName": "Name", "type": "String" }),
        json!({ "schemaName": "seo_CallId", "displayName": "Call", "type": "Lookup", "target": "seo_Call" }),
        json!({ "schemaName": "seo_UnitId", "displayName": "Unit", "type": "Lookup", "target": "seo_Unit" }),
        json!({ "schemaName": "seo_OwnerUser", "displayName": "Owner", "type": "Lookup", "target": "systemuser" }),
    ];
    if extra_call_lookup {
        columns.push(json!({
            "schemaName": "seo_TransferredFromId", "displayName": "Transferred From",
            "type": "Lookup", "target": "seo_Call"
        }));
    }
    table(json!({
        "schemaName": "seo_Incident", "displayName": "Incident", "pluralName": "Incidents",
        "primaryColumn": "seo_Name",
        "columns": columns
    }))
}

fn subgrid(relationship: &str) -> Subgrid {
    serde_json::from_value(json!({
        "name": "incidents", "label": "Incidents",
        "entity": "seo_Incident", "relationship": relationship
    }))
    .unwrap()
}

fn project() -> SolutionProject {
    SolutionProject {
        name: "Demo".to_string(),
        friendly_name: "Demo".to_string(),
        description: String::new(),
        version: "1.0.0.0".to_string(),
        language_code: 1033,
        publisher: Publisher {
            unique_name: "Pub".to_string(),
            friendly_name: "Publisher".to_string(),
            description: String::new(),
            prefix: "seo".to_string(),
            option_value_prefix: 10000,
        },
        spec_root: PathBuf::from("."),
        views_dir: PathBuf::from("views"),
        forms_dir: PathBuf::from("forms"),
        emit_environment_variables: false,
    }
}

#[test]
fn test_two_lookups_derive_distinct_relationships() {
    let tables = vec![call(), incident(false), unit()];
    let mut diags = Diagnostics::new();
    let relationships = derive_relationships(&tables, "seo", &mut diags);

    let names: Vec<&str> = relationships.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["seo_Incident_CallId", "seo_Incident_UnitId"]);
    assert_eq!(relationships[0].referenced_entity, "seo_call");
    assert_eq!(relationships[1].referenced_entity, "seo_unit");
    assert_eq!(relationships[0].referencing_attribute, "seo_callid");
    assert!(diags.with_code(DiagnosticCode::RelationshipRenamed).is_empty());
}

#[test]
fn test_colliding_lookups_derive_unique_relationships() {
    let mut child = incident(false);
    // `UnitId` and `seo_UnitId` both strip to the same relationship name
    child.columns.push(
        serde_json::from_value(json!({
            "schemaName": "UnitId", "displayName": "Backup Unit",
            "type": "Lookup", "target": "seo_Unit"
        }))
        .unwrap(),
    );
    let tables = vec![call(), child, unit()];
    let mut diags = Diagnostics::new();
    let relationships = derive_relationships(&tables, "seo", &mut diags);

    let names: Vec<&str> = relationships.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["seo_Incident_CallId", "seo_Incident_UnitId", "seo_Incident_UnitId_2"]
    );
    assert_eq!(relationships[2].referencing_attribute, "unitid");
    assert_eq!(diags.with_code(DiagnosticCode::RelationshipRenamed).len(), 1);

    let specs = SpecSet {
        tables,
        ..SpecSet::default()
    };
    let xml =
        generate_customizations_xml_string(&specs, &project(), &mut Diagnostics::new()).unwrap();
    assert!(xml.contains(r#"<EntityRelationship Name="seo_Incident_UnitId">"#));
    assert!(xml.contains(r#"<EntityRelationship Name="seo_Incident_UnitId_2">"#));
}

#[test]
fn test_views_and_forms_without_a_table_are_reported() {
    let view: View = serde_json::from_value(json!({
        "schemaName": "seo_ActiveVehicles", "displayName": "Active Vehicles", "entity": "seo_Vehicle",
        "columns": [{ "name": "seo_Name" }]
    }))
    .unwrap();
    let form: Form = serde_json::from_value(json!({
        "schemaName": "seo_VehicleMain", "displayName": "Vehicle", "entity": "seo_Vehicle", "formType": "Main",
        "layout": { "tabs": [] }
    }))
    .unwrap();

    let specs = SpecSet {
        tables: vec![call()],
        views: vec![view],
        forms: vec![form],
        ..SpecSet::default()
    };
    let mut diags = Diagnostics::new();
    let xml = generate_customizations_xml_string(&specs, &project(), &mut diags).unwrap();

    assert!(!xml.contains("Active Vehicles"));
    let missing = diags.with_code(DiagnosticCode::EntityNotFound);
    let subjects: Vec<&str> = missing.iter().map(|d| d.subject.as_str()).collect();
    assert_eq!(subjects, vec!["view seo_ActiveVehicles", "form seo_VehicleMain"]);
}

#[test]
fn test_subgrid_single_lookup_resolves() {
    let tables = vec![call(), incident(false), unit()];
    let mut diags = Diagnostics::new();

    let name = resolve_subgrid_relationship(
        &subgrid("seo_call_incident"),
        &tables[0],
        &tables,
        &derive_relationships(&tables, "seo", &mut Diagnostics::new()),
        "seo",
        &mut diags,
    );

    assert_eq!(name, "seo_Incident_CallId");
    assert_eq!(diags.with_code(DiagnosticCode::RelationshipResolved).len(), 1);
}

#[test]
fn test_subgrid_ambiguous_lookups_use_naming_convention() {
    let tables = vec![call(), incident(true), unit()];
    let mut diags = Diagnostics::new();

    let name = resolve_subgrid_relationship(
        &subgrid("seo_call_incident"),
        &tables[0],
        &tables,
        &derive_relationships(&tables, "seo", &mut Diagnostics::new()),
        "seo",
        &mut diags,
    );

    assert_eq!(name, "seo_Incident_CallId");
    assert!(diags
        .with_code(DiagnosticCode::RelationshipUnresolved)
        .is_empty());
}

#[test]
fn test_subgrid_without_convention_match_keeps_declared_name() {
    let mut child = incident(true);
    // Neither lookup follows the `{prefix}_{parent}id` convention any more
    child.columns[1].schema_name = "seo_OriginalCall".to_string();
    let tables = vec![call(), child, unit()];
    let mut diags = Diagnostics::new();

    let name = resolve_subgrid_relationship(
        &subgrid("seo_call_incident"),
        &tables[0],
        &tables,
        &derive_relationships(&tables, "seo", &mut Diagnostics::new()),
        "seo",
        &mut diags,
    );

    assert_eq!(name, "seo_call_incident");
    assert_eq!(diags.with_code(DiagnosticCode::RelationshipUnresolved).len(), 1);
}

#[test]
fn test_generate_customizations_in_memory() {
    let view: View = serde_json::from_value(json!({
        "schemaName": "seo_TodaysCalls", "displayName": "Today's Calls", "entity": "seo_Call",
        "columns": [{ "name": "seo_Name" }],
        "filter": { "type": "and", "conditions": [
            { "column": "seo_ReceivedOn", "operator": "on-or-after", "value": 0 },
            { "column": "seo_Bogus", "operator": "eq", "value": 1 }
        ] }
    }))
    .unwrap();
    let form: Form = serde_json::from_value(json!({
        "schemaName": "seo_CallMain", "displayName": "Call", "entity": "seo_Call", "formType": "Main",
        "layout": { "tabs": [{ "name": "general", "label": "General", "sections": [{
            "name": "details", "label": "Details",
            "fields": [{ "name": "seo_Name" }, { "name": "seo_Ghost" }]
        }] }] }
    }))
    .unwrap();

    let specs = SpecSet {
        tables: vec![call(), incident(false), unit()],
        views: vec![view],
        forms: vec![form],
        ..SpecSet::default()
    };
    let mut diags = Diagnostics::new();
    let xml = generate_customizations_xml_string(&specs, &project(), &mut diags).unwrap();

    assert!(xml.contains(r#"<condition attribute="seo_receivedon" operator="today" />"#));
    assert!(!xml.contains("seo_bogus"));
    assert_eq!(diags.with_code(DiagnosticCode::FilterSkipped).len(), 1);
    assert_eq!(diags.with_code(DiagnosticCode::FormFieldUnknown).len(), 1);
    assert_eq!(xml.matches("<EntityRelationship ").count(), 2);
}

#[test]
fn test_generation_is_deterministic() {
    let specs = SpecSet {
        tables: vec![call(), incident(false), unit()],
        ..SpecSet::default()
    };

    let first =
        generate_customizations_xml_string(&specs, &project(), &mut Diagnostics::new()).unwrap();
    let second =
        generate_customizations_xml_string(&specs, &project(), &mut Diagnostics::new()).unwrap();
    assert_eq!(first, second);
}
