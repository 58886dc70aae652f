//! Integration tests for the solution package archive and manifest

use pretty_assertions::assert_eq;

use crate::common::{child_text, PackageInfo, TestContext};

#[test]
fn test_package_members_in_order() {
    let ctx = TestContext::with_fixture("emergency_response");
    let outcome = ctx.build_successfully();
    let info = PackageInfo::from_package(&outcome.archive_path).expect("Should read package");

    assert_eq!(
        info.members,
        vec!["[Content_Types].xml", "solution.xml", "customizations.xml"]
    );
    assert!(info
        .content_types_xml
        .as_deref()
        .unwrap()
        .contains(r#"ContentType="application/octet-stream""#));
}

#[test]
fn test_rebuild_is_byte_identical() {
    let ctx = TestContext::with_fixture("emergency_response");

    let first = ctx.build_successfully();
    let first_bytes = std::fs::read(&first.archive_path).unwrap();
    let second = ctx.build_successfully();
    let second_bytes = std::fs::read(&second.archive_path).unwrap();

    assert_eq!(first.archive_path, second.archive_path);
    assert!(
        first_bytes == second_bytes,
        "Rebuilding unchanged specs should produce an identical archive"
    );
}

#[test]
fn test_solution_manifest() {
    let ctx = TestContext::with_fixture("emergency_response");
    let outcome = ctx.build_successfully();
    let info = PackageInfo::from_package(&outcome.archive_path).unwrap();
    let doc = roxmltree::Document::parse(info.solution()).expect("solution.xml should parse");

    let root = doc.root_element();
    assert_eq!(root.attribute("SolutionPackageVersion"), Some("9.2"));
    assert_eq!(root.attribute("languagecode"), Some("1033"));

    let manifest = root.first_element_child().unwrap();
    assert_eq!(manifest.tag_name().name(), "SolutionManifest");
    assert_eq!(
        child_text(manifest, "UniqueName"),
        Some("EmergencyResponseCoordination")
    );
    assert_eq!(child_text(manifest, "Version"), Some("0.8.0.0"));
    assert_eq!(child_text(manifest, "Managed"), Some("0"));

    let publisher = manifest
        .children()
        .find(|n| n.has_tag_name("Publisher"))
        .unwrap();
    assert_eq!(child_text(publisher, "CustomizationPrefix"), Some("seo"));
    assert_eq!(
        child_text(publisher, "CustomizationOptionValuePrefix"),
        Some("10000")
    );

    let components: Vec<(&str, &str)> = doc
        .descendants()
        .filter(|n| n.has_tag_name("RootComponent"))
        .map(|c| {
            (
                c.attribute("type").unwrap_or_default(),
                c.attribute("schemaName").unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(
        components,
        vec![
            ("1", "seo_agency"),
            ("1", "seo_call"),
            ("1", "seo_incident"),
            ("1", "seo_unit"),
        ]
    );
}

#[test]
fn test_environment_variables_off_by_default() {
    let ctx = TestContext::with_fixture("emergency_response");
    let outcome = ctx.build_successfully();
    let info = PackageInfo::from_package(&outcome.archive_path).unwrap();

    assert!(!info.customizations().contains("environmentvariabledefinition"));
    assert!(!info.solution().contains(r#"type="380""#));
}

#[test]
fn test_environment_variables_emitted_when_enabled() {
    let ctx = TestContext::with_fixture("emergency_response");
    ctx.edit_json("solution.json", |project| {
        project["emitEnvironmentVariables"] = true.into();
    });

    let outcome = ctx.build_successfully();
    let info = PackageInfo::from_package(&outcome.archive_path).unwrap();

    let doc = roxmltree::Document::parse(info.customizations()).unwrap();
    let definition = doc
        .descendants()
        .find(|n| n.has_tag_name("environmentvariabledefinition"))
        .expect("definition emitted");
    assert_eq!(definition.attribute("schemaName"), Some("seo_DispatchEndpoint"));
    assert_eq!(child_text(definition, "type"), Some("100000000"));
    assert_eq!(
        child_text(definition, "defaultvalue"),
        Some("https://cad.example.gov/api")
    );

    // Definitions sit between the data providers and the languages
    let sequence: Vec<&str> = doc
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect();
    let position = |name: &str| sequence.iter().position(|s| *s == name).unwrap();
    assert!(position("EntityDataProviders") < position("environmentvariabledefinitions"));
    assert!(position("environmentvariablevalues") < position("Languages"));

    assert!(info
        .solution()
        .contains(r#"<RootComponent type="380" schemaName="seo_DispatchEndpoint" behavior="0" />"#));
}
