//! Generate solution.xml (the solution manifest)

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::model::SpecSet;
use crate::project::SolutionProject;

use super::customizations_xml::xml_helpers::{
    end_element, start_element, write_element, write_empty, write_empty_with, write_localized,
    write_nil_element,
};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const PACKAGE_VERSION: &str = "9.2.24.4";
const SOLUTION_PACKAGE_VERSION: &str = "9.2";

/// Root component type codes
const COMPONENT_ENTITY: &str = "1";
const COMPONENT_ENVIRONMENT_VARIABLE: &str = "380";

/// Address fields the importer expects as explicit nils
const ADDRESS_NIL_FIELDS: &[&str] = &[
    "AddressTypeCode",
    "City",
    "County",
    "Country",
    "Fax",
    "FreightTermsCode",
    "ImportSequenceNumber",
    "Latitude",
    "Line1",
    "Line2",
    "Line3",
    "Longitude",
    "Name",
    "PostalCode",
    "PostOfficeBox",
    "PrimaryContactName",
    "ShippingMethodCode",
    "StateOrProvince",
    "Telephone1",
    "Telephone2",
    "Telephone3",
    "TimeZoneRuleVersionNumber",
    "UPSZone",
    "UTCOffset",
    "UTCConversionTimeZoneCode",
];

/// A root component entry of the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootComponent {
    pub component_type: &'static str,
    pub schema_name: String,
}

/// Root components in manifest order: one entity per table, then one
/// environment variable per definition when those are emitted
pub fn root_components(specs: &SpecSet, project: &SolutionProject) -> Vec<RootComponent> {
    let mut components: Vec<RootComponent> = specs
        .tables
        .iter()
        .map(|t| RootComponent {
            component_type: COMPONENT_ENTITY,
            schema_name: t.logical_name(),
        })
        .collect();

    if project.emit_environment_variables {
        components.extend(
            specs
                .environment_variables
                .iter()
                .map(|v| RootComponent {
                    component_type: COMPONENT_ENVIRONMENT_VARIABLE,
                    schema_name: v.schema_name.clone(),
                }),
        );
    }
    components
}

pub fn generate_solution_xml<W: Write>(
    writer: W,
    specs: &SpecSet,
    project: &SolutionProject,
) -> anyhow::Result<()> {
    let language = project.language();
    let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);
    xml_writer
        .config_mut()
        .add_space_before_slash_in_empty_elements = true;

    xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let root = BytesStart::new("ImportExportXml").with_attributes([
        ("version", PACKAGE_VERSION),
        ("SolutionPackageVersion", SOLUTION_PACKAGE_VERSION),
        ("languagecode", language.as_str()),
        ("generatedBy", "CrmLive"),
        ("xmlns:xsi", XSI_NAMESPACE),
    ]);
    xml_writer.write_event(Event::Start(root))?;

    start_element(&mut xml_writer, "SolutionManifest", &[])?;
    write_element(&mut xml_writer, "UniqueName", &project.name)?;
    write_localized(
        &mut xml_writer,
        "LocalizedNames",
        "LocalizedName",
        &project.friendly_name,
        &language,
    )?;
    write_localized(
        &mut xml_writer,
        "Descriptions",
        "Description",
        &project.description,
        &language,
    )?;
    write_element(&mut xml_writer, "Version", &project.version)?;
    write_element(&mut xml_writer, "Managed", "0")?;

    write_publisher(&mut xml_writer, project, &language)?;

    start_element(&mut xml_writer, "RootComponents", &[])?;
    for component in root_components(specs, project) {
        write_empty_with(
            &mut xml_writer,
            "RootComponent",
            &[
                ("type", component.component_type),
                ("schemaName", component.schema_name.as_str()),
                ("behavior", "0"),
            ],
        )?;
    }
    end_element(&mut xml_writer, "RootComponents")?;
    write_empty(&mut xml_writer, "MissingDependencies")?;

    end_element(&mut xml_writer, "SolutionManifest")?;
    xml_writer.write_event(Event::End(BytesEnd::new("ImportExportXml")))?;
    Ok(())
}

fn write_publisher<W: Write>(
    writer: &mut Writer<W>,
    project: &SolutionProject,
    language: &str,
) -> anyhow::Result<()> {
    let publisher = &project.publisher;

    start_element(writer, "Publisher", &[])?;
    write_element(writer, "UniqueName", &publisher.unique_name)?;
    write_localized(
        writer,
        "LocalizedNames",
        "LocalizedName",
        &publisher.friendly_name,
        language,
    )?;
    write_localized(
        writer,
        "Descriptions",
        "Description",
        &publisher.description,
        language,
    )?;
    write_nil_element(writer, "EMailAddress")?;
    write_nil_element(writer, "SupportingWebsiteUrl")?;
    write_element(writer, "CustomizationPrefix", &publisher.prefix)?;
    write_element(
        writer,
        "CustomizationOptionValuePrefix",
        &publisher.option_value_prefix.to_string(),
    )?;

    start_element(writer, "Addresses", &[])?;
    for number in ["1", "2"] {
        start_element(writer, "Address", &[])?;
        write_element(writer, "AddressNumber", number)?;
        for field in ADDRESS_NIL_FIELDS {
            write_nil_element(writer, field)?;
        }
        end_element(writer, "Address")?;
    }
    end_element(writer, "Addresses")?;

    end_element(writer, "Publisher")?;
    Ok(())
}
