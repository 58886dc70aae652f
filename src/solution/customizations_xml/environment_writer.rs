//! Environment variable definition XML writing.
//!
//! Only written when the project enables environment variable emission.

use quick_xml::Writer;
use std::io::Write;

use crate::model::EnvironmentVariable;

use super::xml_helpers::{end_element, start_element, write_element, write_empty, write_empty_with};

/// Write `<environmentvariabledefinitions>` followed by an empty
/// `<environmentvariablevalues />`.
pub(crate) fn write_environment_variables<W: Write>(
    writer: &mut Writer<W>,
    variables: &[EnvironmentVariable],
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    start_element(writer, "environmentvariabledefinitions", &[])?;
    for variable in variables {
        write_definition(writer, variable, version, language)?;
    }
    end_element(writer, "environmentvariabledefinitions")?;
    write_empty(writer, "environmentvariablevalues")?;
    Ok(())
}

fn write_definition<W: Write>(
    writer: &mut Writer<W>,
    variable: &EnvironmentVariable,
    version: &str,
    language: &str,
) -> anyhow::Result<()> {
    start_element(
        writer,
        "environmentvariabledefinition",
        &[("schemaName", variable.schema_name.as_str())],
    )?;
    write_empty_with(
        writer,
        "displayname",
        &[
            ("languagecode", language),
            ("description", variable.display_name.as_str()),
        ],
    )?;
    write_empty_with(
        writer,
        "description",
        &[
            ("languagecode", language),
            ("description", variable.description.as_str()),
        ],
    )?;
    write_element(writer, "type", &variable.kind.type_code().to_string())?;
    write_element(writer, "IsCustomizable", "1")?;
    write_element(writer, "IsRequired", "0")?;
    write_element(writer, "IntroducedVersion", version)?;
    if let Some(default) = variable.default_value.as_deref().filter(|v| !v.is_empty()) {
        write_element(writer, "defaultvalue", default)?;
    }
    end_element(writer, "environmentvariabledefinition")?;
    Ok(())
}
