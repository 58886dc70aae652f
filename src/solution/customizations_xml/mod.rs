//! Generate customizations.xml for the solution package

mod attribute_writer;
mod entity_writer;
mod environment_writer;
mod form_writer;
mod registry;
mod relationship_writer;
mod view_writer;
pub(crate) mod xml_helpers;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::SolutionPackageError;
use crate::model::{SpecSet, Table};
use crate::project::SolutionProject;
use crate::solution::collision::EffectiveNames;

pub use attribute_writer::{
    serialize_column, AttributeFragment, OptionSetFragment, OptionSetKind, RequiredLevel,
};
pub use entity_writer::{assemble_entity, EntityDocument};
pub use form_writer::{
    control_class_id, resolve_subgrid_relationship, subgrid_rowspan, CLASSID_LOOKUP,
    CLASSID_STANDARD, CLASSID_SUBGRID,
};
pub use registry::{ChoiceRegistry, ChoiceValueIndex};
pub use relationship_writer::{
    derive_relationships, relationship_for, relationship_name, RelationshipRecord,
};
pub use view_writer::{
    compile_filter, compile_view, CompiledCondition, CompiledFilter, CompiledView,
    ConditionPayload, FetchQuery, LayoutGrid, ValidColumns,
};

use entity_writer::write_entity;
use environment_writer::write_environment_variables;
use relationship_writer::write_relationships;
use xml_helpers::{end_element, write_element, write_empty};

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Per-table state shared by the entity, form and view writers
pub(crate) struct TableContext<'a> {
    pub table: &'a Table,
    pub names: &'a EffectiveNames,
    pub valid: &'a ValidColumns,
    /// All tables of the build, for subgrid relationship resolution
    pub tables: &'a [Table],
    /// Every derived relationship, with final (unique) names
    pub relationships: &'a [RelationshipRecord],
    pub prefix: &'a str,
    pub version: &'a str,
    pub language: &'a str,
}

impl TableContext<'_> {
    fn entity(&self) -> &str {
        self.names.entity_logical()
    }
}

/// Warn about views and forms whose entity matches no table; they are never
/// emitted.
fn report_orphans(specs: &SpecSet, diagnostics: &mut Diagnostics) {
    let has_table = |entity: &str| {
        specs
            .tables
            .iter()
            .any(|t| t.schema_name.eq_ignore_ascii_case(entity))
    };

    for view in specs.views.iter().filter(|v| !has_table(&v.entity)) {
        diagnostics.warn(
            DiagnosticCode::EntityNotFound,
            format!("view {}", view.schema_name),
            format!("entity {} not found, view skipped", view.entity),
        );
    }
    for form in specs.forms.iter().filter(|f| !has_table(&f.entity)) {
        diagnostics.warn(
            DiagnosticCode::EntityNotFound,
            format!("form {}", form.schema_name),
            format!("entity {} not found, form skipped", form.entity),
        );
    }
}

pub fn generate_customizations_xml<W: Write>(
    writer: W,
    specs: &SpecSet,
    project: &SolutionProject,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let prefix = project.prefix();
    let version = project.version.as_str();
    let language = project.language();

    // Registries are built once per pass and handed to each stage
    let choices = ChoiceRegistry::new(&specs.global_choices);
    let names: Vec<EffectiveNames> = specs
        .tables
        .iter()
        .map(|t| EffectiveNames::for_table(t, diagnostics))
        .collect();
    let mut choice_values = ChoiceValueIndex::new();
    for (table, table_names) in specs.tables.iter().zip(&names) {
        choice_values.add_table(table, table_names, &choices);
    }
    report_orphans(specs, diagnostics);

    // Relationship names are fixed here so subgrids bind to the emitted ones
    let relationships = derive_relationships(&specs.tables, prefix, diagnostics);

    // Assemble every entity before writing so a fatal spec error leaves no
    // partial document behind
    let mut documents = Vec::with_capacity(specs.tables.len());
    for (table, table_names) in specs.tables.iter().zip(&names) {
        let forms = specs.forms_for(table);
        documents.push(assemble_entity(
            table,
            table_names,
            &choices,
            prefix,
            &forms,
            diagnostics,
        )?);
    }

    let mut xml_writer = Writer::new_with_indent(writer, b' ', 2);
    xml_writer.config_mut().add_space_before_slash_in_empty_elements = true;

    xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    let root = BytesStart::new("ImportExportXml").with_attributes([("xmlns:xsi", XSI_NAMESPACE)]);
    xml_writer.write_event(Event::Start(root))?;

    // Global choices are always inlined per column
    write_empty(&mut xml_writer, "optionsets")?;

    xml_writer.write_event(Event::Start(BytesStart::new("Entities")))?;
    for ((table, table_names), document) in specs.tables.iter().zip(&names).zip(&documents) {
        let valid = ValidColumns::for_table(table_names);
        let ctx = TableContext {
            table,
            names: table_names,
            valid: &valid,
            tables: &specs.tables,
            relationships: &relationships,
            prefix,
            version,
            language: &language,
        };

        let forms = specs.forms_for(table);
        let views: Vec<CompiledView> = specs
            .views_for(table)
            .into_iter()
            .map(|view| {
                compile_view(
                    view,
                    table,
                    table_names,
                    &valid,
                    &choice_values,
                    diagnostics,
                )
            })
            .collect();

        write_entity(&mut xml_writer, &ctx, document, &forms, &views, diagnostics)?;
    }
    end_element(&mut xml_writer, "Entities")?;

    write_element(&mut xml_writer, "Roles", "")?;
    write_element(&mut xml_writer, "Workflows", "")?;
    write_element(&mut xml_writer, "FieldSecurityProfiles", "")?;
    write_empty(&mut xml_writer, "Templates")?;
    write_empty(&mut xml_writer, "EntityMaps")?;

    write_relationships(&mut xml_writer, &relationships, version, &language)?;

    write_empty(&mut xml_writer, "OrganizationSettings")?;
    write_empty(&mut xml_writer, "CustomControls")?;
    write_empty(&mut xml_writer, "EntityDataProviders")?;

    if project.emit_environment_variables {
        write_environment_variables(
            &mut xml_writer,
            &specs.environment_variables,
            version,
            &language,
        )?;
    }

    xml_writer.write_event(Event::Start(BytesStart::new("Languages")))?;
    write_element(&mut xml_writer, "Language", &language)?;
    end_element(&mut xml_writer, "Languages")?;

    xml_writer.write_event(Event::End(BytesEnd::new("ImportExportXml")))?;
    Ok(())
}

/// Generate customizations.xml into a string
pub fn generate_customizations_xml_string(
    specs: &SpecSet,
    project: &SolutionProject,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    generate_customizations_xml(&mut buffer, specs, project, diagnostics)?;
    String::from_utf8(buffer).map_err(|e| {
        SolutionPackageError::XmlGenerationError {
            message: e.to_string(),
        }
        .into()
    })
}
