//! System form XML writing (FormXml block of an entity).
//!
//! Main forms walk tabs, sections, fields and subgrids; quick create forms
//! wrap their flat section list in one synthetic tab. Sections always have a
//! single column, so every field and subgrid gets its own row.

use quick_xml::Writer;
use std::io::Write;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{ColumnType, Form, FormField, FormKind, FormSection, Subgrid, Table};
use crate::solution::collision::{effective_column_name, EffectiveNames};
use crate::solution::identity::seeded_id;
use crate::util::{bare_name, logical_name};

use super::relationship_writer::{relationship_name, RelationshipRecord};
use super::TableContext;
use super::xml_helpers::{
    end_element, start_element, write_element, write_empty_with, write_labels, write_localized,
};

pub const CLASSID_STANDARD: &str = "{4273EDBD-AC1D-40d3-9FB2-095C621B552D}";
pub const CLASSID_LOOKUP: &str = "{270BD3DB-D9AF-4782-9025-509E298DEC0A}";
pub const CLASSID_SUBGRID: &str = "{E7A81278-8635-4D9E-8D4D-59480B391C5B}";

/// Number of empty cells in the footer block
const FOOTER_CELLS: usize = 3;

/// Rows a subgrid spans: half its page size, at least two
pub fn subgrid_rowspan(max_rows: u32) -> u32 {
    max_rows.div_ceil(2).max(2)
}

/// Control class for a field, chosen by the type of the column it binds to
pub fn control_class_id(table: &Table, names: &EffectiveNames, effective: &str) -> &'static str {
    match names.column_for(table, effective).map(|c| &c.kind) {
        Some(ColumnType::Lookup { .. }) => CLASSID_LOOKUP,
        _ => CLASSID_STANDARD,
    }
}

/// Resolve the relationship a subgrid on `parent` should bind to.
///
/// When the child table has exactly one lookup back to the parent, its
/// derived relationship wins. With several, the lookup named
/// `{prefix}_{parentBare}id` wins. Otherwise the declared name is kept and a
/// warning recorded.
///
/// The returned name is the one recorded in `relationships` for the chosen
/// lookup, so a name made unique during derivation is used here as well.
pub fn resolve_subgrid_relationship(
    subgrid: &Subgrid,
    parent: &Table,
    tables: &[Table],
    relationships: &[RelationshipRecord],
    prefix: &str,
    diagnostics: &mut Diagnostics,
) -> String {
    let subject = format!("{}.{}", parent.logical_name(), subgrid.name);

    let Some(child) = tables
        .iter()
        .find(|t| t.schema_name.eq_ignore_ascii_case(&subgrid.entity))
    else {
        diagnostics.warn(
            DiagnosticCode::RelationshipUnresolved,
            subject,
            format!(
                "target table {} not found, keeping {}",
                subgrid.entity, subgrid.relationship
            ),
        );
        return subgrid.relationship.clone();
    };

    let parent_logical = parent.logical_name();
    let lookups: Vec<_> = child.lookups_to(&parent_logical).collect();

    let resolved = if lookups.len() == 1 {
        Some(lookups[0])
    } else {
        let expected_fk = logical_name(&format!(
            "{}_{}id",
            prefix,
            bare_name(&parent.schema_name, prefix)
        ));
        lookups.into_iter().find(|c| c.logical_name() == expected_fk)
    };

    match resolved {
        Some(lookup) => {
            let child_entity = child.logical_name();
            let attribute = effective_column_name(lookup, &child_entity);
            let name = relationships
                .iter()
                .find(|r| {
                    r.referencing_entity == child_entity && r.referencing_attribute == attribute
                })
                .map(|r| r.name.clone())
                .unwrap_or_else(|| {
                    relationship_name(prefix, &child.schema_name, &lookup.schema_name)
                });
            if name != subgrid.relationship {
                diagnostics.info(
                    DiagnosticCode::RelationshipResolved,
                    subject,
                    format!("{} -> {}", subgrid.relationship, name),
                );
            }
            name
        }
        None => {
            diagnostics.warn(
                DiagnosticCode::RelationshipUnresolved,
                subject,
                format!(
                    "no unambiguous lookup from {} to {}, keeping {}",
                    child.logical_name(),
                    parent_logical,
                    subgrid.relationship
                ),
            );
            subgrid.relationship.clone()
        }
    }
}

/// Write the `<FormXml>` block: main forms first, then quick create forms.
pub(crate) fn write_form_xml<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    forms: &[&Form],
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    start_element(writer, "FormXml", &[])?;

    for (kind, type_attr) in [(FormKind::Main, "main"), (FormKind::QuickCreate, "quick")] {
        let group: Vec<&Form> = forms.iter().copied().filter(|f| f.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        start_element(writer, "forms", &[("type", type_attr)])?;
        for form in group {
            write_system_form(writer, ctx, form, diagnostics)?;
        }
        end_element(writer, "forms")?;
    }

    end_element(writer, "FormXml")?;
    Ok(())
}

fn write_system_form<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let entity = ctx.entity();
    let form_id = seeded_id("form", &[entity, &form.schema_name]);

    start_element(writer, "systemform", &[])?;
    write_element(writer, "formid", &form_id.braced())?;
    write_element(writer, "IntroducedVersion", ctx.version)?;
    write_element(writer, "FormPresentation", "1")?;
    write_element(writer, "FormActivationState", "1")?;

    match form.kind {
        FormKind::Main => write_main_form_body(writer, ctx, form, diagnostics)?,
        FormKind::QuickCreate => write_quick_create_body(writer, ctx, form, diagnostics)?,
    }

    write_element(writer, "IsCustomizable", "1")?;
    write_element(writer, "CanBeDeleted", "1")?;
    write_localized(
        writer,
        "LocalizedNames",
        "LocalizedName",
        &form.display_name,
        ctx.language,
    )?;
    if let Some(description) = form.description.as_deref().filter(|d| !d.is_empty()) {
        write_localized(writer, "Descriptions", "Description", description, ctx.language)?;
    }
    end_element(writer, "systemform")?;
    Ok(())
}

fn write_main_form_body<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let entity = ctx.entity();
    start_element(writer, "form", &[("headerdensity", "HighWithControls")])?;

    start_element(writer, "tabs", &[])?;
    for tab in &form.layout.tabs {
        let tab_id = seeded_id("tab", &[entity, &form.schema_name, &tab.name]).braced();
        start_element(
            writer,
            "tab",
            &[
                ("verticallayout", "true"),
                ("id", tab_id.as_str()),
                ("IsUserDefined", "1"),
                ("showlabel", "true"),
                ("expanded", "true"),
            ],
        )?;
        write_labels(writer, &tab.label, ctx.language)?;
        write_tab_sections(writer, ctx, form, &tab.sections, diagnostics)?;
        end_element(writer, "tab")?;
    }
    end_element(writer, "tabs")?;

    if !form.header.is_empty() {
        write_header(writer, ctx, form, diagnostics)?;
    }
    write_footer(writer, ctx, form)?;

    end_element(writer, "form")?;
    Ok(())
}

fn write_quick_create_body<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let tab_id = seeded_id("tab", &[ctx.entity(), &form.schema_name, "quicktab"]).braced();

    start_element(writer, "form", &[])?;
    start_element(writer, "tabs", &[])?;
    start_element(
        writer,
        "tab",
        &[
            ("verticallayout", "true"),
            ("id", tab_id.as_str()),
            ("IsUserDefined", "1"),
        ],
    )?;
    write_labels(writer, "", ctx.language)?;
    write_tab_sections(writer, ctx, form, &form.layout.sections, diagnostics)?;
    end_element(writer, "tab")?;
    end_element(writer, "tabs")?;
    end_element(writer, "form")?;
    Ok(())
}

/// `<columns><column width="100%"><sections>...` wrapper shared by both form kinds
fn write_tab_sections<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    sections: &[FormSection],
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    start_element(writer, "columns", &[])?;
    start_element(writer, "column", &[("width", "100%")])?;
    start_element(writer, "sections", &[])?;
    for section in sections {
        write_section(writer, ctx, form, section, diagnostics)?;
    }
    end_element(writer, "sections")?;
    end_element(writer, "column")?;
    end_element(writer, "columns")?;
    Ok(())
}

fn write_section<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    section: &FormSection,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let section_id =
        seeded_id("section", &[ctx.entity(), &form.schema_name, &section.name]).braced();
    start_element(
        writer,
        "section",
        &[
            ("showlabel", "true"),
            ("showbar", "false"),
            ("IsUserDefined", "0"),
            ("id", section_id.as_str()),
            ("columns", "1"),
        ],
    )?;
    write_labels(writer, &section.label, ctx.language)?;

    start_element(writer, "rows", &[])?;
    for field in &section.fields {
        start_element(writer, "row", &[])?;
        write_field_cell(writer, ctx, form, field, diagnostics)?;
        end_element(writer, "row")?;
    }
    for subgrid in &section.subgrids {
        start_element(writer, "row", &[])?;
        write_subgrid_cell(writer, ctx, form, subgrid, diagnostics)?;
        end_element(writer, "row")?;
    }
    end_element(writer, "rows")?;

    end_element(writer, "section")?;
    Ok(())
}

/// A field reference resolved against the owning table
struct BoundField {
    effective: String,
    label: String,
    class_id: &'static str,
}

fn bind_field(ctx: &TableContext, field: &FormField, diagnostics: &mut Diagnostics) -> BoundField {
    let effective = ctx.names.resolve(&field.name);
    if !ctx.valid.contains(&effective) {
        diagnostics.warn(
            DiagnosticCode::FormFieldUnknown,
            format!("{}.{}", ctx.entity(), field.name),
            "field is not a column of the table",
        );
    }

    let label = match field.label.as_deref() {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => ctx
            .names
            .column_for(ctx.table, &effective)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| field.name.clone()),
    };

    BoundField {
        class_id: control_class_id(ctx.table, ctx.names, &effective),
        effective,
        label,
    }
}

fn write_field_cell<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    field: &FormField,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let cell_id = seeded_id("cell", &[ctx.entity(), &form.schema_name, &field.name]).braced();
    let bound = bind_field(ctx, field, diagnostics);

    start_element(
        writer,
        "cell",
        &[("id", cell_id.as_str()), ("showlabel", "true")],
    )?;
    write_labels(writer, &bound.label, ctx.language)?;
    write_empty_with(
        writer,
        "control",
        &[
            ("id", bound.effective.as_str()),
            ("classid", bound.class_id),
            ("datafieldname", bound.effective.as_str()),
            ("disabled", if field.is_read_only { "true" } else { "false" }),
        ],
    )?;
    end_element(writer, "cell")?;
    Ok(())
}

fn write_subgrid_cell<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    subgrid: &Subgrid,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let cell_id =
        seeded_id("subgrid", &[ctx.entity(), &form.schema_name, &subgrid.name]).braced();
    let rowspan = subgrid_rowspan(subgrid.max_rows).to_string();
    let relationship =
        resolve_subgrid_relationship(
        subgrid,
        ctx.table,
        ctx.tables,
        ctx.relationships,
        ctx.prefix,
        diagnostics,
    );

    start_element(
        writer,
        "cell",
        &[
            ("id", cell_id.as_str()),
            ("rowspan", rowspan.as_str()),
            ("colspan", "1"),
            ("auto", "false"),
        ],
    )?;
    write_labels(writer, &subgrid.label, ctx.language)?;
    start_element(
        writer,
        "control",
        &[
            ("indicationOfSubgrid", "true"),
            ("id", subgrid.name.as_str()),
            ("classid", CLASSID_SUBGRID),
        ],
    )?;
    start_element(writer, "parameters", &[])?;
    write_element(writer, "RecordsPerPage", &subgrid.max_rows.to_string())?;
    write_element(writer, "AutoExpand", "Fixed")?;
    write_element(writer, "EnableQuickFind", "false")?;
    write_element(writer, "EnableViewPicker", "true")?;
    write_element(writer, "RelationshipName", &relationship)?;
    write_element(writer, "TargetEntityType", &logical_name(&subgrid.entity))?;
    end_element(writer, "parameters")?;
    end_element(writer, "control")?;
    end_element(writer, "cell")?;
    Ok(())
}

/// Header fields render as a single-column block outside any tab
fn write_header<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<()> {
    let entity = ctx.entity();
    let header_id = seeded_id("header", &[entity, &form.schema_name]).braced();
    start_element(
        writer,
        "header",
        &[
            ("id", header_id.as_str()),
            ("celllabelposition", "Top"),
            ("columns", "1"),
            ("labelwidth", "115"),
        ],
    )?;
    start_element(writer, "rows", &[])?;
    for field in &form.header {
        let cell_id =
            seeded_id("headercell", &[entity, &form.schema_name, &field.name]).braced();
        let bound = bind_field(ctx, field, diagnostics);

        start_element(writer, "row", &[])?;
        start_element(
            writer,
            "cell",
            &[("id", cell_id.as_str()), ("showlabel", "true")],
        )?;
        write_labels(writer, &bound.label, ctx.language)?;
        write_empty_with(
            writer,
            "control",
            &[
                ("id", bound.effective.as_str()),
                ("classid", bound.class_id),
                ("datafieldname", bound.effective.as_str()),
            ],
        )?;
        end_element(writer, "cell")?;
        end_element(writer, "row")?;
    }
    end_element(writer, "rows")?;
    end_element(writer, "header")?;
    Ok(())
}

/// Fixed three-cell empty footer
fn write_footer<W: Write>(
    writer: &mut Writer<W>,
    ctx: &TableContext,
    form: &Form,
) -> anyhow::Result<()> {
    let entity = ctx.entity();
    let footer_id = seeded_id("footer", &[entity, &form.schema_name]).braced();
    start_element(
        writer,
        "footer",
        &[
            ("id", footer_id.as_str()),
            ("celllabelposition", "Top"),
            ("columns", "111"),
            ("labelwidth", "115"),
            ("celllabelalignment", "Left"),
        ],
    )?;
    start_element(writer, "rows", &[])?;
    start_element(writer, "row", &[])?;
    for i in 0..FOOTER_CELLS {
        let index = i.to_string();
        let cell_id = seeded_id("footercell", &[entity, &form.schema_name, &index]).braced();
        start_element(
            writer,
            "cell",
            &[("id", cell_id.as_str()), ("showlabel", "false")],
        )?;
        write_labels(writer, "", ctx.language)?;
        end_element(writer, "cell")?;
    }
    end_element(writer, "row")?;
    end_element(writer, "rows")?;
    end_element(writer, "footer")?;
    Ok(())
}
