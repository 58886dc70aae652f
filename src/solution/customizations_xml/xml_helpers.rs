//! Low-level XML writing utilities for customizations.xml generation.
//!
//! These are the building blocks shared by the entity, attribute, view and
//! form writers: simple text elements, nil elements, and the localized
//! label containers the import format repeats everywhere.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Write a simple text element.
///
/// Generates: `<name>value</name>` (an empty value still yields an open/close pair)
pub(crate) fn write_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Write a text element for a boolean flag rendered as `1`/`0`.
pub(crate) fn write_flag<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: bool,
) -> anyhow::Result<()> {
    write_element(writer, name, if value { "1" } else { "0" })
}

/// Write a self-closing element with no attributes.
///
/// Generates: `<name />`
pub(crate) fn write_empty<W: Write>(writer: &mut Writer<W>, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::Empty(BytesStart::new(name)))?;
    Ok(())
}

/// Write an explicitly nil element.
///
/// Generates: `<name xsi:nil="true"></name>`
pub(crate) fn write_nil_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
) -> anyhow::Result<()> {
    let elem = BytesStart::new(name).with_attributes([("xsi:nil", "true")]);
    writer.write_event(Event::Start(elem))?;
    writer.write_event(Event::Text(BytesText::new("")))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Open an element with attributes.
pub(crate) fn start_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    attributes: &[(&str, &str)],
) -> anyhow::Result<()> {
    let elem = BytesStart::new(name).with_attributes(attributes.iter().copied());
    writer.write_event(Event::Start(elem))?;
    Ok(())
}

/// Close an element.
pub(crate) fn end_element<W: Write>(writer: &mut Writer<W>, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Write a self-closing element with attributes.
pub(crate) fn write_empty_with<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    attributes: &[(&str, &str)],
) -> anyhow::Result<()> {
    let elem = BytesStart::new(name).with_attributes(attributes.iter().copied());
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

/// Write a localized description container.
///
/// Generates:
/// ```xml
/// <container>
///   <item description="text" languagecode="1033" />
/// </container>
/// ```
pub(crate) fn write_localized<W: Write>(
    writer: &mut Writer<W>,
    container: &str,
    item: &str,
    description: &str,
    language: &str,
) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(container)))?;
    write_empty_with(
        writer,
        item,
        &[("description", description), ("languagecode", language)],
    )?;
    writer.write_event(Event::End(BytesEnd::new(container)))?;
    Ok(())
}

/// Write a `<labels><label .../></labels>` block used by form and option elements.
pub(crate) fn write_labels<W: Write>(
    writer: &mut Writer<W>,
    description: &str,
    language: &str,
) -> anyhow::Result<()> {
    write_localized(writer, "labels", "label", description, language)
}
