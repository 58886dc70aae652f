//! Shared naming helpers.

/// Convert a schema name to its logical (lowercase) name.
#[inline]
pub fn logical_name(schema_name: &str) -> String {
    schema_name.to_lowercase()
}

/// Strip the publisher prefix (`{prefix}_`) from a schema name.
///
/// Names without the prefix are returned unchanged, so the result never
/// carries a doubled prefix when recombined.
pub fn bare_name<'a>(schema_name: &'a str, prefix: &str) -> &'a str {
    let prefix_len = prefix.len() + 1;
    if schema_name.len() > prefix_len
        && schema_name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
        && schema_name.as_bytes()[prefix.len()] == b'_'
    {
        &schema_name[prefix_len..]
    } else {
        schema_name
    }
}
