//! Deterministic identifiers for generated sub-objects
//!
//! Forms, tabs, sections, cells and saved queries all need ids that stay the
//! same across rebuilds of an unchanged spec, so every id is derived from a
//! composite seed (`kind:entity:object[:subpart]`) rather than generated.

use std::fmt;

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A stable, content-addressed identifier in 8-4-4-4-12 GUID form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StableId(Uuid);

impl StableId {
    /// Render with surrounding braces, as the form and view documents expect
    pub fn braced(&self) -> String {
        format!("{{{}}}", self.0.hyphenated())
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Derive a stable id from a seed string
pub fn assign_id(seed: &str) -> StableId {
    let digest = Sha256::digest(seed.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    StableId(Uuid::from_bytes(bytes))
}

/// Derive a stable id from the parts of a composite seed, joined with `:`
pub fn seeded_id(kind: &str, parts: &[&str]) -> StableId {
    let mut seed = String::from(kind);
    for part in parts {
        seed.push(':');
        seed.push_str(part);
    }
    assign_id(&seed)
}
