//! Solution package generation

pub mod checker;
pub mod collision;
pub mod customizations_xml;
pub mod identity;
mod packager;
mod solution_xml;

pub use checker::{
    run_verification, Finding, FindingSeverity, PacChecker, SolutionVerifier, VerificationReport,
    VerificationStatus,
};
pub use collision::{effective_column_name, resolve_collision, EffectiveNames};
pub use customizations_xml::{generate_customizations_xml, generate_customizations_xml_string};
pub use identity::{assign_id, seeded_id, StableId};
pub use packager::{create_solution_package, generate_documents, staging_dir, PACKAGE_MEMBERS};
pub use solution_xml::{generate_solution_xml, root_components, RootComponent};
