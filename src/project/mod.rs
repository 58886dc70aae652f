//! Solution project manifest and spec tree reading

mod solution_project;
mod spec_reader;

pub use solution_project::{parse_solution_project, Publisher, SolutionProject};
pub use spec_reader::read_specs;
