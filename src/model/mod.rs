//! In-memory data model read from the JSON specs

mod elements;
mod forms;
mod spec_set;
mod views;

pub use elements::*;
pub use forms::*;
pub use spec_set::SpecSet;
pub use views::*;
