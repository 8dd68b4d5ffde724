//! Directive parser: typed interactive components from directive segments.

mod body;
pub mod parser;
mod template;
pub mod types;

pub use parser::{parse, TEST_CASE_TAGS};
pub use types::*;
