//! The schema model and its test-construction helper.

pub mod builder;
pub mod types;

pub use types::*;
