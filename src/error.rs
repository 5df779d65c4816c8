//! Structural precondition errors for the schema model.
//!
//! These are programmer errors: a bug in the caller (or in an upstream
//! schema loader) rather than a property of the schema being modeled.
//! Semantic schema problems (unsatisfiable foreign keys) are not
//! modeled as `Err` at all — see [`crate::planner::PlanResult::errors_1215`].

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SchemaError {
    #[error("{kind} `{name}` does not exist in table `{table}`")]
    NotFound {
        kind: &'static str,
        name: String,
        table: String,
    },

    #[error("{kind} `{name}` already exists in table `{table}`")]
    AlreadyExists {
        kind: &'static str,
        name: String,
        table: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
