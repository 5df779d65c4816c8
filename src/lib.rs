//! migrate-plan: MySQL schema migration planner
//!
//! Given a source and target declarative schema, computes an ordered
//! list of DDL operations that transforms the source into the target
//! without ever violating foreign-key referential integrity (MySQL
//! error 1215) at any intermediate state.

pub mod config;
pub mod differ;
pub mod error;
pub mod operation;
pub mod planner;
pub mod schema;
pub mod schema_file;

pub use config::Config;
pub use error::SchemaError;
pub use operation::{AlterAction, Operation};
pub use planner::{plan, PlanResult};
pub use schema::{Column, Constraint, Database, Index, IndexKind, ReferentialAction, Table};
