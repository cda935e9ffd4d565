//! Core data structures and store access for studentctl.
//!
//! This crate provides the student record model, the field validators, the
//! store configuration, and the `StudentStore` trait with its PostgreSQL and
//! in-memory implementations. The `studentctl` binary is a thin shell around
//! [`operations::run`].
//!
//! # Architecture
//! - Validation happens before any store access
//! - Every store call is a single statement; `update` and `delete` report
//!   absence through an empty `RETURNING` set
//! - Store failures are classified into a fixed taxonomy with a severity
//! - Credentials never appear in log lines or error messages

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod operations;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::StoreConfig;
pub use error::{Result, Severity, StoreError, StoreErrorKind, StudentError};
pub use logging::init_logging;
pub use models::{FieldArgs, NationalId, NewStudent, Student};
pub use operations::{Operation, Outcome};
pub use store::StudentStore;
pub use store::memory::MemoryStore;
#[cfg(feature = "postgresql")]
pub use store::postgres::PostgresStore;
pub use validation::FieldError;
