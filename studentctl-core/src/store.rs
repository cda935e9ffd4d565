//! Store trait for student records.
//!
//! Every method is a single round-trip. `update` and `delete` return
//! `Ok(None)` when no row carries the identifier; absence is never an error.

use crate::{
    Result,
    models::{NationalId, NewStudent, Student},
};
use async_trait::async_trait;

pub mod memory;
#[cfg(feature = "postgresql")]
pub mod postgres;

/// Access to the student table.
///
/// Implementations hold at most one live connection, opened on first use
/// and released by [`StudentStore::close`].
#[async_trait]
pub trait StudentStore: Send {
    /// Fetches every record.
    ///
    /// # Errors
    /// Returns a store error if the query fails.
    async fn list(&mut self) -> Result<Vec<Student>>;

    /// Fetches the record with `national_id`, if any.
    ///
    /// # Errors
    /// Returns a store error if the query fails.
    async fn find(&mut self, national_id: &NationalId) -> Result<Option<Student>>;

    /// Inserts a record and returns it as stored, store-generated columns included.
    ///
    /// # Errors
    /// Returns a store error if the insert fails, including on a duplicate key.
    async fn insert(&mut self, student: &NewStudent) -> Result<Student>;

    /// Replaces name, class, and level of the record keyed by the student's
    /// national identifier.
    ///
    /// # Errors
    /// Returns a store error if the update fails.
    async fn update(&mut self, student: &NewStudent) -> Result<Option<Student>>;

    /// Deletes the record with `national_id` and returns what was removed.
    ///
    /// # Errors
    /// Returns a store error if the delete fails.
    async fn delete(&mut self, national_id: &NationalId) -> Result<Option<Student>>;

    /// Releases the connection. Calling it without an open connection is a no-op.
    async fn close(&mut self);

    /// Description safe for logs (no credentials).
    fn safe_description(&self) -> String;
}
