//! In-memory student store.
//!
//! Behaves like the PostgreSQL store for the purposes of dispatch: a serial
//! `id` column is generated on insert, the national identifier is unique,
//! and a failure of any classified kind can be injected.

use super::StudentStore;
use crate::{
    Result, StoreConfig,
    error::{StoreError, StoreErrorKind},
    models::{NationalId, NewStudent, Student},
};
use async_trait::async_trait;
use serde_json::Value;

/// Student store backed by a `Vec`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: StoreConfig,
    records: Vec<Student>,
    next_id: u64,
    failure: Option<StoreErrorKind>,
    round_trips: usize,
    closes: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose error messages render from `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Makes every subsequent call fail with `kind`.
    #[must_use]
    pub fn failing_with(mut self, kind: StoreErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Records currently held.
    pub fn records(&self) -> &[Student] {
        &self.records
    }

    /// Number of store calls made, failed ones included.
    pub const fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Number of times `close` was called.
    pub const fn closes(&self) -> usize {
        self.closes
    }

    fn begin(&mut self) -> Result<()> {
        self.round_trips = self.round_trips.saturating_add(1);
        match self.failure {
            Some(kind) => {
                Err(StoreError::classified(kind, &self.config, "injected failure").into())
            }
            None => Ok(()),
        }
    }

    fn position(&self, national_id: &NationalId) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.national_id == national_id.as_str())
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn list(&mut self) -> Result<Vec<Student>> {
        self.begin()?;
        Ok(self.records.clone())
    }

    async fn find(&mut self, national_id: &NationalId) -> Result<Option<Student>> {
        self.begin()?;
        Ok(self.position(national_id).map(|i| self.records[i].clone()))
    }

    async fn insert(&mut self, student: &NewStudent) -> Result<Student> {
        self.begin()?;
        if self.position(student.national_id()).is_some() {
            return Err(StoreError::other(format!(
                "duplicate key value violates unique constraint \"{}_rut_key\"",
                self.config.table
            ))
            .into());
        }

        self.next_id = self.next_id.saturating_add(1);
        let mut record = Student::from_new(student);
        record
            .extra
            .insert("id".to_string(), Value::from(self.next_id));
        self.records.push(record.clone());
        Ok(record)
    }

    async fn update(&mut self, student: &NewStudent) -> Result<Option<Student>> {
        self.begin()?;
        let Some(index) = self.position(student.national_id()) else {
            return Ok(None);
        };

        let record = &mut self.records[index];
        record.name = student.name().to_string();
        record.class_name = student.class_name().to_string();
        record.level = student.level().to_string();
        Ok(Some(record.clone()))
    }

    async fn delete(&mut self, national_id: &NationalId) -> Result<Option<Student>> {
        self.begin()?;
        Ok(self
            .position(national_id)
            .map(|index| self.records.remove(index)))
    }

    async fn close(&mut self) {
        self.closes = self.closes.saturating_add(1);
    }

    fn safe_description(&self) -> String {
        format!("in-memory store (table {})", self.config.table)
    }
}
