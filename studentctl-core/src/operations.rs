//! Operation dispatch.
//!
//! [`run`] is the whole life of one invocation: resolve the operation name,
//! validate the fields it needs, make one store call, and release the store.
//! User mistakes come back as an [`Outcome`]; only store and configuration
//! failures are errors.

use crate::{
    Result,
    models::{FieldArgs, NationalId, NewStudent, Student},
    store::StudentStore,
    validation::FieldError,
};
use std::str::FromStr;
use thiserror::Error;

/// The five supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Print every record
    List,
    /// Print the record with a national identifier
    Lookup,
    /// Insert a record
    Create,
    /// Change name, class, and level of a record
    Update,
    /// Remove a record
    Delete,
}

impl Operation {
    /// All operations, in help order.
    pub const ALL: [Self; 5] = [
        Self::List,
        Self::Lookup,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    /// Canonical command-line name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Lookup => "lookup",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Older name still accepted on the command line.
    pub const fn alias(self) -> &'static str {
        match self {
            Self::List => "consulta",
            Self::Lookup => "rut",
            Self::Create => "nuevo",
            Self::Update => "editar",
            Self::Delete => "eliminar",
        }
    }

    /// Whether the operation needs all four fields rather than just the
    /// national identifier.
    pub const fn needs_all_fields(self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An operation name that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation '{0}' is not valid")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s || op.alias() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

/// What an invocation ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `list` found records
    Listed(Vec<Student>),
    /// `list` found nothing
    Empty,
    /// `lookup` found the record
    Found(Student),
    /// `create` stored the record
    Created(Student),
    /// `update` changed the record
    Updated(Student),
    /// `delete` removed the record
    Deleted(Student),
    /// No record carries the identifier
    NotFound {
        /// The identifier that was looked for
        national_id: String,
    },
    /// A field the operation needs was not given
    MissingFields {
        /// The operation that was attempted
        operation: Operation,
    },
    /// A field failed validation
    Invalid(FieldError),
    /// The operation name matched nothing
    UnknownOperation {
        /// The name as given, empty when none was given
        name: String,
    },
}

/// Runs one invocation against `store` and releases it.
///
/// The store is closed exactly once, whichever branch ran and whether or
/// not it failed. An unknown operation never touches the store.
///
/// # Errors
/// Returns the store error of the failed call.
pub async fn run<S>(
    store: &mut S,
    operation_name: Option<&str>,
    fields: &FieldArgs,
) -> Result<Outcome>
where
    S: StudentStore + ?Sized,
{
    let result = match operation_name.map(Operation::from_str) {
        Some(Ok(operation)) => execute(store, operation, fields).await,
        Some(Err(UnknownOperation(name))) => Ok(Outcome::UnknownOperation { name }),
        None => Ok(Outcome::UnknownOperation {
            name: String::new(),
        }),
    };

    store.close().await;
    result
}

/// Validates `fields` for `operation` and makes the store call.
///
/// # Errors
/// Returns the store error of the failed call.
pub async fn execute<S>(store: &mut S, operation: Operation, fields: &FieldArgs) -> Result<Outcome>
where
    S: StudentStore + ?Sized,
{
    tracing::debug!("Running {} on {}", operation, store.safe_description());

    let outcome = match operation {
        Operation::List => {
            let records = store.list().await?;
            tracing::debug!("Fetched {} records", records.len());
            if records.is_empty() {
                Outcome::Empty
            } else {
                Outcome::Listed(records)
            }
        }
        Operation::Lookup => {
            let national_id = match national_id_for(operation, fields) {
                Ok(national_id) => national_id,
                Err(outcome) => return Ok(outcome),
            };
            match store.find(&national_id).await? {
                Some(student) => Outcome::Found(student),
                None => not_found(&national_id),
            }
        }
        Operation::Create => {
            let student = match student_for(operation, fields) {
                Ok(student) => student,
                Err(outcome) => return Ok(outcome),
            };
            Outcome::Created(store.insert(&student).await?)
        }
        Operation::Update => {
            let student = match student_for(operation, fields) {
                Ok(student) => student,
                Err(outcome) => return Ok(outcome),
            };
            match store.update(&student).await? {
                Some(updated) => Outcome::Updated(updated),
                None => not_found(student.national_id()),
            }
        }
        Operation::Delete => {
            let national_id = match national_id_for(operation, fields) {
                Ok(national_id) => national_id,
                Err(outcome) => return Ok(outcome),
            };
            match store.delete(&national_id).await? {
                Some(deleted) => Outcome::Deleted(deleted),
                None => not_found(&national_id),
            }
        }
    };

    Ok(outcome)
}

fn national_id_for(
    operation: Operation,
    fields: &FieldArgs,
) -> std::result::Result<NationalId, Outcome> {
    let raw = fields
        .national_id()
        .ok_or(Outcome::MissingFields { operation })?;
    NationalId::parse(raw).map_err(Outcome::Invalid)
}

fn student_for(
    operation: Operation,
    fields: &FieldArgs,
) -> std::result::Result<NewStudent, Outcome> {
    let (name, national_id, class_name, level) = fields
        .all()
        .ok_or(Outcome::MissingFields { operation })?;
    NewStudent::new(name, national_id, class_name, level).map_err(Outcome::Invalid)
}

fn not_found(national_id: &NationalId) -> Outcome {
    tracing::debug!("No record with national id {}", national_id);
    Outcome::NotFound {
        national_id: national_id.to_string(),
    }
}
