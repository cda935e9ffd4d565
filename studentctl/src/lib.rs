//! Command-line surface for studentctl.
//!
//! The binary parses one invocation, runs it against the store, prints the
//! outcome, and maps failures to an exit code. Everything here is written
//! against injected writers and a `StudentStore` so it can be exercised
//! without a database.

use clap::{Args, Parser};
use std::io::Write;
use studentctl_core::{
    FieldArgs, Operation, Outcome, PostgresStore, StoreConfig, Student, StudentError,
    StudentStore, operations,
};
use tracing::debug;

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "studentctl")]
#[command(about = "Manage student records in PostgreSQL")]
#[command(version)]
#[command(long_about = "
studentctl - list, look up, create, update, and delete student records

Connection settings come from the environment:
  DB_USER, DB_HOST, DB_NAME, DB_PASSWORD, DB_PORT
Unset values fall back to the PostgreSQL client defaults. DB_TABLE selects
the table (default: estudiantes).

OPERATIONS:
  list                                    Print every record
  lookup <RUT>                            Print one record
  create <NAME> <RUT> <CLASS> <LEVEL>     Insert a record
  update <NAME> <RUT> <CLASS> <LEVEL>     Change name, class, and level
  delete <RUT>                            Remove a record

lookup and delete take the identifier in the second position, so the name
slot is left empty:
  studentctl lookup '' 12.345.678-K

Flags go before the operation; field values may start with '-', and
arguments past the level are ignored.

EXAMPLES:
  studentctl list
  studentctl create Ana 123456789 Primero 1
  studentctl update AnaMaria 123456789 Primero 2
  studentctl delete '' 123456789
")]
pub struct Cli {
    /// Logging flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Operation to run
    #[arg(value_name = "OPERATION")]
    pub operation: Option<String>,

    /// Student name (letters only)
    #[arg(value_name = "NAME", allow_hyphen_values = true)]
    pub name: Option<String>,

    /// National identifier (digits, '.', ',', '-', 'K'; 9 to 12 characters)
    #[arg(value_name = "RUT", allow_hyphen_values = true)]
    pub national_id: Option<String>,

    /// Class name (letters only)
    #[arg(value_name = "CLASS", allow_hyphen_values = true)]
    pub class_name: Option<String>,

    /// Level (digits only)
    #[arg(value_name = "LEVEL", allow_hyphen_values = true)]
    pub level: Option<String>,

    /// Arguments past the level are accepted and ignored
    #[arg(
        hide = true,
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub ignored: Vec<String>,
}

/// Flags shared by every invocation.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

impl Cli {
    /// The positional field values.
    pub fn fields(&self) -> FieldArgs {
        FieldArgs {
            name: self.name.clone(),
            national_id: self.national_id.clone(),
            class_name: self.class_name.clone(),
            level: self.level.clone(),
        }
    }
}

/// Runs `cli` against the PostgreSQL store configured by the environment.
///
/// Returns the process exit code.
///
/// # Errors
/// Returns an error only if writing to stdout or stderr fails.
pub async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => return report_failure(&e, &mut std::io::stderr()),
    };

    debug!("Using {}", config);
    let mut store = PostgresStore::new(config);
    execute(cli, &mut store, &mut std::io::stdout(), &mut std::io::stderr()).await
}

/// Runs `cli` against `store`, printing results to `out` and failures to `err`.
///
/// Returns the process exit code: 0 for every outcome, including user input
/// mistakes, and the severity code of a store failure.
///
/// # Errors
/// Returns an error only if writing to `out` or `err` fails.
pub async fn execute<S, O, E>(
    cli: &Cli,
    store: &mut S,
    out: &mut O,
    err: &mut E,
) -> anyhow::Result<u8>
where
    S: StudentStore + ?Sized,
    O: Write,
    E: Write,
{
    let fields = fields_for_log(cli);
    debug!(
        "Invocation: operation={} {}",
        cli.operation.as_deref().unwrap_or("<none>"),
        fields
    );

    match operations::run(store, cli.operation.as_deref(), &cli.fields()).await {
        Ok(outcome) => {
            write_outcome(out, &outcome)?;
            Ok(0)
        }
        Err(e) => report_failure(&e, err),
    }
}

/// Prints the user-facing rendering of `outcome`.
///
/// # Errors
/// Returns an error if writing to `out` fails.
pub fn write_outcome<W: Write>(out: &mut W, outcome: &Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Listed(records) => {
            writeln!(out, "Current records:")?;
            serde_json::to_writer_pretty(&mut *out, records)?;
            writeln!(out)?;
        }
        Outcome::Empty => writeln!(out, "There are no records in the table yet")?,
        Outcome::Found(student) => write_record(out, student)?,
        Outcome::Created(student) => {
            writeln!(out, "Student {} created", student.name)?;
            write_record(out, student)?;
        }
        Outcome::Updated(student) => {
            writeln!(out, "Student {} updated", student.name)?;
            write_record(out, student)?;
        }
        Outcome::Deleted(student) => {
            writeln!(
                out,
                "Student record with national id {} deleted",
                student.national_id
            )?;
            write_record(out, student)?;
        }
        Outcome::NotFound { national_id } => {
            writeln!(
                out,
                "The record with national id {} does not exist",
                national_id
            )?;
        }
        Outcome::MissingFields { operation } if operation.needs_all_fields() => {
            writeln!(out, "Please provide name, national id, class and level")?;
        }
        Outcome::MissingFields { .. } => writeln!(out, "Please provide the national id")?,
        Outcome::Invalid(field) => writeln!(out, "Please enter valid data: {}", field)?,
        Outcome::UnknownOperation { name } => {
            if name.is_empty() {
                writeln!(out, "No operation given")?;
            } else {
                writeln!(out, "Operation '{}' is not valid", name)?;
            }
            writeln!(out, "Valid operations: {}", operation_names())?;
        }
    }

    Ok(())
}

fn write_record<W: Write>(out: &mut W, student: &Student) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, student)?;
    writeln!(out)?;
    Ok(())
}

fn report_failure<E: Write>(error: &StudentError, err: &mut E) -> anyhow::Result<u8> {
    let severity = error.severity();
    debug!("Operation failed ({}): {}", severity, error);
    writeln!(err, "Error: {}", error)?;
    Ok(severity.exit_code())
}

fn operation_names() -> String {
    Operation::ALL
        .iter()
        .map(|op| op.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn fields_for_log(cli: &Cli) -> String {
    format!(
        "name={:?} national_id={:?} class={:?} level={:?}",
        cli.name.as_deref().unwrap_or_default(),
        cli.national_id.as_deref().unwrap_or_default(),
        cli.class_name.as_deref().unwrap_or_default(),
        cli.level.as_deref().unwrap_or_default()
    )
}
