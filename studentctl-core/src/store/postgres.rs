//! PostgreSQL student store.
//!
//! # Connection
//! - One connection per process, opened on the first query and released by
//!   `close`; an invocation that never reaches the store never connects
//! - Connection values left unset in `StoreConfig` fall back to the sqlx
//!   client defaults (`PG*` variables, then `localhost:5432`)
//!
//! # Statements
//! - All field values are bound parameters; only the validated table name
//!   is spliced into statement text
//! - `insert` and `update` bind one JSON object and expand it with
//!   `json_populate_record`, so each field is coerced to its column's own
//!   type (`nivel` may be text or an integer column)
//! - Rows come back through `row_to_json`, so columns beyond the four known
//!   ones are returned as well
//! - `update` and `delete` are single `... RETURNING *` statements: an empty
//!   result means the identifier was not present

use super::StudentStore;
use crate::{
    Result, StoreConfig,
    error::{StoreError, StoreErrorKind, StudentError},
    models::{NationalId, NewStudent, Student},
};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};

/// Statement text for one table.
#[derive(Debug, Clone)]
struct Statements {
    list: String,
    find: String,
    insert: String,
    update: String,
    delete: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            list: format!("SELECT row_to_json(t.*) FROM {table} t"),
            find: format!("SELECT row_to_json(t.*) FROM {table} t WHERE t.rut = $1"),
            insert: format!(
                "WITH inserted AS (\
                 INSERT INTO {table} (nombre, rut, curso, nivel) \
                 SELECT r.nombre, r.rut, r.curso, r.nivel \
                 FROM json_populate_record(NULL::{table}, $1::json) r \
                 RETURNING *\
                 ) SELECT row_to_json(inserted.*) FROM inserted"
            ),
            update: format!(
                "WITH updated AS (\
                 UPDATE {table} t SET nombre = r.nombre, curso = r.curso, nivel = r.nivel \
                 FROM json_populate_record(NULL::{table}, $1::json) r \
                 WHERE t.rut = r.rut \
                 RETURNING t.*\
                 ) SELECT row_to_json(updated.*) FROM updated"
            ),
            delete: format!(
                "WITH deleted AS (\
                 DELETE FROM {table} WHERE rut = $1 RETURNING *\
                 ) SELECT row_to_json(deleted.*) FROM deleted"
            ),
        }
    }
}

/// Student store backed by a single PostgreSQL connection.
pub struct PostgresStore {
    config: StoreConfig,
    options: PgConnectOptions,
    statements: Statements,
    connection: Option<PgConnection>,
}

impl PostgresStore {
    /// Creates a store for `config`. No connection is made until the first query.
    pub fn new(config: StoreConfig) -> Self {
        let options = Self::connect_options(&config);
        let statements = Statements::for_table(&config.table);
        Self {
            config,
            options,
            statements,
            connection: None,
        }
    }

    /// Builds client options, overriding the client defaults only where
    /// `config` has a value.
    pub fn connect_options(config: &StoreConfig) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .application_name(concat!("studentctl-", env!("CARGO_PKG_VERSION")))
            // Per-statement logs would interleave with user-facing errors on stderr
            .disable_statement_logging();

        if let Some(host) = &config.host {
            options = options.host(host);
        }
        if let Some(port) = config.port {
            options = options.port(port);
        }
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = config.password() {
            options = options.password(password);
        }
        if let Some(database) = &config.database {
            options = options.database(database);
        }

        options
    }

    /// Whether a connection is currently open.
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn connection(&mut self) -> Result<&mut PgConnection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                tracing::debug!("Connecting to {}", self.config);
                self.options
                    .connect()
                    .await
                    .map_err(|e| classify(e, &self.config))?
            }
        };
        Ok(self.connection.insert(connection))
    }

    async fn fetch_all(&mut self, sql: &str, binds: &[&str]) -> Result<Vec<Student>> {
        let connection = self.connection().await?;

        let mut query = sqlx::query_scalar::<_, JsonValue>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query.fetch_all(&mut *connection).await;

        rows.map_err(|e| classify(e, &self.config))?
            .into_iter()
            .map(|row| decode(row, &self.config))
            .collect()
    }

    /// Runs a write statement whose only parameter is the record as JSON.
    async fn write_record(&mut self, sql: &str, student: &NewStudent) -> Result<Option<Student>> {
        let record = serde_json::to_value(Student::from_new(student)).map_err(|e| {
            StudentError::from(StoreError::other(format!("cannot encode record: {}", e)))
        })?;
        let connection = self.connection().await?;

        let row = sqlx::query_scalar::<_, JsonValue>(sql)
            .bind(record)
            .fetch_optional(&mut *connection)
            .await;

        row.map_err(|e| classify(e, &self.config))?
            .map(|row| decode(row, &self.config))
            .transpose()
    }

    async fn fetch_optional(&mut self, sql: &str, binds: &[&str]) -> Result<Option<Student>> {
        let connection = self.connection().await?;

        let mut query = sqlx::query_scalar::<_, JsonValue>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let row = query.fetch_optional(&mut *connection).await;

        row.map_err(|e| classify(e, &self.config))?
            .map(|row| decode(row, &self.config))
            .transpose()
    }
}

#[async_trait]
impl StudentStore for PostgresStore {
    async fn list(&mut self) -> Result<Vec<Student>> {
        tracing::debug!("Listing rows of {}", self.config.table);
        let sql = self.statements.list.clone();
        self.fetch_all(&sql, &[]).await
    }

    async fn find(&mut self, national_id: &NationalId) -> Result<Option<Student>> {
        tracing::debug!("Looking up {} in {}", national_id, self.config.table);
        let sql = self.statements.find.clone();
        self.fetch_optional(&sql, &[national_id.as_str()]).await
    }

    async fn insert(&mut self, student: &NewStudent) -> Result<Student> {
        tracing::debug!(
            "Inserting {} into {}",
            student.national_id(),
            self.config.table
        );
        let sql = self.statements.insert.clone();
        self.write_record(&sql, student).await?.ok_or_else(|| {
            StoreError::other(format!(
                "insert into {} returned no row",
                self.config.table
            ))
            .into()
        })
    }

    async fn update(&mut self, student: &NewStudent) -> Result<Option<Student>> {
        tracing::debug!(
            "Updating {} in {}",
            student.national_id(),
            self.config.table
        );
        let sql = self.statements.update.clone();
        self.write_record(&sql, student).await
    }

    async fn delete(&mut self, national_id: &NationalId) -> Result<Option<Student>> {
        tracing::debug!("Deleting {} from {}", national_id, self.config.table);
        let sql = self.statements.delete.clone();
        self.fetch_optional(&sql, &[national_id.as_str()]).await
    }

    async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            tracing::debug!("Closing connection to {}", self.config);
            if let Err(e) = connection.close().await {
                tracing::warn!("Connection did not close cleanly: {}", e);
            }
        }
    }

    fn safe_description(&self) -> String {
        format!("PostgreSQL store (table {})", self.config.table)
    }
}

/// Reduces a driver error to the store-failure taxonomy.
pub fn classify(error: sqlx::Error, config: &StoreConfig) -> StudentError {
    let kind = match &error {
        sqlx::Error::Database(db_error) => db_error
            .code()
            .and_then(|code| StoreErrorKind::from_sqlstate(&code)),
        sqlx::Error::Io(io_error) => StoreErrorKind::from_io(io_error),
        _ => None,
    }
    .unwrap_or(StoreErrorKind::Other);

    StoreError::classified(kind, config, &error.to_string())
        .with_source(error)
        .into()
}

fn decode(row: JsonValue, config: &StoreConfig) -> Result<Student> {
    Student::from_row(row).map_err(|e| {
        StoreError::other(format!(
            "row of {} is not a student record: {}",
            config.table, e
        ))
        .with_source(e)
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_statements_use_table_and_lowercase_key() {
        let statements = Statements::for_table("alumnos");
        for sql in [
            &statements.list,
            &statements.find,
            &statements.insert,
            &statements.update,
            &statements.delete,
        ] {
            assert!(sql.contains("alumnos"), "{sql}");
            assert!(!sql.contains("Rut"), "{sql}");
        }
        assert!(statements.update.contains("WHERE t.rut = r.rut RETURNING t.*"));
        assert!(statements.delete.contains("WHERE rut = $1 RETURNING *"));
        assert!(!statements.update.contains("SELECT row_to_json(t.*)"));
    }

    #[test]
    fn test_writes_coerce_through_table_row_type() {
        let statements = Statements::for_table("alumnos");
        for sql in [&statements.insert, &statements.update] {
            assert!(
                sql.contains("json_populate_record(NULL::alumnos, $1::json) r"),
                "{sql}"
            );
            assert!(!sql.contains("$2"), "{sql}");
        }
    }

    #[test]
    fn test_write_payload_uses_column_names() {
        let student = NewStudent::new("Ana", "12.345.678-K", "Primero", "3").unwrap();
        let payload = serde_json::to_value(Student::from_new(&student)).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "nombre": "Ana",
                "rut": "12.345.678-K",
                "curso": "Primero",
                "nivel": "3",
            })
        );
    }

    #[test]
    fn test_new_store_is_lazy() {
        let store = PostgresStore::new(StoreConfig::default());
        assert!(!store.is_connected());
        assert!(store.safe_description().contains("estudiantes"));
    }

    #[test]
    fn test_connect_options_override_only_set_values() {
        let config = StoreConfig::default()
            .with_host("db.internal".to_string())
            .with_port(6543)
            .with_user("registrar".to_string())
            .with_database("school".to_string());
        let options = PostgresStore::connect_options(&config);

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "registrar");
        assert_eq!(options.get_database(), Some("school"));
    }

    #[test]
    fn test_classify_io_errors() {
        let config = StoreConfig::default()
            .with_host("nowhere.invalid".to_string())
            .with_port(5999);

        let refused = classify(
            sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused)),
            &config,
        );
        assert_eq!(refused.to_string(), "connection error on port: 5999");

        let lookup = classify(
            sqlx::Error::Io(io::Error::other(
                "failed to lookup address information: Name or service not known",
            )),
            &config,
        );
        assert_eq!(lookup.to_string(), "invalid host value: nowhere.invalid");

        let other = classify(sqlx::Error::RowNotFound, &config);
        assert!(other.to_string().starts_with("unknown error: "));
    }
}
