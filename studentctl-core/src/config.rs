//! Store connection configuration.
//!
//! `StoreConfig` is built once at startup from the process environment and
//! passed by reference to the store and to the error formatter. Nothing
//! reads the environment after that.

use crate::error::{Result, StudentError};
use zeroize::Zeroizing;

/// Environment variable holding the database role name.
pub const ENV_USER: &str = "DB_USER";
/// Environment variable holding the database host.
pub const ENV_HOST: &str = "DB_HOST";
/// Environment variable holding the database name.
pub const ENV_DATABASE: &str = "DB_NAME";
/// Environment variable holding the database password.
pub const ENV_PASSWORD: &str = "DB_PASSWORD";
/// Environment variable holding the database port.
pub const ENV_PORT: &str = "DB_PORT";
/// Environment variable overriding the student table name.
pub const ENV_TABLE: &str = "DB_TABLE";

/// Table used when `DB_TABLE` is not set.
pub const DEFAULT_TABLE: &str = "estudiantes";

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Configuration for the student store.
///
/// Connection values left as `None` fall through to the database client's
/// own defaults; this type supplies none of its own.
///
/// # Security
/// The password is held in a `Zeroizing` container and is omitted from both
/// `Debug` and `Display` output.
///
/// # Example
/// ```rust
/// use studentctl_core::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_host("localhost".to_string())
///     .with_port(5432)
///     .with_database("school".to_string());
///
/// assert_eq!(config.to_string(), "StoreConfig(localhost:5432/school, table=estudiantes)");
/// ```
#[derive(Clone)]
pub struct StoreConfig {
    /// Database role name
    pub user: Option<String>,
    /// Database host address
    pub host: Option<String>,
    /// Database name
    pub database: Option<String>,
    /// Database port
    pub port: Option<u16>,
    /// Table holding the student records
    pub table: String,
    password: Option<Zeroizing<String>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            user: None,
            host: None,
            database: None,
            port: None,
            table: DEFAULT_TABLE.to_string(),
            password: None,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("port", &self.port)
            .field("table", &self.table)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

impl std::fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StoreConfig({}{}{}, table={})",
            self.host.as_deref().unwrap_or("<default host>"),
            self.port.map_or_else(String::new, |p| format!(":{}", p)),
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{}", db)),
            self.table
        )
        // Intentionally omit username and never include credentials
    }
}

impl StoreConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns a configuration error if `DB_PORT` is not a valid port or
    /// `DB_TABLE` is not a plain SQL identifier.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// Same as [`StoreConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = get(ENV_PORT).map(|raw| parse_port(&raw)).transpose()?;

        let table = match get(ENV_TABLE) {
            Some(table) => {
                validate_table_name(&table)?;
                table
            }
            None => DEFAULT_TABLE.to_string(),
        };

        Ok(Self {
            user: get(ENV_USER),
            host: get(ENV_HOST),
            database: get(ENV_DATABASE),
            port,
            table,
            password: get(ENV_PASSWORD).map(Zeroizing::new),
        })
    }

    /// Builder method to set the role name.
    #[must_use]
    pub fn with_user(mut self, user: String) -> Self {
        self.user = Some(user);
        self
    }

    /// Builder method to set the host.
    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = Some(host);
        self
    }

    /// Builder method to set the database name.
    #[must_use]
    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    /// Builder method to set the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set the password.
    #[must_use]
    pub fn with_password(mut self, password: String) -> Self {
        self.password = Some(Zeroizing::new(password));
        self
    }

    /// Builder method to set the table name.
    ///
    /// # Errors
    /// Returns a configuration error if `table` is not a plain SQL identifier.
    pub fn with_table(mut self, table: String) -> Result<Self> {
        validate_table_name(&table)?;
        self.table = table;
        Ok(self)
    }

    /// Checks if a password is present without exposing it.
    pub const fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.as_str())
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) => Err(StudentError::configuration(format!(
            "{} must be greater than 0",
            ENV_PORT
        ))),
        Ok(port) => Ok(port),
        Err(_) => Err(StudentError::configuration(format!(
            "{} must be a port number, got '{}'",
            ENV_PORT, raw
        ))),
    }
}

/// Checks that `table` can be spliced into statement text unquoted.
///
/// A letter or underscore first, then letters, digits, or underscores.
fn validate_table_name(table: &str) -> Result<()> {
    if table.len() > MAX_IDENTIFIER_LEN {
        return Err(StudentError::configuration(format!(
            "Table name too long: maximum {} characters",
            MAX_IDENTIFIER_LEN
        )));
    }

    let mut chars = table.chars();
    let Some(first) = chars.next() else {
        return Err(StudentError::configuration("Table name cannot be empty"));
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(StudentError::configuration(
            "Table name must start with a letter or underscore",
        ));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StudentError::configuration(
            "Table name contains invalid characters (only letters, digits, and underscores allowed)",
        ));
    }

    Ok(())
}
