//! Error types with a fixed store-failure taxonomy.
//!
//! Store failures are reduced to a small set of kinds, each rendered from a
//! message template that names the configuration value most likely at fault.
//! Passwords are never part of any rendered message.

use crate::config::StoreConfig;
use std::io;
use thiserror::Error;

/// Main error type for studentctl operations.
#[derive(Debug, Error)]
pub enum StudentError {
    /// Configuration could not be built from the environment
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// The store rejected or failed a request
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for Results with StudentError
pub type Result<T> = std::result::Result<T, StudentError>;

impl StudentError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Who is at fault for this error.
    ///
    /// Configuration problems are always the operator's to fix.
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Configuration { .. } => Severity::ClientFault,
            Self::Store(error) => error.severity(),
        }
    }
}

/// Fault classification of a failure, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Bad credentials, names, or settings supplied by the operator
    ClientFault,
    /// Unreachable host or port, or an unexpected store failure
    ServerFault,
}

impl Severity {
    /// Process exit code for this severity.
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::ClientFault => 2,
            Self::ServerFault => 1,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientFault => write!(f, "client fault"),
            Self::ServerFault => write!(f, "server fault"),
        }
    }
}

/// Kinds of store failure the tool knows how to explain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Wrong password or unknown role
    AuthFailure,
    /// The configured table does not exist
    UndefinedTable,
    /// The configured database does not exist
    UndefinedDatabase,
    /// The configured host name does not resolve
    HostNotFound,
    /// Nothing is listening on the configured port
    ConnectionRefused,
    /// Anything else
    Other,
}

impl StoreErrorKind {
    /// Maps a PostgreSQL SQLSTATE code to a known kind.
    ///
    /// Returns `None` for codes outside the taxonomy.
    pub fn from_sqlstate(code: &str) -> Option<Self> {
        match code {
            // invalid_password, invalid_authorization_specification
            "28P01" | "28000" => Some(Self::AuthFailure),
            // undefined_table
            "42P01" => Some(Self::UndefinedTable),
            // invalid_catalog_name
            "3D000" => Some(Self::UndefinedDatabase),
            _ => None,
        }
    }

    /// Maps a socket-level error to a known kind.
    pub fn from_io(error: &io::Error) -> Option<Self> {
        if error.kind() == io::ErrorKind::ConnectionRefused {
            return Some(Self::ConnectionRefused);
        }
        if is_name_resolution_failure(error) {
            return Some(Self::HostNotFound);
        }
        None
    }

    /// Severity of this kind of failure.
    pub const fn severity(self) -> Severity {
        match self {
            Self::AuthFailure | Self::UndefinedTable | Self::UndefinedDatabase => {
                Severity::ClientFault
            }
            Self::HostNotFound | Self::ConnectionRefused | Self::Other => Severity::ServerFault,
        }
    }

    /// Renders the user-facing message for this kind.
    ///
    /// `detail` is only used by [`StoreErrorKind::Other`].
    pub fn describe(self, config: &StoreConfig, detail: &str) -> String {
        match self {
            Self::AuthFailure => format!(
                "authentication failed for user {}",
                display_or_unset(config.user.as_deref())
            ),
            Self::UndefinedTable => format!("table [{}] does not exist", config.table),
            Self::UndefinedDatabase => format!(
                "database [{}] does not exist",
                display_or_unset(config.database.as_deref())
            ),
            Self::HostNotFound => format!(
                "invalid host value: {}",
                display_or_unset(config.host.as_deref())
            ),
            Self::ConnectionRefused => format!(
                "connection error on port: {}",
                config
                    .port
                    .map_or_else(|| UNSET.to_string(), |p| p.to_string())
            ),
            Self::Other => format!("unknown error: {}", detail),
        }
    }
}

const UNSET: &str = "<unset>";

fn display_or_unset(value: Option<&str>) -> &str {
    value.unwrap_or(UNSET)
}

/// Name resolution failures surface as uncategorized I/O errors, so they
/// can only be told apart by the resolver's message.
fn is_name_resolution_failure(error: &io::Error) -> bool {
    let message = error.to_string();
    [
        "failed to lookup address",
        "Name or service not known",
        "nodename nor servname",
        "No such host is known",
        "Temporary failure in name resolution",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

/// A classified store failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Creates an error of `kind` with its message rendered from `config`.
    pub fn classified(kind: StoreErrorKind, config: &StoreConfig, detail: &str) -> Self {
        Self {
            kind,
            message: kind.describe(config, detail),
            source: None,
        }
    }

    /// Creates an unclassified error.
    pub fn other(detail: impl std::fmt::Display) -> Self {
        Self {
            kind: StoreErrorKind::Other,
            message: format!("unknown error: {}", detail),
            source: None,
        }
    }

    /// Attaches the underlying driver error.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// The failure kind.
    pub const fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// The failure severity.
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
