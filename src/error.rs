//! Error types for the fixture layer.
//!
//! Registry errors are configuration faults and surface when the schema is
//! built. Database errors carry the driver's SQLSTATE and a coarse
//! classification so tests can assert on constraint violations.

use thiserror::Error;

/// Coarse classification of a constraint violation reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
    Other,
}

impl From<sqlx::error::ErrorKind> for ViolationKind {
    fn from(kind: sqlx::error::ErrorKind) -> Self {
        match kind {
            sqlx::error::ErrorKind::UniqueViolation => Self::Unique,
            sqlx::error::ErrorKind::ForeignKeyViolation => Self::ForeignKey,
            sqlx::error::ErrorKind::CheckViolation => Self::Check,
            sqlx::error::ErrorKind::NotNullViolation => Self::NotNull,
            _ => Self::Other,
        }
    }
}

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Entity '{entity}' is already registered")]
    DuplicateEntity { entity: String },

    #[error("Invalid constraint on '{entity}': {message}")]
    InvalidConstraint { entity: String, message: String },

    #[error("Unknown entity: {entity}")]
    UnknownEntity { entity: String },

    #[error("Unknown column '{column}' on entity '{entity}'")]
    UnknownColumn { entity: String, column: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A pool handle the introspector has no accessor for.
    #[error("Unsupported pool kind: {kind}")]
    UnsupportedPoolKind { kind: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "23505" for a unique violation on PostgreSQL
        sql_state: Option<String>,
        violation: ViolationKind,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl FixtureError {
    pub fn duplicate_entity(entity: impl Into<String>) -> Self {
        Self::DuplicateEntity {
            entity: entity.into(),
        }
    }

    pub fn invalid_constraint(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
        }
    }

    pub fn unknown_column(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            entity: entity.into(),
            column: column.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_pool_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedPoolKind { kind: kind.into() }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        violation: ViolationKind,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            violation,
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// The constraint violation behind a database error, if any.
    pub fn violation(&self) -> Option<ViolationKind> {
        match self {
            Self::Database { violation, .. } if *violation != ViolationKind::Other => {
                Some(*violation)
            }
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.violation() == Some(ViolationKind::Unique)
    }

    pub fn is_check_violation(&self) -> bool {
        self.violation() == Some(ViolationKind::Check)
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.violation() == Some(ViolationKind::ForeignKey)
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Registry faults are raised while building the schema and are never recoverable.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEntity { .. } | Self::InvalidConstraint { .. } | Self::Config { .. }
        )
    }
}

/// Convert sqlx errors to FixtureError.
impl From<sqlx::Error> for FixtureError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => FixtureError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let violation = ViolationKind::from(db_err.kind());
                FixtureError::database(db_err.message(), code, violation)
            }
            sqlx::Error::RowNotFound => {
                FixtureError::database("No rows returned", None, ViolationKind::Other)
            }
            sqlx::Error::PoolTimedOut => FixtureError::connection(
                "Timed out acquiring a pooled connection",
                "Raise --acquire-timeout or --max-connections",
            ),
            sqlx::Error::PoolClosed => {
                FixtureError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => FixtureError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => FixtureError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                FixtureError::decode(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                FixtureError::decode(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => FixtureError::decode(source.to_string()),
            _ => FixtureError::database(
                format!("Unknown database error: {}", err),
                None,
                ViolationKind::Other,
            ),
        }
    }
}

impl From<serde_json::Error> for FixtureError {
    fn from(err: serde_json::Error) -> Self {
        FixtureError::decode(err.to_string())
    }
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;
