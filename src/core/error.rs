/// Driver Error Module
///
/// This module defines the fixed error taxonomy every driver adapter reports
/// through. Backend-specific failures are translated into these variants at
/// the adapter boundary, carrying the backend's native code and message.
use std::fmt;
use thiserror::Error;

/// Contract operations, used to name the operation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Disconnect,
    Query,
    AffectedRows,
    InsertId,
    Begin,
    Commit,
    Rollback,
    Format,
    ApplyLimit,
    RowCount,
    Fetch,
    Seek,
    Free,
    BuildMeta,
}

impl Operation {
    /// The contract name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Connect => "connect",
            Operation::Disconnect => "disconnect",
            Operation::Query => "query",
            Operation::AffectedRows => "affected_rows",
            Operation::InsertId => "insert_id",
            Operation::Begin => "begin",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
            Operation::Format => "format",
            Operation::ApplyLimit => "apply_limit",
            Operation::RowCount => "row_count",
            Operation::Fetch => "fetch",
            Operation::Seek => "seek",
            Operation::Free => "free",
            Operation::BuildMeta => "build_meta",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type shared by every driver adapter.
///
/// The variants split into three groups:
/// - backend failures (`Connection`, `Query`, `Transaction`), which a caller
///   may retry according to its own policy
/// - capability limits (`Unsupported`, `NotImplemented`), which are permanent
///   for a given adapter and must be worked around
/// - caller mistakes (`Configuration`, `InvalidArgument`, `InvalidState`)
#[derive(Error, Debug)]
pub enum DriverError {
    /// Invalid configuration or a backend that is not available in this build
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend refused or failed to open a session
    #[error("Connection error [{code}]: {message}")]
    Connection { code: i32, message: String },

    /// Statement execution failed
    #[error("Query error [{code}]: {message}\nSQL: {sql}")]
    Query {
        code: i32,
        message: String,
        sql: String,
    },

    /// begin, commit or rollback failed
    #[error("Transaction error [{code}]: {message}")]
    Transaction { code: i32, message: String },

    /// Structurally impossible on an unbuffered result set
    #[error("{operation} is not available for unbuffered result sets")]
    Unsupported { operation: Operation },

    /// Not supplied by this particular adapter
    #[error("{operation} is not implemented by the {driver} driver")]
    NotImplemented {
        driver: &'static str,
        operation: Operation,
    },

    /// An argument outside the accepted domain, e.g. an unknown semantic type
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The adapter was used out of order: no connection, or no live cursor
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File system and I/O errors while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DriverError {
    pub fn unsupported(operation: Operation) -> Self {
        DriverError::Unsupported { operation }
    }

    pub fn not_implemented(driver: &'static str, operation: Operation) -> Self {
        DriverError::NotImplemented { driver, operation }
    }

    pub fn not_connected() -> Self {
        DriverError::InvalidState("not connected".to_string())
    }

    /// Backend failures that a calling layer may choose to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::Connection { .. }
                | DriverError::Query { .. }
                | DriverError::Transaction { .. }
        )
    }

    /// Permanent capability gaps of the adapter.
    pub fn is_capability_limit(&self) -> bool {
        matches!(
            self,
            DriverError::Unsupported { .. } | DriverError::NotImplemented { .. }
        )
    }

    /// The backend's native error code, when the error came from the backend.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            DriverError::Connection { code, .. }
            | DriverError::Query { code, .. }
            | DriverError::Transaction { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Type alias for Result to use DriverError as the error type.
pub type Result<T> = std::result::Result<T, DriverError>;
