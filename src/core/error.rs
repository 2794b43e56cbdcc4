//! Error types for the persistence layer
//!
//! One flat error enum covers the three failure families: configuration
//! problems (fatal at store construction), caller contract violations
//! (always surfaced as `Err`), and operation failures (rolled back and
//! logged by the store, or surfaced by the engine).

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for store and engine operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Missing or unreadable configuration, unrecognized driver kind,
    /// missing credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller broke an API contract (unregistered type, mismatched
    /// builder terminal)
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A row is missing a field the entity requires
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Row value did not convert to the expected field type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Engine operation exceeded its time budget
    #[error("Operation timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        StoreError::Configuration(msg.into())
    }

    /// Create a contract violation error
    pub fn contract<S: Into<String>>(msg: S) -> Self {
        StoreError::Contract(msg.into())
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        StoreError::Connection(msg.into())
    }

    /// Create a query error
    pub fn query<S: Into<String>>(msg: S) -> Self {
        StoreError::Query(msg.into())
    }

    /// Create a transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        StoreError::Transaction(msg.into())
    }

    /// Create a missing field error
    pub fn missing_field<S: Into<String>>(field: S) -> Self {
        StoreError::MissingField(field.into())
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        StoreError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        StoreError::Timeout { timeout_ms }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        StoreError::Other(msg.into())
    }

    /// True for errors the store treats as fatal configuration problems
    pub fn is_configuration(&self) -> bool {
        matches!(self, StoreError::Configuration(_))
    }

    /// True for caller contract violations
    pub fn is_contract(&self) -> bool {
        matches!(self, StoreError::Contract(_))
    }
}
