use thiserror::Error;

/// Unified error type for routing and executing TSDB queries
#[derive(Error, Debug)]
pub enum DataError {
    /// No plugin and no registered factory matches the data source type
    #[error("could not find plugin corresponding to data source type: {source_type:?}")]
    NotFound { source_type: String },

    /// The factory bound to the data source type refused to build an executor
    #[error("could not instantiate endpoint for TSDB plugin {source_type:?}: {source}")]
    Instantiation {
        source_type: String,
        #[source]
        source: Box<DataError>,
    },

    /// Invalid data source settings (malformed URL, bad json_data, etc.)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Credentials are missing or malformed
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Invalid query syntax or parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed on the backend
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Generic backend error; retryability is decided by the executor
    #[error("Backend error: {message}")]
    Backend { message: String, retryable: bool },

    /// The caller cancelled the request
    #[error("query cancelled")]
    Cancelled,

    /// The request deadline passed before the query completed
    #[error("query deadline exceeded")]
    DeadlineExceeded,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataError {
    /// Create a "not found" error for an unknown data source type
    pub fn not_found(source_type: impl Into<String>) -> Self {
        DataError::NotFound {
            source_type: source_type.into(),
        }
    }

    /// Wrap a factory failure together with the offending type
    pub fn instantiation(source_type: impl Into<String>, cause: DataError) -> Self {
        DataError::Instantiation {
            source_type: source_type.into(),
            source: Box::new(cause),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        DataError::InvalidConfiguration(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>, retryable: bool) -> Self {
        DataError::Backend {
            message: msg.into(),
            retryable,
        }
    }

    /// The underlying factory failure of an `Instantiation` error
    pub fn cause(&self) -> Option<&DataError> {
        match self {
            DataError::Instantiation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Errors raised by the dispatcher itself while picking an executor
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            DataError::NotFound { .. } | DataError::Instantiation { .. }
        )
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, DataError::Cancelled | DataError::DeadlineExceeded)
    }

    /// Whether repeating the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::ConnectionFailed(_) => true,
            DataError::Backend { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
