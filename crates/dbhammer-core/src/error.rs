use thiserror::Error;

/// Canonical error type for catalog loading and procedure execution.
///
/// Cancellation is deliberately absent: a stop request is an outcome of the
/// worker loop, not a failure.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The metadata query failed or returned no procedures.
    #[error("metadata load failed: {message}")]
    MetadataLoad {
        /// Human-readable cause.
        message: String,
    },

    /// No procedure could be selected at this instant.
    #[error("no eligible procedure to execute")]
    NoEligibleProcedure,

    /// The database rejected or failed the call.
    #[error("procedure `{procedure}` failed: {message}")]
    Execution {
        /// Procedure being invoked.
        procedure: String,
        /// Driver or server message.
        message: String,
    },

    /// The call did not finish within the command timeout.
    #[error("procedure `{procedure}` timed out after {seconds}s")]
    CommandTimeout {
        /// Procedure being invoked.
        procedure: String,
        /// Configured command timeout.
        seconds: u64,
    },

    /// A database connection could not be obtained.
    #[error("connection unavailable: {message}")]
    ConnectionUnavailable {
        /// Pool or driver message.
        message: String,
    },

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },
}

impl CoreError {
    /// Creates a `MetadataLoad` variant.
    #[must_use]
    pub fn metadata_load(message: impl Into<String>) -> Self {
        Self::MetadataLoad {
            message: message.into(),
        }
    }

    /// Creates an `Execution` variant.
    #[must_use]
    pub fn execution(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            procedure: procedure.into(),
            message: message.into(),
        }
    }

    /// Creates a `CommandTimeout` variant.
    #[must_use]
    pub fn command_timeout(procedure: impl Into<String>, seconds: u64) -> Self {
        Self::CommandTimeout {
            procedure: procedure.into(),
            seconds,
        }
    }

    /// Creates a `ConnectionUnavailable` variant.
    #[must_use]
    pub fn connection_unavailable(message: impl Into<String>) -> Self {
        Self::ConnectionUnavailable {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
