use std::{
    error::Error,
    fmt::{self, Display},
};
use thiserror::Error;

use crate::models::{Operation, StackId};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a stackops-related operation.
pub type StackopsResult<T> = Result<T, StackopsError>;

/// An error that occurred while talking to the stack backend or coordinating stack operations.
#[derive(pretty_error_debug::Debug, Error)]
pub enum StackopsError {
    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),

    /// An error that occurred during an HTTP request.
    #[error("http request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// An error that occurred during an HTTP middleware operation.
    #[error("http middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// An error that occurred while encoding or decoding JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a non-success status code.
    #[error("backend error ({status}): {message}")]
    Backend {
        /// The HTTP status code returned by the backend.
        status: u16,

        /// The `detail` reported by the backend, or the raw body when there is none.
        message: String,
    },

    /// An invalid URL was built from the configured base URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An operation name that is not one of the supported operations.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The stack registry could not be loaded.
    #[error("stack registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// The stack is not (or no longer) part of the registry.
    #[error("stack {0} not found")]
    StackNotFound(StackId),

    /// Another operation is already in flight for the stack.
    #[error("stack {stack_id} is busy with `{operation}`")]
    OperationInProgress {
        /// The stack the operation was requested for.
        stack_id: StackId,

        /// The operation currently holding the stack's lock.
        operation: Operation,
    },

    /// The operation is not meaningful in the stack's current state.
    #[error("`{operation}` is not allowed on stack {stack_id} while it has no running containers")]
    OperationNotAllowed {
        /// The stack the operation was requested for.
        stack_id: StackId,

        /// The refused operation.
        operation: Operation,
    },

    /// The backend ran the operation and reported a failure.
    #[error("`{operation}` failed on stack {stack_id}: {message}")]
    OperationFailed {
        /// The stack the operation ran against.
        stack_id: StackId,

        /// The failed operation.
        operation: Operation,

        /// The message reported with the failure.
        message: String,
    },

    /// The backend refused or failed to delete the stack.
    #[error("failed to remove stack {stack_id}: {reason}")]
    RemoveFailed {
        /// The stack that was kept in the registry.
        stack_id: StackId,

        /// Why the removal failed.
        reason: String,
    },
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StackopsError {
    /// Wraps any other error.
    pub fn custom(error: impl Into<anyhow::Error>) -> StackopsError {
        StackopsError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Returns `true` if the error comes from the transport rather than from the backend's answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StackopsError::HttpRequest(_) | StackopsError::HttpMiddleware(_) | StackopsError::Io(_)
        )
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
