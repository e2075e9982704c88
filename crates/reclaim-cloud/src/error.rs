//! Error types for polling, operation tracking and teardown

use crate::state::ResourceCategory;
use std::time::Duration;
use thiserror::Error;

/// Faults raised by a Resource State Client
///
/// These are hard failures of the underlying call (network, auth, malformed
/// identifiers). The core never retries them on its own.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Resource busy: {0}")]
    Busy(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Absence is benign for delete calls and disappearance waits.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Reasons a convergence wait stopped without an answer
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Wait cancelled")]
    Cancelled,

    #[error("Parent deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Fault(#[from] CloudError),
}

/// Failures of an asynchronous provider operation
#[derive(Error, Debug)]
pub enum OperationError {
    /// The outcome is unknown: the provider never reported a terminal status.
    #[error("Operation {handle} did not reach a terminal status within {timeout:?}")]
    TimedOut { handle: String, timeout: Duration },

    /// The provider reported the operation as failed.
    #[error("Operation {handle} failed: {message}")]
    Failed { handle: String, message: String },

    #[error("Wait for operation {handle} cancelled")]
    Cancelled { handle: String },

    #[error("Parent deadline exceeded while waiting for operation {handle}")]
    DeadlineExceeded { handle: String },

    #[error("Operation {handle} reported a payload that could not be decoded: {source}")]
    Payload {
        handle: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fault(#[from] CloudError),
}

impl OperationError {
    pub(crate) fn from_poll(handle: &str, err: PollError) -> Self {
        match err {
            PollError::Cancelled => OperationError::Cancelled {
                handle: handle.to_string(),
            },
            PollError::DeadlineExceeded => OperationError::DeadlineExceeded {
                handle: handle.to_string(),
            },
            PollError::Fault(e) => OperationError::Fault(e),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OperationError::TimedOut { .. } => ErrorKind::Timeout,
            OperationError::Failed { .. } => ErrorKind::OperationFailed,
            OperationError::Cancelled { .. } | OperationError::DeadlineExceeded { .. } => {
                ErrorKind::Cancelled
            }
            OperationError::Payload { .. } | OperationError::Fault(_) => ErrorKind::ProviderFault,
        }
    }
}

/// Failures of a node teardown
#[derive(Error, Debug)]
pub enum TeardownError {
    #[error("Server({node}) not deleted as it is in state({actual_state})")]
    NotInStableState { node: String, actual_state: String },

    #[error("Failed to list {category} resources: {source}")]
    ResourceListFailure {
        category: ResourceCategory,
        #[source]
        source: CloudError,
    },

    #[error("Server({node}) not stopped within {timeout:?}")]
    PowerOffTimeout { node: String, timeout: Duration },

    #[error("Server({node}) not deleted within {timeout:?}")]
    DeleteTimeout { node: String, timeout: Duration },

    #[error("{category} {id} still in transition after {timeout:?}")]
    SettleTimeout {
        category: ResourceCategory,
        id: String,
        timeout: Duration,
    },

    #[error("{category} {id} is in failed state({state}); teardown aborted")]
    MemberFailed {
        category: ResourceCategory,
        id: String,
        state: String,
    },

    #[error("Provider fault: {source}")]
    ProviderFault {
        #[from]
        source: CloudError,
    },

    #[error("Teardown cancelled")]
    Cancelled,

    #[error("Teardown deadline exceeded")]
    DeadlineExceeded,
}

impl From<PollError> for TeardownError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Cancelled => TeardownError::Cancelled,
            PollError::DeadlineExceeded => TeardownError::DeadlineExceeded,
            PollError::Fault(source) => TeardownError::ProviderFault { source },
        }
    }
}

impl TeardownError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TeardownError::NotInStableState { .. } | TeardownError::MemberFailed { .. } => {
                ErrorKind::PreconditionViolation
            }
            TeardownError::PowerOffTimeout { .. }
            | TeardownError::DeleteTimeout { .. }
            | TeardownError::SettleTimeout { .. } => ErrorKind::Timeout,
            TeardownError::ResourceListFailure { .. } | TeardownError::ProviderFault { .. } => {
                ErrorKind::ProviderFault
            }
            TeardownError::Cancelled | TeardownError::DeadlineExceeded => ErrorKind::Cancelled,
        }
    }

    /// Whether re-running the whole teardown unchanged can succeed.
    ///
    /// Every step is idempotent, so timeouts and cancellations are safe to
    /// retry. Precondition violations and provider faults need a human first.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Timeout | ErrorKind::Cancelled)
    }
}

/// Coarse classification shared by every error in this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A bounded wait ran out of time
    Timeout,
    /// The provider call itself failed
    ProviderFault,
    /// The resource was not in a state the caller may act on
    PreconditionViolation,
    /// The provider reported the operation as failed
    OperationFailed,
    /// An outer cancellation or deadline stopped the work
    Cancelled,
}
