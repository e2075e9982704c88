//! CloudControl provider error types

use reclaim_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudControlError {
    /// The API answered with a non-OK response code
    #[error("{operation} failed with {code}: {message}")]
    Response {
        operation: String,
        code: String,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CloudControlError {
    pub fn response(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CloudControlError::Response {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Response code, if the API answered at all
    pub fn code(&self) -> Option<&str> {
        match self {
            CloudControlError::Response { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(codes::RESOURCE_NOT_FOUND)
    }
}

/// Response codes with a meaning beyond "the call failed"
pub mod codes {
    pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INVALID_INPUT_DATA: &str = "INVALID_INPUT_DATA";
    pub const RESOURCE_BUSY: &str = "RESOURCE_BUSY";
}

impl From<CloudControlError> for CloudError {
    fn from(err: CloudControlError) -> Self {
        match err {
            CloudControlError::Response {
                operation,
                code,
                message,
            } => {
                let detail = format!("{}: {}", operation, message);
                match code.as_str() {
                    codes::RESOURCE_NOT_FOUND => CloudError::NotFound(detail),
                    codes::UNAUTHORIZED => CloudError::AuthenticationFailed(detail),
                    codes::INVALID_INPUT_DATA => CloudError::InvalidIdentifier(detail),
                    codes::RESOURCE_BUSY => CloudError::Busy(detail),
                    _ => CloudError::ApiError(format!("{} ({})", detail, code)),
                }
            }
            CloudControlError::Transport(msg) => CloudError::ApiError(msg),
            CloudControlError::JsonError(e) => CloudError::Json(e),
            CloudControlError::IoError(e) => CloudError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudControlError>;
