//! Provider status vocabularies and their classification

use reclaim_cloud::{JobStatus, ResourceState};
use serde::{Deserialize, Serialize};

/// Lifecycle state label carried by every CloudControl resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderState {
    Normal,
    PendingAdd,
    PendingChange,
    PendingDelete,
    FailedAdd,
    FailedChange,
    FailedDelete,
    Deleted,
    RequiresSupport,
    /// A label this adapter does not know
    Unrecognized(String),
}

impl ProviderState {
    pub fn parse(label: &str) -> Self {
        match label {
            "NORMAL" => ProviderState::Normal,
            "PENDING_ADD" => ProviderState::PendingAdd,
            "PENDING_CHANGE" => ProviderState::PendingChange,
            "PENDING_DELETE" => ProviderState::PendingDelete,
            "FAILED_ADD" => ProviderState::FailedAdd,
            "FAILED_CHANGE" => ProviderState::FailedChange,
            "FAILED_DELETE" => ProviderState::FailedDelete,
            "DELETED" => ProviderState::Deleted,
            "REQUIRES_SUPPORT" => ProviderState::RequiresSupport,
            other => ProviderState::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProviderState::Normal => "NORMAL",
            ProviderState::PendingAdd => "PENDING_ADD",
            ProviderState::PendingChange => "PENDING_CHANGE",
            ProviderState::PendingDelete => "PENDING_DELETE",
            ProviderState::FailedAdd => "FAILED_ADD",
            ProviderState::FailedChange => "FAILED_CHANGE",
            ProviderState::FailedDelete => "FAILED_DELETE",
            ProviderState::Deleted => "DELETED",
            ProviderState::RequiresSupport => "REQUIRES_SUPPORT",
            ProviderState::Unrecognized(label) => label,
        }
    }

    /// Map onto the four-way state the core reasons about
    ///
    /// Anything unknown is treated as failed, never as safe to act on.
    pub fn classify(&self) -> ResourceState {
        match self {
            ProviderState::Normal => ResourceState::Stable,
            ProviderState::PendingAdd
            | ProviderState::PendingChange
            | ProviderState::PendingDelete => ResourceState::Transitional,
            ProviderState::FailedAdd
            | ProviderState::FailedChange
            | ProviderState::FailedDelete
            | ProviderState::RequiresSupport
            | ProviderState::Unrecognized(_) => ResourceState::Failed,
            ProviderState::Deleted => ResourceState::Absent,
        }
    }
}

impl From<String> for ProviderState {
    fn from(label: String) -> Self {
        ProviderState::parse(&label)
    }
}

impl From<ProviderState> for String {
    fn from(state: ProviderState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of an asynchronous request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl RequestStatus {
    /// Combine with the request's payload and error text into a core status
    pub fn into_job_status(
        self,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> JobStatus<serde_json::Value> {
        match self {
            RequestStatus::Queued | RequestStatus::Running => JobStatus::Running,
            RequestStatus::Done => JobStatus::Done {
                result: result.unwrap_or(serde_json::Value::Null),
            },
            RequestStatus::Failed => JobStatus::Failed {
                message: error.unwrap_or_default(),
            },
        }
    }
}
