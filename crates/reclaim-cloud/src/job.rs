//! Asynchronous operation tracking
//!
//! Providers answer mutating calls with a handle to a request that finishes
//! later. [`OperationTracker`] polls that handle until the provider reports a
//! terminal status and turns the answer into a [`Job`] or an
//! [`OperationError`].

use crate::context::WaitContext;
use crate::error::{CloudError, OperationError};
use crate::poller::{ConvergencePoller, PollConfig};
use crate::probe::{StateProbe, await_settled};
use crate::provider::OperationStatusClient;
use crate::state::{ResourceState, Trackable};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque reference the provider uses to report an operation's progress
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusHandle(String);

impl StatusHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StatusHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of an operation as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus<T> {
    Running,
    Done { result: T },
    Failed { message: String },
}

impl<T> JobStatus<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Terminal, successful outcome of an operation
///
/// Only [`OperationTracker`] builds a `Job`, and only after the provider
/// reported `Done`, so a result can never be read from a running operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Job<T> {
    handle: Option<StatusHandle>,
    result: Option<T>,
}

impl<T> Job<T> {
    /// The operation completed without a handle; there was nothing to wait for
    pub fn is_synchronous(&self) -> bool {
        self.handle.is_none()
    }

    pub fn handle(&self) -> Option<&StatusHandle> {
        self.handle.as_ref()
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<T> {
        self.result
    }
}

/// Wait budgets for asynchronous operations
#[derive(Debug, Clone, PartialEq)]
pub struct OperationConfig {
    /// Wait for a request to reach a terminal status
    pub job: PollConfig,

    /// Wait for a provisioned resource (e.g. a data center) to settle
    pub provisioning: PollConfig,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            job: PollConfig::with_timeout(Duration::from_secs(20 * 60)),
            provisioning: PollConfig::with_timeout(Duration::from_secs(30 * 60)),
        }
    }
}

/// Makes "submit now, resolve later" operations look synchronous
pub struct OperationTracker<'a, C: ?Sized> {
    client: &'a C,
    poller: ConvergencePoller,
}

impl<'a, C: OperationStatusClient + ?Sized> OperationTracker<'a, C> {
    pub fn new(client: &'a C, config: PollConfig) -> Self {
        Self {
            client,
            poller: ConvergencePoller::new(config),
        }
    }

    /// Wait for the operation behind `trackable` to finish
    ///
    /// A trackable without a status handle yields a synchronous `Job`
    /// without contacting the provider.
    pub async fn await_job<T: DeserializeOwned>(
        &self,
        trackable: &Trackable,
        ctx: &WaitContext,
    ) -> Result<Job<T>, OperationError> {
        let Some(handle) = trackable.status_handle() else {
            tracing::debug!("{} has no status handle, nothing to wait for", trackable.id());
            return Ok(Job {
                handle: None,
                result: None,
            });
        };

        tracing::debug!("Waiting for operation {} on {}", handle, trackable.id());

        let client = self.client;
        let terminal = self
            .poller
            .await_until(
                move || async move {
                    let status = client.get_operation_status(handle).await?;
                    Ok::<_, CloudError>(status.is_terminal())
                },
                ctx,
            )
            .await
            .map_err(|e| OperationError::from_poll(handle.as_str(), e))?;

        if !terminal {
            return Err(OperationError::TimedOut {
                handle: handle.to_string(),
                timeout: self.poller.config().timeout,
            });
        }

        match self.client.get_operation_status(handle).await? {
            JobStatus::Done { result } => {
                let result = serde_json::from_value(result).map_err(|source| {
                    OperationError::Payload {
                        handle: handle.to_string(),
                        source,
                    }
                })?;
                tracing::info!("Operation {} on {} completed", handle, trackable.id());
                Ok(Job {
                    handle: Some(handle.clone()),
                    result: Some(result),
                })
            }
            JobStatus::Failed { message } => {
                tracing::warn!("Operation {} on {} failed: {}", handle, trackable.id(), message);
                Err(OperationError::Failed {
                    handle: handle.to_string(),
                    message,
                })
            }
            // Terminal statuses never revert; a provider doing so is broken.
            JobStatus::Running => Err(OperationError::Fault(CloudError::ApiError(format!(
                "operation {} reported running after completing",
                handle
            )))),
        }
    }

    /// Wait for the operation, then for the resource it touched to settle
    ///
    /// Covers provisioning flows where the request finishing does not yet
    /// mean the resource (e.g. a data center) is usable.
    pub async fn await_provisioned<T: DeserializeOwned>(
        &self,
        trackable: &mut Trackable,
        probe: &dyn StateProbe,
        settle: &PollConfig,
        ctx: &WaitContext,
    ) -> Result<Job<T>, OperationError> {
        let job = self.await_job(trackable, ctx).await?;
        let label = trackable
            .status_handle()
            .map(|h| h.to_string())
            .unwrap_or_else(|| trackable.id().to_string());

        let settled = await_settled(probe, trackable.id(), settle, ctx)
            .await
            .map_err(|e| OperationError::from_poll(&label, e))?;

        match settled {
            Some(ResourceState::Stable) => {
                trackable.refresh(probe).await?;
                Ok(job)
            }
            Some(state) => Err(OperationError::Failed {
                handle: label,
                message: format!("{} ended up {} after provisioning", trackable.id(), state),
            }),
            None => Err(OperationError::TimedOut {
                handle: label,
                timeout: settle.timeout,
            }),
        }
    }
}
