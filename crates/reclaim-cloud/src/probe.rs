//! State probes and the waits built on top of them

use crate::context::WaitContext;
use crate::error::{CloudError, PollError, Result};
use crate::poller::{ConvergencePoller, PollConfig};
use crate::provider::ResourceStateClient;
use crate::state::ResourceState;
use async_trait::async_trait;

/// Reads the current state of one resource
///
/// "Not found" is reported as [`ResourceState::Absent`], never as an error.
#[async_trait]
pub trait StateProbe: Send + Sync {
    async fn probe(&self, id: &str) -> Result<ResourceState>;
}

/// Probes a node through [`ResourceStateClient::get_node`]
pub struct NodeProbe<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: ResourceStateClient + ?Sized> NodeProbe<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a, C: ResourceStateClient + ?Sized> StateProbe for NodeProbe<'a, C> {
    async fn probe(&self, id: &str) -> Result<ResourceState> {
        Ok(self
            .client
            .get_node(id)
            .await?
            .map(|node| node.state)
            .unwrap_or(ResourceState::Absent))
    }
}

/// Wait until the probe reports `target`
pub async fn await_state(
    probe: &dyn StateProbe,
    id: &str,
    target: ResourceState,
    config: &PollConfig,
    ctx: &WaitContext,
) -> std::result::Result<bool, PollError> {
    tracing::debug!("Waiting for {} to become {}", id, target);
    ConvergencePoller::new(config.clone())
        .await_until(
            move || async move { Ok::<_, CloudError>(probe.probe(id).await? == target) },
            ctx,
        )
        .await
}

/// Wait until the resource is gone
pub async fn await_absent(
    probe: &dyn StateProbe,
    id: &str,
    config: &PollConfig,
    ctx: &WaitContext,
) -> std::result::Result<bool, PollError> {
    await_state(probe, id, ResourceState::Absent, config, ctx).await
}

/// Wait until the resource leaves [`ResourceState::Transitional`]
///
/// Returns the settled state, or `None` if it was still in transition when
/// the budget ran out.
pub async fn await_settled(
    probe: &dyn StateProbe,
    id: &str,
    config: &PollConfig,
    ctx: &WaitContext,
) -> std::result::Result<Option<ResourceState>, PollError> {
    ConvergencePoller::new(config.clone())
        .await_value(
            move || async move {
                let state = probe.probe(id).await?;
                Ok::<_, CloudError>((!state.is_transitional()).then_some(state))
            },
            ctx,
        )
        .await
}
