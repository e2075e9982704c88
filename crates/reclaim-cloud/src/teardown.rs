//! Dependency-ordered node teardown
//!
//! ```text
//! Discover → DeleteNatRules → DeletePublicIpBlocks → DeleteFirewallRules
//!          → PowerOff → AwaitPoweredOff → Delete → AwaitDeleted → Done
//! ```
//!
//! Categories run strictly in this order because the provider rejects
//! deleting a resource that is still referenced by the next one. A port list
//! is removed only once no firewall rule in the network domain references it.
//! Any hard fault ends the teardown; every step is idempotent so the whole
//! call can simply be repeated.

use crate::context::{Interrupt, WaitContext};
use crate::error::{CloudError, Result, TeardownError};
use crate::poller::{ConvergencePoller, PollConfig};
use crate::probe::{NodeProbe, StateProbe, await_absent, await_settled};
use crate::provider::ResourceStateClient;
use crate::report::{TeardownReport, TeardownStep};
use crate::state::{Dependent, FirewallRule, Node, ResourceCategory, ResourceState};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// What to do with a dependent resource caught mid-transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionalPolicy {
    /// Poll until it leaves the transitional state, then decide
    #[default]
    AwaitSettle,
    /// Leave it in place and continue
    Proceed,
}

/// What to do with a dependent resource whose last operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedMemberPolicy {
    /// Leave it in place with a warning and continue
    #[default]
    Skip,
    /// Stop the teardown
    Abort,
}

/// Timeouts and policies for one teardown
#[derive(Debug, Clone, PartialEq)]
pub struct TeardownConfig {
    /// Wait for the node to report stopped after power-off
    pub power_off: PollConfig,

    /// Wait for the node to disappear after delete
    pub delete: PollConfig,

    /// Wait for a transitional dependent resource to settle
    pub settle: PollConfig,

    pub transitional: TransitionalPolicy,

    pub failed_member: FailedMemberPolicy,

    /// Delete members of one category concurrently
    pub concurrent_member_deletes: bool,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            power_off: PollConfig::with_timeout(Duration::from_secs(5 * 60)),
            delete: PollConfig::with_timeout(Duration::from_secs(10 * 60)),
            settle: PollConfig::with_timeout(Duration::from_secs(5 * 60)),
            transitional: TransitionalPolicy::default(),
            failed_member: FailedMemberPolicy::default(),
            concurrent_member_deletes: false,
        }
    }
}

/// Addresses and network domain that tie dependent resources to the node
#[derive(Debug, Clone)]
struct Scope {
    network_domain_id: String,
    private_ipv4: Option<String>,
    external_ips: BTreeSet<String>,
}

impl Scope {
    fn of(node: &Node) -> Self {
        Self {
            network_domain_id: node.network_domain_id.clone(),
            private_ipv4: node.private_ipv4.clone(),
            external_ips: node.public_ipv4.iter().cloned().collect(),
        }
    }

    fn targets(&self, ip: &str) -> bool {
        self.private_ipv4.as_deref() == Some(ip) || self.external_ips.contains(ip)
    }
}

/// Per-member result of the dependent-resource steps
#[derive(Debug)]
enum MemberOutcome {
    Deleted,
    Skipped { provider_state: String, reason: String },
    Gone,
}

impl MemberOutcome {
    fn removed(&self) -> bool {
        matches!(self, MemberOutcome::Deleted | MemberOutcome::Gone)
    }
}

/// Decommissions a node and the networking resources that depend on it
pub struct TeardownOrchestrator<C: ?Sized> {
    client: Arc<C>,
    config: TeardownConfig,
}

impl<C: ResourceStateClient + ?Sized> TeardownOrchestrator<C> {
    pub fn new(client: Arc<C>, config: TeardownConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TeardownConfig {
        &self.config
    }

    /// Tear down `node_id` with independent per-wait timeouts
    pub async fn teardown(&self, node_id: &str) -> std::result::Result<(), TeardownError> {
        self.teardown_with_report(node_id, &WaitContext::background())
            .await
            .map(|_| ())
    }

    /// Tear down `node_id`, honouring the parent deadline and cancellation in `ctx`
    pub async fn teardown_with_report(
        &self,
        node_id: &str,
        ctx: &WaitContext,
    ) -> std::result::Result<TeardownReport, TeardownError> {
        let span = tracing::info_span!("teardown", provider = self.client.name(), node = node_id);
        async move {
            let start = std::time::Instant::now();
            let mut report = TeardownReport::new(node_id);
            let mut step = TeardownStep::Discover;

            match self.run(node_id, &mut step, &mut report, ctx).await {
                Ok(()) => {
                    let report = report.finish(start.elapsed());
                    tracing::info!("Teardown of {} finished: {}", node_id, report.summary());
                    Ok(report)
                }
                Err(e) => {
                    tracing::warn!("Teardown of {} failed at {}: {}", node_id, step, e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        node_id: &str,
        step: &mut TeardownStep,
        report: &mut TeardownReport,
        ctx: &WaitContext,
    ) -> std::result::Result<(), TeardownError> {
        enter(step, TeardownStep::Discover, ctx)?;
        let node = match self.client.get_node(node_id).await? {
            Some(node) if node.state != ResourceState::Absent => node,
            _ => {
                tracing::info!("Server({}) already absent, nothing to tear down", node_id);
                report.node_absent = true;
                *step = TeardownStep::Done;
                return Ok(());
            }
        };
        if !node.state.is_stable() {
            return Err(TeardownError::NotInStableState {
                node: node_id.to_string(),
                actual_state: node.provider_state,
            });
        }
        let mut scope = Scope::of(&node);

        enter(step, TeardownStep::DeleteNatRules, ctx)?;
        let nat_rules: Vec<_> = self
            .client
            .list_nat_rules(&scope.network_domain_id)
            .await
            .map_err(|source| TeardownError::ResourceListFailure {
                category: ResourceCategory::NatRule,
                source,
            })?
            .into_iter()
            .filter(|rule| scope.private_ipv4.as_deref() == Some(rule.internal_ip.as_str()))
            .collect();
        scope
            .external_ips
            .extend(nat_rules.iter().map(|rule| rule.external_ip.clone()));
        self.remove_members(&nat_rules, &scope, report, ctx).await?;

        enter(step, TeardownStep::DeletePublicIpBlocks, ctx)?;
        let ip_blocks: Vec<_> = self
            .client
            .list_public_ip_blocks(&scope.network_domain_id)
            .await
            .map_err(|source| TeardownError::ResourceListFailure {
                category: ResourceCategory::PublicIpBlock,
                source,
            })?
            .into_iter()
            .filter(|block| scope.external_ips.contains(&block.base_ip))
            .collect();
        self.remove_members(&ip_blocks, &scope, report, ctx).await?;

        enter(step, TeardownStep::DeleteFirewallRules, ctx)?;
        let all_rules = self
            .client
            .list_firewall_rules(&scope.network_domain_id)
            .await
            .map_err(|source| TeardownError::ResourceListFailure {
                category: ResourceCategory::FirewallRule,
                source,
            })?;
        let firewall_rules: Vec<_> = all_rules
            .iter()
            .filter(|rule| {
                rule.destination_ip
                    .as_deref()
                    .is_some_and(|ip| scope.targets(ip))
            })
            .cloned()
            .collect();
        let removed = self
            .remove_members(&firewall_rules, &scope, report, ctx)
            .await?;
        self.remove_port_lists(&all_rules, &removed, report).await?;

        if node.started {
            enter(step, TeardownStep::PowerOff, ctx)?;
            tracing::info!("Powering off server {}", node_id);
            absent_ok(self.client.power_off(node_id).await)?;
            report.powered_off = true;

            enter(step, TeardownStep::AwaitPoweredOff, ctx)?;
            let client = &*self.client;
            let stopped = ConvergencePoller::new(self.config.power_off.clone())
                .await_until(
                    move || async move {
                        Ok::<_, CloudError>(client
                            .get_node(node_id)
                            .await?
                            .is_none_or(|node| !node.started))
                    },
                    ctx,
                )
                .await?;
            if !stopped {
                return Err(TeardownError::PowerOffTimeout {
                    node: node_id.to_string(),
                    timeout: self.config.power_off.timeout,
                });
            }
        } else {
            tracing::debug!("Server {} already stopped", node_id);
        }

        enter(step, TeardownStep::Delete, ctx)?;
        tracing::info!("Deleting server {}", node_id);
        absent_ok(self.client.delete_node(node_id).await)?;
        report.add_deleted(ResourceCategory::Node, node_id);

        enter(step, TeardownStep::AwaitDeleted, ctx)?;
        let probe = NodeProbe::new(&*self.client);
        if !await_absent(&probe, node_id, &self.config.delete, ctx).await? {
            return Err(TeardownError::DeleteTimeout {
                node: node_id.to_string(),
                timeout: self.config.delete.timeout,
            });
        }

        *step = TeardownStep::Done;
        Ok(())
    }

    /// Apply the per-member policy to every member of one category
    ///
    /// Returns the ids of members that are gone afterwards.
    async fn remove_members<T: Dependent>(
        &self,
        members: &[T],
        scope: &Scope,
        report: &mut TeardownReport,
        ctx: &WaitContext,
    ) -> std::result::Result<BTreeSet<String>, TeardownError> {
        let mut removed = BTreeSet::new();
        if members.is_empty() {
            tracing::debug!("No {} resources to delete", T::CATEGORY);
            return Ok(removed);
        }

        let outcomes = if self.config.concurrent_member_deletes {
            join_all(
                members
                    .iter()
                    .map(|member| self.remove_member(member, scope, ctx)),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(members.len());
            for member in members {
                let outcome = self.remove_member(member, scope, ctx).await;
                let failed = outcome.is_err();
                outcomes.push(outcome);
                if failed {
                    break;
                }
            }
            outcomes
        };

        let mut first_error = None;
        for (member, outcome) in members.iter().zip(outcomes) {
            if outcome.as_ref().is_ok_and(MemberOutcome::removed) {
                removed.insert(member.id().to_string());
            }
            match outcome {
                Ok(MemberOutcome::Deleted) => {
                    report.add_deleted(T::CATEGORY, member.id());
                }
                Ok(MemberOutcome::Skipped {
                    provider_state,
                    reason,
                }) => {
                    report.add_skipped(T::CATEGORY, member.id(), provider_state, reason);
                }
                Ok(MemberOutcome::Gone) => {}
                Err(e) => {
                    tracing::warn!("Failed to remove {} {}: {}", T::CATEGORY, member.id(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Delete the port lists of removed rules that no remaining rule references
    async fn remove_port_lists(
        &self,
        all_rules: &[FirewallRule],
        removed: &BTreeSet<String>,
        report: &mut TeardownReport,
    ) -> std::result::Result<(), TeardownError> {
        let (gone, remaining): (Vec<_>, Vec<_>) =
            all_rules.iter().partition(|rule| removed.contains(&rule.id));
        let candidates: BTreeSet<&str> = gone.iter().filter_map(|rule| rule.port_list()).collect();

        for port_list_id in candidates {
            if let Some(user) = remaining
                .iter()
                .find(|rule| rule.port_list() == Some(port_list_id))
            {
                tracing::info!(
                    "Keeping {} {}, still referenced by {} {}",
                    ResourceCategory::PortList,
                    port_list_id,
                    ResourceCategory::FirewallRule,
                    user.id
                );
                continue;
            }
            tracing::info!("Deleting {} {}", ResourceCategory::PortList, port_list_id);
            if absent_ok(self.client.delete_port_list(port_list_id).await)? {
                report.add_deleted(ResourceCategory::PortList, port_list_id);
            }
        }
        Ok(())
    }

    async fn remove_member<T: Dependent>(
        &self,
        member: &T,
        scope: &Scope,
        ctx: &WaitContext,
    ) -> std::result::Result<MemberOutcome, TeardownError> {
        let category = T::CATEGORY;
        let id = member.id();

        let state = match member.state() {
            ResourceState::Transitional => match self.config.transitional {
                TransitionalPolicy::Proceed => {
                    tracing::warn!(
                        "Cannot delete {} ({}) in state ({}), leaving it in place",
                        category,
                        id,
                        member.provider_state()
                    );
                    return Ok(MemberOutcome::Skipped {
                        provider_state: member.provider_state().to_string(),
                        reason: "in transition".to_string(),
                    });
                }
                TransitionalPolicy::AwaitSettle => {
                    tracing::debug!(
                        "{} {} in state ({}), waiting for it to settle",
                        category,
                        id,
                        member.provider_state()
                    );
                    let probe = CategoryProbe {
                        client: &*self.client,
                        category,
                        network_domain_id: &scope.network_domain_id,
                    };
                    await_settled(&probe, id, &self.config.settle, ctx)
                        .await?
                        .ok_or_else(|| TeardownError::SettleTimeout {
                            category,
                            id: id.to_string(),
                            timeout: self.config.settle.timeout,
                        })?
                }
            },
            state => state,
        };

        match state {
            ResourceState::Stable => {
                tracing::info!("Deleting {} {}", category, id);
                if absent_ok(self.delete(category, id).await)? {
                    Ok(MemberOutcome::Deleted)
                } else {
                    Ok(MemberOutcome::Gone)
                }
            }
            ResourceState::Failed => match self.config.failed_member {
                FailedMemberPolicy::Skip => {
                    tracing::warn!(
                        "Skipping {} ({}) in failed state ({})",
                        category,
                        id,
                        member.provider_state()
                    );
                    Ok(MemberOutcome::Skipped {
                        provider_state: member.provider_state().to_string(),
                        reason: "failed state".to_string(),
                    })
                }
                FailedMemberPolicy::Abort => Err(TeardownError::MemberFailed {
                    category,
                    id: id.to_string(),
                    state: member.provider_state().to_string(),
                }),
            },
            ResourceState::Absent => {
                tracing::debug!("{} {} already gone", category, id);
                Ok(MemberOutcome::Gone)
            }
            // await_settled never returns a transitional state
            ResourceState::Transitional => Err(TeardownError::SettleTimeout {
                category,
                id: id.to_string(),
                timeout: self.config.settle.timeout,
            }),
        }
    }

    async fn delete(&self, category: ResourceCategory, id: &str) -> Result<()> {
        match category {
            ResourceCategory::NatRule => self.client.delete_nat_rule(id).await,
            ResourceCategory::PublicIpBlock => self.client.delete_public_ip_block(id).await,
            ResourceCategory::FirewallRule => self.client.delete_firewall_rule(id).await,
            ResourceCategory::PortList => self.client.delete_port_list(id).await,
            ResourceCategory::Node => self.client.delete_node(id).await,
        }
    }
}

/// Re-lists a category and reports one member's state
struct CategoryProbe<'a, C: ?Sized> {
    client: &'a C,
    category: ResourceCategory,
    network_domain_id: &'a str,
}

#[async_trait]
impl<'a, C: ResourceStateClient + ?Sized> StateProbe for CategoryProbe<'a, C> {
    async fn probe(&self, id: &str) -> Result<ResourceState> {
        let domain = self.network_domain_id;
        let state = match self.category {
            ResourceCategory::NatRule => find_state(self.client.list_nat_rules(domain).await?, id),
            ResourceCategory::PublicIpBlock => {
                find_state(self.client.list_public_ip_blocks(domain).await?, id)
            }
            ResourceCategory::FirewallRule => {
                find_state(self.client.list_firewall_rules(domain).await?, id)
            }
            ResourceCategory::PortList | ResourceCategory::Node => {
                return Err(CloudError::InvalidIdentifier(format!(
                    "{} is not listed per network domain",
                    self.category
                )));
            }
        };
        Ok(state)
    }
}

fn find_state<T: Dependent>(members: Vec<T>, id: &str) -> ResourceState {
    members
        .iter()
        .find(|member| member.id() == id)
        .map(|member| member.state())
        .unwrap_or(ResourceState::Absent)
}

/// Treat "not found" on a delete as success; `Ok(false)` means it was already gone
fn absent_ok(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => {
            tracing::debug!("Already deleted: {}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn enter(
    step: &mut TeardownStep,
    next: TeardownStep,
    ctx: &WaitContext,
) -> std::result::Result<(), TeardownError> {
    *step = next;
    tracing::debug!("Step: {}", next);
    ctx.check().map_err(|interrupt| match interrupt {
        Interrupt::Cancelled => TeardownError::Cancelled,
        Interrupt::DeadlineExceeded => TeardownError::DeadlineExceeded,
    })
}
