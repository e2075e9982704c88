//! Resource state taxonomy and the resources a teardown touches
//!
//! Provider-specific status vocabularies are classified into
//! [`ResourceState`] inside each provider adapter, so everything in this
//! crate reasons about four states only.

use crate::error::Result;
use crate::job::StatusHandle;
use crate::probe::StateProbe;
use serde::{Deserialize, Serialize};

/// Four-way classification of a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Safe to act on
    Stable,
    /// An operation is in flight; wait, do not act
    Transitional,
    /// The last operation on this resource did not complete
    Failed,
    /// The resource no longer exists
    Absent,
}

impl ResourceState {
    pub fn is_stable(&self) -> bool {
        matches!(self, ResourceState::Stable)
    }

    pub fn is_transitional(&self) -> bool {
        matches!(self, ResourceState::Transitional)
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Stable => write!(f, "stable"),
            ResourceState::Transitional => write!(f, "transitional"),
            ResourceState::Failed => write!(f, "failed"),
            ResourceState::Absent => write!(f, "absent"),
        }
    }
}

/// Resource categories known to the teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceCategory {
    NatRule,
    PublicIpBlock,
    FirewallRule,
    PortList,
    Node,
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceCategory::NatRule => write!(f, "nat-rule"),
            ResourceCategory::PublicIpBlock => write!(f, "public-ip-block"),
            ResourceCategory::FirewallRule => write!(f, "firewall-rule"),
            ResourceCategory::PortList => write!(f, "port-list"),
            ResourceCategory::Node => write!(f, "node"),
        }
    }
}

/// A compute node as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub state: ResourceState,
    /// Provider's own status label (e.g. `FAILED_ADD`), kept for messages
    pub provider_state: String,
    /// Whether the node is powered on
    pub started: bool,
    pub network_domain_id: String,
    pub private_ipv4: Option<String>,
    pub public_ipv4: Option<String>,
}

/// Destination NAT from a public address to a node's private address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatRule {
    pub id: String,
    pub internal_ip: String,
    pub external_ip: String,
    pub state: ResourceState,
    pub provider_state: String,
}

/// Block of public IPv4 addresses reserved in a network domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpBlock {
    pub id: String,
    pub base_ip: String,
    pub size: u32,
    pub state: ResourceState,
    pub provider_state: String,
}

/// Firewall rule, optionally matching on a port list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub id: String,
    pub name: String,
    pub destination_ip: Option<String>,
    /// Port list the rule matches on; other rules may share it
    pub port_list_id: Option<String>,
    pub state: ResourceState,
    pub provider_state: String,
}

/// Common view over the resources that depend on a node
pub trait Dependent: Send + Sync {
    const CATEGORY: ResourceCategory;

    fn id(&self) -> &str;
    fn state(&self) -> ResourceState;
    fn provider_state(&self) -> &str;

    /// Port list this resource references
    fn port_list(&self) -> Option<&str> {
        None
    }
}

impl Dependent for NatRule {
    const CATEGORY: ResourceCategory = ResourceCategory::NatRule;

    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> ResourceState {
        self.state
    }

    fn provider_state(&self) -> &str {
        &self.provider_state
    }
}

impl Dependent for PublicIpBlock {
    const CATEGORY: ResourceCategory = ResourceCategory::PublicIpBlock;

    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> ResourceState {
        self.state
    }

    fn provider_state(&self) -> &str {
        &self.provider_state
    }
}

impl Dependent for FirewallRule {
    const CATEGORY: ResourceCategory = ResourceCategory::FirewallRule;

    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> ResourceState {
        self.state
    }

    fn provider_state(&self) -> &str {
        &self.provider_state
    }

    fn port_list(&self) -> Option<&str> {
        self.port_list_id.as_deref()
    }
}

/// An entity whose lifecycle is driven by a remote asynchronous operation
///
/// The last-known state only changes through [`Trackable::refresh`]; no
/// client-side transition is trusted over what the provider reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trackable {
    id: String,
    status_handle: Option<StatusHandle>,
    state: ResourceState,
}

impl Trackable {
    /// An entity whose operation completed synchronously
    pub fn settled(id: impl Into<String>, state: ResourceState) -> Self {
        Self {
            id: id.into(),
            status_handle: None,
            state,
        }
    }

    /// An entity created or mutated by an operation still in flight
    pub fn pending(id: impl Into<String>, handle: StatusHandle) -> Self {
        Self {
            id: id.into(),
            status_handle: Some(handle),
            state: ResourceState::Transitional,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status_handle(&self) -> Option<&StatusHandle> {
        self.status_handle.as_ref()
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Re-read the state from the provider
    pub async fn refresh(&mut self, probe: &dyn StateProbe) -> Result<ResourceState> {
        self.state = probe.probe(&self.id).await?;
        Ok(self.state)
    }
}
