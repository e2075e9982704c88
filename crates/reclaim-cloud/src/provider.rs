//! Resource State Client traits
//!
//! Each provider adapter (CloudControl, ...) implements these traits and
//! classifies its own status vocabulary into [`ResourceState`] before handing
//! resources to the core. Implementations must be safe for concurrent use by
//! several orchestrators; the core adds no locking of its own.
//!
//! [`ResourceState`]: crate::state::ResourceState

use crate::error::Result;
use crate::job::{JobStatus, StatusHandle};
use crate::state::{FirewallRule, NatRule, Node, PublicIpBlock};
use async_trait::async_trait;

/// Read and delete access to a node and the networking resources around it
#[async_trait]
pub trait ResourceStateClient: Send + Sync {
    /// Returns the provider name (e.g., "cloudcontrol")
    fn name(&self) -> &str;

    /// Fetch a node; `Ok(None)` when it does not exist
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;

    async fn list_nat_rules(&self, network_domain_id: &str) -> Result<Vec<NatRule>>;

    async fn delete_nat_rule(&self, id: &str) -> Result<()>;

    async fn list_public_ip_blocks(&self, network_domain_id: &str) -> Result<Vec<PublicIpBlock>>;

    async fn delete_public_ip_block(&self, id: &str) -> Result<()>;

    async fn list_firewall_rules(&self, network_domain_id: &str) -> Result<Vec<FirewallRule>>;

    async fn delete_firewall_rule(&self, id: &str) -> Result<()>;

    async fn delete_port_list(&self, id: &str) -> Result<()>;

    /// Request a hard power-off; does not wait for the node to stop
    async fn power_off(&self, node_id: &str) -> Result<()>;

    /// Request deletion; does not wait for the node to disappear
    async fn delete_node(&self, node_id: &str) -> Result<()>;
}

/// Progress reporting for asynchronous provider operations
#[async_trait]
pub trait OperationStatusClient: Send + Sync {
    async fn get_operation_status(
        &self,
        handle: &StatusHandle,
    ) -> Result<JobStatus<serde_json::Value>>;
}
