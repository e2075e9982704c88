//! CloudControl provider implementation

use crate::api::CloudControlApi;
use crate::error::CloudControlError;
use crate::model::ApiResponse;
use crate::status::ProviderState;
use async_trait::async_trait;
use reclaim_cloud::{
    FirewallRule, JobStatus, NatRule, Node, OperationStatusClient, PublicIpBlock,
    ResourceStateClient, Result, StatusHandle,
};

/// CloudControl provider
pub struct CloudControlProvider<A> {
    api: A,
    region: String,
}

impl<A: CloudControlApi> CloudControlProvider<A> {
    pub fn new(api: A, region: impl Into<String>) -> Self {
        Self {
            api,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}

/// Accept an OK/IN_PROGRESS envelope, map anything else onto a fault
fn accepted(result: std::result::Result<ApiResponse, CloudControlError>) -> Result<()> {
    let response = result.and_then(ApiResponse::into_result)?;
    tracing::debug!(
        "{} {}: {}",
        response.operation,
        response.response_code,
        response.message
    );
    Ok(())
}

#[async_trait]
impl<A: CloudControlApi> ResourceStateClient for CloudControlProvider<A> {
    fn name(&self) -> &str {
        "cloudcontrol"
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        match self.api.get_server(id).await {
            Ok(info) if info.state == ProviderState::Deleted => Ok(None),
            Ok(info) => Ok(Some(info.into())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_nat_rules(&self, network_domain_id: &str) -> Result<Vec<NatRule>> {
        let rules = self.api.list_nat_rules(network_domain_id).await?;
        tracing::debug!(
            "Listed {} NAT rule(s) in {} ({})",
            rules.len(),
            network_domain_id,
            self.region
        );
        Ok(rules.into_iter().map(NatRule::from).collect())
    }

    async fn delete_nat_rule(&self, id: &str) -> Result<()> {
        accepted(self.api.delete_nat_rule(id).await)
    }

    async fn list_public_ip_blocks(&self, network_domain_id: &str) -> Result<Vec<PublicIpBlock>> {
        let blocks = self.api.list_public_ip_blocks(network_domain_id).await?;
        tracing::debug!(
            "Listed {} public IP block(s) in {} ({})",
            blocks.len(),
            network_domain_id,
            self.region
        );
        Ok(blocks.into_iter().map(PublicIpBlock::from).collect())
    }

    async fn delete_public_ip_block(&self, id: &str) -> Result<()> {
        accepted(self.api.remove_public_ip_block(id).await)
    }

    async fn list_firewall_rules(&self, network_domain_id: &str) -> Result<Vec<FirewallRule>> {
        let rules = self.api.list_firewall_rules(network_domain_id).await?;
        tracing::debug!(
            "Listed {} firewall rule(s) in {} ({})",
            rules.len(),
            network_domain_id,
            self.region
        );
        Ok(rules.into_iter().map(FirewallRule::from).collect())
    }

    async fn delete_firewall_rule(&self, id: &str) -> Result<()> {
        accepted(self.api.delete_firewall_rule(id).await)
    }

    async fn delete_port_list(&self, id: &str) -> Result<()> {
        accepted(self.api.delete_port_list(id).await)
    }

    async fn power_off(&self, node_id: &str) -> Result<()> {
        accepted(self.api.power_off_server(node_id).await)
    }

    async fn delete_node(&self, node_id: &str) -> Result<()> {
        accepted(self.api.delete_server(node_id).await)
    }
}

#[async_trait]
impl<A: CloudControlApi> OperationStatusClient for CloudControlProvider<A> {
    async fn get_operation_status(
        &self,
        handle: &StatusHandle,
    ) -> Result<JobStatus<serde_json::Value>> {
        let request = self.api.get_request(handle.as_str()).await?;
        tracing::debug!("Request {} is {:?}", request.id, request.status);
        Ok(request.into())
    }
}
