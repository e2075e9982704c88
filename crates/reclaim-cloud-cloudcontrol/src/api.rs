//! Binding to the CloudControl REST API
//!
//! The HTTP transport is supplied by the embedding application. Every
//! method answers with the decoded wire type, or with
//! [`CloudControlError::Response`](crate::CloudControlError::Response) when
//! the API returned a non-OK response code.

use crate::error::Result;
use crate::model::{
    ApiResponse, FirewallRuleInfo, NatRuleInfo, PublicIpBlockInfo, RequestInfo, ServerInfo,
};
use async_trait::async_trait;

#[async_trait]
pub trait CloudControlApi: Send + Sync {
    async fn get_server(&self, id: &str) -> Result<ServerInfo>;

    /// Hard power-off, without a guest shutdown
    async fn power_off_server(&self, id: &str) -> Result<ApiResponse>;

    async fn delete_server(&self, id: &str) -> Result<ApiResponse>;

    async fn list_nat_rules(&self, network_domain_id: &str) -> Result<Vec<NatRuleInfo>>;

    async fn delete_nat_rule(&self, id: &str) -> Result<ApiResponse>;

    async fn list_public_ip_blocks(&self, network_domain_id: &str)
    -> Result<Vec<PublicIpBlockInfo>>;

    async fn remove_public_ip_block(&self, id: &str) -> Result<ApiResponse>;

    async fn list_firewall_rules(&self, network_domain_id: &str) -> Result<Vec<FirewallRuleInfo>>;

    async fn delete_firewall_rule(&self, id: &str) -> Result<ApiResponse>;

    async fn delete_port_list(&self, id: &str) -> Result<ApiResponse>;

    async fn get_request(&self, id: &str) -> Result<RequestInfo>;
}
