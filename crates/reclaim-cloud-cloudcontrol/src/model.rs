//! Wire types returned by the CloudControl API

use crate::error::CloudControlError;
use crate::status::{ProviderState, RequestStatus};
use reclaim_cloud::{FirewallRule, JobStatus, NatRule, Node, PublicIpBlock};
use serde::{Deserialize, Serialize};

/// Server information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    pub state: ProviderState,
    #[serde(default)]
    pub started: bool,
    pub network_info: NetworkInfo,
    #[serde(default)]
    pub public_ipv4: Option<String>,
}

impl ServerInfo {
    pub fn private_ipv4(&self) -> Option<&str> {
        self.network_info
            .primary_nic
            .as_ref()?
            .private_ipv4
            .as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub network_domain_id: String,
    #[serde(default)]
    pub primary_nic: Option<NicInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicInfo {
    #[serde(default)]
    pub private_ipv4: Option<String>,
}

impl From<ServerInfo> for Node {
    fn from(info: ServerInfo) -> Self {
        let private_ipv4 = info.private_ipv4().map(str::to_string);
        Self {
            state: info.state.classify(),
            provider_state: info.state.to_string(),
            id: info.id,
            name: info.name,
            started: info.started,
            network_domain_id: info.network_info.network_domain_id,
            private_ipv4,
            public_ipv4: info.public_ipv4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatRuleInfo {
    pub id: String,
    pub internal_ip: String,
    pub external_ip: String,
    pub state: ProviderState,
}

impl From<NatRuleInfo> for NatRule {
    fn from(info: NatRuleInfo) -> Self {
        Self {
            state: info.state.classify(),
            provider_state: info.state.to_string(),
            id: info.id,
            internal_ip: info.internal_ip,
            external_ip: info.external_ip,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpBlockInfo {
    pub id: String,
    pub base_ip: String,
    pub size: u32,
    pub state: ProviderState,
}

impl From<PublicIpBlockInfo> for PublicIpBlock {
    fn from(info: PublicIpBlockInfo) -> Self {
        Self {
            state: info.state.classify(),
            provider_state: info.state.to_string(),
            id: info.id,
            base_ip: info.base_ip,
            size: info.size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub destination: Option<FirewallEndpoint>,
    pub state: ProviderState,
}

/// Source or destination of a firewall rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallEndpoint {
    #[serde(default)]
    pub ip: Option<IpAddressSpec>,
    #[serde(default)]
    pub port_list: Option<PortListRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressSpec {
    pub address: String,
    #[serde(default)]
    pub prefix_size: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortListRef {
    pub id: String,
}

impl From<FirewallRuleInfo> for FirewallRule {
    fn from(info: FirewallRuleInfo) -> Self {
        let destination = info.destination.unwrap_or_default();
        Self {
            state: info.state.classify(),
            provider_state: info.state.to_string(),
            id: info.id,
            name: info.name,
            destination_ip: destination.ip.map(|ip| ip.address),
            port_list_id: destination.port_list.map(|list| list.id),
        }
    }
}

/// Status of an asynchronous request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInfo {
    pub id: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<RequestInfo> for JobStatus<serde_json::Value> {
    fn from(info: RequestInfo) -> Self {
        info.status.into_job_status(info.result, info.error)
    }
}

/// Envelope every mutating call answers with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub operation: String,
    pub response_code: String,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ApiResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self.response_code.as_str(), "OK" | "IN_PROGRESS")
    }

    /// Turn a non-OK envelope into an error
    pub fn into_result(self) -> Result<Self, CloudControlError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(CloudControlError::Response {
                operation: self.operation,
                code: self.response_code,
                message: self.message,
            })
        }
    }
}
