use async_trait::async_trait;
use reclaim_cloud_cloudcontrol::{
    ApiResponse, CloudControlApi, CloudControlError, FirewallRuleInfo, NatRuleInfo,
    ProviderState, PublicIpBlockInfo, RequestInfo, Result, ServerInfo,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct Domain {
    server: Option<ServerInfo>,
    nat_rules: Vec<NatRuleInfo>,
    ip_blocks: Vec<PublicIpBlockInfo>,
    firewall_rules: Vec<FirewallRuleInfo>,
    requests: HashMap<String, VecDeque<RequestInfo>>,
    /// Response code to answer a given operation with
    rejections: HashMap<&'static str, &'static str>,
}

/// In-memory CloudControl network domain
#[derive(Default)]
pub struct FakeApi {
    domain: Mutex<Domain>,
    operations: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(self, state: &str, started: bool) -> Self {
        self.domain.lock().unwrap().server = Some(server("srv-1", state, started));
        self
    }

    pub fn with_nat_rule(self, id: &str, internal_ip: &str, external_ip: &str, state: &str) -> Self {
        let rule = serde_json::from_value(json!({
            "id": id,
            "internalIp": internal_ip,
            "externalIp": external_ip,
            "state": state,
        }))
        .unwrap();
        self.domain.lock().unwrap().nat_rules.push(rule);
        self
    }

    pub fn with_ip_block(self, id: &str, base_ip: &str) -> Self {
        let block = serde_json::from_value(json!({
            "id": id,
            "baseIp": base_ip,
            "size": 2,
            "state": "NORMAL",
        }))
        .unwrap();
        self.domain.lock().unwrap().ip_blocks.push(block);
        self
    }

    pub fn with_firewall_rule(
        self,
        id: &str,
        destination_ip: &str,
        port_list: Option<&str>,
        state: &str,
    ) -> Self {
        let mut destination = json!({ "ip": { "address": destination_ip } });
        if let Some(port_list) = port_list {
            destination["portList"] = json!({ "id": port_list });
        }
        let rule = serde_json::from_value(json!({
            "id": id,
            "name": format!("allow.{}", id),
            "destination": destination,
            "state": state,
        }))
        .unwrap();
        self.domain.lock().unwrap().firewall_rules.push(rule);
        self
    }

    pub fn with_request(self, id: &str, steps: Vec<serde_json::Value>) -> Self {
        let steps = steps
            .into_iter()
            .map(|step| serde_json::from_value(step).unwrap())
            .collect();
        self.domain
            .lock()
            .unwrap()
            .requests
            .insert(id.to_string(), steps);
        self
    }

    pub fn reject(self, operation: &'static str, code: &'static str) -> Self {
        self.domain
            .lock()
            .unwrap()
            .rejections
            .insert(operation, code);
        self
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    fn answer(&self, operation: &'static str, id: &str) -> Result<ApiResponse> {
        self.operations
            .lock()
            .unwrap()
            .push(format!("{} {}", operation, id));
        let code = self
            .domain
            .lock()
            .unwrap()
            .rejections
            .get(operation)
            .copied()
            .unwrap_or("OK");
        ApiResponse {
            operation: operation.to_string(),
            response_code: code.to_string(),
            message: format!("{} {}", operation, id),
            request_id: None,
        }
        .into_result()
    }
}

#[async_trait]
impl CloudControlApi for FakeApi {
    async fn get_server(&self, id: &str) -> Result<ServerInfo> {
        let domain = self.domain.lock().unwrap();
        if let Some(code) = domain.rejections.get("GET_SERVER") {
            return Err(CloudControlError::response("GET_SERVER", *code, "rejected"));
        }
        domain
            .server
            .clone()
            .filter(|server| server.id == id)
            .ok_or_else(|| {
                CloudControlError::response("GET_SERVER", "RESOURCE_NOT_FOUND", id.to_string())
            })
    }

    async fn power_off_server(&self, id: &str) -> Result<ApiResponse> {
        let response = self.answer("POWER_OFF_SERVER", id)?;
        if let Some(server) = self.domain.lock().unwrap().server.as_mut() {
            server.started = false;
        }
        Ok(response)
    }

    async fn delete_server(&self, id: &str) -> Result<ApiResponse> {
        let response = self.answer("DELETE_SERVER", id)?;
        if let Some(server) = self.domain.lock().unwrap().server.as_mut() {
            server.state = ProviderState::Deleted;
        }
        Ok(response)
    }

    async fn list_nat_rules(&self, _network_domain_id: &str) -> Result<Vec<NatRuleInfo>> {
        Ok(self.domain.lock().unwrap().nat_rules.clone())
    }

    async fn delete_nat_rule(&self, id: &str) -> Result<ApiResponse> {
        let response = self.answer("DELETE_NAT_RULE", id)?;
        self.domain.lock().unwrap().nat_rules.retain(|r| r.id != id);
        Ok(response)
    }

    async fn list_public_ip_blocks(
        &self,
        _network_domain_id: &str,
    ) -> Result<Vec<PublicIpBlockInfo>> {
        Ok(self.domain.lock().unwrap().ip_blocks.clone())
    }

    async fn remove_public_ip_block(&self, id: &str) -> Result<ApiResponse> {
        let response = self.answer("REMOVE_PUBLIC_IP_BLOCK", id)?;
        self.domain.lock().unwrap().ip_blocks.retain(|b| b.id != id);
        Ok(response)
    }

    async fn list_firewall_rules(&self, _network_domain_id: &str) -> Result<Vec<FirewallRuleInfo>> {
        Ok(self.domain.lock().unwrap().firewall_rules.clone())
    }

    async fn delete_firewall_rule(&self, id: &str) -> Result<ApiResponse> {
        let response = self.answer("DELETE_FIREWALL_RULE", id)?;
        self.domain
            .lock()
            .unwrap()
            .firewall_rules
            .retain(|r| r.id != id);
        Ok(response)
    }

    async fn delete_port_list(&self, id: &str) -> Result<ApiResponse> {
        self.answer("DELETE_PORT_LIST", id)
    }

    async fn get_request(&self, id: &str) -> Result<RequestInfo> {
        let mut domain = self.domain.lock().unwrap();
        let steps = domain.requests.get_mut(id).ok_or_else(|| {
            CloudControlError::response("GET_REQUEST", "RESOURCE_NOT_FOUND", id.to_string())
        })?;
        let step = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        };
        step.ok_or_else(|| CloudControlError::Transport(format!("no status for {}", id)))
    }
}

pub fn server(id: &str, state: &str, started: bool) -> ServerInfo {
    serde_json::from_value(json!({
        "id": id,
        "name": "web-01",
        "state": state,
        "started": started,
        "networkInfo": {
            "networkDomainId": "nd-1",
            "primaryNic": { "privateIpv4": "10.0.0.5" }
        }
    }))
    .unwrap()
}
