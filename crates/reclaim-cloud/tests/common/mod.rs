use async_trait::async_trait;
use reclaim_cloud::{
    CloudError, FirewallRule, JobStatus, NatRule, Node, OperationStatusClient, PollConfig,
    PublicIpBlock, ResourceCategory, ResourceState, ResourceStateClient, Result, StatusHandle,
    TeardownConfig,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Calls received by the fake client, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetNode(String),
    ListNatRules(String),
    DeleteNatRule(String),
    ListPublicIpBlocks(String),
    DeletePublicIpBlock(String),
    ListFirewallRules(String),
    DeleteFirewallRule(String),
    DeletePortList(String),
    PowerOff(String),
    DeleteNode(String),
    GetOperationStatus(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::DeleteNatRule(_)
                | Call::DeletePublicIpBlock(_)
                | Call::DeleteFirewallRule(_)
                | Call::DeletePortList(_)
                | Call::PowerOff(_)
                | Call::DeleteNode(_)
        )
    }
}

#[derive(Default)]
struct World {
    node: Option<Node>,
    nat_rules: Vec<NatRule>,
    ip_blocks: Vec<PublicIpBlock>,
    firewall_rules: Vec<FirewallRule>,
    port_lists: HashSet<String>,
    /// get_node calls after power-off before the node reports stopped
    stop_after: u32,
    stop_countdown: Option<u32>,
    /// get_node calls after delete before the node disappears
    delete_after: u32,
    delete_countdown: Option<u32>,
    /// States a member moves through, one per listing of its category
    transitions: HashMap<String, VecDeque<ResourceState>>,
    failing_lists: HashSet<ResourceCategory>,
    failing_deletes: HashSet<String>,
    /// Deletes that race with another actor: the resource vanishes first
    racing_deletes: HashSet<String>,
    operations: HashMap<String, VecDeque<JobStatus<serde_json::Value>>>,
}

/// In-memory Resource State Client recording every call
#[derive(Default)]
pub struct MockClient {
    world: Mutex<World>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(self, node: Node) -> Self {
        self.world.lock().unwrap().node = Some(node);
        self
    }

    pub fn with_nat_rule(self, rule: NatRule) -> Self {
        self.world.lock().unwrap().nat_rules.push(rule);
        self
    }

    pub fn with_ip_block(self, block: PublicIpBlock) -> Self {
        self.world.lock().unwrap().ip_blocks.push(block);
        self
    }

    pub fn with_firewall_rule(self, rule: FirewallRule) -> Self {
        {
            let mut world = self.world.lock().unwrap();
            if let Some(port_list) = &rule.port_list_id {
                world.port_lists.insert(port_list.clone());
            }
            world.firewall_rules.push(rule);
        }
        self
    }

    pub fn stop_after(self, polls: u32) -> Self {
        self.world.lock().unwrap().stop_after = polls;
        self
    }

    pub fn delete_after(self, polls: u32) -> Self {
        self.world.lock().unwrap().delete_after = polls;
        self
    }

    pub fn with_transitions(self, id: &str, states: &[ResourceState]) -> Self {
        self.world
            .lock()
            .unwrap()
            .transitions
            .insert(id.to_string(), states.iter().copied().collect());
        self
    }

    pub fn failing_list(self, category: ResourceCategory) -> Self {
        self.world.lock().unwrap().failing_lists.insert(category);
        self
    }

    pub fn failing_delete(self, id: &str) -> Self {
        self.world
            .lock()
            .unwrap()
            .failing_deletes
            .insert(id.to_string());
        self
    }

    pub fn racing_delete(self, id: &str) -> Self {
        self.world
            .lock()
            .unwrap()
            .racing_deletes
            .insert(id.to_string());
        self
    }

    pub fn with_operation(self, handle: &str, statuses: Vec<JobStatus<serde_json::Value>>) -> Self {
        self.world
            .lock()
            .unwrap()
            .operations
            .insert(handle.to_string(), statuses.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_mutation)
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|&call| predicate(call)).count()
    }

    pub fn node(&self) -> Option<Node> {
        self.world.lock().unwrap().node.clone()
    }

    pub fn nat_rule_ids(&self) -> Vec<String> {
        let world = self.world.lock().unwrap();
        world.nat_rules.iter().map(|r| r.id.clone()).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn delete_member<T>(
        &self,
        id: &str,
        select: impl FnOnce(&mut World) -> &mut Vec<T>,
        id_of: impl Fn(&T) -> &str,
    ) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        if world.failing_deletes.contains(id) {
            return Err(CloudError::ApiError(format!("delete of {} rejected", id)));
        }
        let racing = world.racing_deletes.contains(id);
        let members = select(&mut *world);
        let before = members.len();
        members.retain(|member| id_of(member) != id);
        if racing || members.len() == before {
            return Err(CloudError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn advance<T>(
    members: &mut [T],
    transitions: &mut HashMap<String, VecDeque<ResourceState>>,
    id_of: impl Fn(&T) -> String,
    set_state: impl Fn(&mut T, ResourceState),
) {
    for member in members.iter_mut() {
        if let Some(queue) = transitions.get_mut(&id_of(member)) {
            if let Some(state) = queue.pop_front() {
                set_state(member, state);
            }
        }
    }
}

fn label(state: ResourceState) -> String {
    match state {
        ResourceState::Stable => "NORMAL",
        ResourceState::Transitional => "PENDING_CHANGE",
        ResourceState::Failed => "FAILED_CHANGE",
        ResourceState::Absent => "DELETED",
    }
    .to_string()
}

#[async_trait]
impl ResourceStateClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        self.record(Call::GetNode(id.to_string()));
        let mut world = self.world.lock().unwrap();

        let stop_countdown = world.stop_countdown;
        match stop_countdown {
            Some(0) => {
                world.stop_countdown = None;
                if let Some(node) = world.node.as_mut() {
                    node.started = false;
                }
            }
            Some(n) => world.stop_countdown = Some(n - 1),
            None => {}
        }
        let delete_countdown = world.delete_countdown;
        match delete_countdown {
            Some(0) => {
                world.delete_countdown = None;
                world.node = None;
            }
            Some(n) => world.delete_countdown = Some(n - 1),
            None => {}
        }

        Ok(world.node.clone().filter(|node| node.id == id))
    }

    async fn list_nat_rules(&self, network_domain_id: &str) -> Result<Vec<NatRule>> {
        self.record(Call::ListNatRules(network_domain_id.to_string()));
        let mut world = self.world.lock().unwrap();
        if world.failing_lists.contains(&ResourceCategory::NatRule) {
            return Err(CloudError::ApiError("listNatRules failed".to_string()));
        }
        let World {
            nat_rules,
            transitions,
            ..
        } = &mut *world;
        advance(nat_rules, transitions, |r| r.id.clone(), |r, s| {
            r.state = s;
            r.provider_state = label(s);
        });
        Ok(world.nat_rules.clone())
    }

    async fn delete_nat_rule(&self, id: &str) -> Result<()> {
        self.record(Call::DeleteNatRule(id.to_string()));
        self.delete_member(id, |w| &mut w.nat_rules, |r| r.id.as_str())
    }

    async fn list_public_ip_blocks(&self, network_domain_id: &str) -> Result<Vec<PublicIpBlock>> {
        self.record(Call::ListPublicIpBlocks(network_domain_id.to_string()));
        let mut world = self.world.lock().unwrap();
        if world.failing_lists.contains(&ResourceCategory::PublicIpBlock) {
            return Err(CloudError::ApiError(
                "listPublicIpBlocks failed".to_string(),
            ));
        }
        let World {
            ip_blocks,
            transitions,
            ..
        } = &mut *world;
        advance(ip_blocks, transitions, |b| b.id.clone(), |b, s| {
            b.state = s;
            b.provider_state = label(s);
        });
        Ok(world.ip_blocks.clone())
    }

    async fn delete_public_ip_block(&self, id: &str) -> Result<()> {
        self.record(Call::DeletePublicIpBlock(id.to_string()));
        self.delete_member(id, |w| &mut w.ip_blocks, |b| b.id.as_str())
    }

    async fn list_firewall_rules(&self, network_domain_id: &str) -> Result<Vec<FirewallRule>> {
        self.record(Call::ListFirewallRules(network_domain_id.to_string()));
        let mut world = self.world.lock().unwrap();
        if world.failing_lists.contains(&ResourceCategory::FirewallRule) {
            return Err(CloudError::ApiError(
                "listFirewallRules failed".to_string(),
            ));
        }
        let World {
            firewall_rules,
            transitions,
            ..
        } = &mut *world;
        advance(firewall_rules, transitions, |r| r.id.clone(), |r, s| {
            r.state = s;
            r.provider_state = label(s);
        });
        Ok(world.firewall_rules.clone())
    }

    async fn delete_firewall_rule(&self, id: &str) -> Result<()> {
        self.record(Call::DeleteFirewallRule(id.to_string()));
        self.delete_member(id, |w| &mut w.firewall_rules, |r| r.id.as_str())
    }

    async fn delete_port_list(&self, id: &str) -> Result<()> {
        self.record(Call::DeletePortList(id.to_string()));
        let mut world = self.world.lock().unwrap();
        let still_referenced = world
            .firewall_rules
            .iter()
            .any(|rule| rule.port_list_id.as_deref() == Some(id));
        if still_referenced {
            return Err(CloudError::ApiError(format!(
                "port list {} is still referenced",
                id
            )));
        }
        if !world.port_lists.remove(id) {
            return Err(CloudError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn power_off(&self, node_id: &str) -> Result<()> {
        self.record(Call::PowerOff(node_id.to_string()));
        let mut world = self.world.lock().unwrap();
        if world.node.is_none() {
            return Err(CloudError::NotFound(node_id.to_string()));
        }
        world.stop_countdown = Some(world.stop_after);
        Ok(())
    }

    async fn delete_node(&self, node_id: &str) -> Result<()> {
        self.record(Call::DeleteNode(node_id.to_string()));
        let mut world = self.world.lock().unwrap();
        if world.node.is_none() {
            return Err(CloudError::NotFound(node_id.to_string()));
        }
        world.delete_countdown = Some(world.delete_after);
        Ok(())
    }
}

#[async_trait]
impl OperationStatusClient for MockClient {
    async fn get_operation_status(
        &self,
        handle: &StatusHandle,
    ) -> Result<JobStatus<serde_json::Value>> {
        self.record(Call::GetOperationStatus(handle.to_string()));
        let mut world = self.world.lock().unwrap();
        let queue = world
            .operations
            .get_mut(handle.as_str())
            .ok_or_else(|| CloudError::InvalidIdentifier(handle.to_string()))?;
        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        status.ok_or_else(|| CloudError::ApiError(format!("no status for {}", handle)))
    }
}

#[allow(dead_code)]
pub fn node(id: &str) -> Node {
    Node {
        id: id.to_string(),
        name: format!("{}-name", id),
        state: ResourceState::Stable,
        provider_state: "NORMAL".to_string(),
        started: true,
        network_domain_id: "nd-1".to_string(),
        private_ipv4: Some("10.0.0.5".to_string()),
        public_ipv4: None,
    }
}

#[allow(dead_code)]
pub fn nat_rule(id: &str, internal_ip: &str, external_ip: &str) -> NatRule {
    NatRule {
        id: id.to_string(),
        internal_ip: internal_ip.to_string(),
        external_ip: external_ip.to_string(),
        state: ResourceState::Stable,
        provider_state: "NORMAL".to_string(),
    }
}

#[allow(dead_code)]
pub fn ip_block(id: &str, base_ip: &str) -> PublicIpBlock {
    PublicIpBlock {
        id: id.to_string(),
        base_ip: base_ip.to_string(),
        size: 2,
        state: ResourceState::Stable,
        provider_state: "NORMAL".to_string(),
    }
}

#[allow(dead_code)]
pub fn firewall_rule(id: &str, destination_ip: &str, port_list_id: Option<&str>) -> FirewallRule {
    FirewallRule {
        id: id.to_string(),
        name: format!("fw.{}", id),
        destination_ip: Some(destination_ip.to_string()),
        port_list_id: port_list_id.map(str::to_string),
        state: ResourceState::Stable,
        provider_state: "NORMAL".to_string(),
    }
}

/// Short budgets; tests run on a paused clock so these cost nothing
pub fn fast_poll(timeout_secs: u64) -> PollConfig {
    PollConfig {
        timeout: Duration::from_secs(timeout_secs),
        initial_interval: Duration::from_millis(100),
        max_interval: Duration::from_secs(2),
        multiplier: 1.5,
    }
}

#[allow(dead_code)]
pub fn fast_config() -> TeardownConfig {
    TeardownConfig {
        power_off: fast_poll(60),
        delete: fast_poll(60),
        settle: fast_poll(30),
        ..TeardownConfig::default()
    }
}

/// Route `tracing` output through the test harness; `RUST_LOG` selects levels
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
