//! Summary of a successful teardown

use crate::state::ResourceCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Steps of the teardown state machine, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownStep {
    Discover,
    DeleteNatRules,
    DeletePublicIpBlocks,
    DeleteFirewallRules,
    PowerOff,
    AwaitPoweredOff,
    Delete,
    AwaitDeleted,
    Done,
}

impl std::fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeardownStep::Discover => write!(f, "discover"),
            TeardownStep::DeleteNatRules => write!(f, "delete-nat-rules"),
            TeardownStep::DeletePublicIpBlocks => write!(f, "delete-public-ip-blocks"),
            TeardownStep::DeleteFirewallRules => write!(f, "delete-firewall-rules"),
            TeardownStep::PowerOff => write!(f, "power-off"),
            TeardownStep::AwaitPoweredOff => write!(f, "await-powered-off"),
            TeardownStep::Delete => write!(f, "delete"),
            TeardownStep::AwaitDeleted => write!(f, "await-deleted"),
            TeardownStep::Done => write!(f, "done"),
        }
    }
}

/// A resource touched by the teardown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub category: ResourceCategory,
    pub id: String,
}

impl ResourceRef {
    pub fn new(category: ResourceCategory, id: impl Into<String>) -> Self {
        Self {
            category,
            id: id.into(),
        }
    }
}

/// A dependent resource left in place on purpose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedResource {
    pub resource: ResourceRef,
    /// Provider state label at the time it was skipped
    pub provider_state: String,
    pub reason: String,
}

/// What a successful teardown did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeardownReport {
    pub node_id: String,

    /// The node was already gone when teardown started
    pub node_absent: bool,

    /// Whether a power-off had to be issued
    pub powered_off: bool,

    /// Deleted resources, in deletion order
    pub deleted: Vec<ResourceRef>,

    /// Dependent resources skipped under the failed/transitional policies
    pub skipped: Vec<SkippedResource>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl TeardownReport {
    pub fn new(node_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            node_id: node_id.into(),
            node_absent: false,
            powered_off: false,
            deleted: Vec::new(),
            skipped: Vec::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    pub fn add_deleted(&mut self, category: ResourceCategory, id: impl Into<String>) {
        self.deleted.push(ResourceRef::new(category, id));
    }

    pub fn add_skipped(
        &mut self,
        category: ResourceCategory,
        id: impl Into<String>,
        provider_state: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.skipped.push(SkippedResource {
            resource: ResourceRef::new(category, id),
            provider_state: provider_state.into(),
            reason: reason.into(),
        });
    }

    pub fn deleted_in(&self, category: ResourceCategory) -> Vec<&ResourceRef> {
        self.deleted
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    pub(crate) fn finish(mut self, elapsed: std::time::Duration) -> Self {
        self.finished_at = Utc::now();
        self.duration_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn summary(&self) -> TeardownSummary {
        TeardownSummary {
            deleted: self.deleted.len(),
            skipped: self.skipped.len(),
            node_absent: self.node_absent,
        }
    }
}

/// Counts for log lines and CLI output
#[derive(Debug, Clone, Copy)]
pub struct TeardownSummary {
    pub deleted: usize,
    pub skipped: usize,
    pub node_absent: bool,
}

impl std::fmt::Display for TeardownSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.node_absent {
            return write!(f, "node already absent");
        }
        write!(f, "{} deleted, {} skipped", self.deleted, self.skipped)
    }
}
