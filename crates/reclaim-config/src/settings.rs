//! Settings file schema
//!
//! Every field is optional; a missing field takes the same default as the
//! corresponding core type.
//!
//! ```yaml
//! poll:
//!   initial_interval_ms: 1000
//!   max_interval_ms: 10000
//!   multiplier: 1.5
//! teardown:
//!   power_off_timeout_secs: 300
//!   delete_timeout_secs: 600
//!   settle_timeout_secs: 300
//!   transitional: await_settle
//!   failed_member: skip
//!   concurrent_member_deletes: false
//! operations:
//!   job_timeout_secs: 1200
//!   provisioning_timeout_secs: 1800
//! ```

use crate::error::{ConfigError, Result};
use reclaim_cloud::{
    FailedMemberPolicy, OperationConfig, PollConfig, TeardownConfig, TransitionalPolicy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub poll: PollSettings,
    pub teardown: TeardownSettings,
    pub operations: OperationSettings,
}

/// Probe schedule shared by every wait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1_000,
            max_interval_ms: 10_000,
            multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeardownSettings {
    pub power_off_timeout_secs: u64,
    pub delete_timeout_secs: u64,
    pub settle_timeout_secs: u64,
    pub transitional: TransitionalPolicy,
    pub failed_member: FailedMemberPolicy,
    pub concurrent_member_deletes: bool,
}

impl Default for TeardownSettings {
    fn default() -> Self {
        Self {
            power_off_timeout_secs: 5 * 60,
            delete_timeout_secs: 10 * 60,
            settle_timeout_secs: 5 * 60,
            transitional: TransitionalPolicy::default(),
            failed_member: FailedMemberPolicy::default(),
            concurrent_member_deletes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationSettings {
    pub job_timeout_secs: u64,
    pub provisioning_timeout_secs: u64,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            job_timeout_secs: 20 * 60,
            provisioning_timeout_secs: 30 * 60,
        }
    }
}

impl Settings {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the poller cannot honour
    pub fn validate(&self) -> Result<()> {
        let poll = &self.poll;
        if poll.initial_interval_ms == 0 {
            return Err(ConfigError::invalid("poll.initial_interval_ms", "must be positive"));
        }
        if poll.initial_interval_ms > poll.max_interval_ms {
            return Err(ConfigError::invalid(
                "poll.initial_interval_ms",
                format!(
                    "{} exceeds poll.max_interval_ms ({})",
                    poll.initial_interval_ms, poll.max_interval_ms
                ),
            ));
        }
        if !poll.multiplier.is_finite() || poll.multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "poll.multiplier",
                format!("{} is below 1.0", poll.multiplier),
            ));
        }

        let timeouts = [
            ("teardown.power_off_timeout_secs", self.teardown.power_off_timeout_secs),
            ("teardown.delete_timeout_secs", self.teardown.delete_timeout_secs),
            ("teardown.settle_timeout_secs", self.teardown.settle_timeout_secs),
            ("operations.job_timeout_secs", self.operations.job_timeout_secs),
            (
                "operations.provisioning_timeout_secs",
                self.operations.provisioning_timeout_secs,
            ),
        ];
        for (field, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::invalid(field, "must be positive"));
            }
        }

        Ok(())
    }

    /// Poll schedule from these settings with the given budget
    pub fn poll_config(&self, timeout: Duration) -> PollConfig {
        PollConfig {
            timeout,
            initial_interval: Duration::from_millis(self.poll.initial_interval_ms),
            max_interval: Duration::from_millis(self.poll.max_interval_ms),
            multiplier: self.poll.multiplier,
        }
    }

    pub fn teardown_config(&self) -> TeardownConfig {
        let teardown = &self.teardown;
        TeardownConfig {
            power_off: self.poll_config(Duration::from_secs(teardown.power_off_timeout_secs)),
            delete: self.poll_config(Duration::from_secs(teardown.delete_timeout_secs)),
            settle: self.poll_config(Duration::from_secs(teardown.settle_timeout_secs)),
            transitional: teardown.transitional,
            failed_member: teardown.failed_member,
            concurrent_member_deletes: teardown.concurrent_member_deletes,
        }
    }

    pub fn operation_config(&self) -> OperationConfig {
        OperationConfig {
            job: self.poll_config(Duration::from_secs(self.operations.job_timeout_secs)),
            provisioning: self.poll_config(Duration::from_secs(
                self.operations.provisioning_timeout_secs,
            )),
        }
    }
}
