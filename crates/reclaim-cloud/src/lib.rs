//! Reclaim Cloud Core
//!
//! Provider-agnostic engine for driving eventually-consistent cloud APIs:
//! bounded convergence polling, asynchronous operation tracking and the
//! dependency-ordered teardown of a compute node.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               TeardownOrchestrator               │
//! │   NAT rules → IP blocks → firewall rules →       │
//! │   power-off → delete                             │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────────┐
//! │  StateProbe   │ │ OperationTracker  │
//! └───────┬───────┘ └───────┬───────────┘
//!         │                 │
//! ┌───────▼─────────────────▼───────────────────────┐
//! │        ConvergencePoller  (+ WaitContext)        │
//! └───────────────────────┬─────────────────────────┘
//!                         │
//! ┌───────────────────────▼─────────────────────────┐
//! │  trait ResourceStateClient / OperationStatusClient │
//! │        (implemented per provider adapter)        │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod error;
pub mod job;
pub mod poller;
pub mod probe;
pub mod provider;
pub mod report;
pub mod state;
pub mod teardown;

// Re-exports
pub use context::{CancelHandle, Interrupt, WaitContext};
pub use error::{CloudError, ErrorKind, OperationError, PollError, Result, TeardownError};
pub use job::{Job, JobStatus, OperationConfig, OperationTracker, StatusHandle};
pub use poller::{ConvergencePoller, PollConfig, PollOutcome, await_until};
pub use probe::{NodeProbe, StateProbe, await_absent, await_settled, await_state};
pub use provider::{OperationStatusClient, ResourceStateClient};
pub use report::{ResourceRef, SkippedResource, TeardownReport, TeardownStep, TeardownSummary};
pub use state::{
    Dependent, FirewallRule, NatRule, Node, PublicIpBlock, ResourceCategory, ResourceState,
    Trackable,
};
pub use teardown::{FailedMemberPolicy, TeardownConfig, TeardownOrchestrator, TransitionalPolicy};
