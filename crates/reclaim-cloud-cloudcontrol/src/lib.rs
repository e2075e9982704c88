//! CloudControl provider for reclaim
//!
//! Implements [`ResourceStateClient`](reclaim_cloud::ResourceStateClient)
//! and [`OperationStatusClient`](reclaim_cloud::OperationStatusClient) on
//! top of a [`CloudControlApi`] binding, so the core teardown and tracking
//! logic can drive CloudControl network domains.
//!
//! # Features
//!
//! - Provider status labels classified into the core four-way state
//! - NAT rule, public IP block, firewall rule and port list removal
//! - Server power-off and delete
//! - Asynchronous request status
//!
//! # Example
//!
//! ```ignore
//! use reclaim_cloud::{TeardownConfig, TeardownOrchestrator};
//! use reclaim_cloud_cloudcontrol::CloudControlProvider;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(CloudControlProvider::new(api, "na9"));
//! let orchestrator = TeardownOrchestrator::new(provider, TeardownConfig::default());
//! orchestrator.teardown("e75ead52-692f-4314-8725-c8a4f4d13a87").await?;
//! ```

pub mod api;
pub mod error;
pub mod model;
pub mod provider;
pub mod status;

pub use api::CloudControlApi;
pub use error::{CloudControlError, Result};
pub use model::{
    ApiResponse, FirewallEndpoint, FirewallRuleInfo, IpAddressSpec, NatRuleInfo, NetworkInfo,
    NicInfo, PortListRef, PublicIpBlockInfo, RequestInfo, ServerInfo,
};
pub use provider::CloudControlProvider;
pub use status::{ProviderState, RequestStatus};
