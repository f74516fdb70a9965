//! Security-group policy engine for managed cloud resources
//!
//! This crate computes the firewall rules a traffic description implies
//! and places them into security groups under the provider's rule quota,
//! creating and binding `{ip}-auto-{n}` groups as needed.

pub mod config;
pub mod domain;
pub mod errors;
pub mod policy;
pub mod provider;
pub mod resource;
pub mod service;

// Re-export commonly used types
pub use config::SecurityPolicyConfig;
pub use errors::{PolicyError, PolicyResult};
pub use policy::{PolicyAllocator, PolicyCalculator};
pub use service::{ActionOutcome, SecurityPolicyEngine, SecurityPolicyService};
