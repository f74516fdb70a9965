// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Security Policy Management
//!
//! Application service that turns named actions into calls on the policy
//! engine.
//!
//! # Architecture
//!
//! ```text
//! Client Request (action name + JSON)
//!     ↓
//! Service Layer (this module)
//!     ↓
//! PolicyCalculator / PolicyAllocator
//!     ↓
//! Resource types → provider collaborators
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_security_policy::service::{SecurityPolicyEngine, CALC_SECURITY_POLICIES};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = SecurityPolicyEngine::in_memory(cloud, SecurityPolicyConfig::from_env()?);
//!
//!     let outcome = engine.dispatch(CALC_SECURITY_POLICIES, params).await?;
//!     println!("{}", outcome.output);
//!
//!     Ok(())
//! }
//! ```

pub mod security_policy;

pub use security_policy::{
    ActionOutcome, SecurityPolicyEngine, SecurityPolicyService, ACTIONS,
    APPLY_SECURITY_POLICIES, CALC_SECURITY_POLICIES,
};
