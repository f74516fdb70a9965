// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud Provider Collaborator Interfaces
//!
//! The policy engine never talks to a vendor API directly. It calls the
//! traits in this module, which an adapter implements on top of the real
//! SDK. Every call is remote and fallible; the engine neither retries nor
//! caches results across requests.
//!
//! # Collaborators
//!
//! ```text
//! RegionCatalog      regions + per-region provider context
//! ResourceLookup     per-kind instance lookup, group membership, binding
//! LoadBalancerApi    listener → backend expansion
//! SecurityGroupApi   group query and mutation
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Direction, SecurityPolicy};

pub mod memory;

pub use memory::{InMemoryCloud, Inventory};

/// Errors reported by provider collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Referenced object does not exist on the provider
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    /// Provider rejected the request
    #[error("provider rejected request: {message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// Call could not be completed
    #[error("transport error: {0}")]
    Transport(String),

    /// Call did not finish in time
    #[error("timed out: {0}")]
    Timeout(String),
}

impl ProviderError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            code: None,
            message: message.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Per-region handle passed to every provider call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderContext {
    pub region: String,
}

impl ProviderContext {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

/// Instance as reported by a resource lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub name: String,
    pub ip: String,
}

/// Backend registered behind a load balancer listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRecord {
    pub instance_id: String,
    pub port: u16,
}

/// Security group summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRecord {
    pub id: String,
    pub name: String,
}

/// Provider-side rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub protocol: String,
    pub port: String,
    pub cidr_block: String,
    /// Upper-cased action
    pub action: String,
    pub description: String,
}

impl From<&SecurityPolicy> for PolicyRule {
    fn from(policy: &SecurityPolicy) -> Self {
        Self {
            protocol: policy.protocol.clone(),
            port: policy.ports.clone(),
            cidr_block: policy.peer_ip.clone(),
            action: policy.action.to_uppercase(),
            description: policy.description.clone(),
        }
    }
}

/// Rules of one group, split by direction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub ingress: Vec<PolicyRule>,
    pub egress: Vec<PolicyRule>,
}

impl PolicySet {
    pub fn rules(&self, direction: Direction) -> &[PolicyRule] {
        match direction {
            Direction::Ingress => &self.ingress,
            Direction::Egress => &self.egress,
        }
    }
}

/// Region enumeration and client construction
#[async_trait]
pub trait RegionCatalog: Send + Sync {
    /// Every region the engine may find resources in
    async fn regions(&self) -> ProviderResult<Vec<String>>;

    /// Build the provider context for one region
    async fn provider_context(&self, region: &str) -> ProviderResult<ProviderContext>;
}

/// Instance lookup and security-group binding for one resource kind
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    async fn query_by_ids(
        &self,
        ctx: &ProviderContext,
        ids: &[String],
    ) -> ProviderResult<Vec<InstanceRecord>>;

    async fn query_by_ips(
        &self,
        ctx: &ProviderContext,
        ips: &[String],
    ) -> ProviderResult<Vec<InstanceRecord>>;

    /// Ids of the groups currently bound to the instance, in bind order
    async fn query_security_groups(
        &self,
        ctx: &ProviderContext,
        instance_id: &str,
    ) -> ProviderResult<Vec<String>>;

    /// Replace the instance's group membership
    async fn bind_security_groups(
        &self,
        ctx: &ProviderContext,
        instance_id: &str,
        group_ids: &[String],
    ) -> ProviderResult<()>;
}

/// Load balancer listener queries
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    async fn query_backends(
        &self,
        ctx: &ProviderContext,
        load_balancer_id: &str,
        protocol: &str,
        port: u16,
    ) -> ProviderResult<Vec<BackendRecord>>;
}

/// Security group query and mutation
#[async_trait]
pub trait SecurityGroupApi: Send + Sync {
    async fn describe_security_groups(
        &self,
        ctx: &ProviderContext,
        group_ids: &[String],
    ) -> ProviderResult<Vec<SecurityGroupRecord>>;

    /// Every group of the region whose name starts with `name_prefix`
    async fn find_security_groups(
        &self,
        ctx: &ProviderContext,
        name_prefix: &str,
    ) -> ProviderResult<Vec<SecurityGroupRecord>>;

    async fn describe_policies(
        &self,
        ctx: &ProviderContext,
        group_id: &str,
    ) -> ProviderResult<PolicySet>;

    /// Create an empty group, returning its id
    async fn create_security_group(
        &self,
        ctx: &ProviderContext,
        name: &str,
        description: &str,
    ) -> ProviderResult<String>;

    /// Add rules to a group as one batch
    async fn create_policies(
        &self,
        ctx: &ProviderContext,
        group_id: &str,
        direction: Direction,
        rules: &[PolicyRule],
    ) -> ProviderResult<()>;

    /// Remove the given rules from a group
    async fn delete_policies(
        &self,
        ctx: &ProviderContext,
        group_id: &str,
        direction: Direction,
        rules: &[PolicyRule],
    ) -> ProviderResult<()>;
}
