// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Abstraction
//!
//! Two capability interfaces hide the differences between managed resource
//! kinds from the policy engine:
//!
//! - [`ResourceType`] - one per kind; resolves ids or IPs to instances and
//!   declares whether the kind is a load balancer and whether outbound
//!   rules make sense for it.
//! - [`ResourceInstance`] - one per looked-up resource; exposes identity,
//!   group membership, binding and (load balancers only) backend expansion.
//!
//! # Architecture
//!
//! ```text
//! InstanceResolver ──► ResourceTypeRegistry ──► ResourceType ──► ResourceLookup (provider)
//!                                                    │
//!                                                    ▼
//!                                             ResourceInstance
//! ```
//!
//! New kinds are added as [`ResourceKind`] variants plus a registration;
//! call sites never branch on the concrete kind.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::ResourceKind;
use crate::errors::PolicyResult;
use crate::provider::ProviderContext;

pub mod managed;
pub mod registry;
pub mod resolver;

pub use managed::{LoadBalancerResourceType, ManagedInstance, ManagedResourceType};
pub use registry::{ResourceTypeRegistry, ResourceTypeRegistryBuilder};
pub use resolver::InstanceResolver;

/// Instances keyed by id or IP, depending on the query
pub type InstanceMap = HashMap<String, Arc<dyn ResourceInstance>>;

/// Capability interface of one resource kind
#[async_trait]
pub trait ResourceType: Send + Sync {
    /// Kind this type resolves
    fn kind(&self) -> ResourceKind;

    /// Whether instances front backend resources
    fn is_load_balancer(&self) -> bool {
        self.kind().is_load_balancer()
    }

    /// Whether outbound rules are meaningful for this kind
    fn supports_egress_policy(&self) -> bool {
        self.kind().supports_egress_policy()
    }

    /// Resolve instance ids, keyed by id; unknown ids are absent
    async fn query_instances_by_id(
        &self,
        ctx: &ProviderContext,
        ids: &[String],
    ) -> PolicyResult<InstanceMap>;

    /// Resolve instance IPs, keyed by IP; unknown IPs are absent
    async fn query_instances_by_ip(
        &self,
        ctx: &ProviderContext,
        ips: &[String],
    ) -> PolicyResult<InstanceMap>;
}

/// Backend resource receiving traffic from a load balancer listener
#[derive(Clone)]
pub struct BackendTarget {
    pub instance: Arc<dyn ResourceInstance>,
    /// Port the backend itself listens on
    pub port: String,
}

impl fmt::Debug for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendTarget")
            .field("instance", &self.instance.id())
            .field("port", &self.port)
            .finish()
    }
}

/// Polymorphic handle on one managed resource
#[async_trait]
pub trait ResourceInstance: Send + Sync {
    fn kind(&self) -> ResourceKind;
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn ip(&self) -> &str;
    fn region(&self) -> &str;

    fn supports_security_group_api(&self) -> bool {
        self.kind().supports_security_group_api()
    }

    /// Ids of the groups currently bound, in bind order
    async fn query_security_groups(&self, ctx: &ProviderContext) -> PolicyResult<Vec<String>>;

    /// Replace the bound group set
    async fn bind_security_groups(
        &self,
        ctx: &ProviderContext,
        group_ids: &[String],
    ) -> PolicyResult<()>;

    /// Backends behind one listener; only load balancers have any
    async fn backend_targets(
        &self,
        ctx: &ProviderContext,
        protocol: &str,
        port: u16,
    ) -> PolicyResult<Vec<BackendTarget>>;
}
