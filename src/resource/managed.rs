// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider-Backed Resource Types
//!
//! [`ManagedResourceType`] serves every kind whose instances are plain
//! endpoints (databases, virtual machines, caches, document stores).
//! [`LoadBalancerResourceType`] adds listener expansion: backends are
//! resolved through the compute lookup and tagged as
//! [`ResourceKind::ClbCvm`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{BackendTarget, InstanceMap, ResourceInstance, ResourceType};
use crate::domain::ResourceKind;
use crate::errors::{PolicyError, PolicyResult};
use crate::provider::{InstanceRecord, LoadBalancerApi, ProviderContext, ResourceLookup};

/// Resource type backed by one provider lookup service
pub struct ManagedResourceType {
    kind: ResourceKind,
    lookup: Arc<dyn ResourceLookup>,
}

impl ManagedResourceType {
    pub fn new(kind: ResourceKind, lookup: Arc<dyn ResourceLookup>) -> Self {
        Self { kind, lookup }
    }

    fn instance(&self, ctx: &ProviderContext, record: InstanceRecord) -> Arc<dyn ResourceInstance> {
        Arc::new(ManagedInstance::new(
            self.kind,
            record,
            &ctx.region,
            Arc::clone(&self.lookup),
        ))
    }
}

#[async_trait]
impl ResourceType for ManagedResourceType {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn query_instances_by_id(
        &self,
        ctx: &ProviderContext,
        ids: &[String],
    ) -> PolicyResult<InstanceMap> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.lookup.query_by_ids(ctx, ids).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.id.clone(), self.instance(ctx, record)))
            .collect())
    }

    async fn query_instances_by_ip(
        &self,
        ctx: &ProviderContext,
        ips: &[String],
    ) -> PolicyResult<InstanceMap> {
        if ips.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.lookup.query_by_ips(ctx, ips).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.ip.clone(), self.instance(ctx, record)))
            .collect())
    }
}

/// Instance of a plain endpoint kind
pub struct ManagedInstance {
    kind: ResourceKind,
    record: InstanceRecord,
    region: String,
    lookup: Arc<dyn ResourceLookup>,
}

impl ManagedInstance {
    pub fn new(
        kind: ResourceKind,
        record: InstanceRecord,
        region: &str,
        lookup: Arc<dyn ResourceLookup>,
    ) -> Self {
        Self {
            kind,
            record,
            region: region.to_string(),
            lookup,
        }
    }
}

#[async_trait]
impl ResourceInstance for ManagedInstance {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn id(&self) -> &str {
        &self.record.id
    }

    fn name(&self) -> &str {
        &self.record.name
    }

    fn ip(&self) -> &str {
        &self.record.ip
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn query_security_groups(&self, ctx: &ProviderContext) -> PolicyResult<Vec<String>> {
        Ok(self.lookup.query_security_groups(ctx, &self.record.id).await?)
    }

    async fn bind_security_groups(
        &self,
        ctx: &ProviderContext,
        group_ids: &[String],
    ) -> PolicyResult<()> {
        Ok(self
            .lookup
            .bind_security_groups(ctx, &self.record.id, group_ids)
            .await?)
    }

    async fn backend_targets(
        &self,
        _ctx: &ProviderContext,
        _protocol: &str,
        _port: u16,
    ) -> PolicyResult<Vec<BackendTarget>> {
        Err(PolicyError::Capability(format!(
            "{} instance({}) is not a load balancer",
            self.kind, self.record.id
        )))
    }
}

/// Load balancer resource type
pub struct LoadBalancerResourceType {
    lookup: Arc<dyn ResourceLookup>,
    balancer: Arc<dyn LoadBalancerApi>,
    backend_lookup: Arc<dyn ResourceLookup>,
}

impl LoadBalancerResourceType {
    /// `backend_lookup` resolves backend instance ids (compute lookup)
    pub fn new(
        lookup: Arc<dyn ResourceLookup>,
        balancer: Arc<dyn LoadBalancerApi>,
        backend_lookup: Arc<dyn ResourceLookup>,
    ) -> Self {
        Self {
            lookup,
            balancer,
            backend_lookup,
        }
    }

    fn instance(&self, ctx: &ProviderContext, record: InstanceRecord) -> Arc<dyn ResourceInstance> {
        Arc::new(LoadBalancerInstance {
            inner: ManagedInstance::new(
                ResourceKind::Clb,
                record,
                &ctx.region,
                Arc::clone(&self.lookup),
            ),
            balancer: Arc::clone(&self.balancer),
            backend_lookup: Arc::clone(&self.backend_lookup),
        })
    }
}

#[async_trait]
impl ResourceType for LoadBalancerResourceType {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Clb
    }

    async fn query_instances_by_id(
        &self,
        ctx: &ProviderContext,
        ids: &[String],
    ) -> PolicyResult<InstanceMap> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.lookup.query_by_ids(ctx, ids).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.id.clone(), self.instance(ctx, record)))
            .collect())
    }

    async fn query_instances_by_ip(
        &self,
        ctx: &ProviderContext,
        ips: &[String],
    ) -> PolicyResult<InstanceMap> {
        if ips.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.lookup.query_by_ips(ctx, ips).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.ip.clone(), self.instance(ctx, record)))
            .collect())
    }
}

/// Load balancer instance with live backend expansion
pub struct LoadBalancerInstance {
    inner: ManagedInstance,
    balancer: Arc<dyn LoadBalancerApi>,
    backend_lookup: Arc<dyn ResourceLookup>,
}

#[async_trait]
impl ResourceInstance for LoadBalancerInstance {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Clb
    }

    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn ip(&self) -> &str {
        self.inner.ip()
    }

    fn region(&self) -> &str {
        self.inner.region()
    }

    async fn query_security_groups(&self, ctx: &ProviderContext) -> PolicyResult<Vec<String>> {
        self.inner.query_security_groups(ctx).await
    }

    async fn bind_security_groups(
        &self,
        ctx: &ProviderContext,
        group_ids: &[String],
    ) -> PolicyResult<()> {
        self.inner.bind_security_groups(ctx, group_ids).await
    }

    async fn backend_targets(
        &self,
        ctx: &ProviderContext,
        protocol: &str,
        port: u16,
    ) -> PolicyResult<Vec<BackendTarget>> {
        let backends = self
            .balancer
            .query_backends(ctx, self.id(), protocol, port)
            .await?;
        debug!(
            load_balancer = %self.id(),
            protocol,
            port,
            backends = backends.len(),
            "Queried load balancer backends"
        );
        if backends.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = backends.iter().map(|b| b.instance_id.clone()).collect();
        ids.dedup();
        let records: HashMap<String, InstanceRecord> = self
            .backend_lookup
            .query_by_ids(ctx, &ids)
            .await?
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        backends
            .into_iter()
            .map(|backend| {
                let record = records.get(&backend.instance_id).cloned().ok_or_else(|| {
                    PolicyError::NotFound(format!(
                        "backend instance({}) of load balancer({}) can't be found",
                        backend.instance_id,
                        self.id()
                    ))
                })?;
                let instance: Arc<dyn ResourceInstance> = Arc::new(ManagedInstance::new(
                    ResourceKind::ClbCvm,
                    record,
                    &ctx.region,
                    Arc::clone(&self.backend_lookup),
                ));
                Ok(BackendTarget {
                    instance,
                    port: backend.port.to_string(),
                })
            })
            .collect()
    }
}
