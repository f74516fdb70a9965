// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Resolver
//!
//! Answers "which managed resource owns this IP" by scanning every region
//! and, within each, every registered resource type.

use std::sync::Arc;
use tracing::{debug, error};

use super::{ResourceInstance, ResourceTypeRegistry};
use crate::errors::{PolicyError, PolicyResult};
use crate::provider::{ProviderContext, RegionCatalog};

/// Resolves IPs to managed instances
#[derive(Clone)]
pub struct InstanceResolver {
    registry: Arc<ResourceTypeRegistry>,
    catalog: Arc<dyn RegionCatalog>,
}

impl InstanceResolver {
    pub fn new(registry: Arc<ResourceTypeRegistry>, catalog: Arc<dyn RegionCatalog>) -> Self {
        Self { registry, catalog }
    }

    pub fn registry(&self) -> &ResourceTypeRegistry {
        &self.registry
    }

    /// Provider context for one region
    pub async fn provider_context(&self, region: &str) -> PolicyResult<ProviderContext> {
        Ok(self.catalog.provider_context(region).await?)
    }

    /// Find the instance that owns `ip`
    ///
    /// Stops at the first match. Provider errors abort the scan; an IP no
    /// type owns in any region is NotFound.
    pub async fn resolve_by_ip(&self, ip: &str) -> PolicyResult<Arc<dyn ResourceInstance>> {
        let regions = self.catalog.regions().await.map_err(|e| {
            error!(error = %e, "Failed to list regions");
            PolicyError::from(e)
        })?;
        let query = [ip.to_string()];

        for region in &regions {
            let ctx = self.catalog.provider_context(region).await?;

            for resource_type in self.registry.types() {
                let mut instances = resource_type
                    .query_instances_by_ip(&ctx, &query)
                    .await
                    .map_err(|e| {
                        error!(
                            ip,
                            region = %region,
                            kind = %resource_type.kind(),
                            error = %e,
                            "Instance lookup by IP failed"
                        );
                        e
                    })?;

                if let Some(instance) = instances.remove(ip) {
                    debug!(
                        ip,
                        region = %region,
                        kind = %instance.kind(),
                        id = %instance.id(),
                        "Resolved IP to managed instance"
                    );
                    return Ok(instance);
                }
            }
        }

        debug!(ip, "IP is not owned by any managed resource");
        Err(PolicyError::NotFound(format!("ip({}) can't be found", ip)))
    }
}
