// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Type Registry
//!
//! Maps each [`ResourceKind`] to its [`ResourceType`] implementation. The
//! registry is assembled once through [`ResourceTypeRegistryBuilder`] and is
//! immutable afterwards, so it is shared behind an `Arc` without locking.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use super::{LoadBalancerResourceType, ManagedResourceType, ResourceType};
use crate::domain::ResourceKind;
use crate::errors::{PolicyError, PolicyResult};
use crate::provider::{LoadBalancerApi, ResourceLookup};

/// Collects registrations before the registry is frozen
#[derive(Default)]
pub struct ResourceTypeRegistryBuilder {
    types: BTreeMap<ResourceKind, Arc<dyn ResourceType>>,
}

impl ResourceTypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type
    ///
    /// Registering a kind twice logs a warning; the last registration wins.
    pub fn register(mut self, kind: ResourceKind, resource_type: Arc<dyn ResourceType>) -> Self {
        if self.types.insert(kind, resource_type).is_some() {
            warn!(kind = %kind, "Resource type was registered twice, keeping the latest");
        }
        self
    }

    pub fn build(self) -> ResourceTypeRegistry {
        ResourceTypeRegistry { types: self.types }
    }
}

/// Immutable kind → resource type mapping
#[derive(Clone)]
pub struct ResourceTypeRegistry {
    types: BTreeMap<ResourceKind, Arc<dyn ResourceType>>,
}

impl ResourceTypeRegistry {
    pub fn builder() -> ResourceTypeRegistryBuilder {
        ResourceTypeRegistryBuilder::new()
    }

    /// Registry with every standard kind wired to its provider lookup
    ///
    /// `lookup_for` supplies the lookup service of each kind; load balancer
    /// backends are resolved through the compute lookup.
    pub fn standard<F>(lookup_for: F, balancer: Arc<dyn LoadBalancerApi>) -> Self
    where
        F: Fn(ResourceKind) -> Arc<dyn ResourceLookup>,
    {
        let mut builder = Self::builder();
        for kind in ResourceKind::REGISTRABLE {
            let resource_type: Arc<dyn ResourceType> = if kind.is_load_balancer() {
                Arc::new(LoadBalancerResourceType::new(
                    lookup_for(kind),
                    Arc::clone(&balancer),
                    lookup_for(ResourceKind::Cvm),
                ))
            } else {
                Arc::new(ManagedResourceType::new(kind, lookup_for(kind)))
            };
            builder = builder.register(kind, resource_type);
        }
        builder.build()
    }

    /// Look up the type registered for a kind
    pub fn lookup(&self, kind: ResourceKind) -> PolicyResult<Arc<dyn ResourceType>> {
        self.types
            .get(&kind)
            .cloned()
            .ok_or_else(|| PolicyError::NotFound(format!("resourceType[{}] not found", kind)))
    }

    /// Look up a type by its wire name
    pub fn lookup_by_name(&self, name: &str) -> PolicyResult<Arc<dyn ResourceType>> {
        let kind = ResourceKind::parse(name)
            .ok_or_else(|| PolicyError::NotFound(format!("resourceType[{}] not found", name)))?;
        self.lookup(kind)
    }

    /// Registered types in stable kind order
    pub fn types(&self) -> impl Iterator<Item = &Arc<dyn ResourceType>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
