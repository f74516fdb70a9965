// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Cloud Provider
//!
//! A complete implementation of the provider collaborator traits backed by
//! process memory. It enforces the same per-direction rule limit a real
//! provider does, records every call it receives and supports injecting
//! rejections, which makes it suitable for dry runs and for exercising the
//! allocator's rollback paths.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cim_security_policy::provider::{InMemoryCloud, Inventory};
//!
//! let inventory: Inventory = serde_json::from_str(r#"{
//!     "regions": [{
//!         "region": "ap-guangzhou",
//!         "instances": [{ "kind": "cvm", "id": "ins-1", "ip": "10.0.0.1" }]
//!     }]
//! }"#).unwrap();
//!
//! let cloud = Arc::new(InMemoryCloud::from_inventory(inventory));
//! assert_eq!(cloud.call_count(), 0);
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::{
    BackendRecord, InstanceRecord, LoadBalancerApi, PolicyRule, PolicySet, ProviderContext,
    ProviderError, ProviderResult, RegionCatalog, ResourceLookup, SecurityGroupApi,
    SecurityGroupRecord,
};
use crate::domain::{Direction, ResourceKind};

/// Default hard limit on rules per group and direction
pub const DEFAULT_RULE_LIMIT: usize = 100;

/// Seed data for an [`InMemoryCloud`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub regions: Vec<RegionInventory>,
}

/// Resources of one region
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionInventory {
    pub region: String,
    #[serde(default)]
    pub instances: Vec<InstanceSeed>,
    #[serde(default)]
    pub listeners: Vec<ListenerSeed>,
    #[serde(default)]
    pub security_groups: Vec<GroupSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSeed {
    pub kind: ResourceKind,
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub ip: String,
    /// Ids of bound groups, in bind order
    #[serde(default)]
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerSeed {
    pub load_balancer_id: String,
    pub protocol: String,
    pub port: u16,
    #[serde(default)]
    pub backends: Vec<BackendRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ingress: Vec<PolicyRule>,
    #[serde(default)]
    pub egress: Vec<PolicyRule>,
}

#[derive(Debug, Clone)]
struct StoredInstance {
    region: String,
    kind: ResourceKind,
    record: InstanceRecord,
    security_groups: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredListener {
    region: String,
    seed: ListenerSeed,
}

#[derive(Debug, Clone)]
struct StoredGroup {
    region: String,
    name: String,
    description: String,
    rules: PolicySet,
}

#[derive(Debug, Default)]
struct Faults {
    reject_policies_for: HashSet<String>,
    reject_bind_for: HashSet<String>,
    reject_deletes_for: HashSet<String>,
    reject_group_creation: bool,
}

#[derive(Debug, Default)]
struct CloudState {
    regions: Vec<String>,
    instances: Vec<StoredInstance>,
    listeners: Vec<StoredListener>,
    groups: BTreeMap<String, StoredGroup>,
    next_group_number: u64,
    rule_limit: usize,
    faults: Faults,
    calls: Vec<String>,
}

impl CloudState {
    fn record(&mut self, call: String) {
        debug!(call = %call, "in-memory provider call");
        self.calls.push(call);
    }

    fn group_in_region(&self, ctx: &ProviderContext, group_id: &str) -> ProviderResult<&StoredGroup> {
        self.groups
            .get(group_id)
            .filter(|group| group.region == ctx.region)
            .ok_or_else(|| ProviderError::NotFound {
                resource: "security group",
                id: group_id.to_string(),
            })
    }
}

/// Cloud provider held entirely in memory
#[derive(Debug)]
pub struct InMemoryCloud {
    state: Mutex<CloudState>,
}

impl Default for InMemoryCloud {
    fn default() -> Self {
        Self::from_inventory(Inventory::default())
    }
}

impl InMemoryCloud {
    /// Build a provider from seed data
    pub fn from_inventory(inventory: Inventory) -> Self {
        let mut state = CloudState {
            rule_limit: DEFAULT_RULE_LIMIT,
            ..Default::default()
        };

        for region in inventory.regions {
            state.regions.push(region.region.clone());

            for seed in region.instances {
                let name = if seed.name.is_empty() {
                    seed.id.clone()
                } else {
                    seed.name
                };
                state.instances.push(StoredInstance {
                    region: region.region.clone(),
                    kind: seed.kind,
                    record: InstanceRecord {
                        id: seed.id,
                        name,
                        ip: seed.ip,
                    },
                    security_groups: seed.security_groups,
                });
            }

            for seed in region.listeners {
                state.listeners.push(StoredListener {
                    region: region.region.clone(),
                    seed,
                });
            }

            for seed in region.security_groups {
                state.groups.insert(
                    seed.id,
                    StoredGroup {
                        region: region.region.clone(),
                        name: seed.name,
                        description: String::new(),
                        rules: PolicySet {
                            ingress: seed.ingress,
                            egress: seed.egress,
                        },
                    },
                );
            }
        }

        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lookup service scoped to one resource kind
    pub fn lookup(self: &Arc<Self>, kind: ResourceKind) -> Arc<dyn ResourceLookup> {
        Arc::new(KindLookup {
            cloud: Arc::clone(self),
            kind,
        })
    }

    /// Override the per-direction rule limit
    pub fn set_rule_limit(&self, limit: usize) {
        self.state().rule_limit = limit;
    }

    /// Reject every create-policies call against the named group
    pub fn reject_policies_for_group(&self, group_name: impl Into<String>) {
        self.state()
            .faults
            .reject_policies_for
            .insert(group_name.into());
    }

    /// Reject bind calls for the instance
    pub fn reject_bind_for_instance(&self, instance_id: impl Into<String>) {
        self.state().faults.reject_bind_for.insert(instance_id.into());
    }

    /// Reject every delete-policies call against the named group
    pub fn reject_deletes_for_group(&self, group_name: impl Into<String>) {
        self.state()
            .faults
            .reject_deletes_for
            .insert(group_name.into());
    }

    /// Reject every create-group call
    pub fn reject_group_creation(&self) {
        self.state().faults.reject_group_creation = true;
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Id of the group with the given name
    pub fn group_id_by_name(&self, name: &str) -> Option<String> {
        self.state()
            .groups
            .iter()
            .find(|(_, group)| group.name == name)
            .map(|(id, _)| id.clone())
    }

    /// Names of every group, sorted
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state()
            .groups
            .values()
            .map(|group| group.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Rules currently held by the named group
    pub fn rules_of(&self, group_name: &str) -> Option<PolicySet> {
        self.state()
            .groups
            .values()
            .find(|group| group.name == group_name)
            .map(|group| group.rules.clone())
    }

    /// Description of the named group
    pub fn description_of(&self, group_name: &str) -> Option<String> {
        self.state()
            .groups
            .values()
            .find(|group| group.name == group_name)
            .map(|group| group.description.clone())
    }

    /// Ids of the groups bound to an instance
    pub fn bound_groups(&self, instance_id: &str) -> Vec<String> {
        self.state()
            .instances
            .iter()
            .find(|instance| instance.record.id == instance_id)
            .map(|instance| instance.security_groups.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RegionCatalog for InMemoryCloud {
    async fn regions(&self) -> ProviderResult<Vec<String>> {
        let mut state = self.state();
        state.record("regions".to_string());
        Ok(state.regions.clone())
    }

    async fn provider_context(&self, region: &str) -> ProviderResult<ProviderContext> {
        let state = self.state();
        if state.regions.iter().any(|r| r == region) {
            Ok(ProviderContext::new(region))
        } else {
            Err(ProviderError::NotFound {
                resource: "region",
                id: region.to_string(),
            })
        }
    }
}

#[async_trait]
impl LoadBalancerApi for InMemoryCloud {
    async fn query_backends(
        &self,
        ctx: &ProviderContext,
        load_balancer_id: &str,
        protocol: &str,
        port: u16,
    ) -> ProviderResult<Vec<BackendRecord>> {
        let mut state = self.state();
        state.record(format!("query_backends:{}:{}:{}", load_balancer_id, protocol, port));

        Ok(state
            .listeners
            .iter()
            .filter(|listener| {
                listener.region == ctx.region
                    && listener.seed.load_balancer_id == load_balancer_id
                    && listener.seed.protocol.eq_ignore_ascii_case(protocol)
                    && listener.seed.port == port
            })
            .flat_map(|listener| listener.seed.backends.clone())
            .collect())
    }
}

#[async_trait]
impl SecurityGroupApi for InMemoryCloud {
    async fn describe_security_groups(
        &self,
        ctx: &ProviderContext,
        group_ids: &[String],
    ) -> ProviderResult<Vec<SecurityGroupRecord>> {
        let mut state = self.state();
        state.record(format!("describe_security_groups:{}", group_ids.join(",")));

        Ok(group_ids
            .iter()
            .filter_map(|id| {
                state
                    .groups
                    .get(id)
                    .filter(|group| group.region == ctx.region)
                    .map(|group| SecurityGroupRecord {
                        id: id.clone(),
                        name: group.name.clone(),
                    })
            })
            .collect())
    }

    async fn find_security_groups(
        &self,
        ctx: &ProviderContext,
        name_prefix: &str,
    ) -> ProviderResult<Vec<SecurityGroupRecord>> {
        let mut state = self.state();
        state.record(format!("find_security_groups:{}", name_prefix));

        Ok(state
            .groups
            .iter()
            .filter(|(_, group)| group.region == ctx.region && group.name.starts_with(name_prefix))
            .map(|(id, group)| SecurityGroupRecord {
                id: id.clone(),
                name: group.name.clone(),
            })
            .collect())
    }

    async fn describe_policies(
        &self,
        ctx: &ProviderContext,
        group_id: &str,
    ) -> ProviderResult<PolicySet> {
        let mut state = self.state();
        state.record(format!("describe_policies:{}", group_id));
        Ok(state.group_in_region(ctx, group_id)?.rules.clone())
    }

    async fn create_security_group(
        &self,
        ctx: &ProviderContext,
        name: &str,
        description: &str,
    ) -> ProviderResult<String> {
        let mut state = self.state();
        state.record(format!("create_security_group:{}", name));

        if state.faults.reject_group_creation {
            return Err(ProviderError::rejected(format!(
                "security group '{}' could not be created",
                name
            )));
        }

        state.next_group_number += 1;
        let id = format!("sg-mem{:05}", state.next_group_number);
        state.groups.insert(
            id.clone(),
            StoredGroup {
                region: ctx.region.clone(),
                name: name.to_string(),
                description: description.to_string(),
                rules: PolicySet::default(),
            },
        );
        Ok(id)
    }

    async fn create_policies(
        &self,
        ctx: &ProviderContext,
        group_id: &str,
        direction: Direction,
        rules: &[PolicyRule],
    ) -> ProviderResult<()> {
        let mut state = self.state();
        state.record(format!("create_policies:{}:{}:{}", group_id, direction, rules.len()));

        let (name, occupied) = {
            let group = state.group_in_region(ctx, group_id)?;
            (group.name.clone(), group.rules.rules(direction).len())
        };

        if state.faults.reject_policies_for.contains(&name) {
            return Err(ProviderError::rejected(format!(
                "policies for security group '{}' were rejected",
                name
            )));
        }

        let limit = state.rule_limit;
        if occupied + rules.len() > limit {
            return Err(ProviderError::Rejected {
                code: Some("LimitExceeded".to_string()),
                message: format!(
                    "security group '{}' would hold {} {} rules, limit is {}",
                    name,
                    occupied + rules.len(),
                    direction,
                    limit
                ),
            });
        }

        if let Some(group) = state.groups.get_mut(group_id) {
            let target = match direction {
                Direction::Ingress => &mut group.rules.ingress,
                Direction::Egress => &mut group.rules.egress,
            };
            target.extend_from_slice(rules);
        }
        Ok(())
    }

    async fn delete_policies(
        &self,
        ctx: &ProviderContext,
        group_id: &str,
        direction: Direction,
        rules: &[PolicyRule],
    ) -> ProviderResult<()> {
        let mut state = self.state();
        state.record(format!("delete_policies:{}:{}:{}", group_id, direction, rules.len()));
        let name = state.group_in_region(ctx, group_id)?.name.clone();

        if state.faults.reject_deletes_for.contains(&name) {
            return Err(ProviderError::rejected(format!(
                "deleting policies of security group '{}' was rejected",
                name
            )));
        }

        if let Some(group) = state.groups.get_mut(group_id) {
            let target = match direction {
                Direction::Ingress => &mut group.rules.ingress,
                Direction::Egress => &mut group.rules.egress,
            };
            for rule in rules {
                if let Some(position) = target.iter().position(|existing| existing == rule) {
                    target.remove(position);
                }
            }
        }
        Ok(())
    }
}

/// [`ResourceLookup`] view of the cloud restricted to one kind
struct KindLookup {
    cloud: Arc<InMemoryCloud>,
    kind: ResourceKind,
}

impl KindLookup {
    fn matching<F>(&self, ctx: &ProviderContext, predicate: F) -> Vec<InstanceRecord>
    where
        F: Fn(&InstanceRecord) -> bool,
    {
        self.cloud
            .state()
            .instances
            .iter()
            .filter(|instance| {
                instance.kind == self.kind
                    && instance.region == ctx.region
                    && predicate(&instance.record)
            })
            .map(|instance| instance.record.clone())
            .collect()
    }
}

#[async_trait]
impl ResourceLookup for KindLookup {
    async fn query_by_ids(
        &self,
        ctx: &ProviderContext,
        ids: &[String],
    ) -> ProviderResult<Vec<InstanceRecord>> {
        self.cloud
            .state()
            .record(format!("query_by_ids:{}:{}", self.kind, ids.join(",")));
        Ok(self.matching(ctx, |record| ids.contains(&record.id)))
    }

    async fn query_by_ips(
        &self,
        ctx: &ProviderContext,
        ips: &[String],
    ) -> ProviderResult<Vec<InstanceRecord>> {
        self.cloud
            .state()
            .record(format!("query_by_ips:{}:{}", self.kind, ips.join(",")));
        Ok(self.matching(ctx, |record| ips.contains(&record.ip)))
    }

    async fn query_security_groups(
        &self,
        ctx: &ProviderContext,
        instance_id: &str,
    ) -> ProviderResult<Vec<String>> {
        let mut state = self.cloud.state();
        state.record(format!("query_security_groups:{}", instance_id));

        state
            .instances
            .iter()
            .find(|instance| {
                instance.kind == self.kind
                    && instance.region == ctx.region
                    && instance.record.id == instance_id
            })
            .map(|instance| instance.security_groups.clone())
            .ok_or_else(|| ProviderError::NotFound {
                resource: "instance",
                id: instance_id.to_string(),
            })
    }

    async fn bind_security_groups(
        &self,
        ctx: &ProviderContext,
        instance_id: &str,
        group_ids: &[String],
    ) -> ProviderResult<()> {
        let mut state = self.cloud.state();
        state.record(format!(
            "bind_security_groups:{}:{}",
            instance_id,
            group_ids.join(",")
        ));

        if state.faults.reject_bind_for.contains(instance_id) {
            return Err(ProviderError::rejected(format!(
                "binding security groups to '{}' was rejected",
                instance_id
            )));
        }

        for group_id in group_ids {
            state.group_in_region(ctx, group_id)?;
        }

        let kind = self.kind;
        let instance = state
            .instances
            .iter_mut()
            .find(|instance| {
                instance.kind == kind
                    && instance.region == ctx.region
                    && instance.record.id == instance_id
            })
            .ok_or_else(|| ProviderError::NotFound {
                resource: "instance",
                id: instance_id.to_string(),
            })?;
        instance.security_groups = group_ids.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> Arc<InMemoryCloud> {
        let inventory: Inventory = serde_json::from_value(serde_json::json!({
            "regions": [{
                "region": "ap-guangzhou",
                "instances": [
                    { "kind": "cvm", "id": "ins-1", "ip": "10.0.0.1" },
                    { "kind": "mysql", "id": "cdb-1", "ip": "10.0.1.1" }
                ],
                "security_groups": [{ "id": "sg-seed", "name": "base" }]
            }]
        }))
        .unwrap();
        Arc::new(InMemoryCloud::from_inventory(inventory))
    }

    #[tokio::test]
    async fn test_lookup_is_kind_scoped() {
        let cloud = cloud();
        let ctx = ProviderContext::new("ap-guangzhou");

        let cvm = cloud.lookup(ResourceKind::Cvm);
        let found = cvm
            .query_by_ips(&ctx, &["10.0.0.1".to_string(), "10.0.1.1".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "ins-1");
        assert_eq!(found[0].name, "ins-1");
    }

    #[tokio::test]
    async fn test_rule_limit_is_enforced() {
        let cloud = cloud();
        cloud.set_rule_limit(2);
        let ctx = ProviderContext::new("ap-guangzhou");
        let rule = PolicyRule {
            protocol: "TCP".into(),
            port: "80".into(),
            cidr_block: "10.0.0.2".into(),
            action: "ACCEPT".into(),
            description: String::new(),
        };

        cloud
            .create_policies(&ctx, "sg-seed", Direction::Ingress, &[rule.clone(), rule.clone()])
            .await
            .unwrap();
        let err = cloud
            .create_policies(&ctx, "sg-seed", Direction::Ingress, &[rule.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { .. }));

        cloud
            .delete_policies(&ctx, "sg-seed", Direction::Ingress, &[rule])
            .await
            .unwrap();
        assert_eq!(cloud.rules_of("base").unwrap().ingress.len(), 1);
    }

    #[tokio::test]
    async fn test_find_security_groups_by_prefix() {
        let cloud = cloud();
        let ctx = ProviderContext::new("ap-guangzhou");
        let created = cloud
            .create_security_group(&ctx, "10.0.0.1-auto-1", "automation created")
            .await
            .unwrap();

        let found = cloud.find_security_groups(&ctx, "10.0.0.1-auto-").await.unwrap();
        assert_eq!(
            found,
            vec![SecurityGroupRecord {
                id: created,
                name: "10.0.0.1-auto-1".into(),
            }]
        );
        assert!(cloud
            .find_security_groups(&ProviderContext::new("ap-shanghai"), "10.0.0.1-auto-")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_other_region_is_invisible() {
        let cloud = cloud();
        let ctx = ProviderContext::new("ap-shanghai");
        assert!(cloud.describe_policies(&ctx, "sg-seed").await.is_err());
        assert!(cloud.provider_context("ap-shanghai").await.is_err());
    }
}
