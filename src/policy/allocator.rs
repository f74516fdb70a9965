// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy Allocator
//!
//! Places calculated entries into security groups under the per-group
//! rule quota. Each owner resource is handled on its own:
//!
//! 1. read the resource's current groups and pick out its auto-groups;
//! 2. plan the placement, creating `{ip}-auto-{n}` groups when the free
//!    capacity is short; indices held by unbound groups of the same IP are
//!    skipped;
//! 3. submit one create-policies batch per filled group;
//! 4. bind the new groups in front of the existing ones.
//!
//! A failed submission or bind rolls back the batches already committed
//! for that resource and marks all of its entries failed, naming any batch
//! the rollback could not remove. Other resources are unaffected.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::auto_group::{auto_group_name, auto_group_prefix, AutoGroups};
use super::packing::{self, free_capacity};
use crate::config::SecurityPolicyConfig;
use crate::domain::{
    normalize_kind_name, ApplyResult, ApplySecurityPoliciesRequest, ApplySecurityPoliciesResult,
    Direction, PolicyOutcome, SecurityPolicy,
};
use crate::errors::{PolicyError, PolicyResult};
use crate::provider::{PolicyRule, ProviderContext, RegionCatalog, SecurityGroupApi, SecurityGroupRecord};
use crate::resource::ResourceTypeRegistry;

/// Rules committed to one group during the current batch
struct CommittedBatch {
    group_id: String,
    rules: Vec<PolicyRule>,
}

/// Applies security policies to security groups
#[derive(Clone)]
pub struct PolicyAllocator {
    registry: Arc<ResourceTypeRegistry>,
    catalog: Arc<dyn RegionCatalog>,
    groups: Arc<dyn SecurityGroupApi>,
    config: SecurityPolicyConfig,
}

impl PolicyAllocator {
    pub fn new(
        registry: Arc<ResourceTypeRegistry>,
        catalog: Arc<dyn RegionCatalog>,
        groups: Arc<dyn SecurityGroupApi>,
        config: SecurityPolicyConfig,
    ) -> Self {
        Self {
            registry,
            catalog,
            groups,
            config,
        }
    }

    /// Reject a batch with entries that can't be addressed
    pub fn validate(request: &ApplySecurityPoliciesRequest) -> PolicyResult<()> {
        let directions = [
            (Direction::Ingress, &request.ingress_policies),
            (Direction::Egress, &request.egress_policies),
        ];
        for (direction, policies) in directions {
            for (position, policy) in policies.iter().enumerate() {
                if policy.ip.trim().is_empty() || policy.id.trim().is_empty() {
                    return Err(PolicyError::Validation(format!(
                        "{} policy[{}] has an empty ip or id",
                        direction, position
                    )));
                }
            }
        }
        Ok(())
    }

    /// Apply both directions and report every entry's outcome
    ///
    /// Only validation fails the call; provider failures end up in the
    /// per-direction reports.
    pub async fn apply(
        &self,
        request: &ApplySecurityPoliciesRequest,
    ) -> PolicyResult<ApplySecurityPoliciesResult> {
        Self::validate(request)?;
        let start = Instant::now();

        let ingress_result = self
            .apply_direction(Direction::Ingress, request.ingress_policies.clone())
            .await;
        let egress_result = self
            .apply_direction(Direction::Egress, request.egress_policies.clone())
            .await;

        let result = ApplySecurityPoliciesResult {
            time_taken: format!("{:?}", start.elapsed()),
            ingress_result,
            egress_result,
        };

        info!(
            ingress_success = result.ingress_result.success_total,
            egress_success = result.egress_result.success_total,
            undo = result.ingress_result.undo_total + result.egress_result.undo_total,
            failed = result.failed_total(),
            time_taken = %result.time_taken,
            "Applied security policies"
        );
        Ok(result)
    }

    async fn apply_direction(
        &self,
        direction: Direction,
        mut policies: Vec<SecurityPolicy>,
    ) -> ApplyResult {
        let mut by_ip: Vec<(String, Vec<usize>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (index, policy) in policies.iter_mut().enumerate() {
            policy.resource_type = normalize_kind_name(&policy.resource_type);

            if !policy.support_security_group_api {
                let reason = format!(
                    "instance type({}) does not support security group api",
                    policy.resource_type
                );
                policy.apply_outcome(PolicyOutcome::Undo { reason });
                continue;
            }

            match positions.get(&policy.ip) {
                Some(&slot) => by_ip[slot].1.push(index),
                None => {
                    positions.insert(policy.ip.clone(), by_ip.len());
                    by_ip.push((policy.ip.clone(), vec![index]));
                }
            }
        }

        for (ip, indices) in by_ip {
            let entries: Vec<&SecurityPolicy> = indices.iter().map(|&i| &policies[i]).collect();

            let outcomes: Vec<PolicyOutcome> = match self.apply_resource(direction, &ip, &entries).await {
                Ok(group_ids) => group_ids
                    .into_iter()
                    .map(|security_group_id| PolicyOutcome::Success { security_group_id })
                    .collect(),
                Err(e) => {
                    error!(ip = %ip, direction = %direction, error = %e, "Failed to apply policies");
                    vec![PolicyOutcome::failed(&e); indices.len()]
                }
            };

            for (index, outcome) in indices.into_iter().zip(outcomes) {
                policies[index].apply_outcome(outcome);
            }
        }

        ApplyResult::from_policies(policies)
    }

    /// Place the entries of one resource, returning each entry's group id
    async fn apply_resource(
        &self,
        direction: Direction,
        ip: &str,
        entries: &[&SecurityPolicy],
    ) -> PolicyResult<Vec<String>> {
        let Some(first) = entries.first() else {
            return Ok(Vec::new());
        };

        let resource_type = self.registry.lookup_by_name(&first.resource_type)?;
        let ctx = self.catalog.provider_context(&first.region).await?;
        let instance = resource_type
            .query_instances_by_id(&ctx, std::slice::from_ref(&first.id))
            .await?
            .remove(&first.id)
            .ok_or_else(|| {
                PolicyError::NotFound(format!(
                    "{} instance({}) can't be found",
                    first.resource_type, first.id
                ))
            })?;

        let existing = instance.query_security_groups(&ctx).await?;
        let bound = self.describe_bound_groups(&ctx, &existing).await?;
        let mut auto = AutoGroups::detect(ip, &bound);

        let quota = self.config.rule_quota;
        let mut free = Vec::with_capacity(auto.groups.len());
        for group in &auto.groups {
            let occupied = self
                .groups
                .describe_policies(&ctx, &group.id)
                .await?
                .rules(direction)
                .len();
            free.push(free_capacity(quota, occupied));
        }

        let plan = packing::plan(&free, entries.len(), quota)?;
        debug!(
            ip,
            direction = %direction,
            entries = entries.len(),
            auto_groups = auto.groups.len(),
            new_groups = plan.new_groups,
            "Planned security group placement"
        );

        if plan.new_groups > 0 {
            let listed = self
                .groups
                .find_security_groups(&ctx, &auto_group_prefix(ip))
                .await?;
            auto.reserve(ip, &listed);
        }

        let mut created = Vec::with_capacity(plan.new_groups);
        for offset in 0..plan.new_groups {
            let name = auto_group_name(ip, auto.next_index + offset as u32);
            let id = self
                .groups
                .create_security_group(&ctx, &name, &self.config.auto_group_description)
                .await
                .map_err(|e| {
                    error!(ip, name = %name, error = %e, "Failed to create security group");
                    PolicyError::from(e)
                })?;
            info!(ip, name = %name, id = %id, "Created security group");
            created.push(id);
        }

        let targets: Vec<String> = auto.ids().into_iter().chain(created.iter().cloned()).collect();
        let mut assigned = vec![String::new(); entries.len()];
        let mut committed: Vec<CommittedBatch> = Vec::new();

        for (position, slice) in plan.filled() {
            let group_id = &targets[position];
            let rules: Vec<PolicyRule> = entries[slice.clone()]
                .iter()
                .map(|policy| PolicyRule::from(*policy))
                .collect();

            if let Err(e) = self
                .groups
                .create_policies(&ctx, group_id, direction, &rules)
                .await
            {
                error!(ip, group_id = %group_id, error = %e, "Failed to create policies");
                let failures = self.rollback(&ctx, direction, &committed).await;
                return Err(PolicyError::from(e).with_rollback_failures(failures));
            }

            debug!(ip, group_id = %group_id, rules = rules.len(), "Committed policies");
            for slot in &mut assigned[slice] {
                *slot = group_id.clone();
            }
            committed.push(CommittedBatch {
                group_id: group_id.clone(),
                rules,
            });
        }

        if !created.is_empty() {
            let bind_ids: Vec<String> = created.iter().chain(existing.iter()).cloned().collect();
            if let Err(e) = instance.bind_security_groups(&ctx, &bind_ids).await {
                error!(ip, id = %instance.id(), error = %e, "Failed to bind security groups");
                let failures = self.rollback(&ctx, direction, &committed).await;
                return Err(e.with_rollback_failures(failures));
            }
            info!(
                ip,
                id = %instance.id(),
                name = %instance.name(),
                groups = ?bind_ids,
                "Bound security groups"
            );
        }

        Ok(assigned)
    }

    /// Names of the bound groups, in bind order
    async fn describe_bound_groups(
        &self,
        ctx: &ProviderContext,
        group_ids: &[String],
    ) -> PolicyResult<Vec<SecurityGroupRecord>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let described: HashMap<String, SecurityGroupRecord> = self
            .groups
            .describe_security_groups(ctx, group_ids)
            .await?
            .into_iter()
            .map(|group| (group.id.clone(), group))
            .collect();

        group_ids
            .iter()
            .map(|id| {
                described.get(id).cloned().ok_or_else(|| {
                    PolicyError::NotFound(format!("security group({}) can't be found", id))
                })
            })
            .collect()
    }

    /// Delete the rules this batch added, returning what could not be deleted
    async fn rollback(
        &self,
        ctx: &ProviderContext,
        direction: Direction,
        committed: &[CommittedBatch],
    ) -> Vec<String> {
        let mut failures = Vec::new();
        for batch in committed {
            match self
                .groups
                .delete_policies(ctx, &batch.group_id, direction, &batch.rules)
                .await
            {
                Ok(()) => info!(
                    group_id = %batch.group_id,
                    rules = batch.rules.len(),
                    "Rolled back policies"
                ),
                Err(e) => {
                    warn!(
                        group_id = %batch.group_id,
                        rules = batch.rules.len(),
                        error = %e,
                        "Rollback of policies failed"
                    );
                    failures.push(format!("security group({}): {}", batch.group_id, e));
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(ip: &str, id: &str) -> SecurityPolicy {
        SecurityPolicy {
            ip: ip.into(),
            id: id.into(),
            resource_type: "cvm".into(),
            support_security_group_api: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_ip_and_id() {
        let ok = ApplySecurityPoliciesRequest {
            ingress_policies: vec![policy("10.0.0.1", "ins-1")],
            egress_policies: vec![],
        };
        assert!(PolicyAllocator::validate(&ok).is_ok());

        let missing_id = ApplySecurityPoliciesRequest {
            ingress_policies: vec![],
            egress_policies: vec![policy("10.0.0.1", "ins-1"), policy("10.0.0.2", " ")],
        };
        let err = PolicyAllocator::validate(&missing_id).unwrap_err();
        assert_eq!(
            err,
            PolicyError::Validation("egress policy[1] has an empty ip or id".into())
        );
    }
}
