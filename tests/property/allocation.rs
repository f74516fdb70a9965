// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Rule Placement
//!
//! The pure plan is checked on arbitrary capacities; the allocator is then
//! driven end to end against the in-memory cloud with `tokio_test::block_on`.

use cim_security_policy::domain::ApplySecurityPoliciesRequest;
use cim_security_policy::policy::packing::plan;
use cim_security_policy::resource::ResourceTypeRegistry;
use cim_security_policy::{PolicyAllocator, SecurityPolicyConfig};
use proptest::prelude::*;
use std::sync::Arc;

use crate::fixtures::{app_policies, cloud, APP_ID};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Quota plus the free capacity of up to five existing groups
fn capacities() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..150).prop_flat_map(|quota| (Just(quota), prop::collection::vec(0..=quota, 0..5)))
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: only the missing capacity is created
    #[test]
    fn prop_new_group_count((quota, free) in capacities(), entries in 0usize..600) {
        let plan = plan(&free, entries, quota).unwrap();
        let total_free: usize = free.iter().sum();

        let expected = if entries <= total_free {
            0
        } else {
            (entries - total_free + quota - 1) / quota
        };
        prop_assert_eq!(plan.new_groups, expected);
        prop_assert_eq!(plan.slices.len(), free.len() + plan.new_groups);
    }

    /// Property: capacities are never exceeded
    #[test]
    fn prop_capacity_respected((quota, free) in capacities(), entries in 0usize..600) {
        let plan = plan(&free, entries, quota).unwrap();

        for (position, slice) in plan.slices.iter().enumerate() {
            let capacity = free.get(position).copied().unwrap_or(quota);
            prop_assert!(slice.len() <= capacity);
        }
    }

    /// Property: every entry is assigned exactly once, in order
    #[test]
    fn prop_every_entry_assigned_once((quota, free) in capacities(), entries in 0usize..600) {
        let plan = plan(&free, entries, quota).unwrap();

        let assigned: Vec<usize> = plan.slices.iter().flat_map(|slice| slice.clone()).collect();
        prop_assert_eq!(assigned, (0..entries).collect::<Vec<_>>());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: applying to a fresh resource commits every entry
    ///
    /// Groups are created as `ceil(entries / quota)`, none holds more than
    /// the quota, and all of them are bound to the resource.
    #[test]
    fn prop_fresh_allocation_commits_everything(entries in 1usize..260, quota in 1usize..=100) {
        let cloud = cloud();
        let registry = Arc::new(ResourceTypeRegistry::standard(
            |kind| cloud.lookup(kind),
            cloud.clone(),
        ));
        let config = SecurityPolicyConfig {
            rule_quota: quota,
            ..Default::default()
        };
        let allocator = PolicyAllocator::new(registry, cloud.clone(), cloud.clone(), config);
        let request = ApplySecurityPoliciesRequest {
            ingress_policies: app_policies(entries),
            egress_policies: vec![],
        };

        let result = tokio_test::block_on(allocator.apply(&request)).unwrap();

        prop_assert_eq!(result.ingress_result.success_total, entries);

        let names = cloud.group_names();
        prop_assert_eq!(names.len(), (entries + quota - 1) / quota);
        let sizes: Vec<usize> = names
            .iter()
            .map(|name| cloud.rules_of(name).unwrap().ingress.len())
            .collect();
        prop_assert!(sizes.iter().all(|size| *size <= quota));
        prop_assert_eq!(sizes.iter().sum::<usize>(), entries);
        prop_assert_eq!(cloud.bound_groups(APP_ID).len(), names.len());
    }
}
