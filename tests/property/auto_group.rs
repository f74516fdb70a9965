// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Auto-Group Detection

use cim_security_policy::policy::{auto_group_index, auto_group_name, AutoGroups};
use cim_security_policy::provider::SecurityGroupRecord;
use proptest::prelude::*;

const IP: &str = "10.0.0.1";

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Either an auto-group of `IP` or some other group
fn group() -> impl Strategy<Value = SecurityGroupRecord> {
    prop_oneof![
        (1u32..500).prop_map(|n| auto_group_name(IP, n)),
        (1u32..500).prop_map(|n| auto_group_name("10.0.0.2", n)),
        "[a-z][a-z0-9-]{0,15}",
    ]
    .prop_flat_map(|name| {
        "sg-[a-z0-9]{8}".prop_map(move |id| SecurityGroupRecord {
            id,
            name: name.clone(),
        })
    })
}

fn groups() -> impl Strategy<Value = Vec<SecurityGroupRecord>> {
    prop::collection::vec(group(), 0..30)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: names round-trip through the index parser
    #[test]
    fn prop_name_encodes_index(n in 1u32..u32::MAX) {
        prop_assert_eq!(auto_group_index(IP, &auto_group_name(IP, n)), Some(n));
    }

    /// Property: detection is idempotent
    ///
    /// Detecting on the detected groups yields the same groups and index.
    #[test]
    fn prop_detection_is_idempotent(groups in groups()) {
        let once = AutoGroups::detect(IP, &groups);
        let twice = AutoGroups::detect(IP, &once.records());

        prop_assert_eq!(once, twice);
    }

    /// Property: detection ignores listing order
    #[test]
    fn prop_detection_ignores_order(groups in groups()) {
        let mut reversed = groups.clone();
        reversed.reverse();

        prop_assert_eq!(
            AutoGroups::detect(IP, &groups).next_index,
            AutoGroups::detect(IP, &reversed).next_index
        );
    }

    /// Property: the next index is past every existing one
    #[test]
    fn prop_next_index_is_fresh(groups in groups()) {
        let auto = AutoGroups::detect(IP, &groups);

        prop_assert!(auto.groups.windows(2).all(|pair| pair[0].index <= pair[1].index));
        prop_assert!(auto.groups.iter().all(|group| group.index < auto.next_index));
        prop_assert!(auto.groups.iter().all(|group| group.name.starts_with("10.0.0.1-auto-")));
    }
}
