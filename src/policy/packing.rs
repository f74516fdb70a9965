// Copyright (c) 2025 - Cowboy AI, Inc.
//! Rule Bin-Packing
//!
//! Pure planning step of the allocator: given the free capacity of the
//! existing auto-groups, decide how many groups to create and which run of
//! entries lands in which group. Entries keep their order; each group takes
//! a contiguous slice.

use std::ops::Range;

use crate::errors::{PolicyError, PolicyResult};

/// Assignment of entries to groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackingPlan {
    /// Groups to create after the existing ones
    pub new_groups: usize,
    /// One slice per group, existing groups first; slices may be empty
    pub slices: Vec<Range<usize>>,
}

impl PackingPlan {
    /// Groups that receive at least one entry, as (group position, slice)
    pub fn filled(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        self.slices
            .iter()
            .enumerate()
            .filter(|(_, slice)| !slice.is_empty())
            .map(|(position, slice)| (position, slice.clone()))
    }
}

/// Free rule slots of a group holding `occupied` rules
pub fn free_capacity(quota: usize, occupied: usize) -> usize {
    quota.saturating_sub(occupied)
}

/// Plan the placement of `entries` rules
///
/// `free` lists the remaining capacity of each existing group, in fill
/// order. New groups start empty with `quota` slots each.
pub fn plan(free: &[usize], entries: usize, quota: usize) -> PolicyResult<PackingPlan> {
    if quota == 0 {
        return Err(PolicyError::Configuration(
            "security group rule quota must be positive".to_string(),
        ));
    }

    let total_free: usize = free.iter().sum();
    let new_groups = if total_free >= entries {
        0
    } else {
        (entries - total_free).div_ceil(quota)
    };

    let capacities = free
        .iter()
        .copied()
        .chain(std::iter::repeat(quota).take(new_groups));

    let mut next = 0;
    let slices = capacities
        .map(|capacity| {
            let take = capacity.min(entries - next);
            let slice = next..next + take;
            next += take;
            slice
        })
        .collect();

    Ok(PackingPlan { new_groups, slices })
}
