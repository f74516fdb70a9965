// Copyright (c) 2025 - Cowboy AI, Inc.
//! Auto-Created Security Groups
//!
//! Groups the allocator creates are named `{ip}-auto-{n}` with `n >= 1`.
//! Detection works on names alone, so it can be repeated on any listing of
//! an instance's groups and always yields the same ordering. Any unsigned
//! decimal suffix counts, including `0` and a leading `+`.

use crate::provider::SecurityGroupRecord;

/// Name of the `index`-th auto-group of a resource
pub fn auto_group_name(ip: &str, index: u32) -> String {
    format!("{}-auto-{}", ip, index)
}

/// Common prefix of every auto-group name of `ip`
pub fn auto_group_prefix(ip: &str) -> String {
    format!("{}-auto-", ip)
}

/// Index encoded in an auto-group name, if `name` is one for `ip`
pub fn auto_group_index(ip: &str, name: &str) -> Option<u32> {
    name.strip_prefix(&auto_group_prefix(ip))?.parse::<u32>().ok()
}

/// An auto-group already bound to the resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoGroup {
    pub id: String,
    pub name: String,
    pub index: u32,
}

/// Auto-groups of one resource, ascending by index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoGroups {
    pub groups: Vec<AutoGroup>,
    /// Index the next created group takes
    pub next_index: u32,
}

impl AutoGroups {
    /// Pick the auto-groups of `ip` out of a group listing
    pub fn detect(ip: &str, groups: &[SecurityGroupRecord]) -> Self {
        let mut detected: Vec<AutoGroup> = groups
            .iter()
            .filter_map(|group| {
                auto_group_index(ip, &group.name).map(|index| AutoGroup {
                    id: group.id.clone(),
                    name: group.name.clone(),
                    index,
                })
            })
            .collect();
        detected.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));

        let next_index = detected
            .last()
            .map(|group| group.index.saturating_add(1))
            .unwrap_or(1);

        Self {
            groups: detected,
            next_index,
        }
    }

    /// Move `next_index` past auto-groups of `ip` found elsewhere
    ///
    /// Groups left unbound by an earlier failed pass keep their names, so
    /// new groups must not take those indices again.
    pub fn reserve(&mut self, ip: &str, listed: &[SecurityGroupRecord]) {
        for group in listed {
            if let Some(index) = auto_group_index(ip, &group.name) {
                self.next_index = self.next_index.max(index.saturating_add(1));
            }
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.groups.iter().map(|group| group.id.clone()).collect()
    }

    /// The detected groups as plain records
    pub fn records(&self) -> Vec<SecurityGroupRecord> {
        self.groups
            .iter()
            .map(|group| SecurityGroupRecord {
                id: group.id.clone(),
                name: group.name.clone(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
