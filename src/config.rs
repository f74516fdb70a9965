// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy Engine Configuration

use serde::{Deserialize, Serialize};

use crate::errors::{PolicyError, PolicyResult};

/// Rules a provider accepts per security group and direction
pub const DEFAULT_RULE_QUOTA: usize = 100;

/// Description given to groups the allocator creates
pub const DEFAULT_AUTO_GROUP_DESCRIPTION: &str = "automation created";

/// Configuration for the policy allocator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicyConfig {
    /// Per-direction rule quota of one security group
    #[serde(default = "default_rule_quota")]
    pub rule_quota: usize,

    /// Description of auto-created groups
    #[serde(default = "default_auto_group_description")]
    pub auto_group_description: String,
}

fn default_rule_quota() -> usize {
    DEFAULT_RULE_QUOTA
}

fn default_auto_group_description() -> String {
    DEFAULT_AUTO_GROUP_DESCRIPTION.to_string()
}

impl Default for SecurityPolicyConfig {
    fn default() -> Self {
        Self {
            rule_quota: DEFAULT_RULE_QUOTA,
            auto_group_description: DEFAULT_AUTO_GROUP_DESCRIPTION.to_string(),
        }
    }
}

impl SecurityPolicyConfig {
    /// Load configuration from environment variables
    ///
    /// - `SECURITY_GROUP_RULE_QUOTA` (positive integer, default 100)
    /// - `SECURITY_GROUP_AUTO_DESCRIPTION` (default `automation created`)
    pub fn from_env() -> PolicyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> PolicyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rule_quota = match lookup("SECURITY_GROUP_RULE_QUOTA") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|quota| *quota > 0)
                .ok_or_else(|| {
                    PolicyError::Configuration(format!(
                        "SECURITY_GROUP_RULE_QUOTA must be a positive integer, got '{}'",
                        raw
                    ))
                })?,
            None => DEFAULT_RULE_QUOTA,
        };

        let auto_group_description = lookup("SECURITY_GROUP_AUTO_DESCRIPTION")
            .unwrap_or_else(default_auto_group_description);

        Ok(Self {
            rule_quota,
            auto_group_description,
        })
    }
}
