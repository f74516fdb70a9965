// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Records
//!
//! The unit of work flowing from the calculator to the allocator, plus the
//! request and result records of the two exposed actions.

use serde::{Deserialize, Serialize};

/// One security-group rule addressed to one managed resource
///
/// Created by the calculator, consumed by the allocator. After an apply
/// pass each entry is in exactly one terminal state, see [`PolicyOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// IP of the resource that owns the rule
    pub ip: String,
    /// Resource kind wire name
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Provider id of the owning resource
    pub id: String,
    pub region: String,
    pub support_security_group_api: bool,
    pub peer_ip: String,
    pub protocol: String,
    /// Single port, range, `ALL` or comma-joined list
    pub ports: String,
    pub action: String,
    pub description: String,
    #[serde(default, rename = "err_msg", skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub undo_reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_group_id: String,
}

impl SecurityPolicy {
    /// Record the terminal state of this entry
    pub fn apply_outcome(&mut self, outcome: PolicyOutcome) {
        self.error_message.clear();
        self.undo_reason.clear();
        self.security_group_id.clear();
        match outcome {
            PolicyOutcome::Success { security_group_id } => {
                self.security_group_id = security_group_id
            }
            PolicyOutcome::Undo { reason } => self.undo_reason = reason,
            PolicyOutcome::Failed { error } => self.error_message = error,
        }
    }

    /// Read back the terminal state, if one was recorded
    pub fn outcome(&self) -> Option<PolicyOutcome> {
        if !self.error_message.is_empty() {
            Some(PolicyOutcome::Failed {
                error: self.error_message.clone(),
            })
        } else if !self.undo_reason.is_empty() {
            Some(PolicyOutcome::Undo {
                reason: self.undo_reason.clone(),
            })
        } else if !self.security_group_id.is_empty() {
            Some(PolicyOutcome::Success {
                security_group_id: self.security_group_id.clone(),
            })
        } else {
            None
        }
    }
}

/// Terminal state of a policy entry after an apply pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Rule committed and bound through the given group
    Success { security_group_id: String },
    /// Never sent to the provider
    Undo { reason: String },
    /// Sent or attempted and not fully committed
    Failed { error: String },
}

impl PolicyOutcome {
    pub fn failed(error: impl ToString) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }
}

/// Input of `calc-security-policies`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalcSecurityPoliciesRequest {
    pub protocol: String,
    #[serde(default)]
    pub source_ips: Vec<String>,
    #[serde(default)]
    pub dest_ips: Vec<String>,
    pub dest_port: String,
    pub policy_action: String,
    #[serde(default)]
    pub policy_directions: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Output of `calc-security-policies`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalcSecurityPoliciesResult {
    pub time_taken: String,
    pub ingress_policies_total: usize,
    pub egress_policies_total: usize,
    pub ingress_policies: Vec<SecurityPolicy>,
    pub egress_policies: Vec<SecurityPolicy>,
}

/// Input of `apply-security-policies`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplySecurityPoliciesRequest {
    #[serde(default)]
    pub ingress_policies: Vec<SecurityPolicy>,
    #[serde(default)]
    pub egress_policies: Vec<SecurityPolicy>,
}

/// Per-direction report of an apply pass
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub policies_total: usize,
    #[serde(rename = "success_policies_total")]
    pub success_total: usize,
    #[serde(rename = "undo_policies_total")]
    pub undo_total: usize,
    #[serde(rename = "failed_policies_total")]
    pub failed_total: usize,
    pub success_policies: Vec<SecurityPolicy>,
    pub undo_policies: Vec<SecurityPolicy>,
    pub failed_policies: Vec<SecurityPolicy>,
}

impl ApplyResult {
    /// Partition entries by their recorded outcome
    ///
    /// Entries without an outcome are counted as failed.
    pub fn from_policies(policies: Vec<SecurityPolicy>) -> Self {
        let mut result = ApplyResult {
            policies_total: policies.len(),
            ..Default::default()
        };

        for mut policy in policies {
            match policy.outcome() {
                Some(PolicyOutcome::Success { .. }) => result.success_policies.push(policy),
                Some(PolicyOutcome::Undo { .. }) => result.undo_policies.push(policy),
                Some(PolicyOutcome::Failed { .. }) => result.failed_policies.push(policy),
                None => {
                    policy.apply_outcome(PolicyOutcome::failed("policy was not processed"));
                    result.failed_policies.push(policy);
                }
            }
        }

        result.success_total = result.success_policies.len();
        result.undo_total = result.undo_policies.len();
        result.failed_total = result.failed_policies.len();
        result
    }
}

/// Output of `apply-security-policies`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplySecurityPoliciesResult {
    pub time_taken: String,
    #[serde(rename = "ingress")]
    pub ingress_result: ApplyResult,
    #[serde(rename = "egress")]
    pub egress_result: ApplyResult,
}

impl ApplySecurityPoliciesResult {
    /// Failed entries across both directions
    pub fn failed_total(&self) -> usize {
        self.ingress_result.failed_total + self.egress_result.failed_total
    }
}
