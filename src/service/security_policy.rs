// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Service Layer
//!
//! Exposes the calculator and the allocator as two named actions that take
//! and return JSON:
//!
//! | action                    | input                          | output                       |
//! |---------------------------|--------------------------------|------------------------------|
//! | `calc-security-policies`  | [`CalcSecurityPoliciesRequest`]  | [`CalcSecurityPoliciesResult`] |
//! | `apply-security-policies` | [`ApplySecurityPoliciesRequest`] | [`ApplySecurityPoliciesResult`] |
//!
//! # Invocation Semantics
//!
//! 1. Look the action up by name (unknown → NotFound)
//! 2. Read the JSON parameter (malformed → Serialization)
//! 3. Validate and run
//! 4. Return the report together with any error, so callers always see
//!    what was computed or applied
//!
//! Every invocation runs in a tracing span carrying a fresh `request_id`.
//!
//! [`CalcSecurityPoliciesResult`]: crate::domain::CalcSecurityPoliciesResult

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SecurityPolicyConfig;
use crate::domain::{
    ApplySecurityPoliciesRequest, ApplySecurityPoliciesResult, CalcSecurityPoliciesRequest,
};
use crate::errors::{PolicyError, PolicyResult};
use crate::policy::{CalcReport, PolicyAllocator, PolicyCalculator};
use crate::provider::{InMemoryCloud, RegionCatalog, SecurityGroupApi};
use crate::resource::{InstanceResolver, ResourceTypeRegistry};

/// Action name of the calculator
pub const CALC_SECURITY_POLICIES: &str = "calc-security-policies";

/// Action name of the allocator
pub const APPLY_SECURITY_POLICIES: &str = "apply-security-policies";

/// Every action the service answers to
pub const ACTIONS: [&str; 2] = [CALC_SECURITY_POLICIES, APPLY_SECURITY_POLICIES];

/// Output of one action invocation
///
/// `output` is present even when `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub output: Value,
    pub error: Option<PolicyError>,
}

impl ActionOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Security policy service trait
#[async_trait]
pub trait SecurityPolicyService: Send + Sync {
    /// Compute rule entries for a traffic description
    ///
    /// # Returns
    /// - The computed entries plus the joined errors of individual IPs
    async fn calc_security_policies(
        &self,
        request: CalcSecurityPoliciesRequest,
    ) -> PolicyResult<CalcReport>;

    /// Place entries into security groups
    async fn apply_security_policies(
        &self,
        request: ApplySecurityPoliciesRequest,
    ) -> PolicyResult<ApplySecurityPoliciesResult>;
}

/// Service backed by the policy calculator and allocator
#[derive(Clone)]
pub struct SecurityPolicyEngine {
    calculator: PolicyCalculator,
    allocator: PolicyAllocator,
}

impl SecurityPolicyEngine {
    pub fn new(calculator: PolicyCalculator, allocator: PolicyAllocator) -> Self {
        Self {
            calculator,
            allocator,
        }
    }

    /// Wire an engine from its provider collaborators
    pub fn assemble(
        registry: Arc<ResourceTypeRegistry>,
        catalog: Arc<dyn RegionCatalog>,
        groups: Arc<dyn SecurityGroupApi>,
        config: SecurityPolicyConfig,
    ) -> Self {
        let resolver = InstanceResolver::new(Arc::clone(&registry), Arc::clone(&catalog));
        Self::new(
            PolicyCalculator::new(resolver),
            PolicyAllocator::new(registry, catalog, groups, config),
        )
    }

    /// Engine running entirely against an in-memory cloud
    pub fn in_memory(cloud: Arc<InMemoryCloud>, config: SecurityPolicyConfig) -> Self {
        let registry = Arc::new(ResourceTypeRegistry::standard(
            |kind| cloud.lookup(kind),
            cloud.clone(),
        ));
        Self::assemble(registry, cloud.clone(), cloud, config)
    }

    /// Run an action by name
    ///
    /// `Err` means the action never ran: unknown name, malformed JSON or a
    /// request that failed validation.
    pub async fn dispatch(&self, action: &str, params: Value) -> PolicyResult<ActionOutcome> {
        let request_id = Uuid::now_v7();
        let span = info_span!("security_policy_action", %request_id, action);

        async move {
            info!("Action invoked");
            let outcome = match action {
                CALC_SECURITY_POLICIES => self.run_calc(params).await,
                APPLY_SECURITY_POLICIES => self.run_apply(params).await,
                other => Err(PolicyError::NotFound(format!("action({}) not found", other))),
            };

            match &outcome {
                Ok(ActionOutcome { error: Some(e), .. }) => {
                    warn!(error = %e, "Action finished with errors")
                }
                Ok(_) => info!("Action finished"),
                Err(e) => warn!(error = %e, "Action rejected"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_calc(&self, params: Value) -> PolicyResult<ActionOutcome> {
        let request: CalcSecurityPoliciesRequest = serde_json::from_value(params)?;
        let report = self.calc_security_policies(request).await?;
        Ok(ActionOutcome {
            output: serde_json::to_value(&report.result)?,
            error: report.error,
        })
    }

    async fn run_apply(&self, params: Value) -> PolicyResult<ActionOutcome> {
        let request: ApplySecurityPoliciesRequest = serde_json::from_value(params)?;
        let result = self.apply_security_policies(request).await?;

        let failed = result.failed_total();
        Ok(ActionOutcome {
            output: serde_json::to_value(&result)?,
            error: (failed > 0).then_some(PolicyError::PartialFailure { failed }),
        })
    }
}

#[async_trait]
impl SecurityPolicyService for SecurityPolicyEngine {
    async fn calc_security_policies(
        &self,
        request: CalcSecurityPoliciesRequest,
    ) -> PolicyResult<CalcReport> {
        self.calculator.calculate(&request).await
    }

    async fn apply_security_policies(
        &self,
        request: ApplySecurityPoliciesRequest,
    ) -> PolicyResult<ApplySecurityPoliciesResult> {
        self.allocator.apply(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> (Arc<InMemoryCloud>, SecurityPolicyEngine) {
        let cloud = Arc::new(InMemoryCloud::default());
        let engine = SecurityPolicyEngine::in_memory(cloud.clone(), SecurityPolicyConfig::default());
        (cloud, engine)
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_found() {
        let (_, engine) = engine();
        let err = engine.dispatch("delete-everything", json!({})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_params_are_serialization_errors() {
        let (cloud, engine) = engine();
        let err = engine
            .dispatch(CALC_SECURITY_POLICIES, json!({ "protocol": 6 }))
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::Serialization(_)));
        assert_eq!(cloud.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_apply_is_ok() {
        let (_, engine) = engine();
        let outcome = engine
            .dispatch(APPLY_SECURITY_POLICIES, json!({}))
            .await
            .unwrap();
        assert!(outcome.is_ok());
        assert_eq!(outcome.output["ingress"]["policies_total"], 0);
    }
}
