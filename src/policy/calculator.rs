// Copyright (c) 2025 - Cowboy AI, Inc.
//! Policy Calculator
//!
//! Turns a traffic description into per-resource rule entries. Each
//! direction is computed from the point of view of the resource that owns
//! the rule:
//!
//! | direction | owner ("my") | peer        |
//! |-----------|--------------|-------------|
//! | egress    | source IPs   | dest IPs    |
//! | ingress   | dest IPs     | source IPs  |
//!
//! Load balancers never own rules themselves: a rule addressed to a load
//! balancer is expanded to one rule per backend behind the listener.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    bare_ports, validate_ip, CalcSecurityPoliciesRequest, CalcSecurityPoliciesResult, Direction,
    PolicyAction, PortSpec, Protocol, SecurityPolicy,
};
use crate::errors::{PolicyError, PolicyResult};
use crate::resource::{InstanceResolver, ResourceInstance};

/// Calculation output plus the errors of individual IPs
///
/// The result always holds whatever could be computed.
#[derive(Debug, Clone, Default)]
pub struct CalcReport {
    pub result: CalcSecurityPoliciesResult,
    pub error: Option<PolicyError>,
}

/// Request after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcPlan {
    pub protocol: Protocol,
    pub action: PolicyAction,
    pub ports: PortSpec,
    pub directions: Vec<Direction>,
}

impl CalcPlan {
    /// Validate a request without touching any provider
    pub fn validate(request: &CalcSecurityPoliciesRequest) -> PolicyResult<Self> {
        let protocol: Protocol = request.protocol.parse()?;
        let action: PolicyAction = request.policy_action.parse()?;

        for ip in request.source_ips.iter().chain(&request.dest_ips) {
            validate_ip(ip)?;
        }

        let ports = PortSpec::parse(&request.dest_port)?;

        let mut directions = Vec::new();
        for raw in &request.policy_directions {
            let direction: Direction = raw.parse()?;
            if !directions.contains(&direction) {
                directions.push(direction);
            }
        }

        Ok(Self {
            protocol,
            action,
            ports,
            directions,
        })
    }
}

/// Resolutions made while serving one request
///
/// Every distinct IP hits the provider at most once; nothing outlives the
/// request.
struct ResolutionMemo<'a> {
    resolver: &'a InstanceResolver,
    resolved: HashMap<String, PolicyResult<Arc<dyn ResourceInstance>>>,
}

impl<'a> ResolutionMemo<'a> {
    fn new(resolver: &'a InstanceResolver) -> Self {
        Self {
            resolver,
            resolved: HashMap::new(),
        }
    }

    async fn resolve(&mut self, ip: &str) -> PolicyResult<Arc<dyn ResourceInstance>> {
        if let Some(cached) = self.resolved.get(ip) {
            return cached.clone();
        }
        let outcome = self.resolver.resolve_by_ip(ip).await;
        self.resolved.insert(ip.to_string(), outcome.clone());
        outcome
    }
}

/// Computes security policies for a traffic description
#[derive(Clone)]
pub struct PolicyCalculator {
    resolver: InstanceResolver,
}

impl PolicyCalculator {
    pub fn new(resolver: InstanceResolver) -> Self {
        Self { resolver }
    }

    /// Compute the ingress and egress entries of a request
    ///
    /// Fails outright only on validation errors. Errors of individual IPs
    /// are joined into [`CalcReport::error`].
    pub async fn calculate(&self, request: &CalcSecurityPoliciesRequest) -> PolicyResult<CalcReport> {
        let plan = CalcPlan::validate(request)?;
        let start = Instant::now();
        let mut memo = ResolutionMemo::new(&self.resolver);
        let mut errors = Vec::new();
        let mut result = CalcSecurityPoliciesResult::default();

        for direction in &plan.directions {
            let (my_ips, peer_ips) = match direction {
                Direction::Egress => (&request.source_ips, &request.dest_ips),
                Direction::Ingress => (&request.dest_ips, &request.source_ips),
            };

            let policies = match self
                .direction_policies(*direction, &plan, request, my_ips, peer_ips, &mut memo, &mut errors)
                .await
            {
                Ok(policies) => policies,
                Err(e) => {
                    warn!(direction = %direction, error = %e, "Direction dropped");
                    errors.push(e);
                    Vec::new()
                }
            };

            match direction {
                Direction::Ingress => result.ingress_policies = policies,
                Direction::Egress => result.egress_policies = policies,
            }
        }

        result.ingress_policies_total = result.ingress_policies.len();
        result.egress_policies_total = result.egress_policies.len();
        result.time_taken = format!("{:?}", start.elapsed());

        info!(
            ingress = result.ingress_policies_total,
            egress = result.egress_policies_total,
            errors = errors.len(),
            time_taken = %result.time_taken,
            "Calculated security policies"
        );

        Ok(CalcReport {
            result,
            error: PolicyError::aggregate(errors),
        })
    }

    /// Entries of one direction
    ///
    /// Errors of single owner IPs go to `errors`; an `Err` drops the whole
    /// direction.
    #[allow(clippy::too_many_arguments)]
    async fn direction_policies(
        &self,
        direction: Direction,
        plan: &CalcPlan,
        request: &CalcSecurityPoliciesRequest,
        my_ips: &[String],
        peer_ips: &[String],
        memo: &mut ResolutionMemo<'_>,
        errors: &mut Vec<PolicyError>,
    ) -> PolicyResult<Vec<SecurityPolicy>> {
        if direction == Direction::Ingress {
            for peer in peer_ips {
                // unresolvable peers are external addresses
                if let Ok(instance) = memo.resolve(peer).await {
                    if instance.kind().is_load_balancer() {
                        return Err(PolicyError::Capability(format!(
                            "peer ip({}) is a load balancer({}), ingress policies can't be calculated",
                            peer,
                            instance.id()
                        )));
                    }
                }
            }
        }

        let mut policies = Vec::new();
        for ip in my_ips {
            let instance = match memo.resolve(ip).await {
                Ok(instance) => instance,
                Err(e) => {
                    debug!(ip = %ip, direction = %direction, error = %e, "Owner IP skipped");
                    errors.push(e);
                    continue;
                }
            };

            match self
                .instance_policies(direction, plan, request, &instance, peer_ips)
                .await
            {
                Ok(mut computed) => policies.append(&mut computed),
                Err(e) => {
                    warn!(
                        ip = %ip,
                        id = %instance.id(),
                        direction = %direction,
                        error = %e,
                        "Failed to calculate policies for instance"
                    );
                    errors.push(e);
                }
            }
        }
        Ok(policies)
    }

    /// Entries owned by one resolved instance
    async fn instance_policies(
        &self,
        direction: Direction,
        plan: &CalcPlan,
        request: &CalcSecurityPoliciesRequest,
        instance: &Arc<dyn ResourceInstance>,
        peer_ips: &[String],
    ) -> PolicyResult<Vec<SecurityPolicy>> {
        let resource_type = self.resolver.registry().lookup(instance.kind())?;

        if direction == Direction::Egress && !resource_type.supports_egress_policy() {
            info!(
                ip = %instance.ip(),
                kind = %instance.kind(),
                "Resource kind takes no egress policies, skipped"
            );
            return Ok(Vec::new());
        }

        let entries = plan.ports.policy_ports();
        let mut policies = Vec::new();

        if !resource_type.is_load_balancer() {
            for peer in peer_ips {
                for entry in &entries {
                    policies.push(policy_for(instance.as_ref(), peer, entry, request));
                }
            }
            return Ok(policies);
        }

        let ctx = self.resolver.provider_context(instance.region()).await?;
        let mut listeners = Vec::new();
        for entry in &entries {
            for port in bare_ports(entry)? {
                let backends = instance
                    .backend_targets(&ctx, plan.protocol.as_str(), port)
                    .await?;
                if backends.is_empty() {
                    return Err(PolicyError::NotFound(format!(
                        "load balancer({}) has no backend on {}:{}",
                        instance.id(),
                        plan.protocol.as_str(),
                        port
                    )));
                }
                listeners.push(backends);
            }
        }

        // ordered by peer, then listener port, then backend
        for peer in peer_ips {
            for backends in &listeners {
                for backend in backends {
                    policies.push(policy_for(
                        backend.instance.as_ref(),
                        peer,
                        &backend.port,
                        request,
                    ));
                }
            }
        }
        Ok(policies)
    }
}

fn policy_for(
    owner: &dyn ResourceInstance,
    peer: &str,
    ports: &str,
    request: &CalcSecurityPoliciesRequest,
) -> SecurityPolicy {
    SecurityPolicy {
        ip: owner.ip().to_string(),
        resource_type: owner.kind().as_str().to_string(),
        id: owner.id().to_string(),
        region: owner.region().to_string(),
        support_security_group_api: owner.supports_security_group_api(),
        peer_ip: peer.to_string(),
        protocol: request.protocol.clone(),
        ports: ports.to_string(),
        action: request.policy_action.clone(),
        description: request.description.clone(),
        ..Default::default()
    }
}
