// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Domain Models
//!
//! Core vocabulary of the policy engine. Everything in this module is pure:
//! no provider calls, no logging side effects.
//!
//! # Value Objects with Invariants
//!
//! - [`IpAddressWithCidr`] - IPv4/IPv6 with optional CIDR notation
//! - [`Protocol`], [`PolicyAction`], [`Direction`] - request allow-lists
//! - [`PortSpec`] - single port, range, list or `ALL`
//! - [`ResourceKind`] - closed set of managed resource kinds
//!
//! # Records
//!
//! - [`SecurityPolicy`] - one rule for one resource, the unit of work
//! - [`PolicyOutcome`] - terminal state of an entry after an apply pass
//! - request/result records of the `calc-security-policies` and
//!   `apply-security-policies` actions

pub mod network;
pub mod resource_kind;
pub mod security_policy;

pub use network::{
    bare_ports, validate_ip, Direction, IpAddressWithCidr, NetworkError, PolicyAction, PortSpec,
    Protocol,
};
pub use resource_kind::{normalize_kind_name, ResourceKind};
pub use security_policy::{
    ApplyResult, ApplySecurityPoliciesRequest, ApplySecurityPoliciesResult,
    CalcSecurityPoliciesRequest, CalcSecurityPoliciesResult, PolicyOutcome, SecurityPolicy,
};
