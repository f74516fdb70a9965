// Copyright (c) 2025 - Cowboy AI, Inc.
//! Managed Resource Kind Domain Model
//!
//! Defines the closed set of cloud resource kinds whose network security
//! is managed through security groups. Each kind carries the capability
//! flags the policy engine branches on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Managed cloud resource kind
///
/// The wire name (`as_str`) is what travels in the `type` field of a
/// security policy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Relational database instance
    #[serde(rename = "mysql")]
    Mysql,
    /// Virtual machine
    #[serde(rename = "cvm")]
    Cvm,
    /// Load balancer
    #[serde(rename = "clb")]
    Clb,
    /// Cache instance
    #[serde(rename = "redis")]
    Redis,
    /// Document store instance
    #[serde(rename = "mongodb")]
    Mongodb,
    /// Virtual machine discovered as a load balancer backend
    #[serde(rename = "clb-cvm")]
    ClbCvm,
}

impl ResourceKind {
    /// Kinds that own a resource type implementation
    pub const REGISTRABLE: [ResourceKind; 5] = [
        ResourceKind::Mysql,
        ResourceKind::Cvm,
        ResourceKind::Clb,
        ResourceKind::Redis,
        ResourceKind::Mongodb,
    ];

    /// Get the canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Cvm => "cvm",
            Self::Clb => "clb",
            Self::Redis => "redis",
            Self::Mongodb => "mongodb",
            Self::ClbCvm => "clb-cvm",
        }
    }

    /// Parse a wire name, accepting common aliases
    ///
    /// Any name starting with `clb-cvm` is a backend tag and maps to
    /// [`ResourceKind::ClbCvm`].
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name.starts_with("clb-cvm") {
            return Some(Self::ClbCvm);
        }
        match name.as_str() {
            "mysql" | "cdb" | "database" => Some(Self::Mysql),
            "cvm" | "vm" | "compute" => Some(Self::Cvm),
            "clb" | "lb" | "load_balancer" => Some(Self::Clb),
            "redis" | "cache" => Some(Self::Redis),
            "mongodb" | "mongo" | "document_store" => Some(Self::Mongodb),
            _ => None,
        }
    }

    /// Collapse alias kinds onto the kind that owns the resource
    pub fn normalized(&self) -> Self {
        match self {
            Self::ClbCvm => Self::Cvm,
            other => *other,
        }
    }

    /// Check if this kind fronts backend resources
    pub fn is_load_balancer(&self) -> bool {
        matches!(self, Self::Clb)
    }

    /// Check if outbound rules are meaningful for this kind
    ///
    /// Managed data services only ever answer connections.
    pub fn supports_egress_policy(&self) -> bool {
        matches!(self, Self::Cvm | Self::ClbCvm)
    }

    /// Check if the provider exposes security-group binding for this kind
    pub fn supports_security_group_api(&self) -> bool {
        !matches!(self, Self::Mongodb)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize a policy `type` field
///
/// Backend aliases collapse to the owning kind; unknown names are kept
/// verbatim so the registry lookup can report them.
pub fn normalize_kind_name(name: &str) -> String {
    match ResourceKind::parse(name) {
        Some(kind) => kind.normalized().as_str().to_string(),
        None => name.to_string(),
    }
}
