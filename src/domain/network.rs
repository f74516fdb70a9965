// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants
//!
//! Request-side vocabulary of a traffic rule: endpoint addresses, protocol,
//! action, direction and port specification. Everything here is pure and
//! validated before any provider call is made.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),

    #[error("Unsupported protocol: {0} (must be one of TCP, UDP, ICMP, ICMPv6, ALL)")]
    InvalidProtocol(String),

    #[error("Unsupported policy action: {0} (must be ACCEPT or DROP)")]
    InvalidAction(String),

    #[error("Unsupported policy direction: {0} (must be ingress or egress)")]
    InvalidDirection(String),

    #[error("Invalid port format: {0}")]
    InvalidPort(String),
}

/// IP Address with CIDR notation value object
///
/// Represents an IPv4 or IPv6 address with optional prefix length.
/// Invariants:
/// - Valid IP address format
/// - Prefix length within valid range
///
/// # Examples
///
/// ```rust
/// use cim_security_policy::domain::IpAddressWithCidr;
///
/// let ip = IpAddressWithCidr::new("10.0.0.0/24").unwrap();
/// assert_eq!(ip.address().to_string(), "10.0.0.0");
/// assert_eq!(ip.prefix_length(), Some(24));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpAddressWithCidr {
    address: IpAddr,
    prefix_length: Option<u8>,
}

impl IpAddressWithCidr {
    /// Create a new IP address with optional CIDR notation
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref().trim();

        if let Some((addr_str, prefix_str)) = cidr.split_once('/') {
            let address = IpAddr::from_str(addr_str)
                .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

            let prefix_length = prefix_str
                .parse::<u8>()
                .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

            let max_prefix = match address {
                IpAddr::V4(_) => 32,
                IpAddr::V6(_) => 128,
            };

            if prefix_length > max_prefix {
                return Err(NetworkError::InvalidPrefixLength(prefix_length));
            }

            Ok(Self {
                address,
                prefix_length: Some(prefix_length),
            })
        } else {
            let address = IpAddr::from_str(cidr)
                .map_err(|_| NetworkError::InvalidIpAddress(cidr.to_string()))?;

            Ok(Self {
                address,
                prefix_length: None,
            })
        }
    }

    /// Get the IP address
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Get the prefix length
    pub fn prefix_length(&self) -> Option<u8> {
        self.prefix_length
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        if let Some(prefix) = self.prefix_length {
            format!("{}/{}", self.address, prefix)
        } else {
            self.address.to_string()
        }
    }
}

impl fmt::Display for IpAddressWithCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for IpAddressWithCidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Check that a request endpoint is a syntactically valid address
pub fn validate_ip(ip: &str) -> Result<(), NetworkError> {
    IpAddressWithCidr::new(ip).map(|_| ())
}

/// Transport protocol allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Icmp => "ICMP",
            Self::Icmpv6 => "ICMPv6",
            Self::All => "ALL",
        }
    }
}

impl FromStr for Protocol {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TCP" => Ok(Self::Tcp),
            "UDP" => Ok(Self::Udp),
            "ICMP" => Ok(Self::Icmp),
            "ICMPV6" => Ok(Self::Icmpv6),
            "ALL" => Ok(Self::All),
            _ => Err(NetworkError::InvalidProtocol(s.to_string())),
        }
    }
}

/// Policy action allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyAction {
    Accept,
    Drop,
}

impl PolicyAction {
    /// Provider-side spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
        }
    }
}

impl FromStr for PolicyAction {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACCEPT" => Ok(Self::Accept),
            "DROP" => Ok(Self::Drop),
            _ => Err(NetworkError::InvalidAction(s.to_string())),
        }
    }
}

/// Traffic direction of a rule, seen from the resource that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ingress" => Ok(Self::Ingress),
            "egress" => Ok(Self::Egress),
            _ => Err(NetworkError::InvalidDirection(s.to_string())),
        }
    }
}

/// Destination port specification
///
/// Accepted formats:
/// - `ALL`
/// - single port: `80`
/// - range: `8000-8010`
/// - list: `80,443,8080`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSpec {
    All,
    Single(u16),
    Range(u16, u16),
    List(Vec<u16>),
}

impl PortSpec {
    pub fn parse(spec: &str) -> Result<Self, NetworkError> {
        let spec = spec.trim();
        if spec.eq_ignore_ascii_case("ALL") {
            return Ok(Self::All);
        }

        if let Some((low, high)) = spec.split_once('-') {
            let low = parse_port(low, spec)?;
            let high = parse_port(high, spec)?;
            if low > high {
                return Err(NetworkError::InvalidPort(spec.to_string()));
            }
            return Ok(Self::Range(low, high));
        }

        if spec.contains(',') {
            let ports = spec
                .split(',')
                .map(|p| parse_port(p, spec))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::List(ports));
        }

        Ok(Self::Single(parse_port(spec, spec)?))
    }

    /// Port entries that become one policy each
    ///
    /// A list stays joined: the provider accepts comma lists in a single rule.
    pub fn policy_ports(&self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Single(port) => write!(f, "{}", port),
            Self::Range(low, high) => write!(f, "{}-{}", low, high),
            Self::List(ports) => {
                let joined = ports
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "{}", joined)
            }
        }
    }
}

fn parse_port(token: &str, spec: &str) -> Result<u16, NetworkError> {
    match token.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(NetworkError::InvalidPort(spec.to_string())),
    }
}

/// Split a port entry into bare integer ports
///
/// Load balancer listeners are addressed one port at a time, so ranges
/// and `ALL` are rejected here.
pub fn bare_ports(entry: &str) -> Result<Vec<u16>, NetworkError> {
    entry
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<u16>()
                .map_err(|_| NetworkError::InvalidPort(entry.to_string()))
        })
        .collect()
}
