// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-security-policy
//!
//! Provides a deterministic cloud inventory and request builders shared by
//! the integration tests.
//!
//! # Inventory
//!
//! | region       | kind    | id        | ip        | notes                          |
//! |--------------|---------|-----------|-----------|--------------------------------|
//! | ap-guangzhou | cvm     | ins-app   | 10.0.0.1  | application server             |
//! | ap-guangzhou | mysql   | cdb-1     | 10.0.1.1  | database                       |
//! | ap-guangzhou | cvm     | ins-web-1 | 10.0.2.1  | backend of lb-1                |
//! | ap-guangzhou | cvm     | ins-web-2 | 10.0.2.2  | backend of lb-1                |
//! | ap-guangzhou | clb     | lb-1      | 10.0.3.1  | TCP 80, TCP 443, TCP 81 (empty)|
//! | ap-guangzhou | mongodb | cmgo-1    | 10.0.4.1  | no security group api          |
//! | ap-shanghai  | redis   | crs-1     | 10.0.5.1  | second region                  |
//!
//! `10.0.0.2` is owned by nothing and plays the external peer.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;

use cim_security_policy::domain::{CalcSecurityPoliciesRequest, SecurityPolicy};
use cim_security_policy::provider::{InMemoryCloud, Inventory, PolicyRule};
use cim_security_policy::{SecurityPolicyConfig, SecurityPolicyEngine};

pub const REGION: &str = "ap-guangzhou";
pub const OTHER_REGION: &str = "ap-shanghai";

pub const APP_IP: &str = "10.0.0.1";
pub const APP_ID: &str = "ins-app";
pub const EXTERNAL_IP: &str = "10.0.0.2";
pub const DB_IP: &str = "10.0.1.1";
pub const DB_ID: &str = "cdb-1";
pub const WEB_1_IP: &str = "10.0.2.1";
pub const WEB_1_ID: &str = "ins-web-1";
pub const WEB_2_IP: &str = "10.0.2.2";
pub const WEB_2_ID: &str = "ins-web-2";
pub const LB_IP: &str = "10.0.3.1";
pub const LB_ID: &str = "lb-1";
pub const MONGO_IP: &str = "10.0.4.1";
pub const MONGO_ID: &str = "cmgo-1";
pub const CACHE_IP: &str = "10.0.5.1";
pub const CACHE_ID: &str = "crs-1";

/// Inventory of the standard test cloud as JSON
pub fn inventory_json() -> Value {
    json!({
        "regions": [
            {
                "region": REGION,
                "instances": [
                    { "kind": "cvm", "id": APP_ID, "name": "app", "ip": APP_IP },
                    { "kind": "mysql", "id": DB_ID, "ip": DB_IP },
                    { "kind": "cvm", "id": WEB_1_ID, "ip": WEB_1_IP },
                    { "kind": "cvm", "id": WEB_2_ID, "ip": WEB_2_IP },
                    { "kind": "clb", "id": LB_ID, "ip": LB_IP },
                    { "kind": "mongodb", "id": MONGO_ID, "ip": MONGO_IP }
                ],
                "listeners": [
                    {
                        "load_balancer_id": LB_ID,
                        "protocol": "TCP",
                        "port": 80,
                        "backends": [
                            { "instance_id": WEB_1_ID, "port": 8080 },
                            { "instance_id": WEB_2_ID, "port": 8081 }
                        ]
                    },
                    {
                        "load_balancer_id": LB_ID,
                        "protocol": "TCP",
                        "port": 443,
                        "backends": [{ "instance_id": WEB_1_ID, "port": 8443 }]
                    },
                    { "load_balancer_id": LB_ID, "protocol": "TCP", "port": 81 }
                ]
            },
            {
                "region": OTHER_REGION,
                "instances": [
                    { "kind": "redis", "id": CACHE_ID, "ip": CACHE_IP }
                ]
            }
        ]
    })
}

/// Parse an inventory document
pub fn inventory_from(value: Value) -> Inventory {
    serde_json::from_value(value).expect("Invalid inventory in test fixture")
}

/// The standard test cloud
pub fn cloud() -> Arc<InMemoryCloud> {
    cloud_from(inventory_json())
}

pub fn cloud_from(value: Value) -> Arc<InMemoryCloud> {
    Arc::new(InMemoryCloud::from_inventory(inventory_from(value)))
}

/// Standard cloud where the application server already has groups
///
/// `groups` are `(id, name, ingress rules)`; all are bound in order.
pub fn cloud_with_app_groups(groups: &[(&str, &str, Vec<PolicyRule>)]) -> Arc<InMemoryCloud> {
    let mut inventory = inventory_json();
    let region = &mut inventory["regions"][0];

    region["instances"][0]["security_groups"] =
        json!(groups.iter().map(|(id, _, _)| *id).collect::<Vec<_>>());
    region["security_groups"] = json!(groups
        .iter()
        .map(|(id, name, ingress)| json!({ "id": id, "name": name, "ingress": ingress }))
        .collect::<Vec<_>>());

    cloud_from(inventory)
}

/// Engine over `cloud` with the given configuration
pub fn engine(cloud: &Arc<InMemoryCloud>, config: SecurityPolicyConfig) -> SecurityPolicyEngine {
    SecurityPolicyEngine::in_memory(Arc::clone(cloud), config)
}

/// Calculation request with a fixed action and description
pub fn calc_request(
    protocol: &str,
    source_ips: &[&str],
    dest_ips: &[&str],
    dest_port: &str,
    directions: &[&str],
) -> CalcSecurityPoliciesRequest {
    CalcSecurityPoliciesRequest {
        protocol: protocol.to_string(),
        source_ips: source_ips.iter().map(|ip| ip.to_string()).collect(),
        dest_ips: dest_ips.iter().map(|ip| ip.to_string()).collect(),
        dest_port: dest_port.to_string(),
        policy_action: "ACCEPT".to_string(),
        policy_directions: directions.iter().map(|d| d.to_string()).collect(),
        description: "svc".to_string(),
    }
}

/// Entry owned by a resource, allowing `peer_ip` on TCP 80
pub fn policy(ip: &str, id: &str, kind: &str, peer_ip: &str) -> SecurityPolicy {
    SecurityPolicy {
        ip: ip.to_string(),
        resource_type: kind.to_string(),
        id: id.to_string(),
        region: REGION.to_string(),
        support_security_group_api: kind != "mongodb",
        peer_ip: peer_ip.to_string(),
        protocol: "TCP".to_string(),
        ports: "80".to_string(),
        action: "ACCEPT".to_string(),
        description: "svc".to_string(),
        ..Default::default()
    }
}

/// `count` entries for the application server, each with its own peer
pub fn app_policies(count: usize) -> Vec<SecurityPolicy> {
    (0..count)
        .map(|n| policy(APP_IP, APP_ID, "cvm", &peer_ip(n)))
        .collect()
}

/// Distinct peer address for the n-th generated entry
pub fn peer_ip(n: usize) -> String {
    format!("192.168.{}.{}", n / 250, n % 250 + 1)
}

/// `count` provider rules with distinct peers
pub fn rules(count: usize) -> Vec<PolicyRule> {
    (0..count)
        .map(|n| PolicyRule {
            protocol: "TCP".to_string(),
            port: "22".to_string(),
            cidr_block: format!("172.16.{}.{}", n / 250, n % 250 + 1),
            action: "ACCEPT".to_string(),
            description: "seeded".to_string(),
        })
        .collect()
}
