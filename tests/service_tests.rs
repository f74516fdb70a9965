// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Service Tests
//!
//! Drives both actions through their JSON interface, the way an outer
//! transport would.

mod fixtures;

use pretty_assertions::assert_eq;
use serde_json::json;

use cim_security_policy::service::{APPLY_SECURITY_POLICIES, CALC_SECURITY_POLICIES};
use cim_security_policy::{PolicyError, SecurityPolicyConfig};
use fixtures::*;

#[tokio::test]
async fn test_calc_output_feeds_apply() {
    let cloud = cloud();
    let engine = engine(&cloud, SecurityPolicyConfig::default());

    let calc = engine
        .dispatch(
            CALC_SECURITY_POLICIES,
            json!({
                "protocol": "TCP",
                "source_ips": [EXTERNAL_IP],
                "dest_ips": [LB_IP, DB_IP],
                "dest_port": "80",
                "policy_action": "accept",
                "policy_directions": ["ingress"],
                "description": "web"
            }),
        )
        .await
        .unwrap();

    assert!(calc.is_ok());
    assert_eq!(calc.output["ingress_policies_total"], 3);
    assert_eq!(calc.output["egress_policies_total"], 0);
    assert_eq!(calc.output["ingress_policies"][0]["type"], "clb-cvm");

    let apply = engine
        .dispatch(APPLY_SECURITY_POLICIES, calc.output.clone())
        .await
        .unwrap();

    assert!(apply.is_ok());
    let ingress = &apply.output["ingress"];
    assert_eq!(ingress["policies_total"], 3);
    assert_eq!(ingress["success_policies_total"], 3);
    assert_eq!(ingress["failed_policies_total"], 0);
    assert_eq!(ingress["success_policies"][0]["type"], "cvm");

    assert_eq!(
        cloud.group_names(),
        vec!["10.0.1.1-auto-1", "10.0.2.1-auto-1", "10.0.2.2-auto-1"]
    );
    let rules = cloud.rules_of("10.0.2.1-auto-1").unwrap();
    let rule = &rules.ingress[0];
    assert_eq!(rule.action, "ACCEPT");
    assert_eq!(rule.port, "8080");
    assert_eq!(rule.cidr_block, EXTERNAL_IP);
}

#[tokio::test]
async fn test_calc_reports_errors_next_to_output() {
    let cloud = cloud();
    let engine = engine(&cloud, SecurityPolicyConfig::default());

    let outcome = engine
        .dispatch(
            CALC_SECURITY_POLICIES,
            json!({
                "protocol": "TCP",
                "source_ips": [EXTERNAL_IP],
                "dest_ips": ["10.9.9.9", DB_IP],
                "dest_port": "3306",
                "policy_action": "DROP",
                "policy_directions": ["ingress"]
            }),
        )
        .await
        .unwrap();

    assert_eq!(outcome.output["ingress_policies_total"], 1);
    assert_eq!(outcome.output["ingress_policies"][0]["action"], "DROP");
    assert!(outcome.error.unwrap().is_not_found());
}

#[tokio::test]
async fn test_apply_with_failures_returns_report_and_error() {
    let cloud = cloud();
    let engine = engine(&cloud, SecurityPolicyConfig::default());
    cloud.reject_group_creation();

    let params = json!({
        "ingress_policies": [policy(APP_IP, APP_ID, "cvm", EXTERNAL_IP)],
        "egress_policies": [
            policy(APP_IP, APP_ID, "cvm", EXTERNAL_IP),
            policy(MONGO_IP, MONGO_ID, "mongodb", EXTERNAL_IP)
        ]
    });

    let outcome = engine.dispatch(APPLY_SECURITY_POLICIES, params).await.unwrap();

    assert_eq!(outcome.error, Some(PolicyError::PartialFailure { failed: 2 }));
    assert_eq!(outcome.output["ingress"]["failed_policies_total"], 1);
    assert_eq!(outcome.output["egress"]["failed_policies_total"], 1);
    assert_eq!(outcome.output["egress"]["undo_policies_total"], 1);
    assert!(outcome.output["egress"]["failed_policies"][0]["err_msg"]
        .as_str()
        .unwrap()
        .contains("could not be created"));
}

#[tokio::test]
async fn test_invalid_calc_request_is_rejected() {
    let cloud = cloud();
    let engine = engine(&cloud, SecurityPolicyConfig::default());

    let err = engine
        .dispatch(
            CALC_SECURITY_POLICIES,
            json!({
                "protocol": "GRE",
                "source_ips": [APP_IP],
                "dest_ips": [DB_IP],
                "dest_port": "80",
                "policy_action": "ACCEPT",
                "policy_directions": ["egress"]
            }),
        )
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(cloud.call_count(), 0);
}
