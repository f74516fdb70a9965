// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Simulator
//!
//! Runs one policy action against an in-memory cloud seeded from a JSON
//! inventory and prints the action's output.
//!
//! Run with: cargo run --bin policy-sim -- <action> <params.json>
//!
//! Environment:
//! 1. POLICY_SIM_INVENTORY - inventory file (default: inventory.json)
//! 2. SECURITY_GROUP_RULE_QUOTA - rules per group and direction (default: 100)
//! 3. SECURITY_GROUP_AUTO_DESCRIPTION - description of created groups
//!
//! The output of `calc-security-policies` is accepted as the input of
//! `apply-security-policies`.

use anyhow::{bail, Context, Result};
use cim_security_policy::{
    provider::{InMemoryCloud, Inventory},
    service::{SecurityPolicyEngine, ACTIONS},
    SecurityPolicyConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Configuration for one simulator run
#[derive(Debug, Clone)]
struct SimulatorConfig {
    /// Inventory seeding the in-memory cloud
    inventory_path: PathBuf,
    /// Action to run
    action: String,
    /// JSON parameter of the action
    params_path: PathBuf,
    /// Allocator configuration
    policy: SecurityPolicyConfig,
}

impl SimulatorConfig {
    /// Load configuration from arguments and environment variables
    fn load() -> Result<Self> {
        let mut args = std::env::args().skip(1);
        let (Some(action), Some(params)) = (args.next(), args.next()) else {
            bail!(
                "usage: policy-sim <action> <params.json> (actions: {})",
                ACTIONS.join(", ")
            );
        };

        let inventory_path = std::env::var("POLICY_SIM_INVENTORY")
            .unwrap_or_else(|_| "inventory.json".to_string())
            .into();

        let policy = SecurityPolicyConfig::from_env().context("Invalid policy configuration")?;

        Ok(Self {
            inventory_path,
            action,
            params_path: params.into(),
            policy,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {}", what, path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {} JSON", what))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 Starting security policy simulator");

    let config = SimulatorConfig::load()?;
    info!("📋 Configuration loaded:");
    info!("  - Inventory: {}", config.inventory_path.display());
    info!("  - Action: {}", config.action);
    info!("  - Rule quota: {}", config.policy.rule_quota);

    let inventory: Inventory = read_json(&config.inventory_path, "inventory")?;
    info!("☁️  Seeded {} regions", inventory.regions.len());
    let params: serde_json::Value = read_json(&config.params_path, "action parameters")?;

    let cloud = Arc::new(InMemoryCloud::from_inventory(inventory));
    let engine = SecurityPolicyEngine::in_memory(cloud.clone(), config.policy.clone());

    let outcome = engine
        .dispatch(&config.action, params)
        .await
        .with_context(|| format!("Action '{}' was rejected", config.action))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome.output).context("Failed to render output")?
    );
    info!("📊 {} provider calls made", cloud.call_count());

    if let Some(e) = outcome.error {
        error!("❌ {}", e);
        bail!(e);
    }

    info!("✅ Done");
    Ok(())
}
