// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security Policy Engine
//!
//! - [`PolicyCalculator`] expands a traffic description into rule entries
//!   addressed to concrete resources.
//! - [`PolicyAllocator`] packs those entries into security groups under the
//!   rule quota and binds the groups to their resources.

pub mod allocator;
pub mod auto_group;
pub mod calculator;
pub mod packing;

pub use allocator::PolicyAllocator;
pub use auto_group::{auto_group_index, auto_group_name, auto_group_prefix, AutoGroup, AutoGroups};
pub use calculator::{CalcPlan, CalcReport, PolicyCalculator};
pub use packing::{free_capacity, PackingPlan};
