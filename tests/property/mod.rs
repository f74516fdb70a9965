// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - `auto_group` - detection of `{ip}-auto-{n}` groups
//! - `allocation` - bin-packing plans and end-to-end placement

mod allocation;
mod auto_group;
