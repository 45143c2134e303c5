// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Health & Port Injector
//!
//! Adds the agent health probe, reserves the agent port in every container
//! and declares one dynamic host port slot per instance×container, since
//! Marathon requires a `ports` entry for each port it assigns.

use crate::domain::app_definition::{runtime_blocks_mut, AppDefinition};
use crate::domain::protocol::{agent_health_check, agent_port_mapping, fields};
use crate::domain::value::{append, append_grouped};
use serde_json::Value;
use tracing::debug;

/// Returns the number of runtime blocks the port mapping was added to.
pub fn inject_health_checks(app: &mut AppDefinition, count: u64) -> usize {
    append_grouped(app, fields::HEALTH_CHECKS, fields::HEALTH_CHECK, [agent_health_check()]);

    let mut blocks = runtime_blocks_mut(app);
    let container_count = blocks.len();

    for block in blocks.iter_mut() {
        append_grouped(block, fields::PORT_MAPPINGS, fields::PORT_MAPPING, [agent_port_mapping()]);
    }

    let placeholders = usize::try_from(count)
        .unwrap_or(usize::MAX)
        .saturating_mul(container_count);
    append(app, fields::PORTS, std::iter::repeat(Value::from(0)).take(placeholders));

    debug!(container_count, placeholders, "injected health check and agent ports");

    container_count
}
