// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Entrypoint Injector
//!
//! Injects an entrypoint responsible for installing the agent before the
//! container's own command runs. The injection is twofold:
//!
//! - if `cmd` is set, it is prefixed with an `entrypoint.N.sh` script
//! - otherwise every container gets an `entrypoint` runtime parameter,
//!   replacing the image's default entrypoint with the bootstrap one
//!
//! This is the only place instance labels are generated.

use crate::domain::app_definition::{runtime_block_count, runtime_blocks_mut, AppDefinition};
use crate::domain::error::StackError;
use crate::domain::expansion::EntrypointStrategy;
use crate::domain::label::InstanceLabel;
use crate::domain::protocol::{entrypoint_path, fields, INSTANCE_INDEX, MAX_INSTANCE_SLOTS};
use crate::domain::value::{append_grouped, non_empty_str};
use serde_json::{json, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointOutcome {
    pub strategy: EntrypointStrategy,
    pub container_count: usize,
    pub labels: Vec<InstanceLabel>,
}

/// Fails when the definition declares `args`, which the entrypoint wrapping
/// cannot coexist with.
pub fn check_compatible(name: &str, app: &AppDefinition) -> Result<(), StackError> {
    if app.contains_key(fields::ARGS) {
        return Err(StackError::IncompatibleEntrypoint {
            app: name.to_string(),
        });
    }
    Ok(())
}

pub fn inject_entrypoint(
    name: &str,
    app: &mut AppDefinition,
    original_app_id: &str,
    count: u64,
) -> Result<EntrypointOutcome, StackError> {
    check_compatible(name, app)?;

    let slots = count.checked_mul(runtime_block_count(app).max(1) as u64);
    if !matches!(slots, Some(n) if n <= MAX_INSTANCE_SLOTS) {
        return Err(StackError::TooManyInstances {
            app: name.to_string(),
            limit: MAX_INSTANCE_SLOTS,
        });
    }
    let instances = count as usize;

    if let Some(cmd) = non_empty_str(app.get(fields::CMD)).map(str::to_string) {
        let wrapped = format!("{} {}", entrypoint_path(INSTANCE_INDEX), cmd);
        app.insert(fields::CMD.to_string(), Value::from(wrapped));

        // Mesos runs every container through a fixed /bin/sh entrypoint, so
        // with "cmd" only one agent per instance can be wrapped.
        let labels = if count == 1 {
            vec![InstanceLabel::new(original_app_id)]
        } else {
            (1..=instances)
                .map(|i| InstanceLabel::for_instance(original_app_id, i))
                .collect()
        };

        debug!(app = name, labels = labels.len(), "wrapped cmd with entrypoint");

        return Ok(EntrypointOutcome {
            strategy: EntrypointStrategy::Command,
            container_count: 0,
            labels,
        });
    }

    let mut blocks = runtime_blocks_mut(app);
    let container_count = blocks.len();

    for (ordinal, block) in blocks.iter_mut().enumerate() {
        let index = format!("${{count.index * {} + {}}}", container_count, ordinal + 1);
        let parameter = json!({
            "key": "entrypoint",
            "value": entrypoint_path(&index),
        });
        append_grouped(block, fields::PARAMETERS, fields::PARAMETER, [parameter]);
    }

    if container_count == 0 {
        warn!(app = name, "application has neither cmd nor containers, no agent will be injected");
    }

    let mut labels = Vec::with_capacity(instances * container_count);
    for instance in 1..=instances {
        for container in 1..=container_count {
            labels.push(InstanceLabel::for_container(original_app_id, instance, container));
        }
    }

    debug!(app = name, container_count, labels = labels.len(), "injected container entrypoints");

    Ok(EntrypointOutcome {
        strategy: EntrypointStrategy::Container,
        container_count,
        labels,
    })
}
