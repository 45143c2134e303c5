// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Expansion Records
//!
//! Each application definition processed in a request yields its own
//! [`Expansion`]. The request-wide [`StackState`] is assembled from those
//! records once every definition has been processed, so a later definition
//! can never overwrite the count or name another definition's labels were
//! generated from.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Per-definition results and request-scoped engine state

use crate::domain::error::StackError;
use crate::domain::label::InstanceLabel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the agent entrypoint was wired into an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrypointStrategy {
    /// The user's `cmd` was prefixed with the entrypoint script.
    Command,
    /// Every container's runtime got an `entrypoint` parameter.
    Container,
}

/// Result of running one application definition through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expansion {
    /// Key of the definition in the template's resource block.
    pub name: String,

    /// Identifier before group expansion (e.g. `/web`).
    pub original_app_id: String,

    /// `original_app_id` when the count is 1, otherwise its basename.
    pub app_or_group_name: String,

    /// Resolved replica count (`instances * count`).
    pub count: u64,

    /// Number of runtime blocks found in the definition.
    pub container_count: usize,

    pub strategy: Option<EntrypointStrategy>,

    /// Labels in entrypoint order.
    pub labels: Vec<InstanceLabel>,
}

impl Expansion {
    pub fn new(name: impl Into<String>, original_app_id: impl Into<String>, app_or_group_name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            original_app_id: original_app_id.into(),
            app_or_group_name: app_or_group_name.into(),
            count,
            container_count: 0,
            strategy: None,
            labels: Vec::new(),
        }
    }
}

/// Request-scoped engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackState {
    /// Name of the last processed definition.
    pub app_or_group_name: String,

    /// Count of the last processed definition.
    pub app_count: u64,

    /// Every label of the request, in processing order.
    pub labels: Vec<InstanceLabel>,

    /// Per-definition records, in processing order.
    pub expansions: Vec<Expansion>,
}

impl StackState {
    /// Aggregates per-definition records after all of them were processed.
    pub fn from_expansions(expansions: Vec<Expansion>) -> Self {
        let (app_or_group_name, app_count) = expansions
            .last()
            .map(|e| (e.app_or_group_name.clone(), e.count))
            .unwrap_or_default();

        let labels = expansions
            .iter()
            .flat_map(|e| e.labels.iter().cloned())
            .collect();

        Self {
            app_or_group_name,
            app_count,
            labels,
            expansions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Fails on the first label produced twice, e.g. by an application `web`
/// with `count: 2` next to an application named `web-1`.
pub fn check_unique_labels(expansions: &[Expansion]) -> Result<(), StackError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();

    for expansion in expansions {
        for label in &expansion.labels {
            if let Some(first) = owners.insert(label.as_str(), &expansion.name) {
                return Err(StackError::DuplicateLabel {
                    label: label.to_string(),
                    first: first.to_string(),
                    second: expansion.name.clone(),
                });
            }
        }
    }

    Ok(())
}
