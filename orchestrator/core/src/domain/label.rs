// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one deployed instance, or one instance×container pair.
///
/// The position of a label in its expansion is what correlates it with the
/// entrypoint script, fetch entry and metadata variable of the same 1-based
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceLabel(String);

impl InstanceLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Label of the `instance`-th replica (1-based).
    pub fn for_instance(app_id: &str, instance: usize) -> Self {
        Self(format!("{}-{}", app_id, instance))
    }

    /// Label of `container` (1-based) inside replica `instance` (1-based).
    pub fn for_container(app_id: &str, instance: usize, container: usize) -> Self {
        Self(format!("{}-{}-{}", app_id, instance, container))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstanceLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
