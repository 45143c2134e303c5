// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute holding the resolved application (or group) name.
pub const ATTR_APP_ID: &str = "app_id";

/// Attribute holding the resolved replica count.
pub const ATTR_APP_COUNT: &str = "app_count";

/// A machine handed to downstream provisioning, one per instance label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub provider: String,
    pub label: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Label → machine, in label order.
pub type Machines = IndexMap<String, Machine>;
