// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::expansion::StackState;
use crate::domain::machine::{Machine, Machines, ATTR_APP_COUNT, ATTR_APP_ID};
use crate::domain::protocol::PROVIDER_NAME;
use std::collections::BTreeMap;

/// Builds one machine record per label, in label order.
///
/// Attributes come from the expansion that produced the label: `app_id`
/// holds the resolved app (or group) name and `app_count` the resolved
/// replica count.
pub fn build_plan(state: &StackState) -> Machines {
    let mut machines = Machines::with_capacity(state.labels.len());

    for expansion in &state.expansions {
        for label in &expansion.labels {
            let attributes = BTreeMap::from([
                (ATTR_APP_ID.to_string(), expansion.app_or_group_name.clone()),
                (ATTR_APP_COUNT.to_string(), expansion.count.to_string()),
            ]);

            machines.insert(
                label.to_string(),
                Machine {
                    provider: PROVIDER_NAME.to_string(),
                    label: label.to_string(),
                    attributes,
                },
            );
        }
    }

    machines
}
