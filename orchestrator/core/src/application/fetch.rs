// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::app_definition::AppDefinition;
use crate::domain::protocol::{entrypoint_uri, fields};
use crate::domain::value::append;
use serde_json::json;

/// Appends one executable `entrypoint.<i>.sh` fetch entry per label,
/// `i` running from 1 to `label_count`.
pub fn inject_fetch_entrypoints(app: &mut AppDefinition, entrypoint_base_url: &str, label_count: usize) {
    let entries = (1..=label_count).map(|i| {
        json!({
            "uri": entrypoint_uri(entrypoint_base_url, i),
            "executable": true,
        })
    });

    append(app, fields::FETCH, entries);
}
