// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use marathon_stack_core::application::entrypoint::{check_compatible, inject_entrypoint};
use marathon_stack_core::application::fetch::inject_fetch_entrypoints;
use marathon_stack_core::application::health::inject_health_checks;
use marathon_stack_core::domain::app_definition::AppDefinition;
use marathon_stack_core::domain::error::StackError;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;

fn container_app(k: usize) -> AppDefinition {
    let containers: Vec<Value> = (0..k)
        .map(|j| json!({"docker": {"image": format!("img-{}", j)}}))
        .collect();
    json!({"container": containers}).as_object().cloned().unwrap()
}

/// Evaluates `${count.index * K + J}` for a concrete 0-based instance index.
fn entrypoint_index(value: &str, instance: u64) -> u64 {
    let expr = value
        .trim_start_matches("/mnt/mesos/sandbox/entrypoint.${count.index * ")
        .trim_end_matches("}.sh");
    let (k, j) = expr.split_once(" + ").unwrap();
    instance * k.parse::<u64>().unwrap() + j.parse::<u64>().unwrap()
}

proptest! {
    #[test]
    fn test_container_grid(c in 1u64..8, k in 1usize..6) {
        let mut app = container_app(k);
        let outcome = inject_entrypoint("svc", &mut app, "/svc", c).unwrap();

        prop_assert_eq!(outcome.labels.len(), c as usize * k);
        let distinct: HashSet<_> = outcome.labels.iter().collect();
        prop_assert_eq!(distinct.len(), outcome.labels.len());
        prop_assert_eq!(outcome.labels[0].as_str(), "/svc-1-1");
        let last = format!("/svc-{}-{}", c, k);
        prop_assert_eq!(outcome.labels.last().unwrap().as_str(), last.as_str());

        let values: Vec<String> = app["container"]
            .as_array()
            .unwrap()
            .iter()
            .map(|container| {
                container["docker"]["parameters"]["parameter"][0]["value"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();

        let mut indices: Vec<u64> = (0..c)
            .flat_map(|i| values.iter().map(move |v| entrypoint_index(v, i)))
            .collect();
        indices.sort_unstable();
        let expected: Vec<u64> = (1..=c * k as u64).collect();
        prop_assert_eq!(indices, expected);
    }

    #[test]
    fn test_command_labels(c in 1u64..20) {
        let mut app = json!({"cmd": "./run"}).as_object().cloned().unwrap();
        let outcome = inject_entrypoint("svc", &mut app, "/svc", c).unwrap();

        let labels: Vec<&str> = outcome.labels.iter().map(|l| l.as_str()).collect();
        if c == 1 {
            prop_assert_eq!(labels, vec!["/svc"]);
        } else {
            let expected: Vec<String> = (1..=c).map(|i| format!("/svc-{}", i)).collect();
            prop_assert_eq!(labels, expected.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_injected_artifact_counts(c in 1u64..8, k in 1usize..5, existing_checks in 0usize..3) {
        let mut app = container_app(k);
        let checks: Vec<Value> = (0..existing_checks).map(|_| json!({"protocol": "TCP"})).collect();
        app.insert("health_checks".into(), json!({"health_check": checks}));

        let outcome = inject_entrypoint("svc", &mut app, "/svc", c).unwrap();
        inject_fetch_entrypoints(&mut app, "https://bootstrap.example.com", outcome.labels.len());
        let containers = inject_health_checks(&mut app, c);

        prop_assert_eq!(containers, k);
        prop_assert_eq!(app["fetch"].as_array().unwrap().len(), outcome.labels.len());
        prop_assert_eq!(app["ports"].as_array().unwrap().len(), c as usize * k);
        prop_assert_eq!(
            app["health_checks"]["health_check"].as_array().unwrap().len(),
            existing_checks + 1
        );
        for container in app["container"].as_array().unwrap() {
            prop_assert_eq!(
                container["docker"]["port_mappings"]["port_mapping"].as_array().unwrap().len(),
                1
            );
        }
    }

    #[test]
    fn test_args_always_conflicts(c in 1u64..10, k in 0usize..4, with_cmd in any::<bool>()) {
        let mut app = container_app(k);
        app.insert("args".into(), json!(["--flag"]));
        if with_cmd {
            app.insert("cmd".into(), json!("./run"));
        }

        prop_assert!(check_compatible("svc", &app).is_err());
        let result = inject_entrypoint("svc", &mut app, "/svc", c);
        prop_assert!(
            matches!(result, Err(StackError::IncompatibleEntrypoint { .. })),
            "args must conflict"
        );
    }
}
