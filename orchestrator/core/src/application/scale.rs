// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scale Expander
//!
//! Marathon cannot address individual instances of one application, so an
//! application with `count > 1` is rewritten into a group of `count` sibling
//! applications whose ids differ only by the expanded instance index.

use crate::domain::app_definition::runtime_block_count;
use crate::domain::error::StackError;
use crate::domain::protocol::{fields, INSTANCE_INDEX, MAX_INSTANCE_SLOTS};
use crate::domain::value::{integer, ConfigObject};
use serde_json::Value;
use tracing::{debug, warn};

/// What the expander resolved for one application definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleOutcome {
    /// App id before group expansion.
    pub original_app_id: String,
    /// The app id when `count == 1`, otherwise its basename.
    pub app_or_group_name: String,
    /// `instances * count`.
    pub count: u64,
}

/// Folds `instances` into `count` and rewrites `app_id` for group expansion.
///
/// The definition is left untouched when the resolved count does not fit in
/// [`MAX_INSTANCE_SLOTS`] once multiplied by its runtime blocks.
pub fn convert_instances_to_group(name: &str, app: &mut ConfigObject) -> Result<ScaleOutcome, StackError> {
    let count = resolve_count(name, app)?;

    app.remove(fields::INSTANCES);
    app.insert(fields::COUNT.to_string(), Value::from(count));

    let app_id = match app.get(fields::APP_ID).and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = clean_path(&format!("/{}", name));
            app.insert(fields::APP_ID.to_string(), Value::from(id.clone()));
            id
        }
    };

    let mut app_or_group_name = app_id.clone();

    if count > 1 {
        app_or_group_name = basename(&app_id).to_string();
        let templated = clean_path(&format!("{}/{}-{}", app_id, app_or_group_name, INSTANCE_INDEX));
        debug!(app = name, app_id = %templated, count, "expanded application into group");
        app.insert(fields::APP_ID.to_string(), Value::from(templated));
    }

    Ok(ScaleOutcome {
        original_app_id: app_id,
        app_or_group_name,
        count,
    })
}

/// `instances * count` of a definition, bounded by [`MAX_INSTANCE_SLOTS`].
pub fn resolve_count(name: &str, app: &ConfigObject) -> Result<u64, StackError> {
    let too_many = || StackError::TooManyInstances {
        app: name.to_string(),
        limit: MAX_INSTANCE_SLOTS,
    };

    let instances = read_multiplier(app.get(fields::INSTANCES), fields::INSTANCES);
    let count = read_multiplier(app.get(fields::COUNT), fields::COUNT)
        .checked_mul(instances)
        .ok_or_else(too_many)?;

    let slots = count
        .checked_mul(runtime_block_count(app).max(1) as u64)
        .ok_or_else(too_many)?;
    if slots > MAX_INSTANCE_SLOTS {
        return Err(too_many());
    }

    Ok(count)
}

/// Absent and non-integer values count as 1. Negative integers deploy
/// nothing, like an explicit 0.
fn read_multiplier(value: Option<&Value>, field: &str) -> u64 {
    match value {
        None | Some(Value::Null) => 1,
        Some(v) => match integer(Some(v)) {
            Some(Ok(n)) => n,
            Some(Err(negative)) => {
                warn!(field, value = negative, "negative replica field, deploying no instances");
                0
            }
            None => {
                warn!(field, value = %v, "ignoring malformed replica field, defaulting to 1");
                1
            }
        },
    }
}

/// Lexically cleans a slash-separated path, like `path.Clean` on an
/// absolute path: duplicate separators and `.` segments are dropped and
/// `..` pops a segment.
pub(crate) fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Last element of a slash-separated path.
pub(crate) fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { "/" };
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app(value: Value) -> ConfigObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_single_instance_derives_app_id() {
        let mut web = app(json!({"cmd": "./server"}));
        let outcome = convert_instances_to_group("web", &mut web).unwrap();

        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.original_app_id, "/web");
        assert_eq!(outcome.app_or_group_name, "/web");
        assert_eq!(web["app_id"], "/web");
        assert_eq!(web["count"], 1);
    }

    #[test]
    fn test_count_expands_into_group() {
        let mut web = app(json!({"cmd": "./server", "count": 2}));
        let outcome = convert_instances_to_group("web", &mut web).unwrap();

        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.original_app_id, "/web");
        assert_eq!(outcome.app_or_group_name, "web");
        assert_eq!(web["app_id"], "/web/web-${count.index + 1}");
    }

    #[test]
    fn test_instances_multiply_count_and_are_removed() {
        let mut api = app(json!({"instances": 3, "count": 2, "app_id": "/team/api"}));
        let outcome = convert_instances_to_group("api", &mut api).unwrap();

        assert_eq!(outcome.count, 6);
        assert!(!api.contains_key("instances"));
        assert_eq!(api["count"], 6);
        assert_eq!(outcome.original_app_id, "/team/api");
        assert_eq!(api["app_id"], "/team/api/api-${count.index + 1}");
    }

    #[test]
    fn test_malformed_fields_default_to_one() {
        let mut api = app(json!({"instances": "three", "count": 2.5, "app_id": ""}));
        let outcome = convert_instances_to_group("api", &mut api).unwrap();

        assert_eq!(outcome.count, 1);
        assert!(!api.contains_key("instances"));
        assert_eq!(api["app_id"], "/api");
    }

    #[test]
    fn test_zero_count_is_kept() {
        let mut web = app(json!({"cmd": "./server", "count": 0}));
        let outcome = convert_instances_to_group("web", &mut web).unwrap();

        assert_eq!(outcome.count, 0);
        assert_eq!(web["count"], 0);
        assert_eq!(web["app_id"], "/web");

        let mut api = app(json!({"count": 3, "instances": 0}));
        assert_eq!(convert_instances_to_group("api", &mut api).unwrap().count, 0);
    }

    #[test]
    fn test_negative_count_deploys_nothing() {
        let mut web = app(json!({"cmd": "./server", "count": -4}));
        assert_eq!(convert_instances_to_group("web", &mut web).unwrap().count, 0);
        assert_eq!(web["count"], 0);
    }

    #[test]
    fn test_overflowing_count_is_rejected_untouched() {
        let original = json!({"cmd": "./x", "count": 1u64 << 33, "instances": 1u64 << 33});
        let mut web = app(original.clone());

        let err = convert_instances_to_group("web", &mut web).unwrap_err();

        assert!(matches!(err, StackError::TooManyInstances { ref app, .. } if app == "web"));
        assert!(err.is_validation());
        assert_eq!(Value::Object(web), original);
    }

    #[test]
    fn test_instance_slots_include_runtime_blocks() {
        let mut api = app(json!({
            "count": MAX_INSTANCE_SLOTS / 2,
            "container": [{"docker": [{"image": "a"}, {"image": "b"}]}]
        }));
        assert_eq!(convert_instances_to_group("api", &mut api).unwrap().count, MAX_INSTANCE_SLOTS / 2);

        let mut api = app(json!({
            "count": MAX_INSTANCE_SLOTS / 2 + 1,
            "container": [{"docker": [{"image": "a"}, {"image": "b"}]}]
        }));
        assert!(matches!(
            convert_instances_to_group("api", &mut api),
            Err(StackError::TooManyInstances { limit: MAX_INSTANCE_SLOTS, .. })
        ));
        assert!(resolve_count("huge", &app(json!({"count": u64::MAX}))).is_err());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/web"), "/web");
        assert_eq!(clean_path("//a/./b//"), "/a/b");
        assert_eq!(clean_path("/a/b/../c"), "/a/c");
        assert_eq!(clean_path("/"), "/");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/web"), "web");
        assert_eq!(basename("/team/api/"), "api");
        assert_eq!(basename("/"), "/");
    }
}
