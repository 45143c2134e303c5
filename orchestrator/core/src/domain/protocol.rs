// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Fixed wire constants shared by the injectors and the agent entrypoint
//! scripts. Changing any of these breaks already-published entrypoints.

use serde_json::{json, Value};

/// Provider tag attached to every machine record.
pub const PROVIDER_NAME: &str = "marathon";

/// Resource type holding the application definitions in a stack template.
pub const RESOURCE_TYPE: &str = "marathon_app";

/// Logical container port the agent listens on.
pub const AGENT_PORT: u16 = 56789;

/// Consecutive failed probes tolerated before an instance is unhealthy.
pub const HEALTH_CHECK_MAX_FAILURES: u32 = 3;

/// Directory Mesos fetches URIs into.
pub const SANDBOX_DIR: &str = "/mnt/mesos/sandbox";

/// Placeholder expanded by the template engine into `1..=count` at apply time.
pub const INSTANCE_INDEX: &str = "${count.index + 1}";

/// Environment variable holding the agent download URL.
pub const KLIENT_URL_ENV: &str = "KODING_KLIENT_URL";

/// Prefix of the positional per-instance metadata variables.
pub const METADATA_ENV_PREFIX: &str = "KODING_METADATA_";

/// Template variables that must never be referenced from user resources.
pub const SHADOWED_VARIABLES: [&str; 2] = ["marathon_basic_auth_user", "marathon_basic_auth_password"];

/// Replacement for shadowed variable references.
pub const SHADOW_PLACEHOLDER: &str = "FORBIDDEN";

/// Upper bound on `count × runtime blocks` for one application. Each slot
/// costs a label, a host port and a kite key.
pub const MAX_INSTANCE_SLOTS: u64 = 10_000;

/// Application definition field names.
pub mod fields {
    pub const INSTANCES: &str = "instances";
    pub const COUNT: &str = "count";
    pub const APP_ID: &str = "app_id";
    pub const CMD: &str = "cmd";
    pub const ARGS: &str = "args";
    pub const CONTAINER: &str = "container";
    pub const DOCKER: &str = "docker";
    pub const PARAMETERS: &str = "parameters";
    pub const PARAMETER: &str = "parameter";
    pub const PORT_MAPPINGS: &str = "port_mappings";
    pub const PORT_MAPPING: &str = "port_mapping";
    pub const FETCH: &str = "fetch";
    pub const HEALTH_CHECKS: &str = "health_checks";
    pub const HEALTH_CHECK: &str = "health_check";
    pub const ENV: &str = "env";
    pub const PORTS: &str = "ports";
}

/// Sandbox path of the entrypoint script with the given index expression.
pub fn entrypoint_path(index: &str) -> String {
    format!("{}/entrypoint.{}.sh", SANDBOX_DIR, index)
}

/// Remote location of the `index`-th entrypoint script.
pub fn entrypoint_uri(base_url: &str, index: usize) -> String {
    format!("{}/entrypoint.{}.sh", base_url.trim_end_matches('/'), index)
}

/// Positional environment key for the `index`-th (1-based) instance.
pub fn metadata_env_key(index: usize) -> String {
    format!("{}{}", METADATA_ENV_PREFIX, index)
}

/// Command probe hitting the agent's `/kite` endpoint on the host port
/// Marathon assigned to [`AGENT_PORT`].
pub fn agent_health_check() -> Value {
    json!({
        "command": {
            "value": format!("curl -f -X GET http://$$HOST:$${{PORT_{}}}/kite", AGENT_PORT),
        },
        "max_consecutive_failures": HEALTH_CHECK_MAX_FAILURES,
        "protocol": "COMMAND",
    })
}

/// Port mapping reserving the agent port with a Marathon-assigned host port.
pub fn agent_port_mapping() -> Value {
    json!({
        "container_port": AGENT_PORT,
        "host_port": 0,
        "protocol": "tcp",
    })
}
