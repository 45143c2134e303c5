// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Stack Configuration Types
//
// Defines the configuration schema for the Marathon stack engine, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Control plane, kloud and tunnel endpoints handed to every agent
// - Agent download and entrypoint script locations
// - Kite key signing material
// - Deadlines for network-bound calls
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "marathon-stack/v1";
pub const KIND: &str = "StackConfig";

/// Top-level Kubernetes-style stack configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfigManifest {
    /// API version (must be "marathon-stack/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "StackConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: StackConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable name of this deployment environment
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfigSpec {
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub kite_key: KiteKeyConfig,

    #[serde(default)]
    pub deadlines: DeadlineConfig,

    /// Ask every agent to start with debug logging
    #[serde(default)]
    pub debug: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Kontrol (agent registry) URL
    #[serde(default = "default_kontrol_url")]
    pub kontrol_url: String,

    /// Kloud (control plane) URL
    #[serde(default = "default_kloud_url")]
    pub kloud_url: String,

    /// Tunnel proxy URL
    #[serde(default = "default_tunnel_url")]
    pub tunnel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Where the entrypoint downloads the agent from
    #[serde(default = "default_klient_url")]
    pub klient_url: String,

    /// Base URL the `entrypoint.N.sh` scripts are fetched from
    #[serde(default = "default_entrypoint_base_url")]
    pub entrypoint_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KiteKeyConfig {
    /// `iss` claim of issued kite keys
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// `aud` claim of issued kite keys
    #[serde(default = "default_audience")]
    pub audience: String,

    /// HS256 shared secret (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// RS256 private key in PEM format; takes precedence over `secret`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,

    /// Lifetime of issued keys
    #[serde(default = "default_kite_key_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineConfig {
    /// Upper bound for the Marathon ping
    #[serde(default = "default_verify_deadline", with = "humantime_serde")]
    pub verify: Duration,

    /// Upper bound for issuing a single kite key
    #[serde(default = "default_issue_deadline", with = "humantime_serde")]
    pub issue: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Process-wide deployment settings handed explicitly to the injectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentEndpoints {
    pub kontrol_url: String,
    pub kloud_url: String,
    pub tunnel_url: String,
    pub klient_url: String,
    pub entrypoint_base_url: String,
    pub debug: bool,
}

// Default value functions
fn default_kontrol_url() -> String {
    "https://koding.com/kontrol/kite".to_string()
}

fn default_kloud_url() -> String {
    "https://koding.com/kloud/kite".to_string()
}

fn default_tunnel_url() -> String {
    "http://t.koding.com/kite".to_string()
}

fn default_klient_url() -> String {
    "https://koding-klient.s3.amazonaws.com/production/latest/klient.gz".to_string()
}

fn default_entrypoint_base_url() -> String {
    "https://koding-klient.s3.amazonaws.com/entrypoint".to_string()
}

fn default_issuer() -> String {
    "koding".to_string()
}

fn default_audience() -> String {
    "/".to_string()
}

fn default_kite_key_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_verify_deadline() -> Duration {
    Duration::from_secs(30)
}

fn default_issue_deadline() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            kontrol_url: default_kontrol_url(),
            kloud_url: default_kloud_url(),
            tunnel_url: default_tunnel_url(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            klient_url: default_klient_url(),
            entrypoint_base_url: default_entrypoint_base_url(),
        }
    }
}

impl Default for KiteKeyConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: default_audience(),
            secret: None,
            private_key_path: None,
            ttl: default_kite_key_ttl(),
        }
    }
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            verify: default_verify_deadline(),
            issue: default_issue_deadline(),
        }
    }
}

impl Default for StackConfigSpec {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConfig::default(),
            agent: AgentConfig::default(),
            kite_key: KiteKeyConfig::default(),
            deadlines: DeadlineConfig::default(),
            debug: false,
            observability: None,
        }
    }
}

impl Default for StackConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "marathon-stack".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: StackConfigSpec::default(),
        }
    }
}

impl KiteKeyConfig {
    /// Resolves the HS256 secret, following an "env:VAR_NAME" indirection.
    pub fn resolve_secret(&self) -> anyhow::Result<Option<String>> {
        match self.secret.as_deref() {
            None => Ok(None),
            Some(value) => match value.strip_prefix("env:") {
                Some(var) => std::env::var(var)
                    .map(Some)
                    .map_err(|_| anyhow::anyhow!("kite_key.secret references unset environment variable {}", var)),
                None => Ok(Some(value.to_string())),
            },
        }
    }
}

impl StackConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. MSTACK_CONFIG_PATH environment variable
    /// 2. ./marathon-stack.yaml (working directory)
    /// 3. ~/.marathon-stack/config.yaml (user home)
    /// 4. /etc/marathon-stack/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MSTACK_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./marathon-stack.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".marathon-stack").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/marathon-stack/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MSTACK_DEBUG") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => {
                    tracing::info!("Environment override: MSTACK_DEBUG=true");
                    self.spec.debug = true;
                }
                "false" | "0" | "no" | "off" => {
                    tracing::info!("Environment override: MSTACK_DEBUG=false");
                    self.spec.debug = false;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for MSTACK_DEBUG: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }

        let endpoints = &mut self.spec.endpoints;
        for (var, slot) in [
            ("MSTACK_KONTROL_URL", &mut endpoints.kontrol_url),
            ("MSTACK_KLOUD_URL", &mut endpoints.kloud_url),
            ("MSTACK_TUNNEL_URL", &mut endpoints.tunnel_url),
        ] {
            if let Ok(val) = std::env::var(var) {
                if !val.is_empty() {
                    tracing::info!("Environment override: {}={}", var, val);
                    *slot = val;
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let endpoints = &self.spec.endpoints;
        for (field, value) in [
            ("endpoints.kontrol_url", &endpoints.kontrol_url),
            ("endpoints.kloud_url", &endpoints.kloud_url),
            ("endpoints.tunnel_url", &endpoints.tunnel_url),
            ("agent.klient_url", &self.spec.agent.klient_url),
            ("agent.entrypoint_base_url", &self.spec.agent.entrypoint_base_url),
        ] {
            if value.is_empty() {
                anyhow::bail!("spec.{} cannot be empty", field);
            }
        }

        if self.spec.kite_key.issuer.is_empty() {
            anyhow::bail!("spec.kite_key.issuer cannot be empty");
        }

        if self.spec.kite_key.ttl.is_zero() {
            anyhow::bail!("spec.kite_key.ttl must be greater than zero");
        }

        if self.spec.deadlines.verify.is_zero() || self.spec.deadlines.issue.is_zero() {
            anyhow::bail!("spec.deadlines must be greater than zero");
        }

        Ok(())
    }

    /// Settings the metadata and fetch injectors consume.
    pub fn deployment_endpoints(&self) -> DeploymentEndpoints {
        DeploymentEndpoints {
            kontrol_url: self.spec.endpoints.kontrol_url.clone(),
            kloud_url: self.spec.endpoints.kloud_url.clone(),
            tunnel_url: self.spec.endpoints.tunnel_url.clone(),
            klient_url: self.spec.agent.klient_url.clone(),
            entrypoint_base_url: self.spec.agent.entrypoint_base_url.clone(),
            debug: self.spec.debug,
        }
    }
}
