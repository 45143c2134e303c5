// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Metadata Injector
//!
//! Marathon has no per-instance metadata channel, so each instance learns
//! its identity from a positional environment variable:
//! `KODING_METADATA_<i>` holds the base64-encoded agent configuration of the
//! label at position `i` (1-based), and the entrypoint script of the same
//! index picks it up at boot.

use crate::application::bounded;
use crate::domain::app_definition::AppDefinition;
use crate::domain::credential::KiteKeyIssuer;
use crate::domain::error::StackError;
use crate::domain::label::InstanceLabel;
use crate::domain::protocol::{fields, metadata_env_key, KLIENT_URL_ENV};
use crate::domain::stack_config::DeploymentEndpoints;
use crate::domain::value::{ensure_object, non_empty_str};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Agent configuration embedded for a single instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Konfig {
    #[serde(rename = "kiteKey")]
    pub kite_key: String,

    #[serde(rename = "kontrolURL")]
    pub kontrol_url: String,

    #[serde(rename = "kloudURL")]
    pub kloud_url: String,

    #[serde(rename = "tunnelURL")]
    pub tunnel_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

/// Document stored (encoded) in each `KODING_METADATA_<i>` variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    pub konfig: Konfig,
}

impl InstanceMetadata {
    pub fn new(kite_key: String, endpoints: &DeploymentEndpoints) -> Self {
        Self {
            konfig: Konfig {
                kite_key,
                kontrol_url: endpoints.kontrol_url.clone(),
                kloud_url: endpoints.kloud_url.clone(),
                tunnel_url: endpoints.tunnel_url.clone(),
                debug: endpoints.debug.then_some(true),
            },
        }
    }

    /// Compact JSON, base64 (standard alphabet) encoded.
    pub fn encode(&self) -> Result<String, StackError> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self, StackError> {
        let json = STANDARD
            .decode(encoded)
            .map_err(|e| StackError::Serialization(format!("invalid metadata encoding: {}", e)))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Collaborators and bounds for issuing kite keys.
pub struct MetadataContext<'a> {
    pub issuer: &'a dyn KiteKeyIssuer,
    pub endpoints: &'a DeploymentEndpoints,
    pub username: &'a str,
    pub deadline: Duration,
    pub cancel: &'a CancellationToken,
}

/// Embeds agent configuration for every label into the app's `env`.
///
/// Kite keys are issued sequentially; the `env` block is only touched once
/// every label's metadata has been built.
pub async fn inject_metadata(
    app: &mut AppDefinition,
    labels: &[InstanceLabel],
    ctx: &MetadataContext<'_>,
) -> Result<(), StackError> {
    let mut entries = Vec::with_capacity(labels.len());

    for (i, label) in labels.iter().enumerate() {
        let kite_key = bounded(
            "kite key issuance",
            ctx.deadline,
            ctx.cancel,
            ctx.issuer.issue(label, ctx.username),
        )
        .await??;

        let encoded = InstanceMetadata::new(kite_key, ctx.endpoints).encode()?;
        entries.push((metadata_env_key(i + 1), encoded));
        debug!(%label, index = i + 1, "built instance metadata");
    }

    let env = ensure_object(app, fields::ENV);

    if non_empty_str(env.get(KLIENT_URL_ENV)).is_none() {
        env.insert(KLIENT_URL_ENV.to_string(), Value::from(ctx.endpoints.klient_url.clone()));
    }

    for (key, encoded) in entries {
        env.insert(key, Value::from(encoded));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingIssuer {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl CountingIssuer {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl KiteKeyIssuer for CountingIssuer {
        async fn issue(&self, label: &InstanceLabel, username: &str) -> Result<String, StackError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                return Err(StackError::Issuance {
                    label: label.to_string(),
                    reason: "kontrol unavailable".to_string(),
                });
            }
            Ok(format!("key:{}:{}", username, label))
        }
    }

    fn endpoints(debug: bool) -> DeploymentEndpoints {
        DeploymentEndpoints {
            kontrol_url: "https://kontrol.example.com/kite".to_string(),
            kloud_url: "https://kloud.example.com/kite".to_string(),
            tunnel_url: "https://tunnel.example.com/kite".to_string(),
            klient_url: "https://download.example.com/klient.gz".to_string(),
            entrypoint_base_url: "https://bootstrap.example.com/entrypoint".to_string(),
            debug,
        }
    }

    fn labels(names: &[&str]) -> Vec<InstanceLabel> {
        names.iter().map(|n| InstanceLabel::new(*n)).collect()
    }

    #[tokio::test]
    async fn test_one_entry_per_label() {
        let issuer = CountingIssuer::new(None);
        let endpoints = endpoints(true);
        let cancel = CancellationToken::new();
        let ctx = MetadataContext {
            issuer: &issuer,
            endpoints: &endpoints,
            username: "alice",
            deadline: Duration::from_secs(1),
            cancel: &cancel,
        };

        let mut app = AppDefinition::new();
        inject_metadata(&mut app, &labels(&["/web-1", "/web-2"]), &ctx).await.unwrap();

        let env = app["env"].as_object().unwrap();
        assert_eq!(env.len(), 3);
        assert_eq!(env["KODING_KLIENT_URL"], "https://download.example.com/klient.gz");

        let second = InstanceMetadata::decode(env["KODING_METADATA_2"].as_str().unwrap()).unwrap();
        assert_eq!(second.konfig.kite_key, "key:alice:/web-2");
        assert_eq!(second.konfig.kontrol_url, "https://kontrol.example.com/kite");
        assert_eq!(second.konfig.debug, Some(true));
    }

    #[tokio::test]
    async fn test_user_klient_url_is_kept() {
        let issuer = CountingIssuer::new(None);
        let endpoints = endpoints(false);
        let cancel = CancellationToken::new();
        let ctx = MetadataContext {
            issuer: &issuer,
            endpoints: &endpoints,
            username: "alice",
            deadline: Duration::from_secs(1),
            cancel: &cancel,
        };

        let mut app = json!({"env": {"KODING_KLIENT_URL": "https://mirror.internal/klient.gz", "TZ": "UTC"}})
            .as_object()
            .cloned()
            .unwrap();
        inject_metadata(&mut app, &labels(&["/web"]), &ctx).await.unwrap();

        assert_eq!(app["env"]["KODING_KLIENT_URL"], "https://mirror.internal/klient.gz");
        assert_eq!(app["env"]["TZ"], "UTC");

        let only = InstanceMetadata::decode(app["env"]["KODING_METADATA_1"].as_str().unwrap()).unwrap();
        assert_eq!(only.konfig.debug, None);
    }

    #[tokio::test]
    async fn test_issuance_failure_leaves_env_untouched() {
        let issuer = CountingIssuer::new(Some(2));
        let endpoints = endpoints(false);
        let cancel = CancellationToken::new();
        let ctx = MetadataContext {
            issuer: &issuer,
            endpoints: &endpoints,
            username: "alice",
            deadline: Duration::from_secs(1),
            cancel: &cancel,
        };

        let mut app = AppDefinition::new();
        let err = inject_metadata(&mut app, &labels(&["/a-1", "/a-2", "/a-3"]), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, StackError::Issuance { ref label, .. } if label == "/a-2"));
        assert!(!app.contains_key("env"));
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let issuer = CountingIssuer::new(None);
        let endpoints = endpoints(false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = MetadataContext {
            issuer: &issuer,
            endpoints: &endpoints,
            username: "alice",
            deadline: Duration::from_secs(1),
            cancel: &cancel,
        };

        let mut app = AppDefinition::new();
        let err = inject_metadata(&mut app, &labels(&["/web"]), &ctx).await.unwrap_err();
        assert!(matches!(err, StackError::Cancelled));
    }

    #[test]
    fn test_metadata_wire_format() {
        let metadata = InstanceMetadata::new("jwt".to_string(), &endpoints(false));
        let json: Value = serde_json::from_slice(&STANDARD.decode(metadata.encode().unwrap()).unwrap()).unwrap();
        assert_eq!(
            json,
            json!({"konfig": {
                "kiteKey": "jwt",
                "kontrolURL": "https://kontrol.example.com/kite",
                "kloudURL": "https://kloud.example.com/kite",
                "tunnelURL": "https://tunnel.example.com/kite"
            }})
        );
    }
}
