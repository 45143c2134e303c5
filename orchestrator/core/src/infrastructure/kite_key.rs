// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::credential::KiteKeyIssuer;
use crate::domain::error::StackError;
use crate::domain::label::InstanceLabel;
use crate::domain::stack_config::KiteKeyConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Claims carried by a kite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KiteKeyClaims {
    pub iss: String,
    /// Operator the instance acts for
    pub sub: String,
    pub aud: String,
    /// Instance label the key is bound to
    pub label: String,
    #[serde(rename = "kontrolURL")]
    pub kontrol_url: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs kite keys locally as JWTs (HS256 shared secret or RS256 PEM key)
pub struct JwtKiteKeyIssuer {
    encoding_key: EncodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    kontrol_url: String,
    ttl: Duration,
}

impl JwtKiteKeyIssuer {
    pub fn new(
        encoding_key: EncodingKey,
        algorithm: Algorithm,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        kontrol_url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            encoding_key,
            algorithm,
            issuer: issuer.into(),
            audience: audience.into(),
            kontrol_url: kontrol_url.into(),
            ttl,
        }
    }

    /// Builds the issuer from configuration. `private_key_path` wins over
    /// `secret`; one of them is required.
    pub fn from_config(config: &KiteKeyConfig, kontrol_url: &str) -> Result<Self> {
        let (encoding_key, algorithm) = if let Some(path) = &config.private_key_path {
            let pem = std::fs::read(path)
                .with_context(|| format!("Failed to read kite key private key: {:?}", path))?;
            let key = EncodingKey::from_rsa_pem(&pem)
                .with_context(|| format!("Invalid RSA private key in {:?}", path))?;
            (key, Algorithm::RS256)
        } else if let Some(secret) = config.resolve_secret()? {
            if secret.is_empty() {
                anyhow::bail!("kite_key.secret cannot be empty");
            }
            (EncodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
        } else {
            anyhow::bail!("kite_key requires either secret or private_key_path");
        };

        Ok(Self::new(
            encoding_key,
            algorithm,
            config.issuer.clone(),
            config.audience.clone(),
            kontrol_url,
            config.ttl,
        ))
    }

    fn claims(&self, label: &InstanceLabel, username: &str) -> KiteKeyClaims {
        let iat = chrono::Utc::now().timestamp();
        KiteKeyClaims {
            iss: self.issuer.clone(),
            sub: username.to_string(),
            aud: self.audience.clone(),
            label: label.to_string(),
            kontrol_url: self.kontrol_url.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        }
    }
}

#[async_trait]
impl KiteKeyIssuer for JwtKiteKeyIssuer {
    async fn issue(&self, label: &InstanceLabel, username: &str) -> Result<String, StackError> {
        let claims = self.claims(label, username);

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key).map_err(|e| {
            StackError::Issuance {
                label: label.to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!(%label, jti = %claims.jti, "issued kite key");
        Ok(token)
    }
}
