// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Marathon HTTP Client
//!
//! Proves a user's Marathon credentials work before a stack is deployed.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Credential verification against the Marathon REST API
//! - **Integration:** `GET <url>/ping` (optionally with HTTP basic auth)
//!
//! # Usage
//!
//! ```ignore
//! let client = MarathonClient::new();
//! let credential = MarathonCredential::new("http://marathon.mesos:8080")
//!     .with_basic_auth("admin", "secret");
//! client.verify(&credential).await?;
//! ```

use crate::domain::credential::{CredentialVerifier, MarathonCredential};
use crate::domain::error::StackError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

// ============================================================================
// Client Implementation
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MarathonClient {
    client: Client,
}

impl MarathonClient {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn ping_url(base_url: &str) -> String {
        format!("{}/ping", base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CredentialVerifier for MarathonClient {
    async fn verify(&self, credential: &MarathonCredential) -> Result<(), StackError> {
        if credential.url.is_empty() {
            return Err(StackError::Credential("marathon url is empty".to_string()));
        }

        let url = Self::ping_url(&credential.url);
        debug!(%url, "pinging marathon");

        let mut request = self.client.get(&url);
        if let Some(user) = &credential.basic_auth_user {
            request = request.basic_auth(user, credential.basic_auth_password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| StackError::Credential(format!("failed to reach {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StackError::Credential(format!("{} responded with {}", url, status)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_url() {
        assert_eq!(MarathonClient::ping_url("http://marathon:8080"), "http://marathon:8080/ping");
        assert_eq!(MarathonClient::ping_url("http://marathon:8080/"), "http://marathon:8080/ping");
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let err = MarathonClient::new().verify(&MarathonCredential::new("")).await.unwrap_err();
        assert!(matches!(err, StackError::Credential(_)));
    }
}
