// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Credential Ports
//!
//! The engine needs two network-bound collaborators: one proving the user's
//! Marathon credentials work, one minting the identity token each agent
//! instance boots with. Both are traits so the stack service can be driven
//! by the HTTP/JWT implementations in `infrastructure` or by test doubles.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Ports for credential verification and kite key issuance

use crate::domain::error::StackError;
use crate::domain::label::InstanceLabel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Credentials for a Marathon endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct MarathonCredential {
    /// Marathon base URL, e.g. `http://marathon.mesos:8080`
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth_password: Option<String>,
}

impl MarathonCredential {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            basic_auth_user: None,
            basic_auth_password: None,
        }
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth_user = Some(user.into());
        self.basic_auth_password = Some(password.into());
        self
    }
}

impl std::fmt::Debug for MarathonCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarathonCredential")
            .field("url", &self.url)
            .field("basic_auth_user", &self.basic_auth_user)
            .field("basic_auth_password", &self.basic_auth_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Checks that a credential can be used to deploy into Marathon.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &MarathonCredential) -> Result<(), StackError>;
}

/// Issues the identity token an agent instance authenticates with.
#[async_trait]
pub trait KiteKeyIssuer: Send + Sync {
    async fn issue(&self, label: &InstanceLabel, username: &str) -> Result<String, StackError>;
}
