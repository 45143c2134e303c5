// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

/// Every way a stack request can fail. Any of these discards the document
/// being built; nothing partial is returned.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("marathon: applications are empty")]
    EmptyApplications,

    #[error(
        "marathon: application {app:?}: setting \"args\" argument conflicts with the agent entrypoint \
         injected into each container. Please use \"cmd\" argument instead."
    )]
    IncompatibleEntrypoint { app: String },

    #[error("marathon: application {app:?}: replica count exceeds {limit} instance slots")]
    TooManyInstances { app: String, limit: u64 },

    #[error("marathon: instance label {label} is produced by both {first:?} and {second:?}")]
    DuplicateLabel {
        label: String,
        first: String,
        second: String,
    },

    #[error("marathon: error decoding template: {0}")]
    Decode(String),

    #[error("marathon: credential verification failed: {0}")]
    Credential(String),

    #[error("marathon: error issuing kite key for {label}: {reason}")]
    Issuance { label: String, reason: String },

    #[error("marathon: serialization error: {0}")]
    Serialization(String),

    #[error("marathon: error shadowing: {0}")]
    Shadow(String),

    #[error("marathon: {operation} exceeded deadline of {deadline:?}")]
    DeadlineExceeded {
        operation: &'static str,
        deadline: std::time::Duration,
    },

    #[error("marathon: request cancelled")]
    Cancelled,
}

impl StackError {
    /// Whether the error was raised by request validation, before any kite
    /// key was issued.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyApplications
                | Self::IncompatibleEntrypoint { .. }
                | Self::TooManyInstances { .. }
                | Self::DuplicateLabel { .. }
        )
    }
}

impl From<serde_json::Error> for StackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
