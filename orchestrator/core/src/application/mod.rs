// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod scale;
pub mod entrypoint;
pub mod fetch;
pub mod health;
pub mod metadata;
pub mod plan;
pub mod stack_service;

// Re-export use cases for convenience
pub use stack_service::{AppliedStack, MarathonStack, RequestContext, StackProvider};

use crate::domain::error::StackError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs `fut` until it completes, `deadline` elapses or `cancel` fires.
/// A token that is already cancelled wins over a ready future.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    deadline: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, StackError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StackError::Cancelled),
        result = tokio::time::timeout(deadline, fut) => {
            result.map_err(|_| StackError::DeadlineExceeded { operation, deadline })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let cancel = CancellationToken::new();
        let value = bounded("noop", Duration::from_secs(1), &cancel, async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_deadline() {
        let cancel = CancellationToken::new();
        let err = bounded("sleep", Duration::from_millis(10), &cancel, tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, StackError::DeadlineExceeded { operation: "sleep", .. }));
    }

    #[tokio::test]
    async fn test_bounded_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = bounded("noop", Duration::from_secs(1), &cancel, async { 7 }).await.unwrap_err();
        assert!(matches!(err, StackError::Cancelled));
    }
}
