// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bounded, cancellable waits for files produced by other processes.

use std::io::ErrorKind;
use std::path::Path;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::policy::{PollPolicy, WaitError};

/// Poll until `path` exists, the deadline passes or `cancel` fires. An I/O
/// error other than a missing file ends the wait immediately.
pub async fn wait_for_file(
    path: &Path,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    let condition = path.display().to_string();
    let deadline = Instant::now() + policy.timeout;

    loop {
        match tokio::fs::try_exists(path).await {
            Ok(true) => {
                debug!(path = %condition, "File present");
                return Ok(());
            }
            Ok(false) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(WaitError::Inaccessible {
                    condition,
                    reason: e.to_string(),
                });
            }
        }
        if Instant::now() >= deadline {
            return Err(WaitError::TimedOut {
                condition,
                timeout: policy.timeout,
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(WaitError::Cancelled { condition });
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn policy(timeout_ms: u64) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(10), Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn test_existing_file_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, "x").unwrap();
        wait_for_file(&path, policy(0), &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_file_appearing_later() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                std::fs::write(&path, "x").unwrap();
            })
        };
        wait_for_file(&path, policy(2_000), &CancellationToken::new())
            .await
            .unwrap();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never");
        let err = wait_for_file(&path, policy(30), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::TimedOut { .. }));
        assert!(err.to_string().contains("never"));
    }

    #[tokio::test]
    async fn test_io_error_is_not_reported_as_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("aws");
        std::fs::write(&not_a_dir, "x").unwrap();
        let path = not_a_dir.join("credentials");

        let err = wait_for_file(&path, policy(5_000), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            WaitError::Inaccessible { condition, .. } => assert!(condition.ends_with("aws/credentials")),
            other => panic!("expected an access error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = wait_for_file(&dir.path().join("never"), policy(5_000), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { .. }));
    }
}
