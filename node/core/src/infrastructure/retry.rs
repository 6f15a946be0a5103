// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fixed-backoff retry for external calls.
//!
//! ```ignore
//! let output = retry_fixed(&policy, "ssm-register", |e: &RegistrarError| !is_fatal(e), || async {
//!     registrar.register(&activation, &region).await
//! })
//! .await?;
//! ```

use std::future::Future;
use tracing::{error, warn};

use crate::domain::policy::RetryPolicy;

/// Run `operation` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between attempts. Errors for which `retryable` returns false are returned
/// at once.
pub async fn retry_fixed<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !retryable(&e) {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed with a non-retryable error"
                    );
                    return Err(e);
                }
                if attempt >= policy.max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = policy.delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
