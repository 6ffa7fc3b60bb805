// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The retry loop.
//!
//! Most applications use [execute_with_retry], which runs an async operation
//! under a [RetryConfig]. The lower-level [retry_loop] receives the sleep
//! function and an `on_retry` observer, which makes it easy to test and to
//! embed in other loops.
//!
//! # Example
//! ```
//! # use infra_sdk_gax::*;
//! # use infra_sdk_gax::retry_config::RetryConfig;
//! # use infra_sdk_gax::retry_loop::execute_with_retry;
//! async fn get_vcn(id: &str) -> Result<String> {
//!     // ... details omitted ...
//!     # Ok(id.to_string())
//! }
//!
//! # tokio_test::block_on(async {
//! let config = RetryConfig::default();
//! let vcn = execute_with_retry(async || get_vcn("ocid1.vcn.oc1..example").await, &config).await?;
//! # Result::<()>::Ok(()) });
//! ```

use crate::Result;
use crate::backoff_policy::BackoffPolicy;
use crate::error::Error;
use crate::retry_config::RetryConfig;
use crate::retry_policy::RetryPolicy;
use crate::retry_result::RetryResult;
use crate::retry_state::RetryState;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs the retry loop for a given function.
///
/// This functions calls `inner` as long as (1) the retry policy has not
/// expired, and (2) `inner` has not returned a successful response.
///
/// In between calls the function waits the amount of time prescribed by the
/// backoff policy, using `sleep` to implement the wait. If `sleep` returns
/// [Break][ControlFlow::Break] the loop stops with a
/// [cancelled][Error::is_cancelled] error carrying the last error.
///
/// The `on_retry` callback is called before sleeping, with the attempt count,
/// the error, and the delay.
///
/// Errors the retry policy considers permanent are returned unchanged. When
/// the policy is exhausted, or when the next sleep would exceed the remaining
/// time in the policy, the last error is wrapped in an
/// [exhausted][Error::is_exhausted] error.
pub async fn retry_loop<F, S, OnRetry, T>(
    mut inner: F,
    sleep: S,
    idempotent: bool,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
    mut on_retry: OnRetry,
) -> Result<T>
where
    F: AsyncFnMut() -> Result<T>,
    S: AsyncFn(Duration) -> ControlFlow<()>,
    OnRetry: FnMut(u32, &Error, Duration),
{
    let loop_start = tokio::time::Instant::now();
    let mut state = RetryState::new(idempotent);
    loop {
        state.attempt_count = state.attempt_count.saturating_add(1);
        let error = match inner().await {
            Ok(r) => return Ok(r),
            Err(e) => e,
        };
        state.elapsed = loop_start.elapsed();
        let error = match retry_policy.on_error(&state, error) {
            RetryResult::Permanent(e) => return Err(e),
            RetryResult::Exhausted(e) => return Err(Error::exhausted(e)),
            RetryResult::Continue(e) => e,
        };
        let delay = backoff_policy.on_failure(&state);
        if retry_policy
            .remaining_time(&state)
            .is_some_and(|remaining| remaining < delay)
        {
            return Err(Error::exhausted(error));
        }
        on_retry(state.attempt_count, &error, delay);
        if sleep(delay).await.is_break() {
            return Err(Error::cancelled(error));
        }
    }
}

/// Runs `operation` under the retry and backoff policies in `config`.
///
/// Sleeps with [tokio::time::sleep] and reports each retry as a `tracing`
/// event.
pub async fn execute_with_retry<F, T>(operation: F, config: &RetryConfig) -> Result<T>
where
    F: AsyncFnMut() -> Result<T>,
{
    let sleep = async |d: Duration| {
        tokio::time::sleep(d).await;
        ControlFlow::Continue(())
    };
    run(operation, sleep, config).await
}

/// Like [execute_with_retry], but the backoff sleeps race `cancel`.
///
/// Once `cancel` fires the loop stops at the next sleep and returns a
/// [cancelled][Error::is_cancelled] error carrying the last error. An
/// attempt already in flight is not interrupted.
pub async fn execute_with_retry_cancellable<F, T>(
    operation: F,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: AsyncFnMut() -> Result<T>,
{
    if cancel.is_cancelled() {
        return Err(Error::cancelled("the retry loop was cancelled before it started"));
    }
    let sleep = async |d: Duration| {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => ControlFlow::Break(()),
            _ = tokio::time::sleep(d) => ControlFlow::Continue(()),
        }
    };
    run(operation, sleep, config).await
}

async fn run<F, S, T>(operation: F, sleep: S, config: &RetryConfig) -> Result<T>
where
    F: AsyncFnMut() -> Result<T>,
    S: AsyncFn(Duration) -> ControlFlow<()>,
{
    let result = retry_loop(
        operation,
        sleep,
        config.idempotent(),
        config.retry_policy().clone(),
        config.backoff_policy().clone(),
        |attempt, error, delay| {
            tracing::debug!(attempt, ?delay, %error, "retrying after a transient error");
        },
    )
    .await;
    if let Err(e) = &result {
        if e.is_exhausted() {
            tracing::warn!(error = %e, "giving up after retrying transient errors");
        }
    }
    result
}
