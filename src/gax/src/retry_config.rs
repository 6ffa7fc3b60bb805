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

//! Retry configuration shared by clients and composite operations.
//!
//! A [RetryConfig] bundles a [RetryPolicy] and a [BackoffPolicy]. It is built
//! once, validated, and then shared read-only: cloning only bumps reference
//! counts, and every retry loop keeps its own [RetryState].
//!
//! The defaults retry transport errors, throttling, and server errors, for at
//! most 8 attempts or 600 seconds, with a delay starting at one second,
//! doubling on every failure, and capped at 30 seconds.
//!
//! # Example
//! ```
//! # use infra_sdk_gax::retry_config::{Error, RetryConfig};
//! use std::time::Duration;
//! let config = RetryConfig::builder()
//!     .with_base_delay(Duration::from_millis(500))
//!     .with_growth_factor(3.0)
//!     .with_max_attempts(5)
//!     .with_max_elapsed_time(Duration::from_secs(120))
//!     .with_max_single_delay(Duration::from_secs(10))
//!     .build()?;
//! # Ok::<(), Error>(())
//! ```
//!
//! [RetryState]: crate::retry_state::RetryState

use crate::Result;
use crate::backoff_policy::{BackoffPolicy, BackoffPolicyArg};
use crate::exponential_backoff::{self, ExponentialBackoff, ExponentialBackoffBuilder};
use crate::retry_policy::{
    DefaultRetryable, NeverRetry, RetryPolicy, RetryPolicyArg, RetryPolicyExt,
};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_GROWTH_FACTOR: f64 = 2.0;
const DEFAULT_MAX_ATTEMPTS: u32 = 8;
const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::from_secs(600);
const DEFAULT_MAX_SINGLE_DELAY: Duration = Duration::from_secs(30);

/// The error type for [RetryConfigBuilder::build].
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid backoff configuration: {0}")]
    Backoff(#[from] exponential_backoff::Error),
    #[error("the maximum number of attempts should be at least 1")]
    ZeroAttempts,
}

/// An immutable retry configuration.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
    idempotent: bool,
}

impl RetryConfig {
    /// Returns a builder initialized with the default values.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// A configuration that makes a single attempt and never retries.
    pub fn no_retry() -> Self {
        Self {
            retry_policy: Arc::new(NeverRetry),
            backoff_policy: Arc::new(ExponentialBackoff::default()),
            idempotent: false,
        }
    }

    /// The retry policy, including the attempt and elapsed time limits.
    pub fn retry_policy(&self) -> &Arc<dyn RetryPolicy> {
        &self.retry_policy
    }

    /// The policy computing the delay between attempts.
    pub fn backoff_policy(&self) -> &Arc<dyn BackoffPolicy> {
        &self.backoff_policy
    }

    /// The idempotency reported to the retry policy.
    pub fn idempotent(&self) -> bool {
        self.idempotent
    }

    /// Runs `operation` under this configuration.
    ///
    /// A shorthand for [execute_with_retry][crate::retry_loop::execute_with_retry].
    pub async fn execute<F, T>(&self, operation: F) -> Result<T>
    where
        F: AsyncFnMut() -> Result<T>,
    {
        crate::retry_loop::execute_with_retry(operation, self).await
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let predicate: Arc<dyn RetryPolicy> = Arc::new(DefaultRetryable);
        Self {
            retry_policy: limits(
                predicate,
                Some(DEFAULT_MAX_ATTEMPTS),
                Some(DEFAULT_MAX_ELAPSED_TIME),
            ),
            backoff_policy: Arc::new(ExponentialBackoff::default()),
            idempotent: true,
        }
    }
}

/// A builder for [RetryConfig].
#[derive(Clone, Debug)]
pub struct RetryConfigBuilder {
    base_delay: Duration,
    growth_factor: f64,
    max_single_delay: Duration,
    max_attempts: Option<u32>,
    max_elapsed_time: Option<Duration>,
    retry_predicate: Option<Arc<dyn RetryPolicy>>,
    backoff_policy: Option<Arc<dyn BackoffPolicy>>,
    idempotent: bool,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_single_delay: DEFAULT_MAX_SINGLE_DELAY,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            max_elapsed_time: Some(DEFAULT_MAX_ELAPSED_TIME),
            retry_predicate: None,
            backoff_policy: None,
            idempotent: true,
        }
    }
}

impl RetryConfigBuilder {
    /// Change the delay after the first failure.
    pub fn with_base_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.base_delay = v.into();
        self
    }

    /// Change the growth factor between consecutive delays.
    pub fn with_growth_factor<V: Into<f64>>(mut self, v: V) -> Self {
        self.growth_factor = v.into();
        self
    }

    /// Change the cap on any single delay.
    pub fn with_max_single_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_single_delay = v.into();
        self
    }

    /// Limit the number of attempts, including the first one.
    pub fn with_max_attempts(mut self, v: u32) -> Self {
        self.max_attempts = Some(v);
        self
    }

    /// Remove the limit on the number of attempts.
    pub fn without_max_attempts(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Limit the total time spent in the retry loop, including backoff.
    pub fn with_max_elapsed_time<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_elapsed_time = Some(v.into());
        self
    }

    /// Remove the limit on the total time spent in the retry loop.
    pub fn without_max_elapsed_time(mut self) -> Self {
        self.max_elapsed_time = None;
        self
    }

    /// Replace the predicate deciding which errors are retryable.
    ///
    /// The attempt and elapsed time limits still apply.
    pub fn with_retry_predicate<V: Into<RetryPolicyArg>>(mut self, v: V) -> Self {
        self.retry_predicate = Some(v.into().into());
        self
    }

    /// Replace the delay function.
    ///
    /// When set, the base delay, growth factor, and maximum single delay are
    /// ignored.
    pub fn with_backoff_policy<V: Into<BackoffPolicyArg>>(mut self, v: V) -> Self {
        self.backoff_policy = Some(v.into().into());
        self
    }

    /// Change the idempotency reported to the retry predicate.
    pub fn with_idempotency(mut self, v: bool) -> Self {
        self.idempotent = v;
        self
    }

    /// Validates the configuration and creates the [RetryConfig].
    pub fn build(self) -> std::result::Result<RetryConfig, Error> {
        if self.max_attempts == Some(0) {
            return Err(Error::ZeroAttempts);
        }
        let backoff_policy = match self.backoff_policy {
            Some(p) => p,
            None => Arc::new(
                ExponentialBackoffBuilder::new()
                    .with_base_delay(self.base_delay)
                    .with_growth_factor(self.growth_factor)
                    .with_max_delay(self.max_single_delay)
                    .build()?,
            ),
        };
        let predicate = self
            .retry_predicate
            .unwrap_or_else(|| Arc::new(DefaultRetryable));
        Ok(RetryConfig {
            retry_policy: limits(predicate, self.max_attempts, self.max_elapsed_time),
            backoff_policy,
            idempotent: self.idempotent,
        })
    }
}

fn limits(
    predicate: Arc<dyn RetryPolicy>,
    max_attempts: Option<u32>,
    max_elapsed_time: Option<Duration>,
) -> Arc<dyn RetryPolicy> {
    match (max_attempts, max_elapsed_time) {
        (None, None) => predicate,
        (Some(n), None) => Arc::new(predicate.with_attempt_limit(n)),
        (None, Some(d)) => Arc::new(predicate.with_time_limit(d)),
        (Some(n), Some(d)) => Arc::new(predicate.with_attempt_limit(n).with_time_limit(d)),
    }
}
