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

//! Defines the trait for polling backoff policies and a common implementations.
//!
//! Waiters poll a resource until it reaches a desired state. They backoff
//! between polls to avoid overloading the service.
//!
//! These policies should not be confused with retry backoff policies. Polling
//! backoff policies do not use jitter, while retry policies should.
//!
//! The most common implementation is truncated [exponential backoff]
//! **without** jitter: the period grows exponentially until some limit is
//! reached. This works well when the expected provisioning time is not known
//! in advance. [FixedInterval] polls at a constant rate.
//!
//! # Example
//! ```
//! # use infra_sdk_gax::exponential_backoff::Error;
//! # use infra_sdk_gax::exponential_backoff::ExponentialBackoffBuilder;
//! use std::time::Duration;
//!
//! let policy = ExponentialBackoffBuilder::new()
//!     .with_base_delay(Duration::from_millis(100))
//!     .with_max_delay(Duration::from_secs(5))
//!     .with_growth_factor(4.0)
//!     .build()?;
//! // `policy` implements the `PollingBackoffPolicy` trait.
//! # Ok::<(), Error>(())
//! ```
//!
//! [exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff

use std::sync::Arc;
use std::time::Duration;

/// Defines the trait implemented by all polling backoff strategies.
pub trait PollingBackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the wait period before the next poll.
    ///
    /// # Parameters
    /// * `attempt_count` - the number of the upcoming refresh, starting at 1.
    fn wait_period(&self, attempt_count: u32) -> Duration;
}

/// A helper type to use [PollingBackoffPolicy] in wait options.
#[derive(Clone, Debug)]
pub struct PollingBackoffPolicyArg(Arc<dyn PollingBackoffPolicy>);

impl<T: PollingBackoffPolicy + 'static> std::convert::From<T> for PollingBackoffPolicyArg {
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl std::convert::From<Arc<dyn PollingBackoffPolicy>> for PollingBackoffPolicyArg {
    fn from(value: Arc<dyn PollingBackoffPolicy>) -> Self {
        Self(value)
    }
}

impl std::convert::From<PollingBackoffPolicyArg> for Arc<dyn PollingBackoffPolicy> {
    fn from(value: PollingBackoffPolicyArg) -> Self {
        value.0
    }
}

/// Polls at a constant interval.
#[derive(Clone, Debug)]
pub struct FixedInterval(Duration);

impl FixedInterval {
    pub fn new(period: Duration) -> Self {
        Self(period)
    }
}

impl PollingBackoffPolicy for FixedInterval {
    fn wait_period(&self, _attempt_count: u32) -> Duration {
        self.0
    }
}
