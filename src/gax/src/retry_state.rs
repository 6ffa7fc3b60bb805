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

//! Defines types to query retry and backoff policies.

use std::time::Duration;

/// The input into a retry policy or backoff policy query.
///
/// On an error, the retry loop queries the retry policy as to whether it
/// should make a new attempt, and then the backoff policy to compute how long
/// to wait. Each retry loop creates a fresh instance of this type and updates
/// it after every attempt, so the policies themselves can be shared freely.
///
/// This struct may gain new fields in future versions.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct RetryState {
    /// If true, the operation is idempotent and it is safe to retry.
    ///
    /// Some policies retry non-idempotent operations because they are safe for
    /// a given configuration of the service or client.
    pub idempotent: bool,

    /// The number of times the operation has been attempted, including the
    /// attempt that just failed.
    pub attempt_count: u32,

    /// The time elapsed since the first attempt started.
    pub elapsed: Duration,
}

impl RetryState {
    /// Create a new instance.
    pub fn new(idempotent: bool) -> Self {
        Self::default().set_idempotent(idempotent)
    }

    /// Update the idempotency.
    pub fn set_idempotent(mut self, v: bool) -> Self {
        self.idempotent = v;
        self
    }

    /// Update the attempt count, useful in mocks.
    pub fn set_attempt_count<T: Into<u32>>(mut self, v: T) -> Self {
        self.attempt_count = v.into();
        self
    }

    /// Update the elapsed time, useful in mocks.
    pub fn set_elapsed<T: Into<Duration>>(mut self, v: T) -> Self {
        self.elapsed = v.into();
        self
    }
}
