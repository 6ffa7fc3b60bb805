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

use std::time::Duration;

/// Details about a wait that did not reach its target in time.
///
/// Available via [Error::timeout_details][super::Error::timeout_details].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error(
    "the resource did not reach the desired state after {elapsed:?} (maximum wait {max_wait:?}, {attempts} refreshes), last observed state: {}",
    .last_state.as_deref().unwrap_or("unknown")
)]
#[non_exhaustive]
pub struct WaitTimeout {
    /// The lifecycle state in the last snapshot, if any.
    pub last_state: Option<String>,
    /// The time spent in the wait loop.
    pub elapsed: Duration,
    /// The configured maximum wait time.
    pub max_wait: Duration,
    /// The number of refreshes performed.
    pub attempts: u32,
}

impl WaitTimeout {
    pub fn new(
        last_state: Option<String>,
        elapsed: Duration,
        max_wait: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            last_state,
            elapsed,
            max_wait,
            attempts,
        }
    }
}

/// Details about a wait stopped by a per-iteration check.
///
/// Available via [Error::stop_details][super::Error::stop_details].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("the wait was stopped: {reason}")]
#[non_exhaustive]
pub struct WaitStopped {
    /// Why the wait stopped, as reported by the check.
    pub reason: String,
    /// The lifecycle state in the last snapshot, if any.
    pub last_state: Option<String>,
}

impl WaitStopped {
    pub fn new<T: Into<String>>(reason: T, last_state: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            last_state,
        }
    }
}
