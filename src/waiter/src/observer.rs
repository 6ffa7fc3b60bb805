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
use crate::wait_spec::Check;
use gax::error::Error;
use std::time::Duration;

/// Receives the progress of a wait.
///
/// The waiter reports to an observer instead of logging directly. The
/// default observer is [TracingObserver]. Applications can provide their own
/// to update a progress bar, collect metrics, or in tests, to verify the
/// sequence of polls.
pub trait WaitObserver: Send + Sync + std::fmt::Debug {
    /// Called after each snapshot is evaluated.
    ///
    /// `attempt` is the number of refreshes so far, zero for the initial
    /// snapshot.
    fn on_check(&self, attempt: u32, state: Option<&str>, check: &Check) {
        let _ = (attempt, state, check);
    }

    /// Called before sleeping ahead of refresh number `attempt`.
    fn on_sleep(&self, attempt: u32, delay: Duration) {
        let _ = (attempt, delay);
    }

    /// Called once when the wait ends, with the error if it failed.
    fn on_done(&self, attempts: u32, elapsed: Duration, error: Option<&Error>) {
        let _ = (attempts, elapsed, error);
    }
}

/// Reports the progress of a wait as `tracing` events.
#[derive(Clone, Debug, Default)]
pub struct TracingObserver;

impl WaitObserver for TracingObserver {
    fn on_check(&self, attempt: u32, state: Option<&str>, check: &Check) {
        tracing::debug!(attempt, state = state.unwrap_or("unknown"), ?check, "evaluated resource snapshot");
    }

    fn on_sleep(&self, attempt: u32, delay: Duration) {
        tracing::debug!(attempt, ?delay, "waiting before the next refresh");
    }

    fn on_done(&self, attempts: u32, elapsed: Duration, error: Option<&Error>) {
        match error {
            None => tracing::debug!(attempts, ?elapsed, "wait completed"),
            Some(e) => tracing::warn!(attempts, ?elapsed, error = %e, "wait failed"),
        }
    }
}

/// Discards all progress reports.
#[derive(Clone, Debug, Default)]
pub struct NoopObserver;

impl WaitObserver for NoopObserver {}
