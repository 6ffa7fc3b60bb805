// Copyright 2024 Google LLC
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

//! Defines traits for retry policies and some common implementations.
//!
//! The retry loop automatically retries operations that fail due to transient
//! errors. A retry policy decides which errors are transient, and for how long
//! (or for how many attempts) the loop may continue.
//!
//! # Example
//! ```
//! # use infra_sdk_gax::retry_policy::*;
//! use std::time::Duration;
//! // Retry for at most 5 minutes or at most 8 attempts: whichever limit is
//! // reached first stops the retry loop.
//! let policy = DefaultRetryable
//!     .with_time_limit(Duration::from_secs(5 * 60))
//!     .with_attempt_limit(8);
//! ```

use crate::error::Error;
use crate::retry_result::RetryResult;
use crate::retry_state::RetryState;
use std::sync::Arc;
use std::time::Duration;

/// Determines how errors are handled in the retry loop.
///
/// Implementations of this trait determine if errors may resolve in future
/// attempts, and for how long the retry loop may continue. Implementations
/// must be stateless with respect to any one loop: all the per-loop data is in
/// the [RetryState].
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Query the retry policy after an error.
    ///
    /// # Parameters
    /// * `state` - the idempotency, attempt count, and elapsed time of the
    ///   current retry loop. The attempt count includes the attempt that just
    ///   failed, so it is always non-zero.
    /// * `error` - the last error when attempting the operation.
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult;

    /// The remaining time in the retry policy.
    ///
    /// For policies based on time, this returns the remaining time in the
    /// policy. The retry loop uses this value to avoid sleeping past the
    /// deadline. For policies that are not time based this returns `None`.
    fn remaining_time(&self, _state: &RetryState) -> Option<Duration> {
        None
    }
}

// Shared policies can be decorated too. This also converts an
// `Arc<dyn RetryPolicy>` into a [RetryPolicyArg].
impl RetryPolicy for Arc<dyn RetryPolicy> {
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult {
        self.as_ref().on_error(state, error)
    }

    fn remaining_time(&self, state: &RetryState) -> Option<Duration> {
        self.as_ref().remaining_time(state)
    }
}

/// A helper type to use [RetryPolicy] in configuration builders.
#[derive(Clone, Debug)]
pub struct RetryPolicyArg(Arc<dyn RetryPolicy>);

impl<T> std::convert::From<T> for RetryPolicyArg
where
    T: RetryPolicy + 'static,
{
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl std::convert::From<RetryPolicyArg> for Arc<dyn RetryPolicy> {
    fn from(value: RetryPolicyArg) -> Self {
        value.0
    }
}

/// Extension trait for [RetryPolicy]
pub trait RetryPolicyExt: RetryPolicy + Sized {
    /// Decorate a [RetryPolicy] to limit the total elapsed time in the retry
    /// loop.
    ///
    /// While the time spent in the retry loop (including time in backoff) is
    /// less than the prescribed duration the `on_error()` method returns the
    /// results of the inner policy. After that time it returns
    /// [Exhausted][RetryResult::Exhausted] if the inner policy returns
    /// [Continue][RetryResult::Continue].
    ///
    /// # Example
    /// ```
    /// # use infra_sdk_gax::*;
    /// use retry_policy::*;
    /// use retry_state::RetryState;
    /// use std::time::Duration;
    /// let policy = DefaultRetryable.with_time_limit(Duration::from_secs(10));
    /// let state = RetryState::new(true).set_elapsed(Duration::from_secs(11));
    /// assert!(policy.on_error(&state, transient_error()).is_exhausted());
    ///
    /// use infra_sdk_gax::error::Error;
    /// fn transient_error() -> Error { Error::io("connection reset") }
    /// ```
    fn with_time_limit(self, maximum_duration: Duration) -> LimitedElapsedTime<Self> {
        LimitedElapsedTime::custom(self, maximum_duration)
    }

    /// Decorate a [RetryPolicy] to limit the number of attempts.
    ///
    /// The policy passes through the results from the inner policy as long as
    /// `attempt_count < maximum_attempts`. Once the maximum number of attempts
    /// is reached, the policy returns [Exhausted][RetryResult::Exhausted] if
    /// the inner policy returns [Continue][RetryResult::Continue], and passes
    /// the inner policy result otherwise.
    ///
    /// # Example
    /// ```
    /// # use infra_sdk_gax::*;
    /// use retry_policy::*;
    /// use retry_state::RetryState;
    /// let policy = DefaultRetryable.with_attempt_limit(3);
    /// let state = RetryState::new(true);
    /// assert!(policy.on_error(&state.clone().set_attempt_count(2_u32), transient_error()).is_continue());
    /// assert!(policy.on_error(&state.clone().set_attempt_count(3_u32), transient_error()).is_exhausted());
    ///
    /// use infra_sdk_gax::error::Error;
    /// fn transient_error() -> Error { Error::io("connection reset") }
    /// ```
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: RetryPolicy> RetryPolicyExt for T {}

/// The default retry predicate.
///
/// Retries transport errors without an HTTP response, throttling (HTTP 429),
/// and server errors (HTTP 5xx). Every other error, including not-found and
/// other client errors, is permanent.
///
/// This policy must be decorated to limit the number of attempts or the
/// duration of the retry loop.
///
/// # Example
/// ```
/// # use infra_sdk_gax::*;
/// # use infra_sdk_gax::retry_policy::*;
/// use retry_state::RetryState;
/// let state = RetryState::new(true).set_attempt_count(1_u32);
/// assert!(DefaultRetryable.on_error(&state, error::Error::io("reset")).is_continue());
/// ```
#[derive(Clone, Debug)]
pub struct DefaultRetryable;

impl RetryPolicy for DefaultRetryable {
    fn on_error(&self, _state: &RetryState, error: Error) -> RetryResult {
        if error.is_io() || error.is_throttled() || error.is_server_error() {
            return RetryResult::Continue(error);
        }
        RetryResult::Permanent(error)
    }
}

/// A retry policy that retries all errors.
///
/// This policy must be decorated to limit the number of retry attempts or the
/// duration of the retry loop.
#[derive(Clone, Debug)]
pub struct AlwaysRetry;

impl RetryPolicy for AlwaysRetry {
    fn on_error(&self, _state: &RetryState, error: Error) -> RetryResult {
        RetryResult::Continue(error)
    }
}

/// A retry policy that never retries.
///
/// Errors that [DefaultRetryable] would retry are reported as
/// [Exhausted][RetryResult::Exhausted], all other errors remain
/// [Permanent][RetryResult::Permanent].
#[derive(Clone, Debug)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult {
        match DefaultRetryable.on_error(state, error) {
            RetryResult::Continue(e) => RetryResult::Exhausted(e),
            r => r,
        }
    }
}

/// A retry policy decorator that limits the total time in the retry loop.
///
/// This policy decorates an inner policy and limits the duration of retry
/// loops. While the time spent in the retry loop (including time in backoff)
/// is less than the prescribed duration the `on_error()` method returns the
/// results of the inner policy. After that time it returns
/// [Exhausted][RetryResult::Exhausted] if the inner policy returns
/// [Continue][RetryResult::Continue].
///
/// # Parameters
/// * `P` - the inner retry policy, defaults to [DefaultRetryable].
#[derive(Debug)]
pub struct LimitedElapsedTime<P = DefaultRetryable>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_duration: Duration,
}

impl LimitedElapsedTime {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_duration: Duration) -> Self {
        Self {
            inner: DefaultRetryable,
            maximum_duration,
        }
    }
}

impl<P> LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_duration: Duration) -> Self {
        Self {
            inner,
            maximum_duration,
        }
    }
}

impl<P> RetryPolicy for LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult {
        match self.inner.on_error(state, error) {
            RetryResult::Continue(e) if state.elapsed >= self.maximum_duration => {
                RetryResult::Exhausted(e)
            }
            result => result,
        }
    }

    fn remaining_time(&self, state: &RetryState) -> Option<Duration> {
        let remaining = self.maximum_duration.saturating_sub(state.elapsed);
        self.inner
            .remaining_time(state)
            .map(|inner| std::cmp::min(remaining, inner))
            .or(Some(remaining))
    }
}

/// A retry policy decorator that limits the number of attempts.
///
/// This policy decorates an inner policy and limits the total number of
/// attempts. Setting the maximum number of attempts to 0 or 1 results in no
/// retry attempts after the initial one.
///
/// The policy passes through the results from the inner policy as long as
/// `attempt_count < maximum_attempts`. However, once the maximum number of
/// attempts is reached, the policy replaces any [Continue][RetryResult::Continue]
/// result with [Exhausted][RetryResult::Exhausted].
///
/// # Parameters
/// * `P` - the inner retry policy, defaults to [DefaultRetryable].
#[derive(Debug)]
pub struct LimitedAttemptCount<P = DefaultRetryable>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl LimitedAttemptCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_attempts: u32) -> Self {
        Self {
            inner: DefaultRetryable,
            maximum_attempts,
        }
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P> RetryPolicy for LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult {
        match self.inner.on_error(state, error) {
            RetryResult::Continue(e) if state.attempt_count >= self.maximum_attempts => {
                RetryResult::Exhausted(e)
            }
            result => result,
        }
    }

    fn remaining_time(&self, state: &RetryState) -> Option<Duration> {
        self.inner.remaining_time(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceStatus;
    use test_case::test_case;

    mockall::mock! {
        #[derive(Debug)]
        Policy {}
        impl RetryPolicy for Policy {
            fn on_error(&self, state: &RetryState, error: Error) -> RetryResult;
            fn remaining_time(&self, state: &RetryState) -> Option<Duration>;
        }
    }

    fn http_error(code: u16) -> Error {
        Error::service(
            ServiceStatus::default()
                .set_status_code(code)
                .set_code("Test")
                .set_message("test-only"),
        )
    }

    fn state(attempt_count: u32) -> RetryState {
        RetryState::new(true).set_attempt_count(attempt_count)
    }

    // Verify the traits are dyn-compatible.
    #[test]
    fn dyn_compatible() {
        let _policy: Arc<dyn RetryPolicy> = Arc::new(DefaultRetryable.with_attempt_limit(3));
        let arg = RetryPolicyArg::from(AlwaysRetry);
        let _policy: Arc<dyn RetryPolicy> = arg.into();
    }

    #[test_case(429)]
    #[test_case(500)]
    #[test_case(502)]
    #[test_case(503)]
    #[test_case(504)]
    fn default_retryable_continue(code: u16) {
        let r = DefaultRetryable.on_error(&state(1), http_error(code));
        assert!(r.is_continue(), "{r:?}");
    }

    #[test_case(400)]
    #[test_case(401)]
    #[test_case(404)]
    #[test_case(409)]
    #[test_case(412)]
    fn default_retryable_permanent(code: u16) {
        let r = DefaultRetryable.on_error(&state(1), http_error(code));
        assert!(r.is_permanent(), "{r:?}");
    }

    #[test]
    fn default_retryable_other_kinds() {
        let p = DefaultRetryable;
        assert!(p.on_error(&state(1), Error::io("reset")).is_continue());
        assert!(p.on_error(&state(1), Error::deser("bad")).is_permanent());
        assert!(p.on_error(&state(1), Error::other("other")).is_permanent());
        assert!(p.on_error(&state(1), Error::timeout("t")).is_permanent());
        assert!(p.remaining_time(&state(1)).is_none());
    }

    #[test]
    fn always_and_never() {
        assert!(AlwaysRetry.on_error(&state(1), http_error(400)).is_continue());
        assert!(NeverRetry.on_error(&state(1), http_error(503)).is_exhausted());
        assert!(NeverRetry.on_error(&state(1), Error::io("reset")).is_exhausted());
    }

    #[test_case(400)]
    #[test_case(404)]
    #[test_case(409)]
    fn never_retry_keeps_permanent(code: u16) {
        let r = NeverRetry.on_error(&state(1), http_error(code));
        assert!(r.is_permanent(), "{r:?}");
    }

    #[test]
    fn with_time_limit() {
        let policy = AlwaysRetry.with_time_limit(Duration::from_secs(10));
        let s = state(1).set_elapsed(Duration::from_secs(9));
        assert!(policy.on_error(&s, http_error(503)).is_continue());
        assert_eq!(policy.remaining_time(&s), Some(Duration::from_secs(1)));

        let s = state(2).set_elapsed(Duration::from_secs(10));
        assert!(policy.on_error(&s, http_error(503)).is_exhausted());
        assert_eq!(policy.remaining_time(&s), Some(Duration::ZERO));
    }

    #[test]
    fn limited_time_forwards_permanent() {
        let mut mock = MockPolicy::new();
        mock.expect_on_error()
            .times(1)
            .returning(|_, e| RetryResult::Permanent(e));
        let policy = LimitedElapsedTime::custom(mock, Duration::from_secs(10));
        let s = state(1).set_elapsed(Duration::from_secs(20));
        let r = policy.on_error(&s, http_error(503));
        assert!(r.is_permanent(), "{r:?}");
    }

    #[test]
    fn limited_time_inner_remaining_time() {
        let mut mock = MockPolicy::new();
        mock.expect_remaining_time()
            .times(2)
            .returning(|_| Some(Duration::from_secs(5)));
        let policy = LimitedElapsedTime::custom(mock, Duration::from_secs(60));
        assert_eq!(
            policy.remaining_time(&state(1)),
            Some(Duration::from_secs(5))
        );
        let s = state(1).set_elapsed(Duration::from_secs(58));
        assert_eq!(policy.remaining_time(&s), Some(Duration::from_secs(2)));
    }

    #[test]
    fn with_attempt_limit() {
        let policy = DefaultRetryable.with_attempt_limit(3);
        assert!(policy.on_error(&state(1), http_error(503)).is_continue());
        assert!(policy.on_error(&state(2), http_error(503)).is_continue());
        assert!(policy.on_error(&state(3), http_error(503)).is_exhausted());
        assert!(policy.on_error(&state(4), http_error(503)).is_exhausted());
        // Permanent errors stay permanent, regardless of the attempt count.
        assert!(policy.on_error(&state(3), http_error(404)).is_permanent());
        assert!(policy.remaining_time(&state(3)).is_none());
    }

    #[test]
    fn limited_attempt_count_forwards_remaining_time() {
        let mut mock = MockPolicy::new();
        mock.expect_remaining_time()
            .times(1)
            .returning(|_| Some(Duration::from_secs(7)));
        let policy = LimitedAttemptCount::custom(mock, 3);
        assert_eq!(
            policy.remaining_time(&state(1)),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn combined_limits() {
        let policy = DefaultRetryable
            .with_attempt_limit(5)
            .with_time_limit(Duration::from_secs(30));
        let s = state(2).set_elapsed(Duration::from_secs(31));
        assert!(policy.on_error(&s, http_error(503)).is_exhausted());
        let s = state(5).set_elapsed(Duration::from_secs(1));
        assert!(policy.on_error(&s, http_error(503)).is_exhausted());
        let s = state(4).set_elapsed(Duration::from_secs(1));
        assert!(policy.on_error(&s, http_error(503)).is_continue());
    }
}
