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
//! Describes what a wait is waiting for.
//!
//! A [WaitSpec] combines the target condition with the [WaitOptions] that
//! bound the wait. The condition is satisfied when the lifecycle state of the
//! snapshot is one of the target states, **or** when the custom predicate
//! returns `true`. An optional per-iteration [check][WaitSpecBuilder::with_check]
//! runs before both and can end the wait early, successfully or not.

use crate::handle::LifecycleState;
use crate::observer::{TracingObserver, WaitObserver};
use gax::exponential_backoff::ExponentialBackoffBuilder;
use gax::polling_backoff_policy::{PollingBackoffPolicy, PollingBackoffPolicyArg};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(1200);
const DEFAULT_GROWTH_FACTOR: f64 = 2.0;

/// Errors building a [WaitSpec].
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("a wait needs at least one target state, a predicate, or a check")]
    NoCondition,
    #[error("the polling intervals must be greater than zero")]
    ZeroInterval,
    #[error(transparent)]
    Backoff(#[from] gax::exponential_backoff::Error),
}

/// The result of evaluating one snapshot.
///
/// Checks return `Continue` when they have no opinion about the snapshot.
/// The waiter then evaluates the target states and the predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum Check {
    /// Keep polling.
    Continue,
    /// The snapshot satisfies the target condition.
    Satisfied,
    /// Stop polling and report success, even though the target condition
    /// may not be satisfied.
    DeclaredSuccess,
    /// Stop polling and report an error with the given reason.
    DeclaredFailure(String),
}

/// Bounds the duration and the polling rate of a wait.
///
/// # Example
/// ```
/// # use infra_sdk_waiter::WaitOptions;
/// use std::time::Duration;
/// let options = WaitOptions::default()
///     .with_initial_interval(Duration::from_secs(5))
///     .with_max_interval(Duration::from_secs(60))
///     .with_max_wait(Duration::from_secs(3600));
/// assert_eq!(options.max_wait(), Duration::from_secs(3600));
/// ```
#[derive(Clone, Debug)]
pub struct WaitOptions {
    initial_interval: Duration,
    max_interval: Duration,
    max_wait: Duration,
    polling_backoff: Option<Arc<dyn PollingBackoffPolicy>>,
    cancellation: Option<CancellationToken>,
    observer: Arc<dyn WaitObserver>,
}

impl WaitOptions {
    /// The interval before the first refresh.
    pub fn with_initial_interval<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_interval = v.into();
        self
    }

    /// The maximum interval between refreshes.
    ///
    /// Applies to custom polling backoff policies too.
    pub fn with_max_interval<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_interval = v.into();
        self
    }

    /// The maximum time to wait. The waiter never sleeps past this limit.
    pub fn with_max_wait<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_wait = v.into();
        self
    }

    /// Replaces the default exponential polling backoff.
    pub fn with_polling_backoff_policy<V: Into<PollingBackoffPolicyArg>>(mut self, v: V) -> Self {
        self.polling_backoff = Some(v.into().into());
        self
    }

    /// Stops the wait when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Receives the progress of the wait.
    pub fn with_observer<V: WaitObserver + 'static>(mut self, v: V) -> Self {
        self.observer = Arc::new(v);
        self
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn observer(&self) -> &Arc<dyn WaitObserver> {
        &self.observer
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            polling_backoff: None,
            cancellation: None,
            observer: Arc::new(TracingObserver),
        }
    }
}

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type CheckFn<T> = Arc<dyn Fn(&T) -> Check + Send + Sync>;

/// The condition and limits for [wait_until][crate::wait_until].
///
/// Create instances with [WaitSpec::builder]. A `WaitSpec` is immutable and
/// cheap to clone, the same spec can be used for many waits.
pub struct WaitSpec<T> {
    target_states: BTreeSet<String>,
    predicate: Option<Predicate<T>>,
    check: Option<CheckFn<T>>,
    succeed_on_not_found: bool,
    options: WaitOptions,
    backoff: Arc<dyn PollingBackoffPolicy>,
}

impl<T> WaitSpec<T> {
    pub fn builder() -> WaitSpecBuilder<T> {
        WaitSpecBuilder::default()
    }

    pub fn target_states(&self) -> impl Iterator<Item = &str> {
        self.target_states.iter().map(String::as_str)
    }

    pub fn succeed_on_not_found(&self) -> bool {
        self.succeed_on_not_found
    }

    pub fn options(&self) -> &WaitOptions {
        &self.options
    }

    pub(crate) fn backoff(&self) -> &Arc<dyn PollingBackoffPolicy> {
        &self.backoff
    }

    /// Returns a copy of this spec with a different not-found behavior.
    ///
    /// Waits for deletions treat a "not found" error as success.
    pub fn set_succeed_on_not_found(mut self, v: bool) -> Self {
        self.succeed_on_not_found = v;
        self
    }

    /// Returns a copy of this spec with a different maximum wait.
    ///
    /// Useful to charge time spent before the wait, such as an initial fetch,
    /// against the same budget.
    pub fn set_max_wait<V: Into<Duration>>(mut self, v: V) -> Self {
        self.options = self.options.with_max_wait(v);
        self
    }
}

impl<T: LifecycleState> WaitSpec<T> {
    /// Evaluates a snapshot.
    ///
    /// The check runs first. If it returns [Check::Continue] the snapshot is
    /// [Check::Satisfied] when its state is one of the target states or when
    /// the predicate returns `true`. States are compared exactly.
    pub fn evaluate(&self, snapshot: &T) -> Check {
        if let Some(check) = &self.check {
            match check(snapshot) {
                Check::Continue => {}
                decided => return decided,
            }
        }
        let in_target = snapshot
            .lifecycle_state()
            .is_some_and(|s| self.target_states.contains(s));
        if in_target || self.predicate.as_ref().is_some_and(|p| p(snapshot)) {
            return Check::Satisfied;
        }
        Check::Continue
    }
}

impl<T> Clone for WaitSpec<T> {
    fn clone(&self) -> Self {
        Self {
            target_states: self.target_states.clone(),
            predicate: self.predicate.clone(),
            check: self.check.clone(),
            succeed_on_not_found: self.succeed_on_not_found,
            options: self.options.clone(),
            backoff: self.backoff.clone(),
        }
    }
}

impl<T> std::fmt::Debug for WaitSpec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSpec")
            .field("target_states", &self.target_states)
            .field("has_predicate", &self.predicate.is_some())
            .field("has_check", &self.check.is_some())
            .field("succeed_on_not_found", &self.succeed_on_not_found)
            .field("options", &self.options)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Builds a [WaitSpec].
///
/// # Example
/// ```
/// # use infra_sdk_waiter::{Check, LifecycleState, WaitSpec};
/// # struct Instance { state: String }
/// # impl LifecycleState for Instance {
/// #     fn lifecycle_state(&self) -> Option<&str> { Some(&self.state) }
/// # }
/// let spec = WaitSpec::<Instance>::builder()
///     .with_target_state("RUNNING")
///     .with_check(|i: &Instance| match i.state.as_str() {
///         "TERMINATED" => Check::DeclaredFailure("the instance terminated".into()),
///         _ => Check::Continue,
///     })
///     .build()?;
/// # Ok::<(), infra_sdk_waiter::wait_spec::Error>(())
/// ```
pub struct WaitSpecBuilder<T> {
    target_states: BTreeSet<String>,
    predicate: Option<Predicate<T>>,
    check: Option<CheckFn<T>>,
    succeed_on_not_found: bool,
    options: WaitOptions,
}

impl<T> Default for WaitSpecBuilder<T> {
    fn default() -> Self {
        Self {
            target_states: BTreeSet::new(),
            predicate: None,
            check: None,
            succeed_on_not_found: false,
            options: WaitOptions::default(),
        }
    }
}

impl<T> WaitSpecBuilder<T> {
    /// Adds a target state.
    pub fn with_target_state<V: Into<String>>(mut self, v: V) -> Self {
        self.target_states.insert(v.into());
        self
    }

    /// Adds several target states.
    pub fn with_target_states<I, V>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.target_states.extend(v.into_iter().map(Into::into));
        self
    }

    /// Sets a custom predicate, combined with the target states using OR.
    pub fn with_predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(f));
        self
    }

    /// Sets a per-iteration check, evaluated before the target condition.
    pub fn with_check<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> Check + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(f));
        self
    }

    /// Treat "not found" errors from a refresh as a successful deletion.
    pub fn with_succeed_on_not_found(mut self, v: bool) -> Self {
        self.succeed_on_not_found = v;
        self
    }

    pub fn with_options(mut self, v: WaitOptions) -> Self {
        self.options = v;
        self
    }

    pub fn build(self) -> Result<WaitSpec<T>, Error> {
        if self.target_states.is_empty() && self.predicate.is_none() && self.check.is_none() {
            return Err(Error::NoCondition);
        }
        if self.options.initial_interval.is_zero() || self.options.max_interval.is_zero() {
            return Err(Error::ZeroInterval);
        }
        let backoff: Arc<dyn PollingBackoffPolicy> = match &self.options.polling_backoff {
            Some(b) => b.clone(),
            None => Arc::new(
                ExponentialBackoffBuilder::new()
                    .with_base_delay(self.options.initial_interval)
                    .with_max_delay(self.options.max_interval)
                    .with_growth_factor(DEFAULT_GROWTH_FACTOR)
                    .build()?,
            ),
        };
        Ok(WaitSpec {
            target_states: self.target_states,
            predicate: self.predicate,
            check: self.check,
            succeed_on_not_found: self.succeed_on_not_found,
            options: self.options,
            backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gax::polling_backoff_policy::FixedInterval;
    use test_case::test_case;

    #[derive(Debug)]
    struct Bucket {
        state: Option<&'static str>,
        objects: u32,
    }

    impl LifecycleState for Bucket {
        fn lifecycle_state(&self) -> Option<&str> {
            self.state
        }
    }

    fn bucket(state: &'static str, objects: u32) -> Bucket {
        Bucket {
            state: Some(state),
            objects,
        }
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let spec = WaitSpec::<Bucket>::builder()
            .with_target_state("ACTIVE")
            .build()?;
        assert_eq!(spec.options().initial_interval(), Duration::from_secs(1));
        assert_eq!(spec.options().max_interval(), Duration::from_secs(30));
        assert_eq!(spec.options().max_wait(), Duration::from_secs(1200));
        assert!(!spec.succeed_on_not_found());
        assert!(spec.options().cancellation().is_none());
        assert_eq!(spec.backoff().wait_period(1), Duration::from_secs(1));
        assert_eq!(spec.backoff().wait_period(3), Duration::from_secs(4));
        assert_eq!(spec.backoff().wait_period(10), Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn build_errors() {
        let err = WaitSpec::<Bucket>::builder().build().unwrap_err();
        assert_eq!(err, Error::NoCondition);

        let err = WaitSpec::<Bucket>::builder()
            .with_target_state("ACTIVE")
            .with_options(WaitOptions::default().with_max_interval(Duration::ZERO))
            .build()
            .unwrap_err();
        assert_eq!(err, Error::ZeroInterval);

        let err = WaitSpec::<Bucket>::builder()
            .with_target_state("ACTIVE")
            .with_options(
                WaitOptions::default()
                    .with_initial_interval(Duration::from_secs(60))
                    .with_max_interval(Duration::from_secs(10)),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Backoff(_)), "{err:?}");
    }

    #[test]
    fn custom_backoff() -> anyhow::Result<()> {
        let spec = WaitSpec::<Bucket>::builder()
            .with_target_state("ACTIVE")
            .with_options(
                WaitOptions::default().with_polling_backoff_policy(FixedInterval::new(
                    Duration::from_secs(7),
                )),
            )
            .build()?;
        assert_eq!(spec.backoff().wait_period(1), Duration::from_secs(7));
        assert_eq!(spec.backoff().wait_period(20), Duration::from_secs(7));
        Ok(())
    }

    #[test_case(bucket("ACTIVE", 0), Check::Satisfied; "target state")]
    #[test_case(bucket("UPDATING", 10), Check::Satisfied; "predicate only")]
    #[test_case(bucket("UPDATING", 0), Check::Continue; "neither")]
    #[test_case(bucket("active", 0), Check::Continue; "states are case sensitive")]
    #[test_case(Bucket { state: None, objects: 0 }, Check::Continue; "no state")]
    fn targets_or_predicate(snapshot: Bucket, want: Check) -> anyhow::Result<()> {
        let spec = WaitSpec::<Bucket>::builder()
            .with_target_states(["ACTIVE", "INACTIVE"])
            .with_predicate(|b| b.objects >= 10)
            .build()?;
        assert_eq!(spec.evaluate(&snapshot), want);
        Ok(())
    }

    #[test]
    fn check_runs_first() -> anyhow::Result<()> {
        let spec = WaitSpec::<Bucket>::builder()
            .with_target_state("ACTIVE")
            .with_check(|b| match b.objects {
                0 => Check::Continue,
                1 => Check::DeclaredSuccess,
                _ => Check::DeclaredFailure(format!("{} objects", b.objects)),
            })
            .build()?;
        assert_eq!(spec.evaluate(&bucket("ACTIVE", 0)), Check::Satisfied);
        assert_eq!(spec.evaluate(&bucket("CREATING", 0)), Check::Continue);
        assert_eq!(spec.evaluate(&bucket("CREATING", 1)), Check::DeclaredSuccess);
        assert_eq!(
            spec.evaluate(&bucket("ACTIVE", 2)),
            Check::DeclaredFailure("2 objects".to_string())
        );
        Ok(())
    }

    #[test]
    fn set_succeed_on_not_found() -> anyhow::Result<()> {
        let spec = WaitSpec::<Bucket>::builder()
            .with_target_state("DELETED")
            .build()?;
        let deletion = spec.clone().set_succeed_on_not_found(true);
        assert!(deletion.succeed_on_not_found());
        assert!(!spec.succeed_on_not_found());
        assert_eq!(deletion.target_states().collect::<Vec<_>>(), vec!["DELETED"]);
        Ok(())
    }

    #[test]
    fn set_max_wait() -> anyhow::Result<()> {
        let spec = WaitSpec::<Bucket>::builder()
            .with_target_state("DELETED")
            .build()?;
        let shorter = spec.clone().set_max_wait(Duration::from_secs(5));
        assert_eq!(shorter.options().max_wait(), Duration::from_secs(5));
        assert_eq!(spec.options().max_wait(), DEFAULT_MAX_WAIT);
        Ok(())
    }
}
