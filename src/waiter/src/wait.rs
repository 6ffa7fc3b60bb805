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
use crate::handle::{LifecycleState, PollableHandle};
use crate::wait_spec::{Check, WaitSpec};
use gax::Result;
use gax::error::{Error, WaitStopped, WaitTimeout};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a successful wait ended.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitOutcome<T> {
    /// The snapshot satisfied the target condition.
    Satisfied(T),
    /// The per-iteration check declared success.
    DeclaredSuccess(T),
    /// The resource no longer exists, and the wait treats that as success.
    ///
    /// There is no snapshot, the service returned "not found".
    Deleted,
}

impl<T> WaitOutcome<T> {
    /// Returns the final snapshot, if the resource still exists.
    pub fn into_resource(self) -> Option<T> {
        match self {
            Self::Satisfied(r) | Self::DeclaredSuccess(r) => Some(r),
            Self::Deleted => None,
        }
    }

    pub fn resource(&self) -> Option<&T> {
        match self {
            Self::Satisfied(r) | Self::DeclaredSuccess(r) => Some(r),
            Self::Deleted => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Polls `handle` until its snapshot satisfies `spec`.
///
/// The initial snapshot is evaluated before any refresh, a wait for a
/// resource that is already in the desired state returns immediately. Between
/// refreshes the waiter sleeps for the interval prescribed by the polling
/// backoff policy, capped by the maximum interval and by the time left before
/// the maximum wait.
///
/// The wait fails with:
/// * a [timeout][Error::is_timeout] error, with [details][Error::timeout_details]
///   including the last observed state, if the maximum wait elapses,
/// * a [stopped][Error::is_stopped] error if the check declares a failure,
/// * a [cancelled][Error::is_cancelled] error if the cancellation token fires
///   during a sleep or a refresh,
/// * the error returned by [refresh][PollableHandle::refresh]. The waiter never
///   retries a refresh, use a handle that retries if needed.
///
/// A refresh still in progress when the maximum wait elapses is abandoned, and
/// the wait fails with a timeout error reporting the previous snapshot.
///
/// If the spec [succeeds on not found][WaitSpec::succeed_on_not_found], a
/// refresh that fails with a "not found" error returns [WaitOutcome::Deleted].
pub async fn wait_until<H>(handle: H, spec: &WaitSpec<H::Snapshot>) -> Result<WaitOutcome<H::Snapshot>>
where
    H: PollableHandle,
    H::Snapshot: LifecycleState,
{
    let start = tokio::time::Instant::now();
    let mut attempts = 0_u32;
    let result = poll(handle, spec, start, &mut attempts).await;
    spec.options()
        .observer()
        .on_done(attempts, start.elapsed(), result.as_ref().err());
    result
}

async fn poll<H>(
    mut handle: H,
    spec: &WaitSpec<H::Snapshot>,
    start: tokio::time::Instant,
    attempts: &mut u32,
) -> Result<WaitOutcome<H::Snapshot>>
where
    H: PollableHandle,
    H::Snapshot: LifecycleState,
{
    let options = spec.options();
    let observer = options.observer();
    loop {
        let check = spec.evaluate(handle.snapshot());
        observer.on_check(*attempts, handle.snapshot().lifecycle_state(), &check);
        match check {
            Check::Satisfied => return Ok(WaitOutcome::Satisfied(handle.into_snapshot())),
            Check::DeclaredSuccess => {
                return Ok(WaitOutcome::DeclaredSuccess(handle.into_snapshot()));
            }
            Check::DeclaredFailure(reason) => {
                let details = WaitStopped::new(reason, last_state(handle.snapshot()));
                return Err(Error::stopped(details));
            }
            Check::Continue => {}
        }

        let elapsed = start.elapsed();
        if elapsed >= options.max_wait() {
            return Err(timeout(handle.snapshot(), elapsed, options.max_wait(), *attempts));
        }
        *attempts += 1;
        let delay = spec
            .backoff()
            .wait_period(*attempts)
            .min(options.max_interval())
            .min(options.max_wait() - elapsed);
        observer.on_sleep(*attempts, delay);
        if sleep(delay, options.cancellation()).await.is_break() {
            return Err(cancelled(handle.snapshot()));
        }

        // The refresh may retry internally, it cannot outlive the wait.
        let deadline = start + options.max_wait();
        let refreshed = tokio::select! {
            biased;
            _ = until_cancelled(options.cancellation()) => Refresh::Cancelled,
            r = handle.refresh() => Refresh::Done(r),
            _ = tokio::time::sleep_until(deadline) => Refresh::Deadline,
        };
        match refreshed {
            Refresh::Done(Ok(())) => {}
            Refresh::Done(Err(e)) if spec.succeed_on_not_found() && e.is_not_found() => {
                return Ok(WaitOutcome::Deleted);
            }
            Refresh::Done(Err(e)) => return Err(e),
            Refresh::Cancelled => return Err(cancelled(handle.snapshot())),
            Refresh::Deadline => {
                tracing::debug!(attempt = *attempts, "refresh interrupted by the maximum wait");
                return Err(timeout(
                    handle.snapshot(),
                    start.elapsed(),
                    options.max_wait(),
                    *attempts,
                ));
            }
        }
    }
}

enum Refresh {
    Done(Result<()>),
    Cancelled,
    Deadline,
}

fn last_state<T: LifecycleState>(snapshot: &T) -> Option<String> {
    snapshot.lifecycle_state().map(str::to_string)
}

fn timeout<T: LifecycleState>(snapshot: &T, elapsed: Duration, max_wait: Duration, attempts: u32) -> Error {
    Error::wait_timeout(WaitTimeout::new(last_state(snapshot), elapsed, max_wait, attempts))
}

fn cancelled<T: LifecycleState>(snapshot: &T) -> Error {
    Error::cancelled(format!(
        "the wait was cancelled, last observed state: {}",
        last_state(snapshot).as_deref().unwrap_or("unknown")
    ))
}

async fn until_cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(c) => c.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn sleep(delay: Duration, cancel: Option<&CancellationToken>) -> ControlFlow<()> {
    let Some(cancel) = cancel else {
        tokio::time::sleep(delay).await;
        return ControlFlow::Continue(());
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => ControlFlow::Break(()),
        _ = tokio::time::sleep(delay) => ControlFlow::Continue(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::FetchHandle;
    use crate::wait_spec::WaitOptions;
    use gax::polling_backoff_policy::PollingBackoffPolicy;
    use mockall::Sequence;

    mockall::mock! {
        #[derive(Debug)]
        Backoff {}
        impl PollingBackoffPolicy for Backoff {
            fn wait_period(&self, attempt_count: u32) -> Duration;
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Subnet(&'static str);
    impl LifecycleState for Subnet {
        fn lifecycle_state(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    #[test]
    fn outcome_accessors() {
        let o = WaitOutcome::Satisfied(Subnet("AVAILABLE"));
        assert_eq!(o.resource(), Some(&Subnet("AVAILABLE")));
        assert!(!o.is_deleted());
        assert_eq!(o.into_resource(), Some(Subnet("AVAILABLE")));

        let o = WaitOutcome::DeclaredSuccess(Subnet("UPDATING"));
        assert_eq!(o.into_resource(), Some(Subnet("UPDATING")));

        let o = WaitOutcome::<Subnet>::Deleted;
        assert!(o.is_deleted());
        assert_eq!(o.resource(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn uses_backoff_capped_by_max_interval() -> anyhow::Result<()> {
        let mut seq = Sequence::new();
        let mut backoff = MockBackoff::new();
        backoff
            .expect_wait_period()
            .once()
            .in_sequence(&mut seq)
            .withf(|a| *a == 1)
            .return_const(Duration::from_secs(2));
        backoff
            .expect_wait_period()
            .once()
            .in_sequence(&mut seq)
            .withf(|a| *a == 2)
            .return_const(Duration::from_secs(100));

        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(
                WaitOptions::default()
                    .with_max_interval(Duration::from_secs(10))
                    .with_polling_backoff_policy(backoff),
            )
            .build()?;
        let mut states = vec!["AVAILABLE", "PROVISIONING"];
        let handle = FetchHandle::new(Subnet("PROVISIONING"), async || {
            Ok(Subnet(states.pop().unwrap_or("AVAILABLE")))
        });
        let start = tokio::time::Instant::now();
        let outcome = wait_until(handle, &spec).await?;
        assert_eq!(outcome, WaitOutcome::Satisfied(Subnet("AVAILABLE")));
        assert_eq!(start.elapsed(), Duration::from_secs(12));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_capped_by_remaining_time() -> anyhow::Result<()> {
        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(
                WaitOptions::default()
                    .with_initial_interval(Duration::from_secs(20))
                    .with_max_interval(Duration::from_secs(20))
                    .with_max_wait(Duration::from_secs(5)),
            )
            .build()?;
        let handle = FetchHandle::new(Subnet("PROVISIONING"), async || Ok(Subnet("PROVISIONING")));
        let start = tokio::time::Instant::now();
        let err = wait_until(handle, &spec).await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_before_sleep() -> anyhow::Result<()> {
        let token = CancellationToken::new();
        token.cancel();
        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(WaitOptions::default().with_cancellation(token))
            .build()?;
        let mut refreshes = 0;
        let handle = FetchHandle::new(Subnet("PROVISIONING"), async || {
            refreshes += 1;
            Ok(Subnet("AVAILABLE"))
        });
        let err = wait_until(handle, &spec).await.unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
        assert!(err.to_string().contains("PROVISIONING"), "{err}");
        assert_eq!(refreshes, 0);
        Ok(())
    }
}
