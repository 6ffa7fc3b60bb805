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
//! These tests drive `wait_until()` with a scripted resource. Each refresh
//! returns the next response in the script. The clock is paused, sleeps
//! complete instantly while still advancing `tokio::time::Instant`.

#[cfg(test)]
mod tests {
    use gax::Result;
    use gax::error::{Error, ServiceStatus};
    use gax::polling_backoff_policy::FixedInterval;
    use infra_sdk_waiter::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use test_case::test_case;

    #[derive(Clone, Debug, PartialEq)]
    struct Instance {
        id: String,
        lifecycle_state: String,
    }

    impl LifecycleState for Instance {
        fn lifecycle_state(&self) -> Option<&str> {
            Some(&self.lifecycle_state)
        }
    }

    fn instance(state: &str) -> Instance {
        Instance {
            id: "ocid1.instance.oc1..example".to_string(),
            lifecycle_state: state.to_string(),
        }
    }

    fn service_error(code: u16, service_code: &str) -> Error {
        Error::service(
            ServiceStatus::default()
                .set_status_code(code)
                .set_code(service_code)
                .set_message("simulated"),
        )
    }

    /// A handle that replays a script of refresh results.
    #[derive(Debug)]
    struct ScriptedHandle {
        current: Instance,
        script: VecDeque<Result<Instance>>,
        refreshes: Arc<AtomicU32>,
    }

    impl ScriptedHandle {
        fn new(initial: &str, script: Vec<Result<Instance>>) -> (Self, Arc<AtomicU32>) {
            let refreshes = Arc::new(AtomicU32::new(0));
            let handle = Self {
                current: instance(initial),
                script: script.into(),
                refreshes: refreshes.clone(),
            };
            (handle, refreshes)
        }
    }

    impl PollableHandle for ScriptedHandle {
        type Snapshot = Instance;

        fn snapshot(&self) -> &Instance {
            &self.current
        }

        async fn refresh(&mut self) -> Result<()> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            // Once the script runs out the resource stays where it is.
            if let Some(next) = self.script.pop_front() {
                self.current = next?;
            }
            Ok(())
        }

        fn into_snapshot(self) -> Instance {
            self.current
        }
    }

    /// Records the observer calls.
    #[derive(Clone, Debug, Default)]
    struct Recorder {
        checks: Arc<Mutex<Vec<(u32, Option<String>, Check)>>>,
        sleeps: Arc<Mutex<Vec<Duration>>>,
        done: Arc<Mutex<Option<(u32, bool)>>>,
    }

    impl WaitObserver for Recorder {
        fn on_check(&self, attempt: u32, state: Option<&str>, check: &Check) {
            self.checks.lock().expect("test lock is never poisoned").push((
                attempt,
                state.map(str::to_string),
                check.clone(),
            ));
        }
        fn on_sleep(&self, _attempt: u32, delay: Duration) {
            self.sleeps.lock().expect("test lock is never poisoned").push(delay);
        }
        fn on_done(&self, attempts: u32, _elapsed: Duration, error: Option<&Error>) {
            *self.done.lock().expect("test lock is never poisoned") = Some((attempts, error.is_none()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn already_satisfied_short_circuits() -> anyhow::Result<()> {
        let spec = WaitSpec::builder().with_target_state("AVAILABLE").build()?;
        let mut refreshes = 0;
        let handle = FetchHandle::new(instance("AVAILABLE"), async || {
            refreshes += 1;
            Ok(instance("TERMINATED"))
        });
        let start = tokio::time::Instant::now();
        let outcome = wait_until(handle, &spec).await?;
        assert_eq!(outcome, WaitOutcome::Satisfied(instance("AVAILABLE")));
        assert_eq!(refreshes, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn provisioning_to_available() -> anyhow::Result<()> {
        let recorder = Recorder::default();
        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(WaitOptions::default().with_observer(recorder.clone()))
            .build()?;
        let responses = Mutex::new(vec![
            instance("AVAILABLE"),
            instance("PROVISIONING"),
            instance("PROVISIONING"),
        ]);
        let mut refreshes = 0;
        let handle = FetchHandle::from_fetch(async || {
            refreshes += 1;
            responses
                .lock()
                .expect("test lock is never poisoned")
                .pop()
                .ok_or_else(|| Error::other("no more responses"))
        })
        .await?;
        let outcome = wait_until(handle, &spec).await?;
        assert_eq!(outcome.resource(), Some(&instance("AVAILABLE")));
        // One fetch to seed the handle, then two refreshes.
        assert_eq!(refreshes, 3);

        let checks = recorder.checks.lock().expect("test lock is never poisoned").clone();
        let states = checks
            .iter()
            .map(|(a, s, c)| (*a, s.as_deref().unwrap_or_default().to_string(), c.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            states,
            vec![
                (0, "PROVISIONING".to_string(), Check::Continue),
                (1, "PROVISIONING".to_string(), Check::Continue),
                (2, "AVAILABLE".to_string(), Check::Satisfied),
            ]
        );
        let sleeps = recorder.sleeps.lock().expect("test lock is never poisoned").clone();
        assert_eq!(sleeps, vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(*recorder.done.lock().expect("test lock is never poisoned"), Some((2, true)));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_deletion() -> anyhow::Result<()> {
        let spec = WaitSpec::builder()
            .with_target_state("DELETED")
            .with_succeed_on_not_found(true)
            .build()?;
        let (handle, refreshes) = ScriptedHandle::new(
            "DELETING",
            vec![Err(service_error(404, "NotAuthorizedOrNotFound"))],
        );
        let outcome = wait_until(handle, &spec).await?;
        assert!(outcome.is_deleted(), "{outcome:?}");
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_propagates_by_default() -> anyhow::Result<()> {
        let spec = WaitSpec::builder().with_target_state("AVAILABLE").build()?;
        let (handle, refreshes) = ScriptedHandle::new(
            "PROVISIONING",
            vec![Err(service_error(404, "NotAuthorizedOrNotFound"))],
        );
        let err = wait_until(handle, &spec).await.unwrap_err();
        assert!(err.is_not_found(), "{err:?}");
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test_case(500, "InternalServerError")]
    #[test_case(429, "TooManyRequests")]
    #[test_case(401, "NotAuthenticated")]
    #[tokio::test(start_paused = true)]
    async fn refresh_errors_are_not_retried(code: u16, service_code: &str) -> anyhow::Result<()> {
        let spec = WaitSpec::builder()
            .with_target_state("DELETED")
            .with_succeed_on_not_found(true)
            .build()?;
        let (handle, refreshes) = ScriptedHandle::new(
            "DELETING",
            vec![Err(service_error(code, service_code)), Ok(instance("DELETED"))],
        );
        let err = wait_until(handle, &spec).await.unwrap_err();
        assert_eq!(err.http_status_code(), Some(code));
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_last_state() -> anyhow::Result<()> {
        let max_wait = Duration::from_secs(10);
        let interval = Duration::from_secs(3);
        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(
                WaitOptions::default()
                    .with_max_wait(max_wait)
                    .with_polling_backoff_policy(FixedInterval::new(interval)),
            )
            .build()?;
        let (handle, refreshes) = ScriptedHandle::new("PROVISIONING", vec![]);
        let start = tokio::time::Instant::now();
        let err = wait_until(handle, &spec).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout(), "{err:?}");
        let details = err.timeout_details().expect("timeouts include details");
        assert_eq!(details.last_state.as_deref(), Some("PROVISIONING"));
        assert_eq!(details.max_wait, max_wait);
        assert!(elapsed >= max_wait, "{elapsed:?}");
        assert!(elapsed < max_wait + interval, "{elapsed:?}");
        // Sleeps of 3s, 3s, 3s, and the remaining 1s.
        assert_eq!(details.attempts, 4);
        assert_eq!(refreshes.load(Ordering::SeqCst), 4);
        let bound = max_wait.as_secs().div_ceil(interval.as_secs()) as u32 + 1;
        assert!(refreshes.load(Ordering::SeqCst) <= bound);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn predicate_or_target_states() -> anyhow::Result<()> {
        let spec = WaitSpec::<Instance>::builder()
            .with_target_state("AVAILABLE")
            .with_predicate(|i| i.lifecycle_state.starts_with("RUNNING"))
            .build()?;
        let (handle, refreshes) = ScriptedHandle::new(
            "PROVISIONING",
            vec![Ok(instance("STARTING")), Ok(instance("RUNNING_DEGRADED"))],
        );
        let outcome = wait_until(handle, &spec).await?;
        assert_eq!(outcome.resource(), Some(&instance("RUNNING_DEGRADED")));
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn check_declares_failure() -> anyhow::Result<()> {
        let spec = WaitSpec::<Instance>::builder()
            .with_target_state("AVAILABLE")
            .with_check(|i| match i.lifecycle_state.as_str() {
                "FAILED" => Check::DeclaredFailure(format!("instance {} failed", i.id)),
                _ => Check::Continue,
            })
            .build()?;
        let (handle, _) = ScriptedHandle::new("PROVISIONING", vec![Ok(instance("FAILED"))]);
        let err = wait_until(handle, &spec).await.unwrap_err();
        assert!(err.is_stopped(), "{err:?}");
        let details = err.stop_details().expect("stopped errors include details");
        assert_eq!(details.reason, "instance ocid1.instance.oc1..example failed");
        assert_eq!(details.last_state.as_deref(), Some("FAILED"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn check_declares_success() -> anyhow::Result<()> {
        let spec = WaitSpec::<Instance>::builder()
            .with_target_state("AVAILABLE")
            .with_check(|i| match i.lifecycle_state.as_str() {
                "STOPPED" => Check::DeclaredSuccess,
                _ => Check::Continue,
            })
            .build()?;
        let (handle, _) = ScriptedHandle::new("STOPPING", vec![Ok(instance("STOPPED"))]);
        let outcome = wait_until(handle, &spec).await?;
        assert_eq!(outcome, WaitOutcome::DeclaredSuccess(instance("STOPPED")));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_sleep() -> anyhow::Result<()> {
        let token = tokio_util::sync::CancellationToken::new();
        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(WaitOptions::default().with_cancellation(token.clone()))
            .build()?;
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4500)).await;
            token.cancel();
        });
        let (handle, refreshes) = ScriptedHandle::new("PROVISIONING", vec![]);
        let err = wait_until(handle, &spec).await.unwrap_err();
        canceller.await?;
        assert!(err.is_cancelled(), "{err:?}");
        // Sleeps of 1s and 2s complete, the cancellation interrupts the 4s sleep.
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn slow_refresh_stops_at_max_wait() -> anyhow::Result<()> {
        let max_wait = Duration::from_secs(10);
        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(
                WaitOptions::default()
                    .with_max_wait(max_wait)
                    .with_polling_backoff_policy(FixedInterval::new(Duration::from_secs(1))),
            )
            .build()?;
        // Stands in for a fetch stuck retrying transient errors.
        let handle = FetchHandle::new(instance("PROVISIONING"), async || {
            tokio::time::sleep(Duration::from_secs(100)).await;
            Ok(instance("AVAILABLE"))
        });
        let start = tokio::time::Instant::now();
        let err = wait_until(handle, &spec).await.unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        let details = err.timeout_details().expect("timeouts include details");
        assert_eq!(details.last_state.as_deref(), Some("PROVISIONING"));
        assert_eq!(details.attempts, 1);
        assert_eq!(start.elapsed(), max_wait);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_refresh() -> anyhow::Result<()> {
        let token = tokio_util::sync::CancellationToken::new();
        let spec = WaitSpec::builder()
            .with_target_state("AVAILABLE")
            .with_options(WaitOptions::default().with_cancellation(token.clone()))
            .build()?;
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            token.cancel();
        });
        let handle = FetchHandle::new(instance("PROVISIONING"), async || {
            tokio::time::sleep(Duration::from_secs(100)).await;
            Ok(instance("AVAILABLE"))
        });
        let start = tokio::time::Instant::now();
        let err = wait_until(handle, &spec).await.unwrap_err();
        canceller.await?;
        assert!(err.is_cancelled(), "{err:?}");
        assert!(err.to_string().contains("PROVISIONING"), "{err}");
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        Ok(())
    }
}
