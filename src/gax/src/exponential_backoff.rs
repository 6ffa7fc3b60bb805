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

//! Common implements for exponential backoff.
//!
//! This module provides an implementation of truncated [exponential backoff].
//! It implements the [BackoffPolicy] trait with full jitter, and the
//! [PollingBackoffPolicy] trait without jitter.
//!
//! The nominal delay after the `n`-th failed attempt is
//! `min(max_delay, base_delay * growth_factor^(n - 1))`. With full jitter the
//! actual delay is sampled uniformly from `[0, nominal]`.
//!
//! [exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff
//! [BackoffPolicy]: crate::backoff_policy::BackoffPolicy
//! [PollingBackoffPolicy]: crate::polling_backoff_policy::PollingBackoffPolicy

use crate::retry_state::RetryState;
use std::time::Duration;

/// The error type for exponential backoff creation.
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("the growth factor ({0}) should be >= 1.0")]
    InvalidGrowthFactor(f64),
    #[error("the base delay ({0:?}) should be greater than zero")]
    InvalidBaseDelay(Duration),
    #[error(
        "the maximum delay ({maximum:?}) should be greater than or equal to the base delay ({base:?})"
    )]
    EmptyRange { maximum: Duration, base: Duration },
}

/// Implements truncated exponential backoff with jitter.
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    base_delay: Duration,
    max_delay: Duration,
    growth_factor: f64,
}

impl ExponentialBackoffBuilder {
    /// Creates a builder with the default parameters.
    ///
    /// The defaults are a one second base delay, doubling on every failure,
    /// and capped at 30 seconds.
    ///
    /// # Example
    /// ```
    /// # use infra_sdk_gax::exponential_backoff::Error;
    /// # use infra_sdk_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// use std::time::Duration;
    ///
    /// let policy = ExponentialBackoffBuilder::new()
    ///         .with_base_delay(Duration::from_millis(100))
    ///         .with_max_delay(Duration::from_secs(5))
    ///         .with_growth_factor(4.0)
    ///         .build()?;
    /// # Ok::<(), Error>(())
    /// ```
    pub fn new() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            growth_factor: 2.0,
        }
    }

    /// Change the delay after the first failure.
    pub fn with_base_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.base_delay = v.into();
        self
    }

    /// Change the maximum delay between two attempts.
    pub fn with_max_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_delay = v.into();
        self
    }

    /// Change the growth factor in this backoff policy.
    pub fn with_growth_factor<V: Into<f64>>(mut self, v: V) -> Self {
        self.growth_factor = v.into();
        self
    }

    /// Creates a new exponential backoff policy.
    ///
    /// # Example
    /// ```
    /// # use infra_sdk_gax::exponential_backoff::Error;
    /// # use infra_sdk_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// # use infra_sdk_gax::backoff_policy::BackoffPolicy;
    /// # use infra_sdk_gax::retry_state::RetryState;
    /// use std::time::Duration;
    /// let backoff = ExponentialBackoffBuilder::new()
    ///     .with_base_delay(Duration::from_secs(5))
    ///     .with_max_delay(Duration::from_secs(50))
    ///     .with_growth_factor(2.0)
    ///     .build()?;
    /// let p = backoff.on_failure(&RetryState::new(true).set_attempt_count(1_u32));
    /// assert!(p <= Duration::from_secs(5));
    /// let p = backoff.on_failure(&RetryState::new(true).set_attempt_count(2_u32));
    /// assert!(p <= Duration::from_secs(10));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn build(self) -> Result<ExponentialBackoff, Error> {
        if self.growth_factor.is_nan() || self.growth_factor < 1.0 {
            return Err(Error::InvalidGrowthFactor(self.growth_factor));
        }
        if self.base_delay.is_zero() {
            return Err(Error::InvalidBaseDelay(self.base_delay));
        }
        if self.max_delay < self.base_delay {
            return Err(Error::EmptyRange {
                maximum: self.max_delay,
                base: self.base_delay,
            });
        }
        Ok(ExponentialBackoff {
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            growth_factor: self.growth_factor,
        })
    }

    /// Creates a new exponential backoff policy clamping the ranges towards
    /// recommended values.
    ///
    /// The maximum delay is clamped first, to be between one second and one day
    /// (both inclusive). Then the base delay is clamped to be between one
    /// millisecond and the maximum delay. Finally, the growth factor is clamped
    /// to the `[1.0, 32.0]` range.
    ///
    /// # Example
    /// ```
    /// # use infra_sdk_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// # use infra_sdk_gax::polling_backoff_policy::PollingBackoffPolicy;
    /// use std::time::Duration;
    /// let backoff = ExponentialBackoffBuilder::new().clamp();
    /// assert!(backoff.wait_period(1) > Duration::ZERO);
    /// ```
    pub fn clamp(self) -> ExponentialBackoff {
        let growth_factor = if self.growth_factor.is_nan() {
            1.0
        } else {
            self.growth_factor.clamp(1.0, 32.0)
        };
        let max_delay = self
            .max_delay
            .clamp(Duration::from_secs(1), Duration::from_secs(24 * 60 * 60));
        let base_delay = self.base_delay.clamp(Duration::from_millis(1), max_delay);
        ExponentialBackoff {
            base_delay,
            max_delay,
            growth_factor,
        }
    }
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements truncated exponential backoff.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    growth_factor: f64,
}

impl ExponentialBackoff {
    /// The nominal (pre-jitter) delay after `attempt_count` failed attempts.
    pub fn delay(&self, attempt_count: u32) -> Duration {
        let exp = std::cmp::min(i32::MAX as u32, attempt_count) as i32;
        let exp = exp.saturating_sub(1).max(0);
        let growth = self.growth_factor.powi(exp);
        if growth >= self.max_delay.div_duration_f64(self.base_delay) {
            self.max_delay
        } else {
            // .mul_f64() cannot panic because growth >= 1.0 and we just
            // checked that base_delay * growth < max_delay.
            self.base_delay.mul_f64(growth)
        }
    }

    fn delay_with_jitter(&self, attempt_count: u32, rng: &mut impl rand::Rng) -> Duration {
        let delay = self.delay(attempt_count);
        rng.random_range(Duration::ZERO..=delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            growth_factor: 2.0,
        }
    }
}

impl crate::polling_backoff_policy::PollingBackoffPolicy for ExponentialBackoff {
    fn wait_period(&self, attempt_count: u32) -> Duration {
        self.delay(attempt_count)
    }
}

impl crate::backoff_policy::BackoffPolicy for ExponentialBackoff {
    fn on_failure(&self, state: &RetryState) -> Duration {
        self.delay_with_jitter(state.attempt_count, &mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff_policy::BackoffPolicy;
    use crate::polling_backoff_policy::PollingBackoffPolicy;
    use test_case::test_case;

    fn state(attempt_count: u32) -> RetryState {
        RetryState::new(true).set_attempt_count(attempt_count)
    }

    #[test]
    fn build_errors() {
        let b = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::ZERO)
            .with_max_delay(Duration::from_secs(5))
            .build();
        assert!(matches!(b, Err(Error::InvalidBaseDelay(_))), "{b:?}");

        let b = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(5))
            .build();
        assert!(matches!(b, Err(Error::EmptyRange { .. })), "{b:?}");

        let b = ExponentialBackoffBuilder::new()
            .with_growth_factor(-1.0)
            .build();
        assert!(matches!(b, Err(Error::InvalidGrowthFactor(_))), "{b:?}");

        let b = ExponentialBackoffBuilder::new()
            .with_growth_factor(0.5)
            .build();
        assert!(matches!(b, Err(Error::InvalidGrowthFactor(_))), "{b:?}");

        let b = ExponentialBackoffBuilder::new()
            .with_growth_factor(f64::NAN)
            .build();
        assert!(matches!(b, Err(Error::InvalidGrowthFactor(_))), "{b:?}");
    }

    #[test]
    fn build_limits() {
        let r = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::from_nanos(1))
            .with_max_delay(Duration::MAX)
            .with_growth_factor(1.0)
            .build();
        assert!(r.is_ok(), "{r:?}");

        let r = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::from_secs(3))
            .with_max_delay(Duration::from_secs(3))
            .build();
        assert!(r.is_ok(), "{r:?}");
    }

    #[test]
    fn builder_defaults() {
        let r = ExponentialBackoffBuilder::new().build();
        assert!(r.is_ok(), "{r:?}");
        let r = ExponentialBackoffBuilder::default().build();
        assert!(r.is_ok(), "{r:?}");
    }

    #[test_case(Duration::from_secs(1), Duration::MAX, 0.5; "growth below range")]
    #[test_case(Duration::from_secs(1), Duration::MAX, 1_000_000.0; "growth over range")]
    #[test_case(Duration::from_secs(1), Duration::MAX, 8.0; "max over range")]
    #[test_case(Duration::from_secs(1), Duration::ZERO, 8.0; "max below range")]
    #[test_case(Duration::from_secs(10), Duration::ZERO, 8.0; "base over range")]
    #[test_case(Duration::ZERO, Duration::ZERO, 8.0; "base below range")]
    fn clamp(base: Duration, max: Duration, growth: f64) {
        let b = ExponentialBackoffBuilder::new()
            .with_base_delay(base)
            .with_max_delay(max)
            .with_growth_factor(growth)
            .clamp();
        assert_eq!(b.growth_factor.clamp(1.0, 32.0), b.growth_factor);
        assert_eq!(
            b.base_delay.clamp(Duration::from_millis(1), b.max_delay),
            b.base_delay
        );
        assert_eq!(
            b.max_delay
                .clamp(b.base_delay, Duration::from_secs(24 * 60 * 60)),
            b.max_delay
        );
    }

    #[test]
    fn growth() {
        let b = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(4))
            .with_growth_factor(2.0)
            .build()
            .expect("should succeed with the hard-coded test values");

        assert_eq!(b.delay(0), Duration::from_secs(1));
        assert_eq!(b.delay(1), Duration::from_secs(1));
        assert_eq!(b.delay(2), Duration::from_secs(2));
        assert_eq!(b.delay(3), Duration::from_secs(4));
        assert_eq!(b.delay(4), Duration::from_secs(4));
    }

    #[test]
    fn wait_period() {
        let b = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(4))
            .with_growth_factor(2.0)
            .build()
            .expect("should succeed with the hard-coded test values");

        assert_eq!(b.wait_period(1), Duration::from_secs(1));
        assert_eq!(b.wait_period(2), Duration::from_secs(2));
        assert_eq!(b.wait_period(3), Duration::from_secs(4));
        assert_eq!(b.wait_period(4), Duration::from_secs(4));
    }

    // The jittered delay never exceeds the nominal delay, and the nominal
    // delay never exceeds the cap, for any attempt number.
    #[test_case(1)]
    #[test_case(2)]
    #[test_case(5)]
    #[test_case(31)]
    #[test_case(64)]
    #[test_case(1_000)]
    #[test_case(u32::MAX)]
    fn bounded(attempt_count: u32) {
        let max = Duration::from_secs(10);
        let b = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(max)
            .with_growth_factor(2.0)
            .build()
            .expect("should succeed with the hard-coded test values");
        let nominal = b.delay(attempt_count);
        assert!(nominal <= max, "{nominal:?}");
        let want = std::cmp::min(
            max,
            Duration::from_secs(1).mul_f64(2_f64.powi(attempt_count.min(10) as i32 - 1)),
        );
        assert_eq!(nominal, want);
        for _ in 0..100 {
            let d = b.on_failure(&state(attempt_count));
            assert!(d <= nominal, "{d:?} > {nominal:?}");
        }
    }

    #[test]
    fn full_jitter_covers_the_range() {
        let b = ExponentialBackoffBuilder::new()
            .with_base_delay(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(10))
            .build()
            .expect("should succeed with the hard-coded test values");

        let mut rng = rand::rng();
        let samples = (0..1_000)
            .map(|_| b.delay_with_jitter(1, &mut rng))
            .collect::<Vec<_>>();
        assert!(samples.iter().all(|d| *d <= Duration::from_secs(10)));
        // With 1,000 samples the chance of all of them landing in one half of
        // the range is negligible.
        assert!(samples.iter().any(|d| *d < Duration::from_secs(5)));
        assert!(samples.iter().any(|d| *d > Duration::from_secs(5)));
    }

    #[test]
    fn default() {
        let b = ExponentialBackoff::default();
        assert_eq!(b.delay(1), Duration::from_secs(1));
        assert_eq!(b.delay(2), Duration::from_secs(2));
        assert_eq!(b.delay(3), Duration::from_secs(4));
        assert_eq!(b.delay(10), Duration::from_secs(30));
    }
}
