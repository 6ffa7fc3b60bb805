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
//! Examples showing how to configure the retry engine.

use crate::fake::FakeCompute;

// ANCHOR: default-retry
pub async fn default_retry(service: &FakeCompute, instance_id: &str) -> crate::Result<()> {
    use gax::retry_config::RetryConfig;
    use gax::retry_loop::execute_with_retry;

    // Retries transport errors, 429, and 5xx errors, up to 8 attempts or 10
    // minutes.
    let config = RetryConfig::default();
    let instance = execute_with_retry(
        async || service.get_instance(instance_id.to_string()).await,
        &config,
    )
    .await?;
    println!("instance {} is {}", instance.id, instance.lifecycle_state);
    Ok(())
}
// ANCHOR_END: default-retry

// ANCHOR: custom-retry
pub async fn custom_retry(service: &FakeCompute, instance_id: &str) -> crate::Result<()> {
    use gax::retry_config::RetryConfig;
    use std::time::Duration;

    let config = RetryConfig::builder()
        .with_base_delay(Duration::from_millis(500))
        .with_growth_factor(3.0)
        .with_max_single_delay(Duration::from_secs(10))
        .with_max_attempts(5)
        .with_max_elapsed_time(Duration::from_secs(60))
        .build()?;
    let instance = config
        .execute(async || service.get_instance(instance_id.to_string()).await)
        .await?;
    println!("instance {} is {}", instance.id, instance.lifecycle_state);
    Ok(())
}
// ANCHOR_END: custom-retry

// ANCHOR: custom-predicate
/// Retries all errors, but only a few times.
///
/// Only use a policy like this for idempotent operations.
pub async fn custom_predicate(service: &FakeCompute, instance_id: &str) -> crate::Result<()> {
    use gax::retry_config::RetryConfig;
    use gax::retry_policy::{AlwaysRetry, RetryPolicyExt};
    use std::time::Duration;

    let config = RetryConfig::builder()
        .with_retry_predicate(
            AlwaysRetry
                .with_attempt_limit(3)
                .with_time_limit(Duration::from_secs(15)),
        )
        .with_idempotency(true)
        .build()?;
    let instance = config
        .execute(async || service.get_instance(instance_id.to_string()).await)
        .await?;
    println!("instance {} is {}", instance.id, instance.lifecycle_state);
    Ok(())
}
// ANCHOR_END: custom-predicate

// ANCHOR: observe-retries
pub async fn observe_retries(service: &FakeCompute, instance_id: &str) -> crate::Result<()> {
    use gax::retry_config::RetryConfig;
    use gax::retry_loop::retry_loop;
    use std::ops::ControlFlow;

    let config = RetryConfig::default();
    let instance = retry_loop(
        async || service.get_instance(instance_id.to_string()).await,
        async |delay| {
            tokio::time::sleep(delay).await;
            ControlFlow::Continue(())
        },
        config.idempotent(),
        config.retry_policy().clone(),
        config.backoff_policy().clone(),
        |attempt, error, delay| {
            println!("attempt {attempt} failed with {error}, retrying in {delay:?}");
        },
    )
    .await?;
    println!("instance {} is {}", instance.id, instance.lifecycle_state);
    Ok(())
}
// ANCHOR_END: observe-retries
