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
//! Examples showing how to handle errors from retries, waits, and composite
//! operations.

use crate::fake::FakeCompute;

// ANCHOR: classify-errors
pub async fn classify_errors(service: &FakeCompute) -> crate::Result<()> {
    use gax::retry_config::RetryConfig;

    let config = RetryConfig::default();
    match config
        .execute(async || service.get_instance("ocid1.instance.oc1..missing".to_string()).await)
        .await
    {
        Ok(instance) => println!("unexpected instance {instance:?}"),
        Err(e) if e.is_not_found() => {
            println!(
                "the instance does not exist, opc-request-id={}",
                e.request_id().unwrap_or("unknown")
            );
        }
        Err(e) if e.is_exhausted() => println!("the service is unavailable: {e}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
// ANCHOR_END: classify-errors

// ANCHOR: partial-results
/// Recovers the mutation response when a wait times out.
pub async fn partial_results(service: &FakeCompute) -> crate::Result<()> {
    use composite::{CompositeOperations, Phase};
    use std::time::Duration;
    use waiter::{WaitOptions, WaitSpec};

    let operations = CompositeOperations::default();
    // The fake instance needs a few seconds to boot, this is too short.
    let spec = WaitSpec::builder()
        .with_target_state("RUNNING")
        .with_options(WaitOptions::default().with_max_wait(Duration::from_secs(1)))
        .build()?;
    let result = operations
        .mutate_and_wait_for_state(
            service.launch_instance("partial-results"),
            async |id| service.get_instance(id).await,
            &spec,
        )
        .await;
    match result {
        Ok(outcome) => println!("instance is ready: {:?}", outcome.resource()),
        Err(e) if e.phase() == Phase::Mutate => return Err(e.into()),
        Err(e) => {
            println!("the wait failed: {e}");
            if let Some(details) = e.error().timeout_details() {
                println!("  last observed state: {:?}", details.last_state);
            }
            if let Some(response) = e.partial() {
                println!("  the instance {} was created", response.body().id);
            }
        }
    }
    Ok(())
}
// ANCHOR_END: partial-results
