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
//! Examples showing how to mutate a resource and wait for the result.

use crate::fake::FakeCompute;

// ANCHOR: launch-and-wait
pub async fn launch_and_wait(service: &FakeCompute) -> crate::Result<()> {
    use composite::CompositeOperations;
    use waiter::WaitSpec;

    let operations = CompositeOperations::default();
    let spec = WaitSpec::builder().with_target_state("RUNNING").build()?;
    let outcome = operations
        .mutate_and_wait_for_state(
            service.launch_instance("launch-and-wait"),
            async |id| service.get_instance(id).await,
            &spec,
        )
        .await?;
    println!("instance is ready: {:?}", outcome.resource());
    Ok(())
}
// ANCHOR_END: launch-and-wait

// ANCHOR: launch-with-work-request
pub async fn launch_with_work_request(service: &FakeCompute) -> crate::Result<()> {
    use composite::CompositeOperations;
    use gax::retry_config::RetryConfig;
    use std::time::Duration;
    use waiter::WaitOptions;

    // Retry transient errors while polling, but give up quickly.
    let poll_retry = RetryConfig::builder()
        .with_max_attempts(3)
        .with_max_elapsed_time(Duration::from_secs(30))
        .build()?;
    let operations = CompositeOperations::new(poll_retry);
    let instance = operations
        .mutate_and_wait_for_work_request(
            service.launch_instance_async("launch-with-work-request"),
            async |id| service.get_work_request(id).await,
            "instance",
            async |id| service.get_instance(id).await,
            &WaitOptions::default().with_max_wait(Duration::from_secs(300)),
        )
        .await?;
    println!("instance {} is {}", instance.id, instance.lifecycle_state);
    Ok(())
}
// ANCHOR_END: launch-with-work-request

// ANCHOR: terminate-and-wait
pub async fn terminate_and_wait(service: &FakeCompute) -> crate::Result<()> {
    use composite::CompositeOperations;
    use waiter::WaitSpec;

    let id = service.launch_instance("terminate-and-wait").await?.into_body().id;

    let operations = CompositeOperations::default();
    let spec = WaitSpec::builder().with_target_state("TERMINATED").build()?;
    let outcome = operations
        .delete_and_wait_for_state(
            id.as_str(),
            service.terminate_instance(&id),
            async |id| service.get_instance(id).await,
            &spec,
        )
        .await?;
    if outcome.is_deleted() {
        println!("instance {id} is gone");
    }
    Ok(())
}
// ANCHOR_END: terminate-and-wait
