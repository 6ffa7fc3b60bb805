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
//! Examples showing how to wait for a resource to reach a lifecycle state.

use crate::fake::FakeCompute;

// ANCHOR: wait-until
pub async fn wait_until_running(service: &FakeCompute) -> crate::Result<()> {
    use std::time::Duration;
    use waiter::{FetchHandle, WaitOptions, WaitSpec, wait_until};

    let instance = service.launch_instance("wait-until-running").await?.into_body();
    let id = instance.id.clone();

    let spec = WaitSpec::builder()
        .with_target_state("RUNNING")
        .with_options(
            WaitOptions::default()
                .with_initial_interval(Duration::from_secs(2))
                .with_max_interval(Duration::from_secs(20))
                .with_max_wait(Duration::from_secs(600)),
        )
        .build()?;
    let handle = FetchHandle::new(instance, async || service.get_instance(id.clone()).await);
    let outcome = wait_until(handle, &spec).await?;
    println!("instance is ready: {:?}", outcome.resource());
    Ok(())
}
// ANCHOR_END: wait-until

// ANCHOR: wait-with-check
pub async fn wait_with_check(service: &FakeCompute) -> crate::Result<()> {
    use waiter::{Check, FetchHandle, WaitSpec, wait_until};

    let id = service.launch_instance("wait-with-check").await?.into_body().id;

    let spec = WaitSpec::<crate::fake::Instance>::builder()
        .with_target_state("RUNNING")
        .with_check(|i| match i.lifecycle_state.as_str() {
            "TERMINATED" | "TERMINATING" => {
                Check::DeclaredFailure(format!("instance {} is terminating", i.id))
            }
            _ => Check::Continue,
        })
        .build()?;
    let handle = FetchHandle::from_fetch(async || service.get_instance(id.clone()).await).await?;
    let outcome = wait_until(handle, &spec).await?;
    println!("instance is ready: {:?}", outcome.resource());
    Ok(())
}
// ANCHOR_END: wait-with-check

// ANCHOR: wait-for-deletion
pub async fn wait_for_deletion(service: &FakeCompute) -> crate::Result<()> {
    use waiter::{FetchHandle, WaitSpec, wait_until};

    let id = service.launch_instance("wait-for-deletion").await?.into_body().id;
    service.terminate_instance(&id).await?;

    let spec = WaitSpec::builder()
        .with_target_state("TERMINATED")
        .with_succeed_on_not_found(true)
        .build()?;
    let handle = FetchHandle::from_fetch(async || service.get_instance(id.clone()).await).await?;
    let outcome = wait_until(handle, &spec).await?;
    if outcome.is_deleted() {
        println!("instance {id} is gone");
    }
    Ok(())
}
// ANCHOR_END: wait-for-deletion

// ANCHOR: cancel-wait
pub async fn cancel_wait(service: &FakeCompute) -> crate::Result<()> {
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use waiter::{FetchHandle, WaitOptions, WaitSpec, wait_until};

    let id = service.launch_instance("cancel-wait").await?.into_body().id;
    let token = CancellationToken::new();
    let spec = WaitSpec::builder()
        .with_target_state("RUNNING")
        .with_options(WaitOptions::default().with_cancellation(token.clone()))
        .build()?;

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        token.cancel();
    });
    let handle = FetchHandle::from_fetch(async || service.get_instance(id.clone()).await).await?;
    match wait_until(handle, &spec).await {
        Err(e) if e.is_cancelled() => println!("stopped waiting: {e}"),
        Err(e) => return Err(e.into()),
        Ok(outcome) => println!("instance is ready: {:?}", outcome.resource()),
    }
    canceller.await?;
    Ok(())
}
// ANCHOR_END: cancel-wait
