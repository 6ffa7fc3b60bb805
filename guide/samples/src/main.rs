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
use infra_sdk_samples::fake::FakeCompute;
use infra_sdk_samples::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug to see the retry and wait decisions.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_level(true)
        .init();

    let service = FakeCompute::new().with_transient_failures(2);
    let id = service.launch_instance("getting-started").await?.into_body().id;
    retry_policies::default_retry(&service, &id).await?;
    retry_policies::custom_retry(&service, &id).await?;
    retry_policies::custom_predicate(&service, &id).await?;
    retry_policies::observe_retries(&service, &id).await?;

    wait_for_state::wait_until_running(&service).await?;
    wait_for_state::wait_with_check(&service).await?;
    wait_for_state::wait_for_deletion(&service).await?;
    wait_for_state::cancel_wait(&service).await?;

    composite_operations::launch_and_wait(&service).await?;
    composite_operations::launch_with_work_request(&service).await?;
    composite_operations::terminate_and_wait(&service).await?;

    error_handling::classify_errors(&service).await?;
    error_handling::partial_results(&service).await?;
    Ok(())
}
