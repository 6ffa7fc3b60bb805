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
use crate::error::{CompositeError, Phase};
use crate::work_request::{WorkRequest, WorkRequestReference, WorkRequestStatus};
use gax::Result;
use gax::error::{Error, WaitTimeout};
use gax::response::Response;
use gax::retry_config::RetryConfig;
use gax::retry_loop::execute_with_retry_cancellable;
use tokio_util::sync::CancellationToken;
use waiter::{Check, LifecycleState, PollableHandle, WaitOptions, WaitOutcome, WaitSpec, wait_until};

/// Resources with an id.
///
/// Composite operations use the id in the response to a mutation to poll the
/// resource.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for WorkRequest {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Sends a mutation and waits until its effects are visible.
///
/// The mutation is sent exactly once, it is never retried by this type. The
/// calls that observe the resource, and the final fetch of the resource after
/// a work request completes, use the retry configuration in this object.
/// Those retries stop when the wait's cancellation token fires, and the
/// observation calls never run past the wait's maximum wait.
///
/// The functions return a [CompositeError] on failure. Once the mutation
/// succeeds the error includes its response.
///
/// # Example
/// ```
/// # use infra_sdk_composite::*;
/// # use gax::response::Response;
/// # use waiter::{LifecycleState, WaitSpec};
/// # #[derive(Clone, Debug)]
/// # struct Vcn { id: String, state: String }
/// # impl LifecycleState for Vcn {
/// #     fn lifecycle_state(&self) -> Option<&str> { Some(&self.state) }
/// # }
/// # impl Identified for Vcn {
/// #     fn id(&self) -> &str { &self.id }
/// # }
/// # fn vcn(state: &str) -> Vcn { Vcn { id: "ocid1.vcn.oc1..example".into(), state: state.into() } }
/// # async fn create_vcn() -> gax::Result<Response<Vcn>> { Ok(Response::from(vcn("PROVISIONING"))) }
/// # async fn get_vcn(_id: String) -> gax::Result<Vcn> { Ok(vcn("AVAILABLE")) }
/// # tokio_test::block_on(async {
/// let operations = CompositeOperations::default();
/// let spec = WaitSpec::builder().with_target_state("AVAILABLE").build()?;
/// let outcome = operations
///     .mutate_and_wait_for_state(create_vcn(), async |id| get_vcn(id).await, &spec)
///     .await?;
/// println!("VCN is ready: {:?}", outcome.resource());
/// # anyhow::Ok(()) });
/// ```
#[derive(Clone, Debug, Default)]
pub struct CompositeOperations {
    poll_retry: RetryConfig,
}

impl CompositeOperations {
    pub fn new(poll_retry: RetryConfig) -> Self {
        Self { poll_retry }
    }

    /// Sets the retry configuration for the calls that observe resources.
    pub fn with_poll_retry(mut self, v: RetryConfig) -> Self {
        self.poll_retry = v;
        self
    }

    pub fn poll_retry(&self) -> &RetryConfig {
        &self.poll_retry
    }

    /// Sends `mutate` and waits until the resource satisfies `spec`.
    ///
    /// The response to the mutation seeds the wait. If it already satisfies
    /// `spec` the resource is not fetched again.
    pub async fn mutate_and_wait_for_state<R, M, G>(
        &self,
        mutate: M,
        get: G,
        spec: &WaitSpec<R>,
    ) -> std::result::Result<WaitOutcome<R>, CompositeError<Response<R>>>
    where
        M: Future<Output = Result<Response<R>>>,
        G: AsyncFn(String) -> Result<R>,
        R: Identified + LifecycleState + Clone,
    {
        let response = mutate.await.map_err(CompositeError::mutate)?;
        let resource = response.body().clone();
        let id = resource.id().to_string();
        tracing::debug!(resource_id = %id, request_id = ?response.request_id(), "mutation accepted, waiting for the resource");
        let handle = ResourceHandle::new(resource, id, &get, &self.poll_retry, spec.options());
        wait_until(handle, spec)
            .await
            .map_err(|e| CompositeError::new(Phase::Poll, Some(response), e))
    }

    /// Sends `delete` and waits until the resource is gone.
    ///
    /// The wait succeeds when the resource reaches a state in `spec`, such as
    /// `TERMINATED`, or when fetching it returns "not found". Not found is
    /// treated as success regardless of the value in `spec`.
    pub async fn delete_and_wait_for_state<P, R, D, G>(
        &self,
        id: impl Into<String>,
        delete: D,
        get: G,
        spec: &WaitSpec<R>,
    ) -> std::result::Result<WaitOutcome<R>, CompositeError<Response<P>>>
    where
        D: Future<Output = Result<Response<P>>>,
        G: AsyncFn(String) -> Result<R>,
        R: LifecycleState,
    {
        let id = id.into();
        let response = delete.await.map_err(CompositeError::mutate)?;
        tracing::debug!(resource_id = %id, request_id = ?response.request_id(), "delete accepted, waiting for the resource");
        let start = tokio::time::Instant::now();
        let initial = match initial_fetch(&self.poll_retry, &get, &id, spec.options()).await {
            Ok(r) => r,
            Err(e) if e.is_not_found() => return Ok(WaitOutcome::Deleted),
            Err(e) => return Err(CompositeError::new(Phase::Poll, Some(response), e)),
        };
        let spec = remaining(spec, start).set_succeed_on_not_found(true);
        let handle = ResourceHandle::new(initial, id, &get, &self.poll_retry, spec.options());
        wait_until(handle, &spec)
            .await
            .map_err(|e| CompositeError::new(Phase::Poll, Some(response), e))
    }

    /// Sends `mutate`, waits for its work request, and returns the resource.
    ///
    /// The response to `mutate` must include the `opc-work-request-id`
    /// header. The work request is polled until it succeeds. A `FAILED` or
    /// `CANCELED` work request stops the wait with an
    /// [is_stopped][Error::is_stopped] error. Once the work request succeeds
    /// the resource of type `entity_type` listed in the work request is
    /// fetched and returned.
    pub async fn mutate_and_wait_for_work_request<P, R, M, W, G>(
        &self,
        mutate: M,
        get_work_request: W,
        entity_type: &str,
        get: G,
        options: &WaitOptions,
    ) -> std::result::Result<R, CompositeError<Response<P>>>
    where
        M: Future<Output = Result<Response<P>>>,
        W: AsyncFn(String) -> Result<WorkRequest>,
        G: AsyncFn(String) -> Result<R>,
    {
        let spec = work_request_spec(options).map_err(CompositeError::mutate)?;
        let response = mutate.await.map_err(CompositeError::mutate)?;
        let polled = self
            .wait_for_accepted(&response, &get_work_request, &spec)
            .await;
        let work_request = match polled {
            Ok(wr) => wr,
            Err(e) => return Err(CompositeError::new(Phase::Poll, Some(response), e)),
        };
        let Some(id) = work_request.resource_id(entity_type) else {
            let e = Error::other(format!(
                "work request {} does not list a resource of type {entity_type}",
                work_request.id
            ));
            return Err(CompositeError::new(Phase::FinalFetch, Some(response), e));
        };
        tracing::debug!(work_request_id = %work_request.id, resource_id = %id, "work request succeeded, fetching the resource");
        fetch(&self.poll_retry, &get, id, options.cancellation())
            .await
            .map_err(|e| CompositeError::new(Phase::FinalFetch, Some(response), e))
    }

    /// Sends a delete request and waits for its work request.
    ///
    /// There is no resource to fetch once the work request succeeds, the
    /// function returns the completed work request instead.
    pub async fn delete_and_wait_for_work_request<P, M, W>(
        &self,
        mutate: M,
        get_work_request: W,
        options: &WaitOptions,
    ) -> std::result::Result<WorkRequest, CompositeError<Response<P>>>
    where
        M: Future<Output = Result<Response<P>>>,
        W: AsyncFn(String) -> Result<WorkRequest>,
    {
        let spec = work_request_spec(options).map_err(CompositeError::mutate)?;
        let response = mutate.await.map_err(CompositeError::mutate)?;
        let polled = self
            .wait_for_accepted(&response, &get_work_request, &spec)
            .await;
        match polled {
            Ok(wr) => {
                tracing::debug!(work_request_id = %wr.id, "delete work request succeeded");
                Ok(wr)
            }
            Err(e) => Err(CompositeError::new(Phase::Poll, Some(response), e)),
        }
    }

    /// Waits until the work request `id` succeeds.
    ///
    /// Fails with an [is_stopped][Error::is_stopped] error if the work request
    /// fails or is canceled.
    pub async fn wait_for_work_request<W>(
        &self,
        id: impl Into<String>,
        get_work_request: W,
        options: &WaitOptions,
    ) -> Result<WorkRequest>
    where
        W: AsyncFn(String) -> Result<WorkRequest>,
    {
        let spec = work_request_spec(options)?;
        self.poll_work_request(id.into(), &get_work_request, &spec)
            .await
    }

    async fn wait_for_accepted<P, W>(
        &self,
        response: &Response<P>,
        get_work_request: &W,
        spec: &WaitSpec<WorkRequest>,
    ) -> Result<WorkRequest>
    where
        W: AsyncFn(String) -> Result<WorkRequest>,
    {
        let reference = WorkRequestReference::from_response(response).ok_or_else(|| {
            Error::other("the response does not include an opc-work-request-id header")
        })?;
        tracing::debug!(work_request_id = %reference.id, "mutation accepted, waiting for the work request");
        self.poll_work_request(reference.id, get_work_request, spec)
            .await
    }

    async fn poll_work_request<W>(
        &self,
        id: String,
        get_work_request: &W,
        spec: &WaitSpec<WorkRequest>,
    ) -> Result<WorkRequest>
    where
        W: AsyncFn(String) -> Result<WorkRequest>,
    {
        let start = tokio::time::Instant::now();
        let initial = initial_fetch(&self.poll_retry, get_work_request, &id, spec.options()).await?;
        let spec = remaining(spec, start);
        let handle = ResourceHandle::new(initial, id, get_work_request, &self.poll_retry, spec.options());
        match wait_until(handle, &spec).await? {
            WaitOutcome::Satisfied(wr) | WaitOutcome::DeclaredSuccess(wr) => Ok(wr),
            WaitOutcome::Deleted => Err(Error::other("the work request was not found")),
        }
    }
}

fn work_request_spec(
    options: &WaitOptions,
) -> std::result::Result<WaitSpec<WorkRequest>, Error> {
    WaitSpec::builder()
        .with_target_state(WorkRequestStatus::Succeeded.as_str())
        .with_check(|wr: &WorkRequest| match wr.status {
            WorkRequestStatus::Failed | WorkRequestStatus::Canceled => {
                Check::DeclaredFailure(wr.failure_reason())
            }
            _ => Check::Continue,
        })
        .with_options(options.clone())
        .build()
        .map_err(Error::other)
}

async fn fetch<T, G>(
    retry: &RetryConfig,
    get: &G,
    id: &str,
    cancel: Option<&CancellationToken>,
) -> Result<T>
where
    G: AsyncFn(String) -> Result<T>,
{
    match cancel {
        Some(token) => {
            execute_with_retry_cancellable(async || get(id.to_string()).await, retry, token).await
        }
        None => retry.execute(async || get(id.to_string()).await).await,
    }
}

/// Fetches the resource before the wait starts, within the maximum wait.
async fn initial_fetch<T, G>(
    retry: &RetryConfig,
    get: &G,
    id: &str,
    options: &WaitOptions,
) -> Result<T>
where
    G: AsyncFn(String) -> Result<T>,
{
    let max_wait = options.max_wait();
    match tokio::time::timeout(max_wait, fetch(retry, get, id, options.cancellation())).await {
        Ok(r) => r,
        Err(_) => Err(Error::wait_timeout(WaitTimeout::new(None, max_wait, max_wait, 0))),
    }
}

/// Charges the time since `start` against the maximum wait in `spec`.
fn remaining<T>(spec: &WaitSpec<T>, start: tokio::time::Instant) -> WaitSpec<T> {
    let max_wait = spec.options().max_wait().saturating_sub(start.elapsed());
    spec.clone().set_max_wait(max_wait)
}

/// Polls a resource by id, retrying each fetch.
struct ResourceHandle<'a, T, G> {
    snapshot: T,
    id: String,
    get: &'a G,
    retry: &'a RetryConfig,
    cancel: Option<CancellationToken>,
}

impl<'a, T, G> ResourceHandle<'a, T, G> {
    fn new(
        snapshot: T,
        id: String,
        get: &'a G,
        retry: &'a RetryConfig,
        options: &WaitOptions,
    ) -> Self {
        Self {
            snapshot,
            id,
            get,
            retry,
            cancel: options.cancellation().cloned(),
        }
    }
}

impl<T, G> PollableHandle for ResourceHandle<'_, T, G>
where
    G: AsyncFn(String) -> Result<T>,
{
    type Snapshot = T;

    fn snapshot(&self) -> &T {
        &self.snapshot
    }

    async fn refresh(&mut self) -> Result<()> {
        self.snapshot = fetch(self.retry, self.get, &self.id, self.cancel.as_ref()).await?;
        Ok(())
    }

    fn into_snapshot(self) -> T {
        self.snapshot
    }
}
