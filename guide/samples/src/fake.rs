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
//! An in-memory compute service.
//!
//! Instances start in `PROVISIONING` and move to `RUNNING` after a few
//! calls to [FakeCompute::get_instance]. Terminated instances disappear after
//! a few calls. Asynchronous launches return a work request that progresses
//! the same way. The service can also inject transient failures.

use composite::work_request::{ActionType, WorkRequestResource};
use composite::{Identified, WorkRequest, WorkRequestStatus};
use gax::error::Error;
use gax::response::{OPC_REQUEST_ID, OPC_WORK_REQUEST_ID, Parts, Response};
use std::collections::HashMap;
use std::sync::Mutex;
use waiter::LifecycleState;

/// The number of reads before a resource reaches its next state.
const READS_PER_TRANSITION: u32 = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub id: String,
    pub display_name: String,
    pub lifecycle_state: String,
}

impl LifecycleState for Instance {
    fn lifecycle_state(&self) -> Option<&str> {
        Some(&self.lifecycle_state)
    }
}

impl Identified for Instance {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug)]
struct Tracked<T> {
    value: T,
    reads_left: u32,
}

#[derive(Debug, Default)]
struct State {
    instances: HashMap<String, Tracked<Instance>>,
    work_requests: HashMap<String, Tracked<WorkRequest>>,
    next_id: u32,
    request_count: u32,
    transient_failures: u32,
}

impl State {
    fn next_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("ocid1.{kind}.oc1..fake{:04}", self.next_id)
    }

    fn request_id(&mut self) -> String {
        self.request_count += 1;
        format!("fake-request-{:04}", self.request_count)
    }

    fn maybe_fail(&mut self, request_id: &str) -> gax::Result<()> {
        if self.transient_failures == 0 {
            return Ok(());
        }
        self.transient_failures -= 1;
        Err(service_error(
            request_id,
            503,
            "ServiceUnavailable",
            "the service is temporarily unavailable",
        ))
    }

    fn insert_instance(&mut self, display_name: &str) -> Instance {
        let instance = Instance {
            id: self.next_id("instance"),
            display_name: display_name.to_string(),
            lifecycle_state: "PROVISIONING".to_string(),
        };
        self.instances.insert(
            instance.id.clone(),
            Tracked {
                value: instance.clone(),
                reads_left: READS_PER_TRANSITION,
            },
        );
        instance
    }
}

fn headers(request_id: &str, work_request_id: Option<&str>) -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    if let Ok(v) = http::HeaderValue::from_str(request_id) {
        headers.insert(OPC_REQUEST_ID, v);
    }
    if let Some(v) = work_request_id.and_then(|id| http::HeaderValue::from_str(id).ok()) {
        headers.insert(OPC_WORK_REQUEST_ID, v);
    }
    headers
}

fn response<T>(request_id: &str, work_request_id: Option<&str>, body: T) -> Response<T> {
    Response::from_parts(
        Parts::new().set_headers(headers(request_id, work_request_id)),
        body,
    )
}

fn service_error(request_id: &str, code: u16, service_code: &str, message: &str) -> Error {
    let body = serde_json::json!({"code": service_code, "message": message}).to_string();
    Error::from_http_response(code, headers(request_id, None), bytes::Bytes::from(body))
}

fn not_found(request_id: &str, what: &str) -> Error {
    service_error(
        request_id,
        404,
        "NotAuthorizedOrNotFound",
        &format!("{what} not found"),
    )
}

/// A simulated compute service.
#[derive(Debug, Default)]
pub struct FakeCompute {
    state: Mutex<State>,
}

impl FakeCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` reads fail with a 503 error.
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.lock().transient_failures = n;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Launches an instance and returns it in the `PROVISIONING` state.
    pub async fn launch_instance(&self, display_name: &str) -> gax::Result<Response<Instance>> {
        let mut state = self.lock();
        let request_id = state.request_id();
        let instance = state.insert_instance(display_name);
        tracing::info!(instance_id = %instance.id, "launching instance");
        Ok(response(&request_id, None, instance))
    }

    /// Launches an instance, only the work request id is returned.
    pub async fn launch_instance_async(&self, display_name: &str) -> gax::Result<Response<()>> {
        let mut state = self.lock();
        let request_id = state.request_id();
        let instance = state.insert_instance(display_name);
        let work_request = WorkRequest::default()
            .set_id(state.next_id("coreservicesworkrequest"))
            .set_operation_type("LaunchInstance")
            .set_status(WorkRequestStatus::Accepted)
            .set_resources([WorkRequestResource::default()
                .set_entity_type("instance")
                .set_action_type(ActionType::InProgress)
                .set_identifier(instance.id)]);
        let id = work_request.id.clone();
        tracing::info!(work_request_id = %id, "launching instance asynchronously");
        state.work_requests.insert(
            id.clone(),
            Tracked {
                value: work_request,
                reads_left: READS_PER_TRANSITION,
            },
        );
        Ok(response(&request_id, Some(&id), ()))
    }

    /// Starts terminating an instance.
    pub async fn terminate_instance(&self, id: &str) -> gax::Result<Response<()>> {
        let mut state = self.lock();
        let request_id = state.request_id();
        let Some(tracked) = state.instances.get_mut(id) else {
            return Err(not_found(&request_id, "instance"));
        };
        tracked.value.lifecycle_state = "TERMINATING".to_string();
        tracked.reads_left = READS_PER_TRANSITION;
        tracing::info!(instance_id = %id, "terminating instance");
        Ok(response(&request_id, None, ()))
    }

    /// Reads an instance, advancing its lifecycle.
    pub async fn get_instance(&self, id: String) -> gax::Result<Instance> {
        let mut state = self.lock();
        let request_id = state.request_id();
        state.maybe_fail(&request_id)?;
        let Some(tracked) = state.instances.get_mut(&id) else {
            return Err(not_found(&request_id, "instance"));
        };
        tracked.reads_left = tracked.reads_left.saturating_sub(1);
        let transition = tracked.reads_left == 0;
        let terminated = transition && tracked.value.lifecycle_state == "TERMINATING";
        if transition && tracked.value.lifecycle_state == "PROVISIONING" {
            tracked.value.lifecycle_state = "RUNNING".to_string();
        }
        if !terminated {
            return Ok(tracked.value.clone());
        }
        state.instances.remove(&id);
        Err(not_found(&request_id, "instance"))
    }

    /// Reads a work request, advancing its status.
    pub async fn get_work_request(&self, id: String) -> gax::Result<WorkRequest> {
        let mut state = self.lock();
        let request_id = state.request_id();
        state.maybe_fail(&request_id)?;
        let Some(tracked) = state.work_requests.get_mut(&id) else {
            return Err(not_found(&request_id, "work request"));
        };
        tracked.reads_left = tracked.reads_left.saturating_sub(1);
        let wr = &mut tracked.value;
        if tracked.reads_left > 0 {
            wr.status = WorkRequestStatus::InProgress;
            return Ok(wr.clone());
        }
        wr.status = WorkRequestStatus::Succeeded;
        wr.percent_complete = Some(100.0);
        for r in wr.resources.iter_mut() {
            r.action_type = ActionType::Created;
        }
        Ok(wr.clone())
    }
}
