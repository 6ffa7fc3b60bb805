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
//! Composite operations: mutate a resource and wait for the result.
//!
//! Infrastructure mutations are asynchronous. A create request returns a
//! resource in a transient state, such as `PROVISIONING`, or only a work
//! request id. Applications that need the resource must wait. This crate
//! combines the mutation, the wait, and any final fetch into a single call.
//!
//! - [CompositeOperations::mutate_and_wait_for_state] waits for the resource
//!   returned by the mutation to reach a lifecycle state.
//! - [CompositeOperations::delete_and_wait_for_state] waits for a deleted
//!   resource to reach a terminal state or disappear.
//! - [CompositeOperations::mutate_and_wait_for_work_request] waits for the
//!   work request started by the mutation, then fetches the resource it
//!   created or updated.
//! - [CompositeOperations::delete_and_wait_for_work_request] waits for the
//!   work request started by a delete, and returns the completed work
//!   request.
//!
//! Failures are reported as a [CompositeError], which says in what
//! [Phase] the operation failed and keeps the response to the mutation.

mod error;
pub use error::{CompositeError, Phase};

mod operations;
pub use operations::{CompositeOperations, Identified};

pub mod work_request;
pub use work_request::{WorkRequest, WorkRequestReference, WorkRequestStatus};
