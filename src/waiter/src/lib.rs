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

//! Waits for infrastructure resources to reach a lifecycle state.
//!
//! Creating a virtual machine, a database, or a network returns before the
//! resource is usable. The resource starts in a state such as
//! `PROVISIONING` and eventually transitions to `AVAILABLE`, or to
//! `FAILED`. Applications that need the resource must poll it until it
//! reaches the desired state.
//!
//! This crate provides [wait_until], which polls a [PollableHandle] until its
//! snapshot satisfies a [WaitSpec]. The wait is bounded by a maximum wait
//! time, the interval between polls grows until it reaches a limit, and it
//! can be cancelled through a [CancellationToken][tokio_util::sync::CancellationToken].
//!
//! # Example
//! ```
//! # use infra_sdk_waiter::*;
//! # use gax::error::Error;
//! # #[derive(Clone, Debug)]
//! # struct Instance { state: String }
//! # impl LifecycleState for Instance {
//! #     fn lifecycle_state(&self) -> Option<&str> { Some(&self.state) }
//! # }
//! # async fn get_instance(id: &str) -> gax::Result<Instance> {
//! #     Ok(Instance { state: "RUNNING".to_string() })
//! # }
//! # tokio_test::block_on(async {
//! let spec = WaitSpec::builder()
//!     .with_target_state("RUNNING")
//!     .build()?;
//! let handle = FetchHandle::from_fetch(async || get_instance("ocid1.instance.oc1..example").await).await?;
//! let outcome = wait_until(handle, &spec).await?;
//! println!("instance is ready: {:?}", outcome.resource());
//! # anyhow::Ok(()) });
//! ```

mod handle;
pub use handle::*;

mod observer;
pub use observer::*;

mod wait;
pub use wait::*;

pub mod wait_spec;
pub use wait_spec::{Check, WaitOptions, WaitSpec, WaitSpecBuilder};
