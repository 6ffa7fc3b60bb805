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

//! Errors returned by the infrastructure SDK.
//!
//! All fallible operations return [Error]. The error distinguishes problems
//! reported by the service (with a [ServiceStatus] payload), problems in the
//! transport, and client-side conditions such as an exhausted retry loop or a
//! wait that did not converge in time.
//!
//! # Examples
//!
//! ```
//! use infra_sdk_gax::error::Error;
//! fn handle_error(e: Error) {
//!     if e.is_not_found() {
//!         println!("the resource is gone");
//!     } else if let Some(status) = e.status() {
//!         println!("the service reported {status:?}");
//!     }
//! }
//! ```

mod core_error;
mod service_status;
mod wait;
pub use core_error::*;
pub use service_status::*;
pub use wait::*;
