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

//! Infrastructure SDK helpers.
//!
//! This crate contains the types shared by the infrastructure SDK crates: the
//! core [error][crate::error::Error] type, the [response][crate::response::Response]
//! wrapper, and the retry engine.
//!
//! The retry engine is built from small, composable pieces:
//!
//! * a [retry policy][crate::retry_policy::RetryPolicy] decides if an error
//!   can be retried and when the loop has run out of attempts or time,
//! * a [backoff policy][crate::backoff_policy::BackoffPolicy] decides how
//!   long to wait between attempts,
//! * the [retry loop][crate::retry_loop] combines both around an async
//!   operation.
//!
//! Most applications only interact with [RetryConfig][crate::retry_config::RetryConfig],
//! which bundles a retry policy and a backoff policy with sensible defaults.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions wrapping REST calls.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types used by the clients.
pub mod error;

pub mod backoff_policy;
pub mod exponential_backoff;
pub mod polling_backoff_policy;
pub mod response;
pub mod retry_config;
pub mod retry_loop;
pub mod retry_policy;
pub mod retry_result;
pub mod retry_state;
