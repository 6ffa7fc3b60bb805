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
//! This crate contains guides showing how to use the retry engine, the state
//! waiter, and the composite operations of the infrastructure SDK.
//!
//! The samples run against [fake::FakeCompute], an in-memory service that
//! simulates resources moving through their lifecycle states.

pub type Result<T> = anyhow::Result<T>;

pub mod composite_operations;
pub mod error_handling;
pub mod fake;
pub mod retry_policies;
pub mod wait_for_state;
