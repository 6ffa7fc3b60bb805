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
//! The work request model.
//!
//! Many mutations complete asynchronously. The service accepts the request,
//! returns a work request id in the `opc-work-request-id` header, and
//! reports the progress through the work request.

use gax::response::{OPC_WORK_REQUEST_ID, Response};
use serde::{Deserialize, Serialize};
use waiter::LifecycleState;

/// A reference to the work request started by a mutation.
///
/// The reference only identifies the work request. The resources affected by
/// the work request are only known once the work request is fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkRequestReference {
    pub id: String,
}

impl WorkRequestReference {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self { id: id.into() }
    }

    /// Extracts the reference from the `opc-work-request-id` header.
    pub fn from_headers(headers: &http::HeaderMap) -> Option<Self> {
        headers
            .get(OPC_WORK_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    pub fn from_response<T>(response: &Response<T>) -> Option<Self> {
        Self::from_headers(response.headers())
    }
}

/// The status of an asynchronous work request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkRequestStatus {
    #[default]
    Accepted,
    InProgress,
    Waiting,
    NeedsAttention,
    Failed,
    Succeeded,
    Canceling,
    Canceled,
    /// A status unknown to this version of the SDK.
    Unknown(String),
}

impl WorkRequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Waiting => "WAITING",
            Self::NeedsAttention => "NEEDS_ATTENTION",
            Self::Failed => "FAILED",
            Self::Succeeded => "SUCCEEDED",
            Self::Canceling => "CANCELING",
            Self::Canceled => "CANCELED",
            Self::Unknown(s) => s,
        }
    }

    /// The work request will not make further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for WorkRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for WorkRequestStatus {
    fn from(value: &str) -> Self {
        match value {
            "ACCEPTED" => Self::Accepted,
            "IN_PROGRESS" => Self::InProgress,
            "WAITING" => Self::Waiting,
            "NEEDS_ATTENTION" => Self::NeedsAttention,
            "FAILED" => Self::Failed,
            "SUCCEEDED" => Self::Succeeded,
            "CANCELING" => Self::Canceling,
            "CANCELED" => Self::Canceled,
            _ => Self::Unknown(value.to_string()),
        }
    }
}

impl From<String> for WorkRequestStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<WorkRequestStatus> for String {
    fn from(value: WorkRequestStatus) -> Self {
        match value {
            WorkRequestStatus::Unknown(s) => s,
            v => v.as_str().to_string(),
        }
    }
}

/// What a work request did to a resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Created,
    Updated,
    Deleted,
    InProgress,
    Related,
    Failed,
    /// An action unknown to this version of the SDK.
    Unknown(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
            Self::InProgress => "IN_PROGRESS",
            Self::Related => "RELATED",
            Self::Failed => "FAILED",
            Self::Unknown(s) => s,
        }
    }
}

impl Default for ActionType {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CREATED" => Self::Created,
            "UPDATED" => Self::Updated,
            "DELETED" => Self::Deleted,
            "IN_PROGRESS" => Self::InProgress,
            "RELATED" => Self::Related,
            "FAILED" => Self::Failed,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        match value {
            ActionType::Unknown(s) => s,
            v => v.as_str().to_string(),
        }
    }
}

/// A resource affected by a work request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct WorkRequestResource {
    /// The resource type, for example `instance` or `vcn`.
    pub entity_type: String,
    pub action_type: ActionType,
    /// The resource id.
    pub identifier: String,
    /// The URI to fetch the resource, if the service provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_uri: Option<String>,
}

impl WorkRequestResource {
    pub fn set_entity_type<T: Into<String>>(mut self, v: T) -> Self {
        self.entity_type = v.into();
        self
    }

    pub fn set_action_type<T: Into<ActionType>>(mut self, v: T) -> Self {
        self.action_type = v.into();
        self
    }

    pub fn set_identifier<T: Into<String>>(mut self, v: T) -> Self {
        self.identifier = v.into();
        self
    }

    pub fn set_entity_uri<T: Into<String>>(mut self, v: T) -> Self {
        self.entity_uri = Some(v.into());
        self
    }
}

/// An error reported by a work request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct WorkRequestError {
    pub code: String,
    pub message: String,
}

impl WorkRequestError {
    pub fn new<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The progress of an asynchronous mutation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct WorkRequest {
    pub id: String,
    pub operation_type: String,
    pub status: WorkRequestStatus,
    pub resources: Vec<WorkRequestResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<WorkRequestError>,
}

impl WorkRequest {
    pub fn set_id<T: Into<String>>(mut self, v: T) -> Self {
        self.id = v.into();
        self
    }

    pub fn set_operation_type<T: Into<String>>(mut self, v: T) -> Self {
        self.operation_type = v.into();
        self
    }

    pub fn set_status<T: Into<WorkRequestStatus>>(mut self, v: T) -> Self {
        self.status = v.into();
        self
    }

    pub fn set_resources<I: IntoIterator<Item = WorkRequestResource>>(mut self, v: I) -> Self {
        self.resources = v.into_iter().collect();
        self
    }

    pub fn set_percent_complete(mut self, v: f32) -> Self {
        self.percent_complete = Some(v);
        self
    }

    pub fn set_errors<I: IntoIterator<Item = WorkRequestError>>(mut self, v: I) -> Self {
        self.errors = v.into_iter().collect();
        self
    }

    /// Finds the id of the resource of type `entity_type` affected by this
    /// work request.
    ///
    /// Resources that were deleted, or that the work request failed to
    /// create, are ignored.
    pub fn resource_id(&self, entity_type: &str) -> Option<&str> {
        self.resources
            .iter()
            .filter(|r| r.entity_type.eq_ignore_ascii_case(entity_type))
            .find(|r| !matches!(r.action_type, ActionType::Deleted | ActionType::Failed))
            .map(|r| r.identifier.as_str())
    }

    /// Summarizes the errors reported by the work request.
    pub(crate) fn failure_reason(&self) -> String {
        let details = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect::<Vec<_>>();
        if details.is_empty() {
            return format!("work request {} finished with status {}", self.id, self.status);
        }
        format!(
            "work request {} finished with status {}: {}",
            self.id,
            self.status,
            details.join("; ")
        )
    }
}

impl LifecycleState for WorkRequest {
    fn lifecycle_state(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}
