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

use crate::response::OPC_REQUEST_ID;
use http::HeaderMap;

/// The error details returned by the service.
///
/// Failed REST calls return a JSON body such as
/// `{"code": "NotAuthorizedOrNotFound", "message": "..."}` together with an
/// HTTP status code. The service also tags every response with an
/// `opc-request-id` header, which is the most useful piece of information when
/// contacting support.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ServiceStatus {
    /// The HTTP status code of the failed response.
    #[serde(skip)]
    pub status_code: u16,

    /// The service-specific error code, e.g. `NotAuthorizedOrNotFound`.
    pub code: String,

    /// A human-readable description of the error.
    pub message: String,

    /// The `opc-request-id` of the failed request, if known.
    #[serde(skip)]
    pub request_id: Option<String>,
}

impl ServiceStatus {
    /// Sets the value for [status_code][ServiceStatus::status_code].
    pub fn set_status_code(mut self, v: u16) -> Self {
        self.status_code = v;
        self
    }

    /// Sets the value for [code][ServiceStatus::code].
    pub fn set_code<T: Into<String>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][ServiceStatus::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }

    /// Sets the value for [request_id][ServiceStatus::request_id].
    pub fn set_request_id<T: Into<String>>(mut self, v: T) -> Self {
        self.request_id = Some(v.into());
        self
    }

    /// Parses the error body of a failed HTTP response.
    ///
    /// Returns `None` if the payload is not a service error, for example, when
    /// a proxy or load balancer generated the response.
    pub fn from_http(status_code: u16, headers: &HeaderMap, payload: &[u8]) -> Option<Self> {
        let status = serde_json::from_slice::<ServiceStatus>(payload).ok()?;
        if status.code.is_empty() {
            return None;
        }
        let request_id = headers
            .get(OPC_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Some(Self {
            status_code,
            request_id,
            ..status
        })
    }
}
