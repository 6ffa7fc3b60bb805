// Copyright 2024 Google LLC
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

//! Response types.
//!
//! This module contains the [Response] type returned by REST calls. Besides
//! the decoded body, the response keeps the HTTP headers, which carry the
//! `opc-request-id` of the call and, for asynchronous mutations, the
//! `opc-work-request-id` used to track their progress.
//!
//! # Examples
//!
//! Creating a response for mocks
//!
//! ```
//! # use infra_sdk_gax::Result;
//! # use infra_sdk_gax::response::Response;
//! struct Vcn {
//!   // ...
//! }
//!
//! fn make_mock_response(body: Vcn) -> Result<Response<Vcn>> {
//!     Ok(Response::from(body))
//! }
//! ```

/// The header carrying the unique identifier of each request.
pub const OPC_REQUEST_ID: &str = "opc-request-id";

/// The header carrying the work request created by an asynchronous mutation.
pub const OPC_WORK_REQUEST_ID: &str = "opc-work-request-id";

/// Represents a REST call response.
#[derive(Clone, Debug)]
pub struct Response<T> {
    parts: Parts,
    body: T,
}

impl<T> Response<T> {
    /// Creates a response from the body, with empty headers.
    pub fn from(body: T) -> Self {
        Self {
            body,
            parts: Parts::default(),
        }
    }

    /// Creates a response from the given parts.
    pub fn from_parts(parts: Parts, body: T) -> Self {
        Self { parts, body }
    }

    /// Returns the headers associated with this response.
    pub fn headers(&self) -> &http::HeaderMap<http::HeaderValue> {
        &self.parts.headers
    }

    /// Returns the body associated with this response.
    pub fn body(&self) -> &T {
        &self.body
    }

    /// The `opc-request-id` header, if present.
    pub fn request_id(&self) -> Option<&str> {
        self.header_str(OPC_REQUEST_ID)
    }

    /// The `opc-work-request-id` header, if present.
    pub fn work_request_id(&self) -> Option<&str> {
        self.header_str(OPC_WORK_REQUEST_ID)
    }

    /// Consumes the response returning the metadata, and body.
    pub fn into_parts(self) -> (Parts, T) {
        (self.parts, self.body)
    }

    /// Consumes the response returning only its body.
    pub fn into_body(self) -> T {
        self.body
    }

    fn header_str(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Component parts of a response.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct Parts {
    /// The HTTP headers.
    pub headers: http::HeaderMap<http::HeaderValue>,
}

impl Parts {
    /// Create a new instance.
    pub fn new() -> Self {
        Parts::default()
    }

    /// Set the headers.
    pub fn set_headers<V>(mut self, v: V) -> Self
    where
        V: Into<http::HeaderMap>,
    {
        self.headers = v.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn response_from() {
        let response = Response::from("abc123".to_string());
        assert!(response.headers().is_empty());
        assert_eq!(response.body().as_str(), "abc123");
        assert!(response.request_id().is_none());
        assert!(response.work_request_id().is_none());

        let body = response.into_body();
        assert_eq!(body.as_str(), "abc123");
    }

    #[test]
    fn response_from_parts() {
        let mut headers = http::HeaderMap::new();
        headers.insert(OPC_REQUEST_ID, HeaderValue::from_static("req-1"));
        headers.insert(OPC_WORK_REQUEST_ID, HeaderValue::from_static("wr-1"));
        let parts = Parts::new().set_headers(headers.clone());

        let response = Response::from_parts(parts, "abc123".to_string());
        assert_eq!(response.body().as_str(), "abc123");
        assert_eq!(response.headers(), &headers);
        assert_eq!(response.request_id(), Some("req-1"));
        assert_eq!(response.work_request_id(), Some("wr-1"));

        let (parts, body) = response.into_parts();
        assert_eq!(body.as_str(), "abc123");
        assert_eq!(parts.headers, headers);
    }
}
