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

use super::{ServiceStatus, WaitStopped, WaitTimeout};
use crate::response::OPC_REQUEST_ID;
use http::HeaderMap;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by all the infrastructure SDK crates.
///
/// The SDK reports errors from multiple sources. The service may return an
/// error, the transport may be unable to create the necessary connection, the
/// retry loop may give up, a wait may not converge before its deadline, or a
/// wait may be stopped because the resource reached a failure state.
///
/// Most applications will just return the error or log it. Applications that
/// need to react to specific conditions can use the predicates in this type,
/// such as [is_not_found][Error::is_not_found] or
/// [is_timeout][Error::is_timeout].
///
/// # Example
/// ```
/// use infra_sdk_gax::error::{Error, ServiceStatus};
/// match example_function() {
///     Err(e) if e.is_not_found() => { println!("nothing to see {e}"); },
///     Err(e) if e.is_timeout() => { println!("not enough time {e}"); },
///     Err(e) => { println!("some other error {e}"); },
///     Ok(_) => { println!("success, how boring"); },
/// }
///
/// fn example_function() -> Result<String, Error> {
///     // ... details omitted ...
///     # Err(Error::service(ServiceStatus::default().set_status_code(404).set_code("NotFound")))
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

impl Error {
    /// Creates an error with the information returned by the service.
    ///
    /// # Example
    /// ```
    /// use infra_sdk_gax::error::{Error, ServiceStatus};
    /// let status = ServiceStatus::default().set_status_code(409).set_code("Conflict");
    /// let error = Error::service(status.clone());
    /// assert_eq!(error.status(), Some(&status));
    /// assert_eq!(error.http_status_code(), Some(409));
    /// ```
    pub fn service(status: ServiceStatus) -> Self {
        Self::service_with_http_metadata(status, None)
    }

    /// Creates a service error including the response headers.
    pub fn service_with_http_metadata(status: ServiceStatus, headers: Option<HeaderMap>) -> Self {
        let details = ServiceDetails { status, headers };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// Creates an error from a failed HTTP response.
    ///
    /// If the payload contains a service error body the result is a service
    /// error, otherwise it is a transport error with the status code, headers,
    /// and payload.
    pub fn from_http_response(status_code: u16, headers: HeaderMap, payload: bytes::Bytes) -> Self {
        match ServiceStatus::from_http(status_code, &headers, payload.as_ref()) {
            Some(status) => Self::service_with_http_metadata(status, Some(headers)),
            None => Self::http(status_code, headers, payload),
        }
    }

    /// A problem reported by the transport layer, such as an error generated
    /// by a proxy before the request reached the service.
    pub fn http(status_code: u16, headers: HeaderMap, payload: bytes::Bytes) -> Self {
        let details = TransportDetails {
            status_code: Some(status_code),
            headers: Some(headers),
            payload: Some(payload),
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: None,
        }
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// Examples include: connection failures, a broken connection after the
    /// request is sent, or read and write errors.
    ///
    /// # Example
    /// ```
    /// use infra_sdk_gax::error::Error;
    /// let error = Error::io("connection reset by peer");
    /// assert!(error.is_io());
    /// assert!(error.http_status_code().is_none());
    /// ```
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        let details = TransportDetails {
            status_code: None,
            headers: None,
            payload: None,
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: Some(source.into()),
        }
    }

    /// If true, the request failed in the transport layer without a full HTTP
    /// response.
    ///
    /// # Troubleshooting
    ///
    /// This indicates a problem completing the request, such as a dropped
    /// connection or a DNS failure. These problems are usually transient, and
    /// the default retry policy retries them.
    pub fn is_io(&self) -> bool {
        matches!(
        &self.kind,
        ErrorKind::Transport(d) if d.status_code.is_none())
    }

    /// If true, the error was reported by the transport layer, with or without
    /// an HTTP status code.
    pub fn is_transport(&self) -> bool {
        matches!(&self.kind, ErrorKind::Transport(_))
    }

    /// Creates an error representing a timeout.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use infra_sdk_gax::error::Error;
    /// let error = Error::timeout("simulated timeout");
    /// assert!(error.is_timeout());
    /// assert!(error.source().is_some());
    /// ```
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// Creates an error for a wait that did not reach its target in time.
    pub fn wait_timeout(details: WaitTimeout) -> Self {
        Self::timeout(details)
    }

    /// The operation could not be completed before its deadline.
    ///
    /// This is always a client-side generated error. Waits report this error
    /// when the resource does not reach the desired state before the maximum
    /// wait time. The resource may still reach that state later.
    ///
    /// # Troubleshooting
    ///
    /// Some resources, such as large databases or clusters, take a long time
    /// to provision. Consider increasing the maximum wait time.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// The details of a wait timeout, if this error is one.
    pub fn timeout_details(&self) -> Option<&WaitTimeout> {
        match &self.kind {
            ErrorKind::Timeout => self.source_as::<WaitTimeout>(),
            _ => None,
        }
    }

    /// Creates an error representing an exhausted retry loop.
    ///
    /// The last error seen by the loop is preserved as the
    /// [source][std::error::Error::source] of the new error. The status code,
    /// service status, and classification predicates forward to it.
    ///
    /// # Example
    /// ```
    /// use infra_sdk_gax::error::{Error, ServiceStatus};
    /// let last = Error::service(ServiceStatus::default().set_status_code(503));
    /// let error = Error::exhausted(last);
    /// assert!(error.is_exhausted());
    /// assert!(error.is_server_error());
    /// assert_eq!(error.http_status_code(), Some(503));
    /// ```
    pub fn exhausted(last_error: Error) -> Self {
        Self {
            kind: ErrorKind::Exhausted,
            source: Some(Box::new(last_error)),
        }
    }

    /// The operation could not complete before the retry policy gave up.
    ///
    /// This is always a client-side generated error, but it may be the result
    /// of multiple errors received from the service.
    ///
    /// # Troubleshooting
    ///
    /// The most common cause of this problem is a transient problem that lasts
    /// longer than your retry policy. If your application can tolerate longer
    /// recovery times then extend the retry policy.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::Exhausted)
    }

    /// Creates an error for a wait stopped by a per-iteration check.
    pub fn stopped(details: WaitStopped) -> Self {
        Self {
            kind: ErrorKind::Stopped,
            source: Some(Box::new(details)),
        }
    }

    /// The wait was stopped because the resource reached a failure state.
    ///
    /// For example, a work request that finished with `FAILED` status.
    pub fn is_stopped(&self) -> bool {
        matches!(self.kind, ErrorKind::Stopped)
    }

    /// The details of a stopped wait, if this error is one.
    pub fn stop_details(&self) -> Option<&WaitStopped> {
        match &self.kind {
            ErrorKind::Stopped => self.source_as::<WaitStopped>(),
            _ => None,
        }
    }

    /// Creates an error representing a cancelled operation.
    pub fn cancelled<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            source: Some(source.into()),
        }
    }

    /// The operation was cancelled by the application.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Creates an error representing a deserialization problem.
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response could not be deserialized.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// An error that does not fit any other category.
    pub fn other<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Other,
            source: Some(source.into()),
        }
    }

    /// The last error seen by an exhausted or cancelled retry loop.
    pub fn last_error(&self) -> Option<&Error> {
        match &self.kind {
            ErrorKind::Exhausted | ErrorKind::Cancelled => self.source_as::<Error>(),
            _ => None,
        }
    }

    /// The [ServiceStatus] payload associated with this error.
    ///
    /// For exhausted retry loops this is the status of the last error.
    pub fn status(&self) -> Option<&ServiceStatus> {
        match &self.kind {
            ErrorKind::Service(d) => Some(&d.status),
            ErrorKind::Exhausted => self.last_error().and_then(Error::status),
            _ => None,
        }
    }

    /// The HTTP status code, if any, associated with this error.
    ///
    /// For exhausted retry loops this is the status code of the last error.
    ///
    /// # Example
    /// ```
    /// use infra_sdk_gax::error::Error;
    /// let e = search_for_thing("the thing");
    /// if let Some(code) = e.http_status_code() {
    ///     if code == 404 {
    ///         println!("cannot find the thing, more details in {e}");
    ///     }
    /// }
    ///
    /// fn search_for_thing(name: &str) -> Error {
    ///     # Error::http(404, http::HeaderMap::new(), bytes::Bytes::from_static(b"NOT FOUND"))
    /// }
    /// ```
    pub fn http_status_code(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Transport(d) => d.status_code,
            ErrorKind::Service(d) => Some(d.status.status_code),
            ErrorKind::Exhausted => self.last_error().and_then(Error::http_status_code),
            _ => None,
        }
    }

    /// The headers, if any, associated with this error.
    pub fn http_headers(&self) -> Option<&HeaderMap> {
        match &self.kind {
            ErrorKind::Transport(d) => d.headers.as_ref(),
            ErrorKind::Service(d) => d.headers.as_ref(),
            ErrorKind::Exhausted => self.last_error().and_then(Error::http_headers),
            _ => None,
        }
    }

    /// The payload, if any, associated with a transport error.
    pub fn http_payload(&self) -> Option<&bytes::Bytes> {
        match &self.kind {
            ErrorKind::Transport(d) => d.payload.as_ref(),
            _ => None,
        }
    }

    /// The `opc-request-id` of the failed request, if known.
    ///
    /// Include this value when contacting support about a failed request.
    pub fn request_id(&self) -> Option<&str> {
        self.status()
            .and_then(|s| s.request_id.as_deref())
            .or_else(|| {
                self.http_headers()
                    .and_then(|h| h.get(OPC_REQUEST_ID))
                    .and_then(|v| v.to_str().ok())
            })
    }

    /// The resource does not exist, or the caller is not authorized to see it.
    pub fn is_not_found(&self) -> bool {
        self.http_status_code() == Some(404)
    }

    /// The service is throttling the caller (HTTP 429).
    pub fn is_throttled(&self) -> bool {
        self.http_status_code() == Some(429)
    }

    /// The service reported an internal problem (HTTP 5xx).
    pub fn is_server_error(&self) -> bool {
        self.http_status_code()
            .is_some_and(|c| (500..600).contains(&c))
    }

    /// The request was rejected as invalid (HTTP 4xx, excluding 429).
    ///
    /// This includes not-found errors. Throttling is reported by
    /// [is_throttled][Error::is_throttled] instead.
    pub fn is_client_error(&self) -> bool {
        self.http_status_code()
            .is_some_and(|c| (400..500).contains(&c) && c != 429)
    }

    fn source_as<T: StdError + 'static>(&self) -> Option<&T> {
        self.source.as_ref().and_then(|e| e.downcast_ref::<T>())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::Service(d), _) => {
                write!(
                    f,
                    "the service reports an error with HTTP status {} and code {} described as: {}",
                    d.status.status_code, d.status.code, d.status.message
                )?;
                if let Some(id) = &d.status.request_id {
                    write!(f, " (opc-request-id: {id})")?;
                }
                Ok(())
            }
            (ErrorKind::Transport(d), source) => d.display(source.as_deref(), f),
            (ErrorKind::Timeout, Some(e)) => write!(f, "the operation exceeded its deadline: {e}"),
            (ErrorKind::Exhausted, Some(e)) => {
                write!(f, "the retry policy is exhausted, last error: {e}")
            }
            (ErrorKind::Stopped, Some(e)) => write!(f, "{e}"),
            (ErrorKind::Cancelled, Some(e)) => write!(f, "the operation was cancelled: {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Other, Some(e)) => write!(f, "an unclassified problem: {e}"),
            (_, None) => unreachable!("no constructor allows this"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

/// The type of error held by an [Error] instance.
#[derive(Debug)]
enum ErrorKind {
    Service(Box<ServiceDetails>),
    Transport(Box<TransportDetails>),
    Timeout,
    Exhausted,
    Stopped,
    Cancelled,
    Deserialization,
    /// A uncategorized error.
    Other,
}

#[derive(Debug)]
struct TransportDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    payload: Option<bytes::Bytes>,
}

impl TransportDetails {
    fn display(
        &self,
        source: Option<&(dyn StdError + Send + Sync + 'static)>,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (source, &self) {
            (
                _,
                TransportDetails {
                    status_code: Some(code),
                    payload: Some(p),
                    ..
                },
            ) => {
                if let Ok(message) = std::str::from_utf8(p.as_ref()) {
                    write!(f, "the HTTP transport reports a [{code}] error: {message}")
                } else {
                    write!(f, "the HTTP transport reports a [{code}] error: {p:?}")
                }
            }
            (Some(source), _) => write!(f, "the transport reports an error: {source}"),
            (None, _) => unreachable!("no Error constructor allows this"),
        }
    }
}

#[derive(Debug)]
struct ServiceDetails {
    status: ServiceStatus,
    headers: Option<HeaderMap>,
}
