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
use gax::error::Error;

/// The phase of a composite operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Sending the request that changes the resource.
    Mutate,
    /// Waiting for the resource or the work request.
    Poll,
    /// Fetching the resource after the work request completed.
    FinalFetch,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mutate => "mutate",
            Self::Poll => "poll",
            Self::FinalFetch => "final fetch",
        };
        f.write_str(name)
    }
}

/// The error returned by composite operations.
///
/// Once the mutation succeeds the resource has changed, even if the wait
/// fails. The error preserves the response to the mutation as the
/// [partial][CompositeError::partial] result, so applications can find the
/// resource and decide how to proceed.
///
/// # Example
/// ```
/// # use infra_sdk_composite::{CompositeError, Phase};
/// # use gax::response::Response;
/// fn report(e: CompositeError<Response<String>>) {
///     match (e.phase(), e.partial()) {
///         (Phase::Mutate, _) => println!("nothing changed: {e}"),
///         (_, Some(r)) => println!("the resource {} changed, but {e}", r.body()),
///         (_, None) => println!("{e}"),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[error("the {phase} phase of the operation failed: {source}")]
pub struct CompositeError<P> {
    phase: Phase,
    partial: Option<P>,
    #[source]
    source: Error,
}

impl<P> CompositeError<P> {
    pub fn new(phase: Phase, partial: Option<P>, source: Error) -> Self {
        Self {
            phase,
            partial,
            source,
        }
    }

    pub(crate) fn mutate(source: Error) -> Self {
        Self::new(Phase::Mutate, None, source)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The response to the mutation, if the mutation succeeded.
    pub fn partial(&self) -> Option<&P> {
        self.partial.as_ref()
    }

    pub fn into_partial(self) -> Option<P> {
        self.partial
    }

    /// The underlying error.
    pub fn error(&self) -> &Error {
        &self.source
    }

    pub fn into_parts(self) -> (Phase, Option<P>, Error) {
        (self.phase, self.partial, self.source)
    }
}
