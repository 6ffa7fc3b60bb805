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

use gax::Result;
use gax::response::Response;

/// Exposes the lifecycle state of a resource snapshot.
///
/// Most infrastructure resources carry a `lifecycleState` field, such as
/// `PROVISIONING`, `AVAILABLE`, or `TERMINATED`. Work requests carry a
/// `status` instead. Types used with [wait_until][crate::wait_until] return
/// whichever field represents their state.
pub trait LifecycleState {
    /// The current state, if the snapshot has one.
    fn lifecycle_state(&self) -> Option<&str>;
}

impl<T: LifecycleState> LifecycleState for Response<T> {
    fn lifecycle_state(&self) -> Option<&str> {
        self.body().lifecycle_state()
    }
}

/// A resource that can be observed and refreshed.
///
/// The waiter only reads the current snapshot and asks the handle to refresh
/// it. How the snapshot is fetched, including any retry policy, is the
/// concern of the handle.
pub trait PollableHandle {
    /// The type of the resource snapshot.
    type Snapshot;

    /// The most recently fetched snapshot.
    fn snapshot(&self) -> &Self::Snapshot;

    /// Fetches a new snapshot, replacing the current one.
    ///
    /// On error the previous snapshot is kept.
    fn refresh(&mut self) -> impl Future<Output = Result<()>>;

    /// Consumes the handle and returns the last snapshot.
    fn into_snapshot(self) -> Self::Snapshot;
}

/// A [PollableHandle] backed by an async closure.
///
/// Each refresh calls the closure and stores its result. This is the most
/// common way to wait for a resource: wrap the `get` call for the resource
/// in a closure.
pub struct FetchHandle<T, F> {
    snapshot: T,
    fetch: F,
}

impl<T, F> FetchHandle<T, F>
where
    F: AsyncFnMut() -> Result<T>,
{
    /// Creates a handle from a snapshot the application already has.
    ///
    /// For example, the response to a create or update request.
    pub fn new(initial: T, fetch: F) -> Self {
        Self {
            snapshot: initial,
            fetch,
        }
    }

    /// Creates a handle seeded from an initial call to `fetch`.
    pub async fn from_fetch(mut fetch: F) -> Result<Self> {
        let snapshot = fetch().await?;
        Ok(Self { snapshot, fetch })
    }
}

impl<T, F> PollableHandle for FetchHandle<T, F>
where
    F: AsyncFnMut() -> Result<T>,
{
    type Snapshot = T;

    fn snapshot(&self) -> &T {
        &self.snapshot
    }

    async fn refresh(&mut self) -> Result<()> {
        let snapshot = (self.fetch)().await?;
        self.snapshot = snapshot;
        Ok(())
    }

    fn into_snapshot(self) -> T {
        self.snapshot
    }
}

impl<T: std::fmt::Debug, F> std::fmt::Debug for FetchHandle<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchHandle")
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}
