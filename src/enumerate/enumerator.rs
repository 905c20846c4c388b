// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pull-based directory listing.
//!
//! The handle is opened when the enumerator is created, so a dead session or
//! a missing directory fails the call that asked for the listing. Entries are
//! fetched one `SSH_FXP_READDIR` batch at a time, only when the caller pulls
//! past the end of the current batch.
//!
//! ```text
//!            open ok
//!   (new) ───────────► Open ──── exhausted ───► Exhausted
//!     │                 │  └──── error/cancel ─► Failed
//!     └─ error          └─────── close() ──────► Closed
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use super::entry::{DirEntry, EntryBatch};
use super::error::{EnumerationError, Result};
use super::handle::DirectoryHandle;
use super::path::RemotePath;
use super::session::DirectorySession;

/// Where an enumeration currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationState {
    /// The handle is open; more entries may follow.
    Open,
    /// The server reported the end of the listing.
    Exhausted,
    /// A pull failed; the error was returned once.
    Failed,
    /// The caller closed the enumeration early.
    Closed,
}

impl EnumerationState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// Lazy listing of one remote directory.
///
/// `next_entry` takes `&mut self`, so a single enumerator cannot have two
/// reads in flight. Dropping it before exhaustion still releases the remote
/// handle.
pub struct DirectoryEnumerator<S: DirectorySession + ?Sized + 'static> {
    handle: DirectoryHandle<S>,
    buffer: VecDeque<DirEntry>,
    state: EnumerationState,
    yielded: usize,
}

impl<S: DirectorySession + ?Sized + 'static> DirectoryEnumerator<S> {
    /// Validate `path` and open it on `session`.
    ///
    /// A `None` path fails with [`EnumerationError::InvalidArgument`] before
    /// the session is consulted.
    pub async fn open(session: Arc<S>, path: Option<&str>) -> Result<Self> {
        let path = RemotePath::new(path)?;
        let handle = DirectoryHandle::open(session, path).await?;

        Ok(Self {
            handle,
            buffer: VecDeque::new(),
            state: EnumerationState::Open,
            yielded: 0,
        })
    }

    pub fn path(&self) -> &RemotePath {
        self.handle.path()
    }

    pub fn state(&self) -> EnumerationState {
        self.state
    }

    /// Number of entries handed out so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Entries fetched but not yet handed out; never more than one batch.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pull the next entry.
    ///
    /// Returns `Ok(None)` once the listing is exhausted, and on every call
    /// after the enumeration has failed or been closed. While the handle is
    /// open, every pull checks the session first: once it has gone away the
    /// buffered remainder of the batch is discarded and the pull fails with
    /// [`EnumerationError::SessionUnavailable`].
    pub async fn next_entry(&mut self) -> Result<Option<DirEntry>> {
        loop {
            self.ensure_session_active().await?;

            if let Some(entry) = self.take_buffered() {
                return Ok(Some(entry));
            }

            if self.state.is_terminal() {
                return Ok(None);
            }

            let result = self.handle.read_next_batch().await;
            self.absorb(result).await?;
        }
    }

    /// Like [`next_entry`](Self::next_entry), but abandons a pending read
    /// when `token` is cancelled.
    ///
    /// Cancellation moves the enumeration to [`EnumerationState::Failed`];
    /// entries already buffered are still returned before the token is
    /// looked at.
    pub async fn next_entry_cancellable(
        &mut self,
        token: &CancellationToken,
    ) -> Result<Option<DirEntry>> {
        loop {
            self.ensure_session_active().await?;

            if let Some(entry) = self.take_buffered() {
                return Ok(Some(entry));
            }

            if self.state.is_terminal() {
                return Ok(None);
            }

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(EnumerationError::Cancelled),
                result = self.handle.read_next_batch() => result,
            };
            self.absorb(result).await?;
        }
    }

    /// Close the enumeration without reading the rest of the listing.
    pub async fn close(&mut self) {
        if self.state == EnumerationState::Open {
            self.state = EnumerationState::Closed;
        }
        self.buffer.clear();
        self.handle.close().await;
    }

    /// Turn the enumerator into a [`Stream`].
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<DirEntry>> + Send {
        futures::stream::try_unfold(self, |mut enumerator| async move {
            let next = enumerator.next_entry().await?;
            Ok::<_, EnumerationError>(next.map(|entry| (entry, enumerator)))
        })
    }

    async fn ensure_session_active(&mut self) -> Result<()> {
        if self.state != EnumerationState::Open || self.handle.is_session_active() {
            return Ok(());
        }
        tracing::debug!(
            path = %self.handle.path(),
            discarded = self.buffer.len(),
            "Session went away during enumeration"
        );
        self.absorb(Err(EnumerationError::SessionUnavailable)).await
    }

    fn take_buffered(&mut self) -> Option<DirEntry> {
        let entry = self.buffer.pop_front()?;
        self.yielded += 1;
        let full_path = self.handle.path().join(entry.name());
        Some(entry.with_full_path(full_path))
    }

    async fn absorb(&mut self, result: Result<EntryBatch>) -> Result<()> {
        match result {
            Ok(batch) => {
                self.buffer.extend(batch.entries);
                if batch.exhausted {
                    tracing::debug!(
                        path = %self.handle.path(),
                        count = self.yielded + self.buffer.len(),
                        "Directory listing exhausted"
                    );
                    self.state = EnumerationState::Exhausted;
                    self.handle.close().await;
                }
                Ok(())
            }
            Err(e) => {
                tracing::debug!(path = %self.handle.path(), error = %e, "Directory enumeration failed");
                self.state = EnumerationState::Failed;
                self.buffer.clear();
                self.handle.close().await;
                Err(e)
            }
        }
    }
}

impl<S: DirectorySession + ?Sized + 'static> std::fmt::Debug for DirectoryEnumerator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryEnumerator")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("yielded", &self.yielded)
            .finish()
    }
}
