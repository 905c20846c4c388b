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

//! Lifecycle of one server-side directory handle.
//!
//! [`DirectoryHandle`] is the single owner of a [`RemoteHandle`]. Every way
//! out of an enumeration (exhaustion, failure, explicit close, drop) ends up
//! in the same `take()` of the inner option, so the close request is sent at
//! most once.

use std::sync::Arc;

use super::entry::EntryBatch;
use super::error::{EnumerationError, Result};
use super::path::RemotePath;
use super::session::{DirectorySession, RemoteHandle};

/// An open directory on the remote side.
pub struct DirectoryHandle<S: DirectorySession + ?Sized + 'static> {
    session: Arc<S>,
    path: RemotePath,
    handle: Option<RemoteHandle>,
}

impl<S: DirectorySession + ?Sized + 'static> DirectoryHandle<S> {
    /// Open `path` on `session`.
    ///
    /// No request is sent when the session is inactive.
    pub async fn open(session: Arc<S>, path: RemotePath) -> Result<Self> {
        if !session.is_active() {
            tracing::debug!(path = %path, "Refusing to open directory on inactive session");
            return Err(EnumerationError::SessionUnavailable);
        }

        let handle = session
            .open_directory(path.as_str())
            .await
            .map_err(|e| EnumerationError::from_open(&path.to_string(), e))?;

        tracing::debug!(path = %path, handle = %handle, "Opened directory handle");

        Ok(Self {
            session,
            path,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &RemotePath {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_active()
    }

    /// Request the next batch of entries.
    ///
    /// Liveness is checked on every call: a session that was active at open
    /// time may have been disconnected since.
    pub async fn read_next_batch(&mut self) -> Result<EntryBatch> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            EnumerationError::invalid_argument("handle", "directory handle is already closed")
        })?;

        if !self.session.is_active() {
            return Err(EnumerationError::SessionUnavailable);
        }

        let batch = self
            .session
            .read_directory(handle)
            .await
            .map_err(|e| EnumerationError::from_read(&self.path.to_string(), e))?;

        tracing::trace!(
            handle = %handle,
            count = batch.len(),
            exhausted = batch.exhausted,
            "Read directory batch"
        );

        Ok(batch)
    }

    /// Close the handle.
    ///
    /// Calling this more than once is harmless. A failed close is logged and
    /// dropped: by the time it fails the session is usually gone and the
    /// handle with it.
    pub async fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match self.session.close_handle(&handle).await {
            Ok(()) => tracing::debug!(path = %self.path, handle = %handle, "Closed directory handle"),
            Err(e) => tracing::debug!(
                path = %self.path,
                handle = %handle,
                error = %e,
                "Ignoring failure to close directory handle"
            ),
        }
    }
}

impl<S: DirectorySession + ?Sized + 'static> Drop for DirectoryHandle<S> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let session = Arc::clone(&self.session);
                let path = self.path.to_string();
                runtime.spawn(async move {
                    if let Err(e) = session.close_handle(&handle).await {
                        tracing::debug!(
                            path = %path,
                            handle = %handle,
                            error = %e,
                            "Ignoring failure to close abandoned directory handle"
                        );
                    } else {
                        tracing::debug!(path = %path, handle = %handle, "Closed abandoned directory handle");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    path = %self.path,
                    handle = %handle,
                    "Directory handle dropped outside a tokio runtime; it stays open until the session ends"
                );
            }
        }
    }
}

impl<S: DirectorySession + ?Sized + 'static> std::fmt::Debug for DirectoryHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryHandle")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::MemorySession;

    fn session() -> Arc<MemorySession> {
        Arc::new(
            MemorySession::new()
                .with_batch_size(2)
                .with_generated_directory("/d", "f", 3),
        )
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let session = session();
        let path = RemotePath::new(Some("/d")).unwrap();
        let mut handle = DirectoryHandle::open(session.clone(), path).await.unwrap();
        assert!(handle.is_open());

        handle.close().await;
        handle.close().await;
        drop(handle);
        tokio::task::yield_now().await;

        assert_eq!(session.close_count(), 1);
    }

    #[tokio::test]
    async fn test_read_after_close_is_invalid_argument() {
        let session = session();
        let path = RemotePath::new(Some("/d")).unwrap();
        let mut handle = DirectoryHandle::open(session.clone(), path).await.unwrap();
        handle.close().await;

        let err = handle.read_next_batch().await.unwrap_err();
        assert!(matches!(
            err,
            EnumerationError::InvalidArgument { name: "handle", .. }
        ));
        assert_eq!(session.read_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_close_is_swallowed() {
        let session = session();
        let path = RemotePath::new(Some("/d")).unwrap();
        let mut handle = DirectoryHandle::open(session.clone(), path).await.unwrap();

        session.disconnect();
        handle.close().await;

        assert!(!handle.is_open());
        assert_eq!(session.failed_close_count(), 1);
    }

    #[test]
    fn test_drop_outside_runtime_leaves_handle_open() {
        let session = session();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let handle = runtime
            .block_on(DirectoryHandle::open(
                session.clone(),
                RemotePath::new(Some("/d")).unwrap(),
            ))
            .unwrap();
        drop(runtime);

        drop(handle);
        assert_eq!(session.close_count(), 0);
        assert_eq!(session.open_handles(), 1);
    }
}
