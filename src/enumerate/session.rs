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

//! The session seam the enumerator is built on.

use async_trait::async_trait;
use std::fmt;

use super::entry::EntryBatch;
use super::error::SessionError;

/// Opaque server-assigned token for an open directory cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteHandle(String);

impl RemoteHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RemoteHandle {
    fn from(handle: String) -> Self {
        Self(handle)
    }
}

/// A connected session able to list directories.
///
/// Implementations own request framing and dispatch; enumeration only ever
/// calls these four operations. The session is shared (`Arc`) and may be
/// used by other operations concurrently, but the enumerator issues at most
/// one request per handle at a time.
#[async_trait]
pub trait DirectorySession: Send + Sync {
    /// Whether requests can currently be issued.
    fn is_active(&self) -> bool;

    /// `SSH_FXP_OPENDIR`. The empty path means the working directory.
    async fn open_directory(&self, path: &str) -> Result<RemoteHandle, SessionError>;

    /// `SSH_FXP_READDIR`. End of listing is reported through
    /// [`EntryBatch::exhausted`], not as an error.
    async fn read_directory(&self, handle: &RemoteHandle) -> Result<EntryBatch, SessionError>;

    /// `SSH_FXP_CLOSE`.
    async fn close_handle(&self, handle: &RemoteHandle) -> Result<(), SessionError>;
}
