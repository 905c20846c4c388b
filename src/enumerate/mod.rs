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

//! Lazy enumeration of remote directories.
//!
//! The module is layered as follows:
//!
//! 1. **Session seam** ([`session`]) - the four operations a connected
//!    session must offer: liveness, open, read batch, close.
//! 2. **Handle manager** ([`handle`]) - owns one remote directory handle and
//!    guarantees it is closed exactly once.
//! 3. **Enumerator** ([`enumerator`]) - buffers one batch at a time and hands
//!    out entries on demand.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sftp_dirstream::enumerate::{enumerate_directory, MemorySession};
//!
//! # async fn example() -> Result<(), sftp_dirstream::enumerate::EnumerationError> {
//! let session = Arc::new(MemorySession::new());
//! let mut entries = enumerate_directory(session, Some("/home/user")).await?;
//! while let Some(entry) = entries.next_entry().await? {
//!     println!("{}", entry.full_path());
//! }
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod enumerator;
pub mod error;
pub mod handle;
pub mod memory;
pub mod path;
pub mod session;

use std::sync::Arc;

pub use entry::{format_longname, DirEntry, EntryBatch};
pub use enumerator::{DirectoryEnumerator, EnumerationState};
pub use error::{EnumerationError, Result, SessionError};
pub use handle::DirectoryHandle;
pub use memory::MemorySession;
pub use path::{join_remote, RemotePath};
pub use session::{DirectorySession, RemoteHandle};

/// Start enumerating `path` on `session`.
///
/// The directory handle is opened before this returns; entries are read
/// lazily as the returned enumerator is pulled. `None` is rejected with
/// [`EnumerationError::InvalidArgument`] and the empty path lists the
/// session's working directory.
pub async fn enumerate_directory<S>(
    session: Arc<S>,
    path: Option<&str>,
) -> Result<DirectoryEnumerator<S>>
where
    S: DirectorySession + ?Sized + 'static,
{
    DirectoryEnumerator::open(session, path).await
}
