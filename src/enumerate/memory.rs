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

//! In-memory [`DirectorySession`].
//!
//! Behaves like an SFTP server's directory handling: handles are named
//! `h1`, `h2`, ..., `READDIR` returns up to `batch_size` names per call and
//! then `SSH_FX_EOF` as a separate empty batch. Every call is counted so
//! tests can check the open/close balance, and faults (disconnects, denied
//! directories, failing reads, stalled reads, empty batches) can be injected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use russh_sftp::protocol::{FileAttributes, StatusCode};

use super::entry::{DirEntry, EntryBatch};
use super::error::SessionError;
use super::session::{DirectorySession, RemoteHandle};

/// Default number of names returned per `READDIR`.
pub const DEFAULT_BATCH_SIZE: usize = 100;

enum Directory {
    Listing(Arc<Vec<DirEntry>>),
    Denied,
}

struct Cursor {
    entries: Arc<Vec<DirEntry>>,
    position: usize,
    empty_batch_pending: bool,
}

#[derive(Default)]
struct State {
    directories: HashMap<String, Directory>,
    handles: HashMap<String, Cursor>,
    handle_counter: u64,
    read_failures: HashMap<usize, SessionError>,
}

/// Call counters of a [`MemorySession`].
#[derive(Debug, Default)]
struct Counters {
    opens: AtomicUsize,
    reads: AtomicUsize,
    closes: AtomicUsize,
    failed_closes: AtomicUsize,
}

/// An in-memory directory tree served through [`DirectorySession`].
pub struct MemorySession {
    state: Mutex<State>,
    counters: Counters,
    active: AtomicBool,
    stall_reads: AtomicBool,
    batch_size: usize,
    empty_batches: bool,
    working_directory: String,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    /// An active session with no directories and `/` as working directory.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            counters: Counters::default(),
            active: AtomicBool::new(true),
            stall_reads: AtomicBool::new(false),
            batch_size: DEFAULT_BATCH_SIZE,
            empty_batches: false,
            working_directory: "/".to_string(),
        }
    }

    /// Names returned per `READDIR`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Answer every `READDIR` that would carry names with an empty,
    /// non-final batch first.
    pub fn with_empty_batches(mut self) -> Self {
        self.empty_batches = true;
        self
    }

    /// Directory the empty path resolves to.
    pub fn with_working_directory(mut self, path: impl Into<String>) -> Self {
        self.working_directory = normalize(&path.into());
        self
    }

    /// Add a directory holding `entries` in listing order.
    pub fn with_directory(self, path: &str, entries: Vec<DirEntry>) -> Self {
        self.lock()
            .directories
            .insert(normalize(path), Directory::Listing(Arc::new(entries)));
        self
    }

    /// Add a directory with `count` generated regular files named
    /// `prefix_0`, `prefix_1`, ...
    pub fn with_generated_directory(self, path: &str, prefix: &str, count: usize) -> Self {
        let entries = (0..count)
            .map(|i| DirEntry::new(format!("{prefix}_{i}"), "", file_attributes(i as u64)))
            .collect();
        self.with_directory(path, entries)
    }

    /// Add a directory whose open is refused with `SSH_FX_PERMISSION_DENIED`.
    pub fn with_denied_directory(self, path: &str) -> Self {
        self.lock()
            .directories
            .insert(normalize(path), Directory::Denied);
        self
    }

    /// Make the `nth` `READDIR` call (1-based, across all handles) fail.
    pub fn fail_read(&self, nth: usize, error: SessionError) {
        self.lock().read_failures.insert(nth, error);
    }

    /// Drop the connection: later requests fail and `is_active` is false.
    pub fn disconnect(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Make `READDIR` calls wait forever until switched off again.
    pub fn stall_reads(&self, stall: bool) {
        self.stall_reads.store(stall, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    /// Close requests received, whether or not they succeeded.
    pub fn close_count(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Close requests that were refused (unknown handle or no connection).
    pub fn failed_close_count(&self) -> usize {
        self.counters.failed_closes.load(Ordering::SeqCst)
    }

    /// Handles currently open on the "server".
    pub fn open_handles(&self) -> usize {
        self.lock().handles.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens in a failing test;
        // the state is still usable for reporting.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn resolve(&self, path: &str) -> String {
        if path.is_empty() || path == "." {
            self.working_directory.clone()
        } else if path.starts_with('/') {
            normalize(path)
        } else {
            normalize(&super::path::join_remote(&self.working_directory, path))
        }
    }
}

#[async_trait]
impl DirectorySession for MemorySession {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn open_directory(&self, path: &str) -> Result<RemoteHandle, SessionError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.ensure_connected()?;

        let resolved = self.resolve(path);
        let mut state = self.lock();

        let entries = match state.directories.get(&resolved) {
            Some(Directory::Listing(entries)) => Arc::clone(entries),
            Some(Directory::Denied) => {
                return Err(SessionError::status(
                    StatusCode::PermissionDenied,
                    format!("Permission denied: {resolved}"),
                ))
            }
            None => {
                return Err(SessionError::status(
                    StatusCode::NoSuchFile,
                    format!("No such file: {resolved}"),
                ))
            }
        };

        state.handle_counter += 1;
        let handle = format!("h{}", state.handle_counter);
        state.handles.insert(
            handle.clone(),
            Cursor {
                entries,
                position: 0,
                empty_batch_pending: self.empty_batches,
            },
        );

        Ok(RemoteHandle::new(handle))
    }

    async fn read_directory(&self, handle: &RemoteHandle) -> Result<EntryBatch, SessionError> {
        let nth = self.counters.reads.fetch_add(1, Ordering::SeqCst) + 1;

        if self.stall_reads.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }

        self.ensure_connected()?;

        let mut state = self.lock();
        if let Some(error) = state.read_failures.remove(&nth) {
            return Err(error);
        }

        let cursor = state
            .handles
            .get_mut(handle.as_str())
            .ok_or_else(|| SessionError::status(StatusCode::Failure, "Invalid handle"))?;

        if cursor.position >= cursor.entries.len() {
            return Ok(EntryBatch::exhausted());
        }

        if cursor.empty_batch_pending {
            cursor.empty_batch_pending = false;
            return Ok(EntryBatch::more(Vec::new()));
        }

        let end = (cursor.position + self.batch_size).min(cursor.entries.len());
        let entries = cursor.entries[cursor.position..end].to_vec();
        cursor.position = end;
        cursor.empty_batch_pending = self.empty_batches;

        Ok(EntryBatch::more(entries))
    }

    async fn close_handle(&self, handle: &RemoteHandle) -> Result<(), SessionError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);

        let removed = self.lock().handles.remove(handle.as_str());

        if let Err(e) = self.ensure_connected() {
            self.counters.failed_closes.fetch_add(1, Ordering::SeqCst);
            return Err(e);
        }

        match removed {
            Some(_) => Ok(()),
            None => {
                self.counters.failed_closes.fetch_add(1, Ordering::SeqCst);
                Err(SessionError::status(StatusCode::Failure, "Invalid handle"))
            }
        }
    }
}

/// Attributes of a regular `0644` file of the given size.
pub fn file_attributes(size: u64) -> FileAttributes {
    FileAttributes {
        size: Some(size),
        uid: Some(1000),
        user: None,
        gid: Some(1000),
        group: None,
        permissions: Some(0o100644),
        atime: Some(0),
        mtime: Some(0),
    }
}

/// Attributes of a `0755` directory.
pub fn dir_attributes() -> FileAttributes {
    FileAttributes {
        size: Some(4096),
        uid: Some(1000),
        user: None,
        gid: Some(1000),
        group: None,
        permissions: Some(0o40755),
        atime: Some(0),
        mtime: Some(0),
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
