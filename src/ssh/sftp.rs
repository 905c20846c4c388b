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

//! [`DirectorySession`] over a live SFTP subsystem.
//!
//! Uses the raw request API so each `SSH_FXP_READDIR` response reaches the
//! enumerator as one batch, instead of the whole listing being collected up
//! front.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use russh_sftp::client::error::Error as SftpClientError;
use russh_sftp::client::RawSftpSession;
use russh_sftp::protocol::{FileAttributes, Name, StatusCode};
use tokio::sync::RwLock;

use super::connection::Client;
use super::Error;
use crate::enumerate::{
    join_remote, DirEntry, DirectorySession, EntryBatch, EnumerationError, RemoteHandle,
    SessionError,
};

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

/// SFTP session bound to one SSH connection.
pub struct SftpDirectorySession {
    client: Client,
    sftp: RawSftpSession,
    active: AtomicBool,
    working_directory: RwLock<String>,
    request_timeout: Duration,
}

impl SftpDirectorySession {
    /// Start the SFTP subsystem on `client` and resolve the initial working
    /// directory.
    pub async fn connect(client: Client, request_timeout: Duration) -> Result<Self, Error> {
        let sftp = client.open_sftp().await?;
        Self::with_sftp(client, sftp, request_timeout).await
    }

    /// Wrap an already initialised SFTP subsystem.
    pub async fn with_sftp(
        client: Client,
        sftp: RawSftpSession,
        request_timeout: Duration,
    ) -> Result<Self, Error> {
        let home = tokio::time::timeout(request_timeout, sftp.realpath("."))
            .await
            .map_err(|_| Error::ConnectTimeout(request_timeout))??;
        let working_directory = first_name(home).unwrap_or_else(|| "/".to_string());

        tracing::debug!(
            user = client.username(),
            cwd = %working_directory,
            "SFTP session established"
        );

        Ok(Self {
            client,
            sftp,
            active: AtomicBool::new(true),
            working_directory: RwLock::new(working_directory),
            request_timeout,
        })
    }

    /// Absolute path relative paths are resolved against.
    pub async fn working_directory(&self) -> String {
        self.working_directory.read().await.clone()
    }

    /// Change the working directory.
    ///
    /// The target is canonicalised by the server and must be a directory.
    /// Returns the new absolute working directory.
    pub async fn change_directory(&self, path: &str) -> Result<String, EnumerationError> {
        if !self.is_active() {
            return Err(EnumerationError::SessionUnavailable);
        }

        let resolved = self.resolve(path).await;
        let reply = self
            .request(self.sftp.realpath(resolved.as_str()))
            .await
            .map_err(|e| EnumerationError::from_open(path, e))?;
        let canonical = first_name(reply).ok_or_else(|| {
            EnumerationError::Protocol(format!("realpath returned no name for {path}"))
        })?;

        let attrs = self
            .request(self.sftp.stat(canonical.as_str()))
            .await
            .map_err(|e| EnumerationError::from_open(path, e))?
            .attrs;
        ensure_directory(&canonical, &attrs)?;

        tracing::debug!(cwd = %canonical, "Changed working directory");
        *self.working_directory.write().await = canonical.clone();
        Ok(canonical)
    }

    /// Tear down the SSH connection. Later requests fail as unavailable.
    pub async fn disconnect(&self) -> Result<(), Error> {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::debug!(address = %self.client.address(), "Disconnecting SFTP session");
            self.client.disconnect().await?;
        }
        Ok(())
    }

    async fn resolve(&self, path: &str) -> String {
        if path.is_empty() || path == "." {
            self.working_directory().await
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            join_remote(&self.working_directory.read().await, path)
        }
    }

    async fn request<T, F>(&self, fut: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SftpClientError>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result.map_err(|e| self.session_error(e)),
            Err(_) => Err(SessionError::Timeout),
        }
    }

    fn session_error(&self, err: SftpClientError) -> SessionError {
        let mapped = map_sftp_error(err);
        if mapped.is_disconnect() {
            self.active.store(false, Ordering::SeqCst);
        }
        mapped
    }
}

#[async_trait]
impl DirectorySession for SftpDirectorySession {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.client.is_closed()
    }

    async fn open_directory(&self, path: &str) -> Result<RemoteHandle, SessionError> {
        let resolved = self.resolve(path).await;
        let handle = self.request(self.sftp.opendir(resolved.as_str())).await?;
        tracing::trace!(path = %resolved, handle = %handle.handle, "SSH_FXP_OPENDIR ok");
        Ok(RemoteHandle::new(handle.handle))
    }

    async fn read_directory(&self, handle: &RemoteHandle) -> Result<EntryBatch, SessionError> {
        batch_from_readdir(self.request(self.sftp.readdir(handle.as_str())).await)
    }

    async fn close_handle(&self, handle: &RemoteHandle) -> Result<(), SessionError> {
        let status = self.request(self.sftp.close(handle.as_str())).await?;
        if status.status_code != StatusCode::Ok {
            return Err(SessionError::status(status.status_code, status.error_message));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SftpDirectorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpDirectorySession")
            .field("client", &self.client)
            .field("active", &self.active.load(Ordering::Relaxed))
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Translate an SFTP client error into the session seam's error type.
pub fn map_sftp_error(err: SftpClientError) -> SessionError {
    match err {
        SftpClientError::Status(status) => {
            SessionError::status(status.status_code, status.error_message)
        }
        SftpClientError::IO(message) => SessionError::Io(message),
        SftpClientError::Timeout => SessionError::Timeout,
        other => SessionError::UnexpectedResponse(other.to_string()),
    }
}

/// Turn an `SSH_FXP_READDIR` reply into a batch. `SSH_FX_EOF` ends the
/// listing and is not an error.
fn batch_from_readdir(reply: Result<Name, SessionError>) -> Result<EntryBatch, SessionError> {
    match reply {
        Ok(name) => Ok(EntryBatch::more(
            name.files
                .into_iter()
                .map(|file| DirEntry::new(file.filename, file.longname, file.attrs))
                .collect(),
        )),
        Err(SessionError::Status {
            code: StatusCode::Eof,
            ..
        }) => Ok(EntryBatch::exhausted()),
        Err(e) => Err(e),
    }
}

fn first_name(reply: Name) -> Option<String> {
    reply.files.into_iter().next().map(|file| file.filename)
}

fn ensure_directory(path: &str, attrs: &FileAttributes) -> Result<(), EnumerationError> {
    if is_directory(attrs) {
        Ok(())
    } else {
        Err(EnumerationError::InvalidArgument {
            name: "path",
            reason: format!("{path} is not a directory"),
        })
    }
}

fn is_directory(attrs: &FileAttributes) -> bool {
    attrs
        .permissions
        .is_some_and(|mode| mode & S_IFMT == S_IFDIR)
}
