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

//! Error types for directory enumeration.
//!
//! Two layers are involved:
//!
//! - [`SessionError`] is what a [`DirectorySession`](super::DirectorySession)
//!   reports: a raw SFTP status code, a dropped connection, or a response the
//!   session could not make sense of.
//! - [`EnumerationError`] is what callers of the enumerator see. Session
//!   errors are folded into it by [`EnumerationError::from_open`] and
//!   [`EnumerationError::from_read`], which differ because the same status
//!   means different things before and after a handle exists.

use russh_sftp::protocol::StatusCode;
use thiserror::Error;

/// Failure reported by the session collaborator.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The server answered with a non-OK `SSH_FXP_STATUS`.
    #[error("{code}: {message}")]
    Status { code: StatusCode, message: String },

    /// The session is not connected (never was, or has been torn down).
    #[error("session is not connected")]
    NotConnected,

    /// The server sent a packet that does not answer the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The underlying channel failed while a request was in flight.
    #[error("transport I/O error: {0}")]
    Io(String),

    /// No response arrived within the configured request timeout.
    #[error("request timed out")]
    Timeout,
}

impl SessionError {
    /// Create a status error with the given code.
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Whether this error means the session itself is gone.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::NotConnected | Self::Io(_) => true,
            Self::Status { code, .. } => {
                matches!(code, StatusCode::NoConnection | StatusCode::ConnectionLost)
            }
            Self::UnexpectedResponse(_) | Self::Timeout => false,
        }
    }
}

/// Failure surfaced to enumeration callers.
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The caller passed no path, or a path the protocol cannot carry.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// The session was not active when a request had to be issued.
    #[error("SFTP session is not active")]
    SessionUnavailable,

    /// The directory does not exist on the remote side.
    #[error("no such directory: {path}")]
    PathNotFound { path: String },

    /// The remote side refused to open the directory.
    #[error("permission denied opening {path}: {message}")]
    PermissionDenied { path: String, message: String },

    /// The server answered with something enumeration cannot use.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A pending read was abandoned through its cancellation token.
    #[error("directory read cancelled")]
    Cancelled,
}

impl EnumerationError {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Map a failure of `open_directory`.
    pub fn from_open(path: &str, err: SessionError) -> Self {
        if err.is_disconnect() {
            return Self::SessionUnavailable;
        }

        match err {
            SessionError::Status {
                code: StatusCode::NoSuchFile,
                ..
            } => Self::PathNotFound {
                path: path.to_string(),
            },
            SessionError::Status {
                code: StatusCode::PermissionDenied,
                message,
            } => Self::PermissionDenied {
                path: path.to_string(),
                message,
            },
            other => Self::Protocol(format!("opening {path}: {other}")),
        }
    }

    /// Map a failure of `read_directory`.
    ///
    /// Once a handle is open only two outcomes matter to the caller: the
    /// session went away, or the server misbehaved.
    pub fn from_read(path: &str, err: SessionError) -> Self {
        if err.is_disconnect() {
            Self::SessionUnavailable
        } else {
            Self::Protocol(format!("reading {path}: {err}"))
        }
    }
}

/// Result alias for enumeration operations.
pub type Result<T> = std::result::Result<T, EnumerationError>;
