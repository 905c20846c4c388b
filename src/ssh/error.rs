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

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while establishing or tearing down an SSH/SFTP session.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to load key, bad format or passphrase: {0}")]
    KeyInvalid(#[from] russh::keys::Error),

    #[error("Key authentication failed")]
    KeyAuthFailed,

    #[error("Unable to resolve address: {0}")]
    AddressInvalid(io::Error),

    #[error("Password authentication failed")]
    PasswordWrong,

    #[error("Server host key verification failed")]
    ServerCheckFailed,

    #[error("Could not connect to the SSH agent (is SSH_AUTH_SOCK set?)")]
    AgentConnectionFailed,

    #[error("Could not list identities from the SSH agent")]
    AgentRequestIdentitiesFailed,

    #[error("The SSH agent holds no identities")]
    AgentNoIdentities,

    #[error("No identity in the SSH agent was accepted by the server")]
    AgentAuthenticationFailed,

    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("SSH error: {0}")]
    SshError(#[from] russh::Error),

    #[error("SFTP error: {0}")]
    SftpError(#[from] russh_sftp::client::error::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
