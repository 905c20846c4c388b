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

//! SSH authentication methods and server verification.
//!
//! Supported client authentication:
//! - Password authentication
//! - Private key file (optionally encrypted)
//! - SSH agent (Unix only)

use russh::client::{Handle, Handler};
use std::path::PathBuf;
use std::sync::Arc;
use zeroize::Zeroizing;

use super::Error;

/// How to authenticate once the transport is up.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    PrivateKeyFile {
        key_file_path: PathBuf,
        key_pass: Option<Zeroizing<String>>,
    },
    #[cfg(not(target_os = "windows"))]
    Agent,
}

impl AuthMethod {
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key_file<T: AsRef<std::path::Path>>(
        key_file_path: T,
        passphrase: Option<&str>,
    ) -> Self {
        Self::PrivateKeyFile {
            key_file_path: key_file_path.as_ref().to_path_buf(),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    /// Authenticate with every identity the running SSH agent offers.
    ///
    /// Requires `SSH_AUTH_SOCK`.
    #[cfg(not(target_os = "windows"))]
    pub fn with_agent() -> Self {
        Self::Agent
    }

    /// Short label for logs; never includes secrets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::PrivateKeyFile { .. } => "publickey",
            #[cfg(not(target_os = "windows"))]
            Self::Agent => "agent",
        }
    }
}

/// Server host key verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ServerCheckMethod {
    /// Accept any host key (insecure, for testing only)
    NoCheck,
    /// Use `~/.ssh/known_hosts`
    DefaultKnownHostsFile,
    /// Use a specific known_hosts file
    KnownHostsFile(String),
}

impl ServerCheckMethod {
    pub fn with_known_hosts_file(known_hosts_file: &str) -> Self {
        Self::KnownHostsFile(known_hosts_file.to_string())
    }

    /// Map a `StrictHostKeyChecking`-style value (`yes`/`no`).
    pub fn from_strict_checking(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "no" | "off" | "false" => Self::NoCheck,
            _ => Self::DefaultKnownHostsFile,
        }
    }
}

/// Authenticate `username` on an established transport.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    auth: AuthMethod,
) -> Result<(), Error> {
    match auth {
        AuthMethod::Password(password) => {
            let result = handle.authenticate_password(username, &**password).await?;
            if !result.success() {
                return Err(Error::PasswordWrong);
            }
        }
        AuthMethod::PrivateKeyFile {
            key_file_path,
            key_pass,
        } => {
            let cprivk =
                russh::keys::load_secret_key(key_file_path, key_pass.as_ref().map(|p| &***p))
                    .map_err(Error::KeyInvalid)?;
            let result = handle
                .authenticate_publickey(
                    username,
                    russh::keys::PrivateKeyWithHashAlg::new(
                        Arc::new(cprivk),
                        handle.best_supported_rsa_hash().await?.flatten(),
                    ),
                )
                .await?;
            if !result.success() {
                return Err(Error::KeyAuthFailed);
            }
        }
        #[cfg(not(target_os = "windows"))]
        AuthMethod::Agent => {
            let mut agent = russh::keys::agent::client::AgentClient::connect_env()
                .await
                .map_err(|_| Error::AgentConnectionFailed)?;

            let identities = agent
                .request_identities()
                .await
                .map_err(|_| Error::AgentRequestIdentitiesFailed)?;

            if identities.is_empty() {
                return Err(Error::AgentNoIdentities);
            }

            let mut auth_success = false;
            for identity in identities {
                let result = handle
                    .authenticate_publickey_with(
                        username,
                        identity.clone(),
                        handle.best_supported_rsa_hash().await?.flatten(),
                        &mut agent,
                    )
                    .await;

                if let Ok(auth_result) = result {
                    if auth_result.success() {
                        auth_success = true;
                        break;
                    }
                }
            }

            if !auth_success {
                return Err(Error::AgentAuthenticationFailed);
            }
        }
    };
    Ok(())
}
