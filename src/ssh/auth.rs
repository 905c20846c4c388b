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

//! Choosing how to authenticate from command-line flags and configuration.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use super::authentication::AuthMethod;

/// Key files tried under `~/.ssh` when nothing else is configured.
const DEFAULT_KEY_NAMES: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

/// Inputs for picking an [`AuthMethod`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub key_path: Option<PathBuf>,
    pub use_agent: bool,
    pub use_password: bool,
    /// Username for prompts
    pub username: String,
    /// Host for prompts
    pub host: String,
}

impl AuthContext {
    pub fn new(username: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            key_path: None,
            use_agent: false,
            use_password: false,
            username: username.into(),
            host: host.into(),
        }
    }

    pub fn with_key_path(mut self, key_path: Option<PathBuf>) -> Self {
        self.key_path = key_path;
        self
    }

    pub fn with_agent(mut self, use_agent: bool) -> Self {
        self.use_agent = use_agent;
        self
    }

    pub fn with_password(mut self, use_password: bool) -> Self {
        self.use_password = use_password;
        self
    }

    /// Pick the authentication method.
    ///
    /// Priority:
    /// 1. Password (`--password`)
    /// 2. SSH agent (`--use-agent`, when `SSH_AUTH_SOCK` is set)
    /// 3. The configured or `--identity` key file
    /// 4. SSH agent, when `SSH_AUTH_SOCK` is set
    /// 5. Default key locations (`~/.ssh/id_ed25519`, `~/.ssh/id_ecdsa`, `~/.ssh/id_rsa`)
    pub fn determine_method(&self) -> Result<AuthMethod> {
        if self.use_password {
            return self.password_auth();
        }

        if self.use_agent {
            if let Some(auth) = agent_auth() {
                return Ok(auth);
            }
            tracing::warn!("SSH agent requested but SSH_AUTH_SOCK environment variable not set");
        }

        if let Some(key_path) = &self.key_path {
            return key_file_auth(key_path);
        }

        if let Some(auth) = agent_auth() {
            return Ok(auth);
        }

        if let Some(key_path) = default_key() {
            return key_file_auth(&key_path);
        }

        anyhow::bail!(
            "No authentication method available for {}@{}.\n\
             Use --password, start an SSH agent, or pass a key with -i/--identity",
            self.username,
            self.host
        )
    }

    fn password_auth(&self) -> Result<AuthMethod> {
        tracing::debug!("Using password authentication");
        let password = Zeroizing::new(
            rpassword::prompt_password(format!(
                "Enter password for {}@{}: ",
                self.username, self.host
            ))
            .context("Failed to read password")?,
        );
        Ok(AuthMethod::with_password(&password))
    }
}

#[cfg(not(target_os = "windows"))]
fn agent_auth() -> Option<AuthMethod> {
    std::env::var_os("SSH_AUTH_SOCK").map(|_| {
        tracing::debug!("Using SSH agent for authentication");
        AuthMethod::with_agent()
    })
}

#[cfg(target_os = "windows")]
fn agent_auth() -> Option<AuthMethod> {
    None
}

fn default_key() -> Option<PathBuf> {
    let ssh_dir = PathBuf::from(std::env::var_os("HOME")?).join(".ssh");
    DEFAULT_KEY_NAMES
        .iter()
        .map(|name| ssh_dir.join(name))
        .find(|path| path.exists())
}

fn key_file_auth(key_path: &Path) -> Result<AuthMethod> {
    tracing::debug!("Authenticating with key: {:?}", key_path);

    let key_contents = std::fs::read_to_string(key_path)
        .with_context(|| format!("Failed to read SSH key file: {key_path:?}"))?;

    let passphrase = if is_encrypted_key(&key_contents) {
        tracing::debug!("Detected encrypted SSH key, prompting for passphrase");
        Some(Zeroizing::new(
            rpassword::prompt_password(format!("Enter passphrase for key {key_path:?}: "))
                .context("Failed to read passphrase")?,
        ))
    } else {
        None
    };

    Ok(AuthMethod::with_key_file(
        key_path,
        passphrase.as_ref().map(|p| p.as_str()),
    ))
}

/// PEM keys announce encryption in a header. OpenSSH-format keys name
/// their cipher, which is `none` only for unencrypted keys.
fn is_encrypted_key(contents: &str) -> bool {
    if contents.contains("ENCRYPTED") {
        return true;
    }
    if !contents.contains("BEGIN OPENSSH PRIVATE KEY") {
        return false;
    }
    russh::keys::decode_secret_key(contents, None).is_err()
}
