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

//! Destination resolution against the loaded configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{Config, HostConfig, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
use super::utils::{expand_tilde, get_current_username};
use crate::target::RemoteTarget;

/// Everything needed to open a session to one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub ssh_key: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub strict_host_key_checking: String,
}

impl Config {
    /// Look up a named host entry.
    pub fn host(&self, alias: &str) -> Option<&HostConfig> {
        self.hosts.get(alias)
    }

    /// Fill in what `target` leaves unspecified.
    ///
    /// The target's own user and port win over a matching host entry, which
    /// wins over `defaults`, which wins over the built-in values.
    pub fn resolve(&self, target: &RemoteTarget) -> ConnectionSettings {
        let entry = self.host(&target.host);
        if entry.is_some() {
            tracing::debug!(alias = %target.host, "Using host entry from configuration");
        }

        let host = entry
            .map(|e| e.host.clone())
            .unwrap_or_else(|| target.host.clone());
        let user = target
            .user
            .clone()
            .or_else(|| entry.and_then(|e| e.user.clone()))
            .or_else(|| self.defaults.user.clone())
            .unwrap_or_else(get_current_username);
        let port = target
            .port
            .or_else(|| entry.and_then(|e| e.port))
            .or(self.defaults.port)
            .unwrap_or(DEFAULT_PORT);
        let ssh_key = entry
            .and_then(|e| e.ssh_key.as_deref())
            .or(self.defaults.ssh_key.as_deref())
            .map(|key| expand_tilde(Path::new(key)));

        ConnectionSettings {
            host,
            port,
            user,
            ssh_key,
            connect_timeout: Duration::from_secs(
                self.defaults.connect_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            request_timeout: Duration::from_secs(
                self.defaults.request_timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            strict_host_key_checking: self
                .defaults
                .strict_host_key_checking
                .clone()
                .unwrap_or_else(|| "yes".to_string()),
        }
    }
}
