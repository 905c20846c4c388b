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

//! Configuration loading and priority management.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::Config;
use super::utils::expand_tilde;

/// Config file looked up in the current directory.
const LOCAL_CONFIG_FILE: &str = "sftp-ls.yaml";

impl Config {
    /// Load configuration from a file.
    ///
    /// A missing file yields the default configuration.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        if !expanded_path.exists() {
            tracing::debug!(
                "Config file not found at {:?}, using defaults",
                expanded_path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| format!("Failed to read configuration file at {}. Please check file permissions and ensure the file is accessible.", expanded_path.display()))?;

        let config: Config = serde_yaml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse YAML configuration file at {}. Please check the YAML syntax is valid.",
                expanded_path.display()
            )
        })?;

        Ok(config)
    }

    /// Load configuration with priority order:
    /// 1. Explicit --config path (if it exists)
    /// 2. `sftp-ls.yaml` in the current directory
    /// 3. XDG config directory ($XDG_CONFIG_HOME/sftp-ls/config.yaml or ~/.config/sftp-ls/config.yaml)
    /// 4. Built-in defaults
    pub async fn load_with_priority(cli_config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_config_path {
            let expanded = expand_tilde(path);
            if expanded.exists() {
                tracing::debug!("Using explicitly specified config file: {:?}", expanded);
                return Self::load(&expanded).await;
            }
            tracing::debug!(
                "Custom config file not found, continuing with other sources: {:?}",
                expanded
            );
        }

        for candidate in Self::standard_locations() {
            if candidate.exists() {
                tracing::debug!("Found config at {:?}", candidate);
                return Self::load(&candidate).await;
            }
        }

        tracing::debug!("No config file found, using default configuration");
        Ok(Self::default())
    }

    /// Candidate config files after an explicit path, highest priority first.
    fn standard_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::xdg_config_path() {
            locations.push(path);
        }
        locations
    }

    /// Path of the per-user config file.
    pub fn xdg_config_path() -> Option<PathBuf> {
        if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
            return Some(
                PathBuf::from(xdg_config_home)
                    .join("sftp-ls")
                    .join("config.yaml"),
            );
        }
        ProjectDirs::from("", "", "sftp-ls").map(|dirs| dirs.config_dir().join("config.yaml"))
    }
}
