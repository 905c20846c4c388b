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

use std::fmt;

use super::error::{EnumerationError, Result};

/// A validated remote directory path.
///
/// Remote paths are plain `/`-separated strings interpreted by the server,
/// so no local [`Path`](std::path::Path) semantics apply. The empty path
/// stands for the session's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath(String);

impl RemotePath {
    /// Validate a caller-supplied path.
    ///
    /// `None` and paths containing NUL bytes are rejected with
    /// [`EnumerationError::InvalidArgument`].
    pub fn new(path: Option<&str>) -> Result<Self> {
        let path = path.ok_or_else(|| {
            EnumerationError::invalid_argument("path", "a directory path is required")
        })?;

        if path.contains('\0') {
            return Err(EnumerationError::invalid_argument(
                "path",
                "path contains a NUL byte",
            ));
        }

        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this path denotes the working directory.
    pub fn is_working_directory(&self) -> bool {
        self.0.is_empty()
    }

    /// Join an entry name onto this path.
    pub fn join(&self, name: &str) -> String {
        join_remote(&self.0, name)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Join two remote path fragments with exactly one `/` between them.
///
/// An empty base yields `name` unchanged, so entries of the working
/// directory stay relative.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}
