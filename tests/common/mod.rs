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

//! Shared helpers for enumeration integration tests.

#![allow(dead_code)]

use sftp_dirstream::enumerate::memory::{dir_attributes, file_attributes};
use sftp_dirstream::enumerate::{DirEntry, DirectoryEnumerator, MemorySession, Result};

/// Regular files with the given names, in order.
pub fn files(names: &[&str]) -> Vec<DirEntry> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| DirEntry::new(*name, "", file_attributes(i as u64)))
        .collect()
}

/// A listing the way most servers send it: `.` and `..` first.
pub fn listing_with_dots(names: &[&str]) -> Vec<DirEntry> {
    let mut entries = vec![
        DirEntry::new(".", "", dir_attributes()),
        DirEntry::new("..", "", dir_attributes()),
    ];
    entries.extend(files(names));
    entries
}

/// Pull every remaining entry name.
pub async fn drain(enumerator: &mut DirectoryEnumerator<MemorySession>) -> Result<Vec<String>> {
    let mut names = Vec::new();
    while let Some(entry) = enumerator.next_entry().await? {
        names.push(entry.name().to_string());
    }
    Ok(names)
}

/// Let tasks spawned by dropped handles run until `session` has seen
/// `expected` close requests.
pub async fn wait_for_closes(session: &MemorySession, expected: usize) {
    for _ in 0..100 {
        if session.close_count() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "expected {expected} close requests, saw {}",
        session.close_count()
    );
}
