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

//! Directory entries and the batches they arrive in.

use chrono::{DateTime, Utc};
use russh_sftp::protocol::FileAttributes;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// One item of a remote directory listing.
///
/// Entries are produced by the session and stamped with their full path by
/// the enumerator before they are handed out; after that they never change.
#[derive(Debug, Clone)]
pub struct DirEntry {
    name: String,
    full_path: String,
    longname: String,
    attrs: FileAttributes,
}

impl DirEntry {
    /// Create an entry as listed by the server.
    ///
    /// `longname` is the `ls -l` style line from `SSH_FXP_NAME`; pass an empty
    /// string when the server did not provide one.
    pub fn new(name: impl Into<String>, longname: impl Into<String>, attrs: FileAttributes) -> Self {
        let name = name.into();
        Self {
            full_path: name.clone(),
            name,
            longname: longname.into(),
            attrs,
        }
    }

    pub(crate) fn with_full_path(mut self, full_path: String) -> Self {
        self.full_path = full_path;
        self
    }

    /// File name relative to the enumerated directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enumerated path joined with [`name`](Self::name).
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// Long name as sent by the server (may be empty).
    pub fn longname(&self) -> &str {
        &self.longname
    }

    pub fn attributes(&self) -> &FileAttributes {
        &self.attrs
    }

    fn file_type_bits(&self) -> Option<u32> {
        self.attrs.permissions.map(|mode| mode & S_IFMT)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type_bits() == Some(S_IFDIR)
    }

    pub fn is_file(&self) -> bool {
        self.file_type_bits() == Some(S_IFREG)
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type_bits() == Some(S_IFLNK)
    }

    /// `.` or `..`.
    pub fn is_dot_entry(&self) -> bool {
        self.name == "." || self.name == ".."
    }

    pub fn size(&self) -> Option<u64> {
        self.attrs.size
    }

    /// Modification time, if the server reported one.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.attrs
            .mtime
            .and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
    }

    /// The server's long name, or one built from the attributes when the
    /// server left it empty.
    pub fn display_longname(&self) -> String {
        if self.longname.is_empty() {
            format_longname(&self.name, &self.attrs)
        } else {
            self.longname.clone()
        }
    }
}

/// Build an `ls -l` style line for an entry.
pub fn format_longname(filename: &str, attrs: &FileAttributes) -> String {
    let perms = attrs.permissions.unwrap_or(0);

    let file_type = match perms & S_IFMT {
        S_IFLNK => 'l',
        S_IFDIR => 'd',
        _ => '-',
    };

    let perm_str: String = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ]
    .iter()
    .map(|&(bit, c)| if perms & bit != 0 { c } else { '-' })
    .collect();

    let size = attrs.size.unwrap_or(0);
    let uid = attrs.uid.unwrap_or(0);
    let gid = attrs.gid.unwrap_or(0);
    let mtime = attrs
        .mtime
        .and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
        .map(|t| t.format("%b %e %H:%M").to_string())
        .unwrap_or_else(|| "Jan  1 00:00".to_string());

    format!("{file_type}{perm_str}  1 {uid:5} {gid:5} {size:10} {mtime} {filename}")
}

/// Entries returned by one `read_directory` round trip.
///
/// `exhausted` is the only end-of-listing signal; an empty batch with
/// `exhausted == false` means "nothing this time, ask again".
#[derive(Debug, Clone, Default)]
pub struct EntryBatch {
    pub entries: Vec<DirEntry>,
    pub exhausted: bool,
}

impl EntryBatch {
    /// A batch that leaves the listing open.
    pub fn more(entries: Vec<DirEntry>) -> Self {
        Self {
            entries,
            exhausted: false,
        }
    }

    /// A batch that ends the listing, possibly carrying its last entries.
    pub fn last(entries: Vec<DirEntry>) -> Self {
        Self {
            entries,
            exhausted: true,
        }
    }

    /// The empty terminal batch (`SSH_FX_EOF`).
    pub fn exhausted() -> Self {
        Self::last(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
