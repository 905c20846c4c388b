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

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sftp-ls",
    version,
    about = "List remote directories over SFTP",
    long_about = "sftp-ls lists a remote directory over an SFTP session.\nEntries are streamed as the server returns them, one READDIR batch at a time,\nso very large directories start printing immediately and stopping early with\n--limit never transfers the rest of the listing.",
    after_help = "EXAMPLES:\n  List the login directory:      sftp-ls user@host\n  List a path on a custom port:  sftp-ls -p 2222 user@host /var/log\n  Long format via a host alias:  sftp-ls -l storage /srv/backups\n  First 20 entries only:         sftp-ls -n 20 host /data"
)]
pub struct Cli {
    #[arg(help = "Destination in [user@]hostname[:port] format, or a host alias from the config file")]
    pub destination: String,

    #[arg(
        default_value = "",
        help = "Remote directory to list\nRelative paths are resolved against the login directory; empty lists the login directory itself"
    )]
    pub path: String,

    #[arg(
        short = 'F',
        long,
        help = "Configuration file path\nConfig loading priority:\n  1. This flag's value\n  2. Current directory (./sftp-ls.yaml)\n  3. User config (~/.config/sftp-ls/config.yaml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'i',
        long,
        help = "SSH private key file path (prompts for passphrase if encrypted)"
    )]
    pub identity: Option<PathBuf>,

    #[arg(
        short = 'A',
        long,
        help = "Use SSH agent for authentication (Unix/Linux/macOS only)"
    )]
    pub use_agent: bool,

    #[arg(
        short = 'P',
        long,
        help = "Use password authentication (will prompt for password)"
    )]
    pub password: bool,

    #[arg(short = 'p', long, help = "Port to connect to on the remote host")]
    pub port: Option<u16>,

    #[arg(short = 'l', long, help = "Use a long listing format")]
    pub long: bool,

    #[arg(
        short = 'n',
        long,
        value_name = "N",
        help = "Stop after N entries without reading the rest of the directory"
    )]
    pub limit: Option<usize>,

    #[arg(short = 'a', long, help = "Do not hide the '.' and '..' entries")]
    pub all: bool,

    #[arg(
        long,
        value_parser = ["yes", "no"],
        help = "Host key checking mode (yes/no) [default: yes, or the config file's value]\n  yes - Strict checking against known_hosts\n  no  - Accept all host keys (insecure, testing only)"
    )]
    pub strict_host_key_checking: Option<String>,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}
