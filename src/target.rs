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

use anyhow::{bail, Context, Result};
use std::fmt;

/// A destination as written on the command line.
///
/// Only the parts that were actually given are set; the rest are filled in
/// from configuration when the target is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl RemoteTarget {
    pub fn parse(target: &str) -> Result<Self> {
        // Parse formats:
        // - host
        // - host:port
        // - user@host
        // - user@host:port
        // - [ipv6]:port

        let (user_part, host_part) = match target.rfind('@') {
            Some(at_pos) => (Some(&target[..at_pos]), &target[at_pos + 1..]),
            None => (None, target),
        };

        if user_part.is_some_and(str::is_empty) {
            bail!("Empty user name in destination '{target}'");
        }

        let (host, port) = if let Some(rest) = host_part.strip_prefix('[') {
            let close = rest
                .find(']')
                .with_context(|| format!("Unterminated '[' in destination '{target}'"))?;
            let host = &rest[..close];
            let port = match rest[close + 1..].strip_prefix(':') {
                Some(port_str) => Some(parse_port(port_str)?),
                None => None,
            };
            (host, port)
        } else if host_part.matches(':').count() == 1 {
            let colon_pos = host_part.rfind(':').unwrap_or(host_part.len());
            let port = parse_port(&host_part[colon_pos + 1..])?;
            (&host_part[..colon_pos], Some(port))
        } else {
            // Bare IPv6 addresses carry more than one colon and no port
            (host_part, None)
        };

        if host.is_empty() {
            bail!("Missing host in destination '{target}'");
        }

        Ok(Self {
            user: user_part.map(str::to_string),
            host: host.to_string(),
            port,
        })
    }
}

fn parse_port(port_str: &str) -> Result<u16> {
    port_str
        .parse::<u16>()
        .with_context(|| format!("Invalid port number '{port_str}'"))
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            write!(f, "{}", self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
