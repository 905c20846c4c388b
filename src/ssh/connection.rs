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

//! SSH connection establishment.
//!
//! Resolves the target, connects to each resolved address in turn, verifies
//! the server key and authenticates on the first transport that comes up.

use russh::client::{Config, Handle, Handler};
use russh_sftp::client::RawSftpSession;
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::authentication::{AuthMethod, ServerCheckMethod};
use super::Error;

/// An authenticated SSH connection.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use sftp_dirstream::ssh::{AuthMethod, Client, ServerCheckMethod};
///
/// # async fn example() -> Result<(), sftp_dirstream::ssh::Error> {
/// let client = Client::connect(
///     "10.10.10.2",
///     22,
///     "root",
///     AuthMethod::with_password("root"),
///     ServerCheckMethod::NoCheck,
///     Duration::from_secs(30),
/// )
/// .await?;
/// let sftp = client.open_sftp().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    connection_handle: Arc<Handle<ClientHandler>>,
    username: String,
    address: SocketAddr,
}

impl Client {
    /// Open an SSH connection to `host:port` and authenticate as `username`.
    ///
    /// Resolution, the TCP connect and the key exchange together must finish
    /// within `connect_timeout`.
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        auth: AuthMethod,
        server_check: ServerCheckMethod,
        connect_timeout: Duration,
    ) -> Result<Self, Error> {
        let config = Arc::new(Config {
            inactivity_timeout: None,
            ..Config::default()
        });

        let (address, mut handle) = tokio::time::timeout(
            connect_timeout,
            Self::establish(config, host, port, server_check),
        )
        .await
        .map_err(|_| Error::ConnectTimeout(connect_timeout))??;

        tracing::debug!(
            host = %host,
            address = %address,
            method = auth.label(),
            "Authenticating"
        );
        super::authentication::authenticate(&mut handle, username, auth).await?;

        Ok(Self {
            connection_handle: Arc::new(handle),
            username: username.to_string(),
            address,
        })
    }

    async fn establish(
        config: Arc<Config>,
        host: &str,
        port: u16,
        server_check: ServerCheckMethod,
    ) -> Result<(SocketAddr, Handle<ClientHandler>), Error> {
        let socket_addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(Error::AddressInvalid)?;

        let mut connect_res = Err(Error::AddressInvalid(io::Error::new(
            io::ErrorKind::InvalidInput,
            "could not resolve to any addresses",
        )));
        for socket_addr in socket_addrs {
            let handler = ClientHandler::new(host.to_string(), socket_addr, server_check.clone());
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(h) => {
                    connect_res = Ok((socket_addr, h));
                    break;
                }
                Err(e) => {
                    tracing::debug!(address = %socket_addr, error = %e, "Connection attempt failed");
                    connect_res = Err(e);
                }
            }
        }
        connect_res
    }

    /// Start the `sftp` subsystem on a new channel.
    pub async fn open_sftp(&self) -> Result<RawSftpSession, Error> {
        let channel = self.connection_handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = RawSftpSession::new(channel.into_stream());
        let version = sftp.init().await?;
        tracing::debug!(version = version.version, "SFTP subsystem ready");
        Ok(sftp)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn address(&self) -> &SocketAddr {
        &self.address
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), Error> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(Error::SshError)
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.connection_handle.is_closed()
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// Verifies the server key during the handshake.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    host: SocketAddr,
    server_check: ServerCheckMethod,
}

impl ClientHandler {
    pub fn new(hostname: String, host: SocketAddr, server_check: ServerCheckMethod) -> Self {
        Self {
            hostname,
            host,
            server_check,
        }
    }
}

impl Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let accepted = match &self.server_check {
            ServerCheckMethod::NoCheck => true,
            ServerCheckMethod::KnownHostsFile(known_hosts_path) => {
                russh::keys::check_known_hosts_path(
                    &self.hostname,
                    self.host.port(),
                    server_public_key,
                    known_hosts_path,
                )
                .map_err(|_| Error::ServerCheckFailed)?
            }
            ServerCheckMethod::DefaultKnownHostsFile => russh::keys::check_known_hosts(
                &self.hostname,
                self.host.port(),
                server_public_key,
            )
            .map_err(|_| Error::ServerCheckFailed)?,
        };

        if !accepted {
            tracing::warn!(host = %self.hostname, "Server host key is not in known_hosts");
        }
        Ok(accepted)
    }
}
