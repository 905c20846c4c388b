//! SSH transport and SFTP adapter for directory enumeration.
//!
//! [`Client`] establishes and authenticates the SSH connection, and
//! [`SftpDirectorySession`] runs the `sftp` subsystem on top of it as a
//! [`DirectorySession`](crate::enumerate::DirectorySession).
//!
//! # Features
//! * Password, private key and SSH agent authentication
//! * known_hosts verification
//! * Per-request timeouts on the SFTP channel

pub mod auth;
pub mod authentication;
pub mod connection;
pub mod error;
pub mod sftp;

pub use auth::AuthContext;
pub use authentication::{AuthMethod, ServerCheckMethod};
pub use connection::{Client, ClientHandler};
pub use error::Error;
pub use sftp::{map_sftp_error, SftpDirectorySession};
