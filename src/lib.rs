//! Lazy, batch-at-a-time listing of remote directories over SFTP.
//!
//! [`enumerate`] holds the protocol-independent core: the handle manager and
//! the pull-based enumerator. [`ssh`] runs it over a real SSH connection.

pub mod cli;
pub mod config;
pub mod enumerate;
pub mod ssh;
pub mod target;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use enumerate::{enumerate_directory, DirEntry, DirectoryEnumerator, EnumerationError};
pub use ssh::SftpDirectorySession;
pub use target::RemoteTarget;
