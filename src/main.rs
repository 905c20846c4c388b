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

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use sftp_dirstream::{
    cli::Cli,
    config::{Config, ConnectionSettings},
    enumerate::{
        enumerate_directory, DirEntry, DirectoryEnumerator, DirectorySession, EnumerationError,
    },
    ssh::{AuthContext, Client, ServerCheckMethod, SftpDirectorySession},
    target::RemoteTarget,
    utils::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_with_priority(cli.config.as_deref()).await?;
    let target = RemoteTarget::parse(&cli.destination)
        .with_context(|| format!("Invalid destination '{}'", cli.destination))?;
    let settings = apply_overrides(config.resolve(&target), &cli);

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        user = %settings.user,
        "Connecting"
    );

    let auth = AuthContext::new(settings.user.clone(), settings.host.clone())
        .with_key_path(settings.ssh_key.clone())
        .with_agent(cli.use_agent)
        .with_password(cli.password)
        .determine_method()?;

    let client = Client::connect(
        &settings.host,
        settings.port,
        &settings.user,
        auth,
        ServerCheckMethod::from_strict_checking(&settings.strict_host_key_checking),
        settings.connect_timeout,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to connect to {}@{}:{}",
            settings.user, settings.host, settings.port
        )
    })?;

    let session = Arc::new(
        SftpDirectorySession::connect(client, settings.request_timeout)
            .await
            .context("Failed to start the SFTP subsystem")?,
    );

    let result = list_directory(Arc::clone(&session), &cli).await;

    if let Err(e) = session.disconnect().await {
        tracing::debug!(error = %e, "Disconnect failed");
    }
    result
}

/// Command-line flags win over configuration.
fn apply_overrides(mut settings: ConnectionSettings, cli: &Cli) -> ConnectionSettings {
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(identity) = &cli.identity {
        settings.ssh_key = Some(identity.clone());
    }
    if let Some(mode) = &cli.strict_host_key_checking {
        settings.strict_host_key_checking = mode.clone();
    }
    settings
}

async fn list_directory(session: Arc<SftpDirectorySession>, cli: &Cli) -> Result<()> {
    let entries = enumerate_directory(session, Some(cli.path.as_str()))
        .await
        .with_context(|| format!("Cannot list '{}'", display_path(&cli.path)))?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = write_listing(entries, cli, &cancel, &mut io::stdout().lock()).await;
    io::stdout().flush().ok();
    result
}

/// Print entries as they are pulled. The enumeration is closed on every
/// exit path, including an early stop at `--limit`.
async fn write_listing<S, W>(
    mut entries: DirectoryEnumerator<S>,
    cli: &Cli,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()>
where
    S: DirectorySession + ?Sized + 'static,
    W: Write,
{
    let limit = cli.limit.unwrap_or(usize::MAX);
    let mut printed = 0usize;

    while printed < limit {
        let entry = match entries.next_entry_cancellable(cancel).await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e @ EnumerationError::Cancelled) => {
                tracing::info!(yielded = entries.yielded(), "Listing interrupted");
                entries.close().await;
                return Err(e).context("Listing interrupted");
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Listing '{}' failed", display_path(&cli.path)))
            }
        };

        if !cli.all && entry.is_dot_entry() {
            continue;
        }

        if let Err(e) = writeln!(out, "{}", format_entry(&entry, cli.long)) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                break;
            }
            entries.close().await;
            return Err(e).context("Failed to write listing");
        }
        printed += 1;
    }

    entries.close().await;
    Ok(())
}

fn format_entry(entry: &DirEntry, long: bool) -> String {
    if long {
        entry.display_longname()
    } else {
        entry.name().to_string()
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}
