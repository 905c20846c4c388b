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

mod common;

use futures::{StreamExt, TryStreamExt};
use russh_sftp::protocol::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use sftp_dirstream::enumerate::{
    enumerate_directory, DirectorySession, EnumerationError, EnumerationState, MemorySession,
    SessionError,
};

use common::{drain, files, listing_with_dots, wait_for_closes};

#[tokio::test]
async fn test_entries_in_server_order() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(2)
            .with_directory("/home/user", listing_with_dots(&["b.txt", "a.txt", "c.txt"])),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/home/user"))
        .await
        .unwrap();
    let names = drain(&mut entries).await.unwrap();

    // dot entries are passed through untouched
    assert_eq!(names, vec![".", "..", "b.txt", "a.txt", "c.txt"]);
    assert_eq!(entries.state(), EnumerationState::Exhausted);
    assert_eq!(entries.yielded(), 5);
    assert_eq!(session.open_count(), 1);
    assert_eq!(session.close_count(), 1);
    assert_eq!(session.open_handles(), 0);
}

#[tokio::test]
async fn test_full_path_joins_directory_and_name() {
    let session = Arc::new(MemorySession::new().with_directory("/srv", files(&["data"])));

    let mut entries = enumerate_directory(session, Some("/srv")).await.unwrap();
    let entry = entries.next_entry().await.unwrap().unwrap();

    assert_eq!(entry.name(), "data");
    assert_eq!(entry.full_path(), "/srv/data");
    assert!(entry.is_file());
}

#[tokio::test]
async fn test_disconnected_session_fails_before_any_entry() {
    let session = Arc::new(MemorySession::new().with_directory("/tmp", files(&["a"])));
    session.disconnect();

    let err = enumerate_directory(session.clone(), Some("/tmp"))
        .await
        .unwrap_err();

    assert!(matches!(err, EnumerationError::SessionUnavailable));
    // refused locally, nothing reached the server
    assert_eq!(session.open_count(), 0);
    assert_eq!(session.close_count(), 0);
}

#[tokio::test]
async fn test_permission_denied() {
    let session = Arc::new(MemorySession::new().with_denied_directory("/root"));

    let err = enumerate_directory(session.clone(), Some("/root"))
        .await
        .unwrap_err();

    match err {
        EnumerationError::PermissionDenied { path, .. } => assert_eq!(path, "/root"),
        other => panic!("expected PermissionDenied, got {other:?}"),
    }
    assert_eq!(session.open_count(), 1);
    assert_eq!(session.close_count(), 0);
}

#[tokio::test]
async fn test_missing_directory() {
    let session = Arc::new(MemorySession::new());

    let err = enumerate_directory(session.clone(), Some("/nonexistent"))
        .await
        .unwrap_err();

    match err {
        EnumerationError::PathNotFound { path } => assert_eq!(path, "/nonexistent"),
        other => panic!("expected PathNotFound, got {other:?}"),
    }
    assert_eq!(session.open_handles(), 0);
}

#[tokio::test]
async fn test_missing_path_is_invalid_argument() {
    let session = Arc::new(MemorySession::new());
    let err = enumerate_directory(session.clone(), None).await.unwrap_err();
    assert!(matches!(
        err,
        EnumerationError::InvalidArgument { name: "path", .. }
    ));

    // the argument check comes before the liveness check
    session.disconnect();
    let err = enumerate_directory(session.clone(), None).await.unwrap_err();
    assert!(matches!(err, EnumerationError::InvalidArgument { .. }));
    assert_eq!(session.open_count(), 0);
}

#[tokio::test]
async fn test_empty_path_lists_working_directory() {
    let session = Arc::new(
        MemorySession::new()
            .with_working_directory("/home/user")
            .with_directory("/home/user", files(&[".profile", "notes.md"])),
    );

    let mut entries = enumerate_directory(session, Some("")).await.unwrap();
    assert!(entries.path().is_working_directory());

    let first = entries.next_entry().await.unwrap().unwrap();
    assert_eq!(first.name(), ".profile");
    // entries of the working directory keep relative paths
    assert_eq!(first.full_path(), ".profile");
    assert_eq!(drain(&mut entries).await.unwrap(), vec!["notes.md"]);
}

#[tokio::test]
async fn test_large_directory_is_buffered_one_batch_at_a_time() {
    const COUNT: usize = 10_000;
    const BATCH: usize = 100;

    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(BATCH)
            .with_generated_directory("/big", "file", COUNT),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/big"))
        .await
        .unwrap();
    assert_eq!(session.read_count(), 0, "open must not read ahead");

    let mut seen = 0;
    while let Some(entry) = entries.next_entry().await.unwrap() {
        assert_eq!(entry.name(), format!("file_{seen}"));
        assert!(entries.buffered() < BATCH);
        seen += 1;
    }

    assert_eq!(seen, COUNT);
    // one read per batch plus the EOF read
    assert_eq!(session.read_count(), COUNT / BATCH + 1);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_reads_happen_only_when_pulled() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(3)
            .with_generated_directory("/d", "f", 9),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    entries.next_entry().await.unwrap();
    assert_eq!(session.read_count(), 1);
    entries.next_entry().await.unwrap();
    entries.next_entry().await.unwrap();
    assert_eq!(session.read_count(), 1);
    entries.next_entry().await.unwrap();
    assert_eq!(session.read_count(), 2);
}

#[tokio::test]
async fn test_disconnect_mid_iteration() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(2)
            .with_generated_directory("/d", "f", 6),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    let first = entries.next_entry().await.unwrap().unwrap();
    let second = entries.next_entry().await.unwrap().unwrap();

    session.disconnect();
    let err = entries.next_entry().await.unwrap_err();
    assert!(matches!(err, EnumerationError::SessionUnavailable));
    assert_eq!(entries.state(), EnumerationState::Failed);

    // earlier entries remain usable
    assert_eq!(first.name(), "f_0");
    assert_eq!(second.name(), "f_1");

    // terminal: no further reads, and the close was attempted once
    assert!(entries.next_entry().await.unwrap().is_none());
    assert_eq!(session.read_count(), 1);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_disconnect_inside_a_batch_discards_buffered_entries() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(100)
            .with_generated_directory("/d", "f", 6),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    let first = entries.next_entry().await.unwrap().unwrap();
    assert_eq!(entries.buffered(), 5);

    session.disconnect();
    let err = entries.next_entry().await.unwrap_err();
    assert!(matches!(err, EnumerationError::SessionUnavailable));
    assert_eq!(entries.state(), EnumerationState::Failed);
    assert_eq!(entries.buffered(), 0);
    assert_eq!(entries.yielded(), 1);
    assert_eq!(first.name(), "f_0");

    assert!(entries.next_entry().await.unwrap().is_none());
    assert_eq!(session.read_count(), 1);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_disconnect_inside_a_batch_with_cancellable_pull() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(100)
            .with_generated_directory("/d", "f", 3),
    );
    let token = CancellationToken::new();

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    entries.next_entry_cancellable(&token).await.unwrap().unwrap();

    session.disconnect();
    let err = entries.next_entry_cancellable(&token).await.unwrap_err();
    assert!(matches!(err, EnumerationError::SessionUnavailable));
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_new_enumeration_after_reconnect() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(2)
            .with_generated_directory("/d", "f", 3),
    );

    session.disconnect();
    let err = enumerate_directory(session.clone(), Some("/d"))
        .await
        .unwrap_err();
    assert!(matches!(err, EnumerationError::SessionUnavailable));

    session.reconnect();
    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    assert_eq!(drain(&mut entries).await.unwrap(), vec!["f_0", "f_1", "f_2"]);
    assert_eq!(session.open_count(), 1);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_connection_lost_status_is_session_unavailable() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(1)
            .with_generated_directory("/d", "f", 3),
    );
    session.fail_read(
        2,
        SessionError::status(StatusCode::ConnectionLost, "connection lost"),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_some());
    let err = entries.next_entry().await.unwrap_err();
    assert!(matches!(err, EnumerationError::SessionUnavailable));
}

#[tokio::test]
async fn test_read_failure_is_protocol_error() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(1)
            .with_generated_directory("/d", "f", 3),
    );
    session.fail_read(
        1,
        SessionError::UnexpectedResponse("SSH_FXP_DATA".to_string()),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    let err = entries.next_entry().await.unwrap_err();

    match err {
        EnumerationError::Protocol(message) => assert!(message.contains("SSH_FXP_DATA")),
        other => panic!("expected Protocol, got {other:?}"),
    }
    assert_eq!(session.close_count(), 1);
    assert_eq!(session.open_handles(), 0);
}

#[tokio::test]
async fn test_empty_batches_are_skipped() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(2)
            .with_empty_batches()
            .with_directory("/d", files(&["a", "b", "c"])),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    assert_eq!(drain(&mut entries).await.unwrap(), vec!["a", "b", "c"]);
    // empty, [a b], empty, [c], EOF
    assert_eq!(session.read_count(), 5);
}

#[tokio::test]
async fn test_empty_directory() {
    let session = Arc::new(MemorySession::new().with_directory("/empty", Vec::new()));

    let mut entries = enumerate_directory(session.clone(), Some("/empty"))
        .await
        .unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
    assert_eq!(entries.state(), EnumerationState::Exhausted);
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_exactly_one_close_on_completion() {
    let session = Arc::new(MemorySession::new().with_generated_directory("/d", "f", 5));

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    drain(&mut entries).await.unwrap();
    entries.close().await;
    assert!(entries.next_entry().await.unwrap().is_none());
    drop(entries);
    tokio::task::yield_now().await;

    assert_eq!(session.close_count(), 1);
    assert_eq!(session.failed_close_count(), 0);
}

#[tokio::test]
async fn test_exactly_one_close_on_abandonment() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(10)
            .with_generated_directory("/d", "f", 100),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    entries.next_entry().await.unwrap();
    drop(entries);

    wait_for_closes(&session, 1).await;
    assert_eq!(session.close_count(), 1);
    assert_eq!(session.open_handles(), 0);
}

#[tokio::test]
async fn test_abandon_before_first_pull() {
    let session = Arc::new(MemorySession::new().with_generated_directory("/d", "f", 3));

    let entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    drop(entries);

    wait_for_closes(&session, 1).await;
    assert_eq!(session.read_count(), 0);
    assert_eq!(session.open_handles(), 0);
}

#[tokio::test]
async fn test_exactly_one_close_on_failure() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(1)
            .with_generated_directory("/d", "f", 3),
    );
    session.fail_read(2, SessionError::Timeout);

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    entries.next_entry().await.unwrap();
    assert!(entries.next_entry().await.is_err());
    entries.close().await;
    drop(entries);
    tokio::task::yield_now().await;

    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_explicit_close_stops_enumeration() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(2)
            .with_generated_directory("/d", "f", 10),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    entries.next_entry().await.unwrap();
    entries.close().await;

    assert_eq!(entries.state(), EnumerationState::Closed);
    assert_eq!(entries.buffered(), 0);
    // buffered entries are discarded along with the handle
    assert!(entries.next_entry().await.unwrap().is_none());
    assert_eq!(session.read_count(), 1);
    assert_eq!(session.close_count(), 1);
    assert_eq!(session.open_handles(), 0);
}

#[tokio::test]
async fn test_cancel_pending_read() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(1)
            .with_generated_directory("/d", "f", 3),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    let token = CancellationToken::new();
    assert!(entries
        .next_entry_cancellable(&token)
        .await
        .unwrap()
        .is_some());

    session.stall_reads(true);
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = entries.next_entry_cancellable(&token).await.unwrap_err();
    assert!(matches!(err, EnumerationError::Cancelled));
    assert_eq!(entries.state(), EnumerationState::Failed);
    assert_eq!(session.close_count(), 1);
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancelled_token_still_returns_buffered_entries() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(3)
            .with_generated_directory("/d", "f", 3),
    );

    let mut entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    let token = CancellationToken::new();
    entries.next_entry_cancellable(&token).await.unwrap();

    token.cancel();
    let buffered = entries.next_entry_cancellable(&token).await.unwrap().unwrap();
    assert_eq!(buffered.name(), "f_1");
}

#[tokio::test]
async fn test_into_stream() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(4)
            .with_generated_directory("/d", "f", 10),
    );

    let entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    let names: Vec<String> = entries
        .into_stream()
        .map_ok(|entry| entry.name().to_string())
        .try_collect()
        .await
        .unwrap();

    assert_eq!(names.len(), 10);
    assert_eq!(names[9], "f_9");
    assert_eq!(session.close_count(), 1);
}

#[tokio::test]
async fn test_stream_take_releases_handle() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(4)
            .with_generated_directory("/d", "f", 100),
    );

    let entries = enumerate_directory(session.clone(), Some("/d")).await.unwrap();
    let firsts: Vec<_> = entries.into_stream().take(3).collect().await;
    assert_eq!(firsts.len(), 3);

    wait_for_closes(&session, 1).await;
    assert_eq!(session.open_handles(), 0);
}

#[tokio::test]
async fn test_works_through_trait_object() {
    let session: Arc<dyn DirectorySession> =
        Arc::new(MemorySession::new().with_directory("/d", files(&["x", "y"])));

    let mut entries = enumerate_directory(session, Some("/d")).await.unwrap();
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        names.push(entry.name().to_string());
    }
    assert_eq!(names, vec!["x", "y"]);
}

#[tokio::test]
async fn test_concurrent_enumerations_are_independent() {
    let session = Arc::new(
        MemorySession::new()
            .with_batch_size(2)
            .with_generated_directory("/a", "a", 5)
            .with_generated_directory("/b", "b", 3),
    );

    let mut first = enumerate_directory(session.clone(), Some("/a")).await.unwrap();
    let mut second = enumerate_directory(session.clone(), Some("/b")).await.unwrap();
    assert_eq!(session.open_handles(), 2);

    let (a, b) = tokio::join!(drain(&mut first), drain(&mut second));
    assert_eq!(a.unwrap().len(), 5);
    assert_eq!(b.unwrap().len(), 3);
    assert_eq!(session.close_count(), 2);
    assert_eq!(session.open_handles(), 0);
}
