// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Failures: per-record errors, aborted passes and recovery.

use davsync_core::{
    DefaultPolicy, ErrorKind, Identity, MemoryStateStore, Reconciler, SyncError, SyncOptions,
    SyncState, run_sync,
};

use crate::common::{MemoryLocal, MemoryRemote, vcard};

fn reconciler() -> Reconciler {
    Reconciler::new(SyncOptions::default(), DefaultPolicy)
}

#[tokio::test]
async fn failed_fetch_is_retried_by_next_pass() {
    // Arrange
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let alice = remote.put("alice", vcard("alice"));
    let bob = remote.put("bob", vcard("bob"));
    remote.fail_fetch(&bob, true);
    let store = MemoryStateStore::default();

    // Act
    let result = reconciler().run(&local, &remote, &store).await.unwrap();

    // Assert
    assert_eq!(result.local.inserted, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].identity, Identity::Remote(bob.clone()));
    assert_eq!(result.errors[0].kind, ErrorKind::Transport);

    let state = store.snapshot().await;
    assert!(state.entries.contains_key(&alice));
    assert!(!state.entries.contains_key(&bob));
    assert_eq!(state.last_collection_tag, None, "tag must not advance");

    // Once the server recovers, the next pass lists again and catches up
    remote.fail_fetch(&bob, false);
    let result = reconciler().run(&local, &remote, &store).await.unwrap();
    assert!(!result.fast_path);
    assert!(result.is_clean());
    assert_eq!(result.local.inserted, 1);
    assert_eq!(local.live().len(), 2);
    assert!(store.snapshot().await.last_collection_tag.is_some());
}

#[tokio::test]
async fn failed_push_keeps_record_dirty() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let alice = remote.put("alice", vcard("alice"));
    let store = MemoryStateStore::default();
    reconciler().run(&local, &remote, &store).await.unwrap();
    let id = local.by_href(&alice).unwrap().local_id;
    let etag_before = store.snapshot().await.entries[&alice].clone();

    local.edit(id, vcard("alice-2"));
    remote.fail_push(&alice, true);
    let result = reconciler().run(&local, &remote, &store).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].identity, Identity::Remote(alice.clone()));
    assert!(local.get(id).unwrap().dirty);
    assert_eq!(store.snapshot().await.entries[&alice], etag_before);

    remote.fail_push(&alice, false);
    let result = reconciler().run(&local, &remote, &store).await.unwrap();
    assert!(result.is_clean());
    assert_eq!(result.remote.updated, 1);
    assert_eq!(remote.get(&alice).unwrap().1, vcard("alice-2"));
}

#[tokio::test]
async fn listing_failure_aborts_without_touching_state() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    remote.put("alice", vcard("alice"));
    remote.fail_listing(true);
    let store = MemoryStateStore::default();

    let err = reconciler().run(&local, &remote, &store).await.unwrap_err();

    assert!(matches!(err, SyncError::Transport(_)));
    assert!(store.snapshot().await.is_empty());
    assert_eq!(local.len(), 0);
}

#[tokio::test]
async fn local_write_failure_aborts_and_next_pass_redoes_work() {
    // Arrange
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    remote.put("alice", vcard("alice"));
    remote.put("bob", vcard("bob"));
    let mut state = SyncState::default();
    local.fail_writes(true);

    // Act
    let err = run_sync(
        &local,
        &remote,
        &mut state,
        &DefaultPolicy,
        &SyncOptions::default(),
    )
    .await
    .unwrap_err();

    // Assert
    assert_eq!(err.kind(), ErrorKind::StoreWrite);
    assert_eq!(state, SyncState::default());

    local.fail_writes(false);
    let result = run_sync(
        &local,
        &remote,
        &mut state,
        &DefaultPolicy,
        &SyncOptions::default(),
    )
    .await
    .unwrap();
    assert!(result.is_clean());
    assert_eq!(local.live().len(), 2);
    assert_eq!(state.entries.len(), 2);
}

#[tokio::test]
async fn interrupted_pass_converges_without_duplicates() {
    // A pass that crashed after writing some records locally but before the
    // state was saved leaves records the state does not know about
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    remote.put("alice", vcard("alice"));
    remote.put("bob", vcard("bob"));
    let mut lost = SyncState::default();
    run_sync(&local, &remote, &mut lost, &DefaultPolicy, &SyncOptions::default())
        .await
        .unwrap();

    let store = MemoryStateStore::default();
    let result = reconciler().run(&local, &remote, &store).await.unwrap();

    assert!(result.is_clean());
    assert_eq!(result.local.inserted, 0);
    assert_eq!(local.live().len(), 2);
    assert_eq!(store.snapshot().await.entries.len(), 2);

    let result = reconciler().run(&local, &remote, &store).await.unwrap();
    assert!(result.fast_path);
}
