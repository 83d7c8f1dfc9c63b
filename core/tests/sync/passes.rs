// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Passes without conflicts: pulling, pushing and the fast path.

use davsync_core::{
    ChangeCounts, CollectionTag, DefaultPolicy, LocalCollection, MemoryStateStore, Reconciler,
    SyncOptions, SyncState,
};

use crate::common::{MemoryLocal, MemoryRemote, member, options, vcard};

fn reconciler() -> Reconciler {
    Reconciler::new(SyncOptions::default(), DefaultPolicy)
}

#[tokio::test]
async fn first_pass_pulls_every_remote_record() {
    // Arrange
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let alice = remote.put("alice", vcard("alice"));
    let bob = remote.put("bob", vcard("bob"));
    let store = MemoryStateStore::default();

    // Act
    let result = reconciler().run(&local, &remote, &store).await.unwrap();

    // Assert
    assert!(result.is_clean());
    assert!(!result.fast_path);
    assert_eq!(
        result.local,
        ChangeCounts {
            inserted: 2,
            updated: 0,
            deleted: 0
        }
    );
    assert_eq!(result.remote.total(), 0);

    let record = local.by_href(&alice).unwrap();
    assert_eq!(record.body, vcard("alice"));
    assert!(!record.dirty);
    assert_eq!(local.by_href(&bob).unwrap().body, vcard("bob"));

    let state = store.snapshot().await;
    assert_eq!(state.entries.len(), 2);
    assert_eq!(state.entries[&alice], remote.get(&alice).unwrap().0);
    assert_eq!(state.last_collection_tag, Some(CollectionTag::ctag("2")));
}

#[tokio::test]
async fn second_pass_takes_fast_path_and_changes_nothing() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    remote.put("alice", vcard("alice"));
    let store = MemoryStateStore::default();
    let reconciler = reconciler();
    reconciler.run(&local, &remote, &store).await.unwrap();
    let state_before = store.snapshot().await;
    let calls_before = remote.calls();

    let result = reconciler.run(&local, &remote, &store).await.unwrap();

    assert!(result.fast_path);
    assert!(result.is_clean());
    assert_eq!(result.local.total() + result.remote.total(), 0);
    assert_eq!(store.snapshot().await, state_before);

    let calls = remote.calls();
    assert_eq!(calls.listing, calls_before.listing, "listing must be skipped");
    assert_eq!(calls.fetch_batches, calls_before.fetch_batches);
    assert_eq!(calls.tag, calls_before.tag + 1);
}

#[tokio::test]
async fn local_changes_are_pushed() {
    // Arrange
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let alice = remote.put("alice", vcard("alice"));
    let bob = remote.put("bob", vcard("bob"));
    let store = MemoryStateStore::default();
    let reconciler = reconciler();
    reconciler.run(&local, &remote, &store).await.unwrap();

    let carol = local.create(vcard("carol"));
    let alice_id = local.by_href(&alice).unwrap().local_id;
    local.edit(alice_id, vcard("alice-2"));
    let bob_id = local.by_href(&bob).unwrap().local_id;
    local.remove(bob_id);

    // Act
    let result = reconciler.run(&local, &remote, &store).await.unwrap();

    // Assert
    assert!(result.is_clean());
    assert!(result.fast_path);
    assert_eq!(
        result.remote,
        ChangeCounts {
            inserted: 1,
            updated: 1,
            deleted: 1
        }
    );

    let carol = local.get(carol).unwrap();
    let carol_href = carol.href.clone().unwrap();
    assert!(!carol.dirty);
    assert_eq!(remote.get(&carol_href).unwrap().1, vcard("carol"));
    assert_eq!(carol.etag, Some(remote.get(&carol_href).unwrap().0));

    assert_eq!(remote.get(&alice).unwrap().1, vcard("alice-2"));
    assert!(!local.get(alice_id).unwrap().dirty);

    assert!(remote.get(&bob).is_none());
    assert!(local.get(bob_id).is_none(), "tombstone is purged");

    let state = store.snapshot().await;
    assert_eq!(state.entries.len(), 2);
    assert_eq!(state.entries[&alice], remote.get(&alice).unwrap().0);
    assert!(state.entries.contains_key(&carol_href));
    assert!(local.list_dirty().await.unwrap().is_empty());
}

#[tokio::test]
async fn remote_changes_are_pulled() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let alice = remote.put("alice", vcard("alice"));
    let bob = remote.put("bob", vcard("bob"));
    let store = MemoryStateStore::default();
    let reconciler = reconciler();
    reconciler.run(&local, &remote, &store).await.unwrap();
    let bob_id = local.by_href(&bob).unwrap().local_id;

    remote.put("alice", vcard("alice-2"));
    remote.remove(&bob);
    let dave = remote.put("dave", vcard("dave"));

    let result = reconciler.run(&local, &remote, &store).await.unwrap();

    assert!(result.is_clean());
    assert_eq!(
        result.local,
        ChangeCounts {
            inserted: 1,
            updated: 1,
            deleted: 1
        }
    );
    assert_eq!(local.by_href(&alice).unwrap().body, vcard("alice-2"));
    assert!(local.get(bob_id).is_none());
    assert_eq!(local.by_href(&dave).unwrap().body, vcard("dave"));

    let state = store.snapshot().await;
    let hrefs: Vec<_> = state.entries.keys().cloned().collect();
    assert_eq!(hrefs, vec![alice.clone(), dave]);
    assert_eq!(state.entries[&alice], remote.get(&alice).unwrap().0);
}

#[tokio::test]
async fn own_pushes_do_not_come_back() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let store = MemoryStateStore::default();
    let reconciler = reconciler();
    local.create(vcard("carol"));
    reconciler.run(&local, &remote, &store).await.unwrap();

    // The push changed the tag, so this pass lists, but finds nothing to do
    let result = reconciler.run(&local, &remote, &store).await.unwrap();
    assert!(!result.fast_path);
    assert_eq!(result.local.total() + result.remote.total(), 0);

    let result = reconciler.run(&local, &remote, &store).await.unwrap();
    assert!(result.fast_path);
    assert_eq!(local.len(), 1);
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn known_href_updates_existing_record() {
    // A record that is known locally but missing from the sync state is
    // updated in place rather than duplicated
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let alice = remote.put("alice", vcard("alice-2"));
    let (stale_etag, _) = remote.get(&alice).unwrap();
    let id = local
        .insert(&alice, &stale_etag, &vcard("alice"))
        .await
        .unwrap();
    let store = MemoryStateStore::default();

    let result = reconciler().run(&local, &remote, &store).await.unwrap();

    assert_eq!(result.local.inserted, 0);
    assert_eq!(result.local.updated, 1);
    assert_eq!(local.len(), 1);
    assert_eq!(local.get(id).unwrap().body, vcard("alice-2"));
}

#[tokio::test]
async fn vanished_record_is_downloaded_again() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let alice = remote.put("alice", vcard("alice"));
    remote.put("bob", vcard("bob"));
    let store = MemoryStateStore::default();
    let reconciler = reconciler();
    reconciler.run(&local, &remote, &store).await.unwrap();

    local.vanish(local.by_href(&alice).unwrap().local_id);
    remote.put("carol", vcard("carol"));

    let result = reconciler.run(&local, &remote, &store).await.unwrap();

    assert_eq!(result.local.inserted, 2);
    assert_eq!(local.by_href(&alice).unwrap().body, vcard("alice"));
    assert_eq!(local.live().len(), 3);
}

#[tokio::test]
async fn bodies_are_fetched_in_bounded_batches() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    for i in 0..25 {
        let name = format!("person-{i:02}");
        remote.put(&name, vcard(&name));
    }
    let store = MemoryStateStore::default();
    let reconciler = Reconciler::new(options(10, 2), DefaultPolicy);

    let result = reconciler.run(&local, &remote, &store).await.unwrap();

    assert_eq!(result.local.inserted, 25);
    let calls = remote.calls();
    assert_eq!(calls.fetch_batches, 3);
    assert_eq!(calls.largest_batch, 10);
    assert_eq!(store.snapshot().await.entries.len(), 25);
}

#[tokio::test]
async fn never_pushed_tombstone_is_purged_without_remote_call() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    let id = local.create(vcard("erin"));
    let mut state = SyncState::default();

    local.tombstone(id);
    let result = reconciler()
        .run_with_state(&local, &remote, &mut state)
        .await
        .unwrap();

    assert!(result.is_clean());
    assert_eq!(remote.calls().deletes, 0);
    assert_eq!(remote.calls().creates, 0);
    assert_eq!(local.len(), 0);
}

#[tokio::test]
async fn pushed_href_is_reported_back() {
    let local = MemoryLocal::default();
    let remote = MemoryRemote::default();
    remote.next_create_href(member("chosen"));
    let id = local.create(vcard("frank"));
    let mut state = SyncState::default();

    reconciler()
        .run_with_state(&local, &remote, &mut state)
        .await
        .unwrap();

    assert_eq!(local.get(id).unwrap().href, Some(member("chosen")));
    assert!(state.entries.contains_key(&member("chosen")));
}
