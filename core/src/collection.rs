// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Contracts between the reconciler and the two stores it synchronizes.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{Body, CollectionTag, ETag, Href, LocalId, LocalRecord, RemoteResource};

/// The local record store.
///
/// Every failure to read or write is reported as [`SyncError::StoreWrite`],
/// except for [`LocalCollection::delete`] and friends on a missing record,
/// which report [`SyncError::NotFound`].
#[async_trait]
pub trait LocalCollection: Send + Sync {
    /// Records that are dirty or tombstoned.
    async fn list_dirty(&self) -> Result<Vec<LocalRecord>, SyncError>;

    /// All records carrying a remote identity, keyed by it.
    async fn list_by_remote_identity(&self) -> Result<HashMap<Href, LocalRecord>, SyncError>;

    /// Materializes a remote resource. Calling it twice with the same href
    /// updates the existing record instead of creating a second one.
    async fn insert(&self, href: &Href, etag: &ETag, body: &Body) -> Result<LocalId, SyncError>;

    /// Overwrites body and `ETag`, clearing both the dirty flag and a tombstone.
    async fn update(&self, local_id: LocalId, etag: &ETag, body: &Body) -> Result<(), SyncError>;

    /// Removes the record for good.
    async fn delete(&self, local_id: LocalId) -> Result<(), SyncError>;

    /// Records a successful push: assigns href and `ETag`, clears the dirty flag.
    async fn clear_dirty(&self, local_id: LocalId, href: &Href, etag: &ETag)
    -> Result<(), SyncError>;
}

/// Bodies returned by [`RemoteCollection::fetch_bodies`].
#[derive(Debug, Default)]
pub struct FetchedBodies {
    pub resources: Vec<RemoteResource>,
    /// Hrefs that could not be fetched. A [`SyncError::NotFound`] means the
    /// resource no longer exists.
    pub failures: Vec<(Href, SyncError)>,
}

/// The remote collection.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Current collection tag.
    async fn fetch_collection_tag(&self) -> Result<CollectionTag, SyncError>;

    /// Every member resource with its current `ETag`, in no particular order.
    async fn list_identities(&self) -> Result<Vec<(Href, ETag)>, SyncError>;

    /// Fetches bodies for `hrefs`. Hrefs missing from both lists of the
    /// result count as failed.
    async fn fetch_bodies(&self, hrefs: &[Href]) -> Result<FetchedBodies, SyncError>;

    /// Creates a new resource, returning its identity.
    ///
    /// Fails with [`SyncError::Conflict`] if the chosen identity already exists.
    async fn create(&self, body: &Body) -> Result<(Href, ETag), SyncError>;

    /// Replaces a resource if its `ETag` still equals `expected`.
    async fn update(&self, href: &Href, expected: &ETag, body: &Body) -> Result<ETag, SyncError>;

    /// Deletes a resource if its `ETag` still equals `expected`. A resource
    /// that is already gone counts as deleted.
    async fn delete(&self, href: &Href, expected: &ETag) -> Result<(), SyncError>;
}
