// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory collections for driving sync passes.
//!
//! Both keep their data behind a mutex so that tests can inspect and modify
//! them between passes, and both can be told to fail in specific ways.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use davsync_core::{
    Body, CollectionTag, ETag, FetchedBodies, Href, LocalCollection, LocalId, LocalRecord,
    RemoteCollection, RemoteResource, SyncError,
};

use super::fixtures::member;

/// Local store keeping records in a map.
#[derive(Debug, Default)]
pub struct MemoryLocal {
    inner: Mutex<LocalInner>,
}

#[derive(Debug, Default)]
struct LocalInner {
    records: BTreeMap<LocalId, LocalRecord>,
    next_id: i64,
    fail_writes: bool,
}

impl LocalInner {
    fn check_writable(&self) -> Result<(), SyncError> {
        match self.fail_writes {
            true => Err(SyncError::StoreWrite("disk full".to_string())),
            false => Ok(()),
        }
    }

    fn record_mut(&mut self, local_id: LocalId) -> Result<&mut LocalRecord, SyncError> {
        self.records
            .get_mut(&local_id)
            .ok_or_else(|| SyncError::NotFound(format!("local record {local_id}")))
    }

    fn allocate(&mut self) -> LocalId {
        self.next_id += 1;
        LocalId(self.next_id)
    }
}

#[allow(dead_code)]
impl MemoryLocal {
    /// Adds a record as a user would, dirty and without a remote identity.
    pub fn create(&self, body: Body) -> LocalId {
        let mut inner = self.inner.lock().unwrap();
        let local_id = inner.allocate();
        inner.records.insert(
            local_id,
            LocalRecord {
                local_id,
                href: None,
                etag: None,
                dirty: true,
                deleted: false,
                body,
            },
        );
        local_id
    }

    /// Edits a record as a user would.
    pub fn edit(&self, local_id: LocalId, body: Body) {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.record_mut(local_id).unwrap();
        record.body = body;
        record.dirty = true;
    }

    /// Deletes a record as a user would, leaving a tombstone once synced.
    pub fn remove(&self, local_id: LocalId) {
        let mut inner = self.inner.lock().unwrap();
        let synced = inner.record_mut(local_id).unwrap().href.is_some();
        if synced {
            inner.record_mut(local_id).unwrap().deleted = true;
        } else {
            inner.records.remove(&local_id);
        }
    }

    /// Marks a record deleted, even one that was never pushed.
    pub fn tombstone(&self, local_id: LocalId) {
        self.inner.lock().unwrap().record_mut(local_id).unwrap().deleted = true;
    }

    /// Drops a record without leaving a tombstone.
    pub fn vanish(&self, local_id: LocalId) {
        self.inner.lock().unwrap().records.remove(&local_id);
    }

    pub fn get(&self, local_id: LocalId) -> Option<LocalRecord> {
        self.inner.lock().unwrap().records.get(&local_id).cloned()
    }

    pub fn by_href(&self, href: &Href) -> Option<LocalRecord> {
        self.inner
            .lock()
            .unwrap()
            .records
            .values()
            .find(|r| r.href.as_ref() == Some(href))
            .cloned()
    }

    /// Records that are not tombstones.
    pub fn live(&self) -> Vec<LocalRecord> {
        self.inner
            .lock()
            .unwrap()
            .records
            .values()
            .filter(|r| !r.deleted)
            .cloned()
            .collect()
    }

    /// Every record, tombstones included.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }
}

#[async_trait]
impl LocalCollection for MemoryLocal {
    async fn list_dirty(&self) -> Result<Vec<LocalRecord>, SyncError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .values()
            .filter(|r| r.dirty || r.deleted)
            .cloned()
            .collect())
    }

    async fn list_by_remote_identity(&self) -> Result<HashMap<Href, LocalRecord>, SyncError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .values()
            .filter_map(|r| Some((r.href.clone()?, r.clone())))
            .collect())
    }

    async fn insert(&self, href: &Href, etag: &ETag, body: &Body) -> Result<LocalId, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;

        let existing = inner
            .records
            .values()
            .find(|r| r.href.as_ref() == Some(href))
            .map(|r| r.local_id);
        let local_id = existing.unwrap_or_else(|| inner.allocate());
        inner.records.insert(
            local_id,
            LocalRecord {
                local_id,
                href: Some(href.clone()),
                etag: Some(etag.clone()),
                dirty: false,
                deleted: false,
                body: body.clone(),
            },
        );
        Ok(local_id)
    }

    async fn update(&self, local_id: LocalId, etag: &ETag, body: &Body) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;

        let record = inner.record_mut(local_id)?;
        record.etag = Some(etag.clone());
        record.body = body.clone();
        record.dirty = false;
        record.deleted = false;
        Ok(())
    }

    async fn delete(&self, local_id: LocalId) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;

        inner
            .records
            .remove(&local_id)
            .map(|_| ())
            .ok_or_else(|| SyncError::NotFound(format!("local record {local_id}")))
    }

    async fn clear_dirty(
        &self,
        local_id: LocalId,
        href: &Href,
        etag: &ETag,
    ) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;

        let record = inner.record_mut(local_id)?;
        record.href = Some(href.clone());
        record.etag = Some(etag.clone());
        record.dirty = false;
        Ok(())
    }
}

/// Number of calls per remote operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCalls {
    pub tag: usize,
    pub listing: usize,
    pub fetch_batches: usize,
    pub largest_batch: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

/// Remote collection keeping resources in a map. The collection tag is a
/// counter bumped on every change.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    inner: Mutex<RemoteInner>,
}

#[derive(Debug, Default)]
struct RemoteInner {
    resources: BTreeMap<Href, (ETag, Body)>,
    version: u64,
    etag_seq: u64,
    calls: RemoteCalls,

    fail_listing: bool,
    fail_fetch: HashSet<Href>,
    fail_push: HashSet<Href>,
    create_hrefs: VecDeque<Href>,
    concurrent_edits: HashMap<Href, VecDeque<Body>>,
}

impl RemoteInner {
    fn write(&mut self, href: Href, body: Body) -> ETag {
        self.etag_seq += 1;
        self.version += 1;
        let etag = ETag::new(format!("\"{}\"", self.etag_seq));
        self.resources.insert(href, (etag.clone(), body));
        etag
    }

    /// Applies an edit scheduled to race with the next push to `href`.
    fn race(&mut self, href: &Href) {
        let body = self
            .concurrent_edits
            .get_mut(href)
            .and_then(VecDeque::pop_front);
        if let Some(body) = body {
            self.write(href.clone(), body);
        }
    }

    fn check_pushable(&self, href: &Href) -> Result<(), SyncError> {
        match self.fail_push.contains(href) {
            true => Err(SyncError::Transport("connection reset".to_string())),
            false => Ok(()),
        }
    }

    fn check_etag(&self, href: &Href, expected: &ETag) -> Result<(), SyncError> {
        match self.resources.get(href) {
            Some((etag, _)) if etag == expected => Ok(()),
            _ => Err(SyncError::PreconditionFailed(href.clone())),
        }
    }
}

#[allow(dead_code)]
impl MemoryRemote {
    /// Creates or replaces a resource as another client would.
    pub fn put(&self, name: &str, body: Body) -> Href {
        let href = member(name);
        self.inner.lock().unwrap().write(href.clone(), body);
        href
    }

    /// Deletes a resource as another client would.
    pub fn remove(&self, href: &Href) {
        let mut inner = self.inner.lock().unwrap();
        if inner.resources.remove(href).is_some() {
            inner.version += 1;
        }
    }

    pub fn get(&self, href: &Href) -> Option<(ETag, Body)> {
        self.inner.lock().unwrap().resources.get(href).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().resources.len()
    }

    pub fn calls(&self) -> RemoteCalls {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn fail_listing(&self, fail: bool) {
        self.inner.lock().unwrap().fail_listing = fail;
    }

    pub fn fail_fetch(&self, href: &Href, fail: bool) {
        let mut inner = self.inner.lock().unwrap();
        if fail {
            inner.fail_fetch.insert(href.clone());
        } else {
            inner.fail_fetch.remove(href);
        }
    }

    pub fn fail_push(&self, href: &Href, fail: bool) {
        let mut inner = self.inner.lock().unwrap();
        if fail {
            inner.fail_push.insert(href.clone());
        } else {
            inner.fail_push.remove(href);
        }
    }

    /// The next create picks `href` instead of a fresh identity.
    pub fn next_create_href(&self, href: Href) {
        self.inner.lock().unwrap().create_hrefs.push_back(href);
    }

    /// Another client edits `href` right before our next push to it lands.
    /// Repeated calls race with the following pushes, one edit each.
    pub fn edit_before_push(&self, href: &Href, body: Body) {
        self.inner
            .lock()
            .unwrap()
            .concurrent_edits
            .entry(href.clone())
            .or_default()
            .push_back(body);
    }
}

#[async_trait]
impl RemoteCollection for MemoryRemote {
    async fn fetch_collection_tag(&self) -> Result<CollectionTag, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.tag += 1;
        Ok(CollectionTag::ctag(inner.version.to_string()))
    }

    async fn list_identities(&self) -> Result<Vec<(Href, ETag)>, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.listing += 1;
        if inner.fail_listing {
            return Err(SyncError::Transport("listing timed out".to_string()));
        }
        Ok(inner
            .resources
            .iter()
            .map(|(href, (etag, _))| (href.clone(), etag.clone()))
            .collect())
    }

    async fn fetch_bodies(&self, hrefs: &[Href]) -> Result<FetchedBodies, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.fetch_batches += 1;
        inner.calls.largest_batch = inner.calls.largest_batch.max(hrefs.len());

        let mut fetched = FetchedBodies::default();
        for href in hrefs {
            if inner.fail_fetch.contains(href) {
                let e = SyncError::Transport("fetch timed out".to_string());
                fetched.failures.push((href.clone(), e));
                continue;
            }
            match inner.resources.get(href) {
                Some((etag, body)) => fetched.resources.push(RemoteResource {
                    href: href.clone(),
                    etag: etag.clone(),
                    body: body.clone(),
                }),
                None => {
                    let e = SyncError::NotFound(href.to_string());
                    fetched.failures.push((href.clone(), e));
                }
            }
        }
        Ok(fetched)
    }

    async fn create(&self, body: &Body) -> Result<(Href, ETag), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.creates += 1;

        let href = match inner.create_hrefs.pop_front() {
            Some(href) => href,
            None => member(&format!("new-{}", inner.calls.creates)),
        };
        if inner.resources.contains_key(&href) {
            return Err(SyncError::Conflict(href));
        }
        let etag = inner.write(href.clone(), body.clone());
        Ok((href, etag))
    }

    async fn update(&self, href: &Href, expected: &ETag, body: &Body) -> Result<ETag, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.updates += 1;
        inner.race(href);
        inner.check_pushable(href)?;
        inner.check_etag(href, expected)?;
        Ok(inner.write(href.clone(), body.clone()))
    }

    async fn delete(&self, href: &Href, expected: &ETag) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.deletes += 1;
        inner.race(href);
        inner.check_pushable(href)?;
        if !inner.resources.contains_key(href) {
            return Ok(());
        }
        inner.check_etag(href, expected)?;
        inner.resources.remove(href);
        inner.version += 1;
        Ok(())
    }
}
