// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The sync pass: detects changes on both sides, applies them, and settles
//! conflicts through a [`ConflictPolicy`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use futures::{StreamExt, stream};

use crate::collection::{LocalCollection, RemoteCollection};
use crate::config::SyncOptions;
use crate::diff::{LocalDiff, RemoteDiff};
use crate::error::{Identity, RecordError, SyncError};
use crate::policy::{ConflictKind, ConflictPolicy, ConflictRecord, DefaultPolicy, Resolution};
use crate::result::SyncResult;
use crate::state::{StateStore, SyncState};
use crate::types::{Body, ETag, Href, LocalRecord, RemoteResource};

/// Step of a sync pass, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Start,
    FastPathCheck,
    RemoteDiff,
    LocalDiff,
    ApplyRemoteToLocal,
    ApplyLocalToRemote,
    Finalize,
    Done,
    Error,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::FastPathCheck => "fast-path-check",
            Self::RemoteDiff => "remote-diff",
            Self::LocalDiff => "local-diff",
            Self::ApplyRemoteToLocal => "apply-remote-to-local",
            Self::ApplyLocalToRemote => "apply-local-to-remote",
            Self::Finalize => "finalize",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Synchronizes collection pairs with a fixed policy and options.
///
/// Passes over the same pair must not overlap; the reconciler assumes it has
/// exclusive access to both collections and to the state while a pass runs.
#[derive(Debug, Clone, Default)]
pub struct Reconciler<P = DefaultPolicy> {
    options: SyncOptions,
    policy: P,
}

impl<P: ConflictPolicy> Reconciler<P> {
    pub fn new(options: SyncOptions, policy: P) -> Self {
        Self { options, policy }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Loads the state, runs one pass and saves the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass aborts or the state cannot be loaded or
    /// saved. The stored state is left untouched in that case.
    #[tracing::instrument(skip_all)]
    pub async fn run<L, R, S>(
        &self,
        local: &L,
        remote: &R,
        store: &S,
    ) -> Result<SyncResult, SyncError>
    where
        L: LocalCollection + ?Sized,
        R: RemoteCollection + ?Sized,
        S: StateStore + ?Sized,
    {
        let mut state = store.load().await?;
        let result = run_sync(local, remote, &mut state, &self.policy, &self.options).await?;
        store.save(&state).await?;
        Ok(result)
    }

    /// Runs one pass against an in-memory state. See [`run_sync`].
    ///
    /// # Errors
    ///
    /// Returns an error if the pass aborts.
    pub async fn run_with_state<L, R>(
        &self,
        local: &L,
        remote: &R,
        state: &mut SyncState,
    ) -> Result<SyncResult, SyncError>
    where
        L: LocalCollection + ?Sized,
        R: RemoteCollection + ?Sized,
    {
        run_sync(local, remote, state, &self.policy, &self.options).await
    }
}

/// Runs one sync pass.
///
/// `state` is replaced only if the pass completes; on error it keeps its
/// previous value and the next pass redoes the work.
///
/// # Errors
///
/// Returns an error if the collection tag, the remote listing or any local
/// listing cannot be read, or if a local write fails.
pub async fn run_sync<L, R, P>(
    local: &L,
    remote: &R,
    state: &mut SyncState,
    policy: &P,
    options: &SyncOptions,
) -> Result<SyncResult, SyncError>
where
    L: LocalCollection + ?Sized,
    R: RemoteCollection + ?Sized,
    P: ConflictPolicy + ?Sized,
{
    let mut pass = Pass::new(local, remote, &*state, policy, *options);
    match pass.execute().await {
        Ok(next) => {
            pass.enter(SyncPhase::Done);
            let result = pass.result;
            tracing::info!(
                fast_path = result.fast_path,
                local = %result.local,
                remote = %result.remote,
                resolved = result.resolved_conflicts,
                conflicts = result.conflicts.len(),
                errors = result.errors.len(),
                "sync pass finished"
            );
            *state = next;
            Ok(result)
        }
        Err(e) => {
            tracing::warn!(phase = %pass.phase, error = %e, "sync pass aborted");
            pass.enter(SyncPhase::Error);
            Err(e)
        }
    }
}

/// A conflict waiting for the remote version to be fetched.
struct PendingConflict {
    record: LocalRecord,
    href: Href,
    kind: ConflictKind,
}

#[derive(Debug)]
enum PushAction {
    Create { replaces: Option<Href> },
    Update { href: Href, expected: ETag },
    Delete { href: Href, expected: ETag },
}

/// A push the remote refused, to be run through conflict detection.
enum Reroute {
    /// The resource changed or vanished after it was listed.
    Changed(Push),
    /// The href picked for a create is taken.
    Taken(Push, Href),
}

/// A change to send to the remote.
#[derive(Debug)]
struct Push {
    record: LocalRecord,
    action: PushAction,
    /// Body agreed on by a merge, written to both sides.
    merged: Option<Body>,
    /// Settles a conflict: refused again, it is deferred instead of re-routed.
    from_conflict: bool,
}

impl Push {
    fn new(record: LocalRecord, action: PushAction) -> Self {
        Self {
            record,
            action,
            merged: None,
            from_conflict: false,
        }
    }

    fn body(&self) -> &Body {
        self.merged.as_ref().unwrap_or(&self.record.body)
    }

    fn identity(&self) -> Identity {
        match &self.action {
            PushAction::Create { .. } => Identity::Local(self.record.local_id),
            PushAction::Update { href, .. } | PushAction::Delete { href, .. } => {
                Identity::Remote(href.clone())
            }
        }
    }
}

enum PushOutcome {
    Created(Href, ETag),
    Updated(ETag),
    Deleted,
}

async fn send<R: RemoteCollection + ?Sized>(
    remote: &R,
    push: &Push,
) -> Result<PushOutcome, SyncError> {
    match &push.action {
        PushAction::Create { .. } => {
            let (href, etag) = remote.create(push.body()).await?;
            Ok(PushOutcome::Created(href, etag))
        }
        PushAction::Update { href, expected } => {
            let etag = remote.update(href, expected, push.body()).await?;
            Ok(PushOutcome::Updated(etag))
        }
        PushAction::Delete { href, expected } => {
            remote.delete(href, expected).await?;
            Ok(PushOutcome::Deleted)
        }
    }
}

/// The push that replaces the remote version of a conflict. A tombstone
/// deletes the remote resource unless a merged body is written instead.
fn overriding_action(conflict: &ConflictRecord, merged: bool) -> PushAction {
    match &conflict.remote {
        Some(remote) if conflict.local.is_none() && !merged => PushAction::Delete {
            href: conflict.href.clone(),
            expected: remote.etag.clone(),
        },
        Some(remote) => PushAction::Update {
            href: conflict.href.clone(),
            expected: remote.etag.clone(),
        },
        None => PushAction::Create {
            replaces: Some(conflict.href.clone()),
        },
    }
}

/// Deleting a record that is already gone is not an error.
fn tolerate_missing(result: Result<(), SyncError>) -> Result<bool, SyncError> {
    match result {
        Ok(()) => Ok(true),
        Err(SyncError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

struct Pass<'a, L: ?Sized, R: ?Sized, P: ?Sized> {
    local: &'a L,
    remote: &'a R,
    policy: &'a P,
    options: SyncOptions,
    old: &'a SyncState,

    phase: SyncPhase,
    entries: BTreeMap<Href, ETag>,
    result: SyncResult,
    /// A remote change was left unapplied, the collection tag must not advance.
    remote_pending: bool,
}

impl<'a, L, R, P> Pass<'a, L, R, P>
where
    L: LocalCollection + ?Sized,
    R: RemoteCollection + ?Sized,
    P: ConflictPolicy + ?Sized,
{
    fn new(
        local: &'a L,
        remote: &'a R,
        old: &'a SyncState,
        policy: &'a P,
        options: SyncOptions,
    ) -> Self {
        Self {
            local,
            remote,
            policy,
            options,
            old,
            phase: SyncPhase::Start,
            entries: old.entries.clone(),
            result: SyncResult::default(),
            remote_pending: false,
        }
    }

    fn enter(&mut self, phase: SyncPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "sync phase");
        self.phase = phase;
    }

    async fn execute(&mut self) -> Result<SyncState, SyncError> {
        self.enter(SyncPhase::FastPathCheck);
        let tag = self.remote.fetch_collection_tag().await?;
        let fast_path = self.old.last_collection_tag.as_ref() == Some(&tag);
        self.result.fast_path = fast_path;

        self.enter(SyncPhase::RemoteDiff);
        let remote_diff = if fast_path {
            tracing::debug!(%tag, "collection tag unchanged, skipping listing");
            RemoteDiff::unchanged_since(self.old)
        } else {
            let listing = self.remote.list_identities().await?;
            RemoteDiff::compute(listing, self.old)
        };
        tracing::debug!(
            new = remote_diff.new.len(),
            modified = remote_diff.modified.len(),
            deleted = remote_diff.deleted.len(),
            "remote changes"
        );

        self.enter(SyncPhase::LocalDiff);
        let local_diff = LocalDiff::from_dirty(self.local.list_dirty().await?);
        // Nothing changed remotely on the fast path, so only dirty records matter
        let synced = if fast_path {
            HashMap::new()
        } else {
            self.local.list_by_remote_identity().await?
        };
        tracing::debug!(
            new = local_diff.new.len(),
            modified = local_diff.modified.len(),
            deleted = local_diff.deleted.len(),
            "local changes"
        );

        self.enter(SyncPhase::ApplyRemoteToLocal);
        let pushes = self
            .apply_remote_to_local(&remote_diff, local_diff, &synced, fast_path)
            .await?;

        self.enter(SyncPhase::ApplyLocalToRemote);
        self.apply_local_to_remote(pushes).await?;

        self.enter(SyncPhase::Finalize);
        let last_collection_tag = if self.remote_pending {
            tracing::info!("remote changes left unapplied, keeping previous collection tag");
            self.old.last_collection_tag.clone()
        } else {
            Some(tag)
        };

        Ok(SyncState {
            last_collection_tag,
            entries: std::mem::take(&mut self.entries),
        })
    }

    /// Applies remote changes locally and settles conflicts. Returns the
    /// local changes left to push.
    async fn apply_remote_to_local(
        &mut self,
        remote_diff: &RemoteDiff,
        local_diff: LocalDiff,
        synced: &HashMap<Href, LocalRecord>,
        fast_path: bool,
    ) -> Result<Vec<Push>, SyncError> {
        let LocalDiff {
            new,
            modified,
            deleted,
            purge,
        } = local_diff;

        let mut touched: HashMap<Href, LocalRecord> = modified
            .into_iter()
            .chain(deleted)
            .filter_map(|r| Some((r.href.clone()?, r)))
            .collect();

        let mut downloads: Vec<Href> = Vec::new();
        let mut pending: Vec<PendingConflict> = Vec::new();
        let mut settled: Vec<(ConflictRecord, LocalRecord)> = Vec::new();

        for href in remote_diff.new.keys().chain(remote_diff.modified.keys()) {
            match touched.remove(href) {
                Some(record) => {
                    let kind = if record.deleted {
                        ConflictKind::RemoteModifiedLocalDeleted
                    } else {
                        ConflictKind::BothModified
                    };
                    pending.push(PendingConflict {
                        record,
                        href: href.clone(),
                        kind,
                    });
                }
                None => downloads.push(href.clone()),
            }
        }

        // Synced records that vanished locally without a tombstone
        if !fast_path {
            for href in remote_diff.unchanged.keys() {
                if !synced.contains_key(href) {
                    tracing::info!(%href, "record missing locally, downloading again");
                    downloads.push(href.clone());
                }
            }
        }

        let mut fetch_list = downloads.clone();
        fetch_list.extend(pending.iter().map(|p| p.href.clone()));
        let mut fetched = self.fetch_all(fetch_list).await;

        for href in downloads {
            let Some(outcome) = fetched.remove(&href) else {
                continue;
            };
            match outcome {
                Ok(resource) => self.store_remote(synced.get(&href), resource).await?,
                Err(e) => {
                    tracing::warn!(%href, error = %e, "failed to fetch remote resource");
                    self.fail(Identity::Remote(href), &e);
                    self.remote_pending = true;
                }
            }
        }

        let mut deleted_remotely: Vec<&Href> = remote_diff.deleted.iter().collect();
        deleted_remotely.sort();
        for href in deleted_remotely {
            match touched.remove(href) {
                Some(record) if record.deleted => {
                    tracing::debug!(%href, "deleted on both sides");
                    tolerate_missing(self.local.delete(record.local_id).await)?;
                    self.entries.remove(href);
                }
                Some(record) => settled.push((
                    ConflictRecord {
                        href: href.clone(),
                        local_id: record.local_id,
                        kind: ConflictKind::RemoteDeletedLocalModified,
                        local: Some(record.body.clone()),
                        remote: None,
                    },
                    record,
                )),
                None => {
                    if let Some(record) = synced.get(href) {
                        if tolerate_missing(self.local.delete(record.local_id).await)? {
                            self.result.local.deleted += 1;
                        }
                    }
                    self.entries.remove(href);
                }
            }
        }

        for PendingConflict { record, href, kind } in pending {
            match fetched.remove(&href) {
                Some(Ok(resource)) => settled.push((
                    ConflictRecord {
                        href,
                        local_id: record.local_id,
                        kind,
                        local: (!record.deleted).then(|| record.body.clone()),
                        remote: Some(resource),
                    },
                    record,
                )),
                // Deleted remotely after the listing
                Some(Err(SyncError::NotFound(_))) if record.deleted => {
                    tolerate_missing(self.local.delete(record.local_id).await)?;
                    self.entries.remove(&href);
                }
                Some(Err(SyncError::NotFound(_))) => settled.push((
                    ConflictRecord {
                        href,
                        local_id: record.local_id,
                        kind: ConflictKind::RemoteDeletedLocalModified,
                        local: Some(record.body.clone()),
                        remote: None,
                    },
                    record,
                )),
                Some(Err(e)) => {
                    tracing::warn!(%href, error = %e, "failed to fetch conflicting resource");
                    self.fail(Identity::Remote(href), &e);
                    self.remote_pending = true;
                }
                None => {}
            }
        }

        let mut pushes = Vec::new();
        for (conflict, record) in settled {
            if let Some(push) = self.settle(conflict, record).await? {
                pushes.push(push);
            }
        }

        for record in purge {
            tracing::debug!(local_id = %record.local_id, "purging unsynced tombstone");
            tolerate_missing(self.local.delete(record.local_id).await)?;
        }

        for record in new {
            pushes.push(Push::new(record, PushAction::Create { replaces: None }));
        }

        let mut remaining: Vec<LocalRecord> = touched.into_values().collect();
        remaining.sort_by_key(|r| r.local_id);
        for record in remaining {
            let Some(href) = record.href.clone() else {
                continue;
            };
            let Some(expected) = record.etag.clone().or_else(|| self.entries.get(&href).cloned())
            else {
                self.fail(
                    Identity::Remote(href),
                    &SyncError::Protocol("no known ETag for the remote resource".to_string()),
                );
                continue;
            };
            let action = if record.deleted {
                PushAction::Delete { href, expected }
            } else {
                PushAction::Update { href, expected }
            };
            pushes.push(Push::new(record, action));
        }

        Ok(pushes)
    }

    /// Pushes local changes, then writes the outcomes locally one by one.
    async fn apply_local_to_remote(&mut self, pushes: Vec<Push>) -> Result<(), SyncError> {
        let remote = self.remote;
        let outcomes: Vec<(Push, Result<PushOutcome, SyncError>)> = stream::iter(pushes)
            .map(|push| async move {
                let outcome = send(remote, &push).await;
                (push, outcome)
            })
            .buffer_unordered(self.options.max_in_flight.max(1))
            .collect()
            .await;

        let mut rerouted: Vec<Reroute> = Vec::new();
        for (push, outcome) in outcomes {
            if let Some(reroute) = self.finish_push(push, outcome).await? {
                rerouted.push(reroute);
            }
        }

        // Pushes that settle a conflict are deferred when they fail again, so
        // this runs at most twice
        while !rerouted.is_empty() {
            rerouted = self.reroute(rerouted).await?;
        }
        Ok(())
    }

    /// Sends refused pushes back through conflict detection. Returns the
    /// pushes refused again.
    async fn reroute(&mut self, rerouted: Vec<Reroute>) -> Result<Vec<Reroute>, SyncError> {
        // The remote changed after it was listed: fetch what is there now
        let hrefs: Vec<Href> = rerouted
            .iter()
            .filter_map(|r| match r {
                Reroute::Changed(push) => match &push.action {
                    PushAction::Update { href, .. } | PushAction::Delete { href, .. } => {
                        Some(href.clone())
                    }
                    PushAction::Create { .. } => None,
                },
                Reroute::Taken(..) => None,
            })
            .collect();
        let mut fetched = self.fetch_all(hrefs).await;

        let mut again = Vec::new();
        for reroute in rerouted {
            let (conflict, push) = match reroute {
                Reroute::Taken(push, href) => (
                    ConflictRecord {
                        href,
                        local_id: push.record.local_id,
                        kind: ConflictKind::IdentityCollision,
                        local: Some(push.body().clone()),
                        remote: None,
                    },
                    push,
                ),
                Reroute::Changed(push) => {
                    let (href, was_delete) = match &push.action {
                        PushAction::Update { href, .. } => (href.clone(), false),
                        PushAction::Delete { href, .. } => (href.clone(), true),
                        PushAction::Create { .. } => continue,
                    };
                    let local_id = push.record.local_id;
                    let conflict = match fetched.remove(&href) {
                        Some(Ok(resource)) => ConflictRecord {
                            href,
                            local_id,
                            kind: if was_delete {
                                ConflictKind::RemoteModifiedLocalDeleted
                            } else {
                                ConflictKind::BothModified
                            },
                            local: (!was_delete).then(|| push.record.body.clone()),
                            remote: Some(resource),
                        },
                        Some(Err(SyncError::NotFound(_))) if was_delete => {
                            tolerate_missing(self.local.delete(local_id).await)?;
                            self.entries.remove(&href);
                            continue;
                        }
                        Some(Err(SyncError::NotFound(_))) => ConflictRecord {
                            href,
                            local_id,
                            kind: ConflictKind::RemoteDeletedLocalModified,
                            local: Some(push.record.body.clone()),
                            remote: None,
                        },
                        Some(Err(e)) => {
                            self.fail(Identity::Remote(href), &e);
                            self.remote_pending = true;
                            continue;
                        }
                        None => continue,
                    };
                    (conflict, push)
                }
            };

            if push.from_conflict {
                tracing::warn!(
                    href = %conflict.href,
                    local_id = %conflict.local_id,
                    kind = %conflict.kind,
                    "push refused again, deferring conflict"
                );
                if conflict.kind != ConflictKind::IdentityCollision {
                    self.remote_pending = true;
                }
                self.result.conflicts.push(conflict);
                continue;
            }

            if let Some(push) = self.settle(conflict, push.record).await? {
                let outcome = send(self.remote, &push).await;
                if let Some(reroute) = self.finish_push(push, outcome).await? {
                    again.push(reroute);
                }
            }
        }

        Ok(again)
    }

    /// Records the outcome of a push locally. Returns the push back if it
    /// must go through conflict detection.
    async fn finish_push(
        &mut self,
        push: Push,
        outcome: Result<PushOutcome, SyncError>,
    ) -> Result<Option<Reroute>, SyncError> {
        let local_id = push.record.local_id;
        match (outcome, &push.action) {
            (Ok(PushOutcome::Created(href, etag)), PushAction::Create { replaces }) => {
                if let Some(body) = &push.merged {
                    self.local.update(local_id, &etag, body).await?;
                }
                self.local.clear_dirty(local_id, &href, &etag).await?;
                if let Some(old) = replaces {
                    self.entries.remove(old);
                }
                tracing::debug!(%href, %local_id, "created remote resource");
                self.entries.insert(href, etag);
                self.result.remote.inserted += 1;
            }
            (Ok(PushOutcome::Updated(etag)), PushAction::Update { href, .. }) => {
                match &push.merged {
                    Some(body) => self.local.update(local_id, &etag, body).await?,
                    None => self.local.clear_dirty(local_id, href, &etag).await?,
                }
                tracing::debug!(%href, %local_id, "updated remote resource");
                self.entries.insert(href.clone(), etag);
                self.result.remote.updated += 1;
            }
            (Ok(PushOutcome::Deleted), PushAction::Delete { href, .. }) => {
                tolerate_missing(self.local.delete(local_id).await)?;
                tracing::debug!(%href, %local_id, "deleted remote resource");
                self.entries.remove(href);
                self.result.remote.deleted += 1;
            }
            (Ok(_), _) => {
                return Err(SyncError::Protocol(
                    "remote answered a different operation".to_string(),
                ));
            }
            (Err(SyncError::Conflict(href)), PushAction::Create { .. }) => {
                tracing::warn!(%href, %local_id, "remote identity already taken");
                return Ok(Some(Reroute::Taken(push, href)));
            }
            (
                Err(SyncError::PreconditionFailed(_) | SyncError::NotFound(_)),
                PushAction::Update { href, .. } | PushAction::Delete { href, .. },
            ) => {
                tracing::info!(%href, %local_id, "remote changed concurrently, re-checking");
                return Ok(Some(Reroute::Changed(push)));
            }
            (Err(e), _) => {
                tracing::warn!(identity = %push.identity(), error = %e, "push failed");
                self.fail(push.identity(), &e);
                return Ok(None);
            }
        }

        if push.from_conflict {
            self.result.resolved_conflicts += 1;
        }
        Ok(None)
    }

    /// Applies the policy's decision. Returns the push needed to make the
    /// remote side match, if any.
    async fn settle(
        &mut self,
        conflict: ConflictRecord,
        record: LocalRecord,
    ) -> Result<Option<Push>, SyncError> {
        let resolution = self.policy.resolve(&conflict);
        tracing::info!(
            href = %conflict.href,
            local_id = %conflict.local_id,
            kind = %conflict.kind,
            ?resolution,
            "conflict"
        );

        if conflict.kind == ConflictKind::IdentityCollision {
            return Ok(self.settle_collision(conflict, record, resolution));
        }

        let href = conflict.href.clone();
        match resolution {
            Resolution::Defer => {
                self.result.conflicts.push(conflict);
                self.remote_pending = true;
                Ok(None)
            }
            Resolution::KeepRemote => {
                match &conflict.remote {
                    Some(remote) => {
                        self.local
                            .update(conflict.local_id, &remote.etag, &remote.body)
                            .await?;
                        self.entries.insert(href, remote.etag.clone());
                        self.result.local.updated += 1;
                    }
                    None => {
                        if tolerate_missing(self.local.delete(conflict.local_id).await)? {
                            self.result.local.deleted += 1;
                        }
                        self.entries.remove(&href);
                    }
                }
                self.result.resolved_conflicts += 1;
                Ok(None)
            }
            Resolution::KeepLocal => {
                let mut push = Push::new(record, overriding_action(&conflict, false));
                push.from_conflict = true;
                Ok(Some(push))
            }
            Resolution::Merged(body) => {
                let mut push = Push::new(record, overriding_action(&conflict, true));
                push.merged = Some(body);
                push.from_conflict = true;
                Ok(Some(push))
            }
        }
    }

    /// A create whose href was taken is retried once under a fresh href.
    fn settle_collision(
        &mut self,
        conflict: ConflictRecord,
        record: LocalRecord,
        resolution: Resolution,
    ) -> Option<Push> {
        let merged = match resolution {
            Resolution::KeepLocal => None,
            Resolution::Merged(body) => Some(body),
            // The taken href belongs to another resource, there is no remote side to keep
            Resolution::KeepRemote | Resolution::Defer => {
                self.result.conflicts.push(conflict);
                return None;
            }
        };
        let mut push = Push::new(record, PushAction::Create { replaces: None });
        push.merged = merged;
        push.from_conflict = true;
        Some(push)
    }

    /// Writes a fetched remote resource into the local store.
    async fn store_remote(
        &mut self,
        existing: Option<&LocalRecord>,
        resource: RemoteResource,
    ) -> Result<(), SyncError> {
        let RemoteResource { href, etag, body } = resource;
        match existing {
            // Known locally already, even though the sync state lacks it
            Some(record) => {
                self.local.update(record.local_id, &etag, &body).await?;
                self.result.local.updated += 1;
            }
            None => {
                self.local.insert(&href, &etag, &body).await?;
                self.result.local.inserted += 1;
            }
        }
        self.entries.insert(href, etag);
        Ok(())
    }

    /// Fetches bodies in batches, at most `max_in_flight` batches at once.
    async fn fetch_all(
        &self,
        hrefs: Vec<Href>,
    ) -> HashMap<Href, Result<RemoteResource, SyncError>> {
        let mut fetched = HashMap::with_capacity(hrefs.len());
        if hrefs.is_empty() {
            return fetched;
        }

        let remote = self.remote;
        let batches: Vec<Vec<Href>> = hrefs
            .chunks(self.options.multiget_batch_size.max(1))
            .map(<[Href]>::to_vec)
            .collect();

        let mut results = stream::iter(batches)
            .map(|batch| async move {
                let outcome = remote.fetch_bodies(&batch).await;
                (batch, outcome)
            })
            .buffer_unordered(self.options.max_in_flight.max(1));

        while let Some((batch, outcome)) = results.next().await {
            match outcome {
                Ok(bodies) => {
                    for resource in bodies.resources {
                        fetched.insert(resource.href.clone(), Ok(resource));
                    }
                    for (href, e) in bodies.failures {
                        fetched.entry(href).or_insert(Err(e));
                    }
                    for href in batch {
                        fetched.entry(href).or_insert_with(|| {
                            Err(SyncError::Protocol(
                                "resource missing from fetch response".to_string(),
                            ))
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(count = batch.len(), error = %e, "failed to fetch batch");
                    for href in batch {
                        fetched.insert(href, Err(e.clone()));
                    }
                }
            }
        }

        fetched
    }

    fn fail(&mut self, identity: Identity, error: &SyncError) {
        self.result.errors.push(RecordError::new(identity, error));
    }
}
