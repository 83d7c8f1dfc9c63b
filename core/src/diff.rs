// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Change detection on either side of a collection pair.

use std::collections::{BTreeMap, HashSet};

use crate::state::SyncState;
use crate::types::{ETag, Href, LocalRecord};

/// Remote changes since the last sync.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoteDiff {
    /// Listed, not in the sync state.
    pub new: BTreeMap<Href, ETag>,
    /// Listed with an `ETag` differing from the sync state.
    pub modified: BTreeMap<Href, ETag>,
    /// In the sync state, no longer listed.
    pub deleted: HashSet<Href>,
    /// Listed with the `ETag` recorded in the sync state.
    pub unchanged: BTreeMap<Href, ETag>,
}

impl RemoteDiff {
    /// Classifies a listing against the sync state.
    ///
    /// A listing that names the same href twice keeps the last `ETag`.
    pub fn compute(listing: Vec<(Href, ETag)>, state: &SyncState) -> Self {
        let listing: BTreeMap<Href, ETag> = listing.into_iter().collect();
        let mut diff = Self::default();

        for href in state.entries.keys() {
            if !listing.contains_key(href) {
                diff.deleted.insert(href.clone());
            }
        }

        for (href, etag) in listing {
            match state.entries.get(&href) {
                None => diff.new.insert(href, etag),
                Some(known) if *known == etag => diff.unchanged.insert(href, etag),
                Some(_) => diff.modified.insert(href, etag),
            };
        }

        diff
    }

    /// The diff of a collection known to be unchanged: everything in the
    /// sync state is unchanged.
    #[must_use]
    pub fn unchanged_since(state: &SyncState) -> Self {
        Self {
            unchanged: state.entries.clone(),
            ..Self::default()
        }
    }

    /// `ETag` of `href` if it was added or modified remotely.
    #[must_use]
    pub fn changed_etag(&self, href: &Href) -> Option<&ETag> {
        self.new.get(href).or_else(|| self.modified.get(href))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Local changes since the last sync.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalDiff {
    /// Dirty records never pushed.
    pub new: Vec<LocalRecord>,
    /// Dirty records with a remote identity.
    pub modified: Vec<LocalRecord>,
    /// Tombstones with a remote identity.
    pub deleted: Vec<LocalRecord>,
    /// Tombstones never pushed, removed locally without a remote call.
    pub purge: Vec<LocalRecord>,
}

impl LocalDiff {
    /// Classifies the records returned by `list_dirty`.
    pub fn from_dirty(records: Vec<LocalRecord>) -> Self {
        let mut diff = Self::default();
        for record in records {
            match (record.deleted, record.href.is_some()) {
                (true, true) => diff.deleted.push(record),
                (true, false) => diff.purge.push(record),
                (false, true) if record.dirty => diff.modified.push(record),
                (false, false) if record.dirty => diff.new.push(record),
                _ => {}
            }
        }
        diff
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.purge.is_empty()
    }
}
