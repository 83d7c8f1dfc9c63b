// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::SyncError;
use crate::types::{CollectionTag, ETag, Href};

/// What the last successful pass saw of the remote collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncState {
    /// Collection tag the state corresponds to; `None` before the first sync.
    pub last_collection_tag: Option<CollectionTag>,
    /// `ETag` of every resource known to be in sync.
    pub entries: BTreeMap<Href, ETag>,
}

impl SyncState {
    /// Whether nothing was ever synced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_collection_tag.is_none() && self.entries.is_empty()
    }
}

/// Persistence for [`SyncState`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the state, or an empty one if nothing was saved yet.
    async fn load(&self) -> Result<SyncState, SyncError>;

    /// Replaces the saved state. Either all of `state` is stored or none of it.
    async fn save(&self, state: &SyncState) -> Result<(), SyncError>;
}

/// In-memory [`StateStore`].
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<SyncState>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new(state: SyncState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> SyncState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<SyncState, SyncError> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, state: &SyncState) -> Result<(), SyncError> {
        *self.state.lock().await = state.clone();
        Ok(())
    }
}
