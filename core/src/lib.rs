// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Two-way synchronization between a local contact store and a remote
//! `CardDAV` address book.

mod collection;
mod config;
mod davsync;
mod diff;
mod error;
mod localdb;
mod policy;
mod reconciler;
mod remote;
mod result;
mod state;
mod types;

pub use crate::collection::{FetchedBodies, LocalCollection, RemoteCollection};
pub use crate::config::{APP_NAME, Config, DATABASE_NAME, SyncConfig, SyncOptions};
pub use crate::davsync::Davsync;
pub use crate::diff::{LocalDiff, RemoteDiff};
pub use crate::error::{ErrorKind, Identity, RecordError, SyncError};
pub use crate::localdb::{AddressBook, LocalDb, SqliteStateStore};
pub use crate::policy::{
    ConflictKind, ConflictPolicy, ConflictRecord, ConflictStrategy, DefaultPolicy, LocalWins,
    RemoteWins, Resolution,
};
pub use crate::reconciler::{Reconciler, SyncPhase, run_sync};
pub use crate::remote::DavAddressBook;
pub use crate::result::{ChangeCounts, SyncResult};
pub use crate::state::{MemoryStateStore, StateStore, SyncState};
pub use crate::types::{
    Body, CollectionTag, ETag, Href, LocalId, LocalRecord, RemoteResource, TagKind,
};

pub use davsync_carddav::{AddressBookCollection, AuthMethod, CardDavConfig};
