// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Conflict classification and resolution policies.

use std::fmt;

use crate::types::{Body, Href, LocalId, RemoteResource};

/// How the two sides disagree about one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    /// Changed on both sides since the last sync.
    BothModified,
    /// Deleted remotely, changed locally.
    RemoteDeletedLocalModified,
    /// Changed remotely, deleted locally.
    RemoteModifiedLocalDeleted,
    /// A create was refused because the remote identity is taken.
    IdentityCollision,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BothModified => "both modified",
            Self::RemoteDeletedLocalModified => "deleted remotely, modified locally",
            Self::RemoteModifiedLocalDeleted => "modified remotely, deleted locally",
            Self::IdentityCollision => "identity collision",
        };
        f.write_str(s)
    }
}

/// A conflict, with both versions where they exist.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConflictRecord {
    pub href: Href,
    pub local_id: LocalId,
    pub kind: ConflictKind,
    /// Local body, `None` if the local record is a tombstone.
    pub local: Option<Body>,
    /// Remote version, `None` if the resource was deleted remotely. A
    /// collision has none: the taken href belongs to another resource.
    pub remote: Option<RemoteResource>,
}

/// Outcome a policy picks for a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Leave both sides untouched and report the conflict.
    Defer,
    /// Make the local side match the remote one.
    KeepRemote,
    /// Make the remote side match the local one.
    KeepLocal,
    /// Write this body to both sides.
    Merged(Body),
}

/// Decides how conflicts are resolved.
pub trait ConflictPolicy: Send + Sync {
    fn resolve(&self, conflict: &ConflictRecord) -> Resolution;
}

/// Remote deletions and modifications win over the local side, concurrent
/// edits are deferred unless both bodies are identical. A create whose href
/// is taken is retried under a fresh one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ConflictPolicy for DefaultPolicy {
    fn resolve(&self, conflict: &ConflictRecord) -> Resolution {
        match conflict.kind {
            ConflictKind::RemoteDeletedLocalModified | ConflictKind::RemoteModifiedLocalDeleted => {
                Resolution::KeepRemote
            }
            ConflictKind::BothModified => match (&conflict.local, &conflict.remote) {
                (Some(local), Some(remote)) if *local == remote.body => Resolution::KeepRemote,
                _ => Resolution::Defer,
            },
            ConflictKind::IdentityCollision => Resolution::KeepLocal,
        }
    }
}

/// The remote version always wins. A taken href has no remote version of
/// the record, so the create is retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteWins;

impl ConflictPolicy for RemoteWins {
    fn resolve(&self, conflict: &ConflictRecord) -> Resolution {
        match conflict.kind {
            ConflictKind::IdentityCollision => Resolution::KeepLocal,
            _ => Resolution::KeepRemote,
        }
    }
}

/// The local version always wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalWins;

impl ConflictPolicy for LocalWins {
    fn resolve(&self, _conflict: &ConflictRecord) -> Resolution {
        Resolution::KeepLocal
    }
}

/// Policy selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// See [`DefaultPolicy`].
    #[default]
    Default,
    /// See [`RemoteWins`].
    RemoteWins,
    /// See [`LocalWins`].
    LocalWins,
}

impl ConflictPolicy for ConflictStrategy {
    fn resolve(&self, conflict: &ConflictRecord) -> Resolution {
        match self {
            Self::Default => DefaultPolicy.resolve(conflict),
            Self::RemoteWins => RemoteWins.resolve(conflict),
            Self::LocalWins => LocalWins.resolve(conflict),
        }
    }
}
