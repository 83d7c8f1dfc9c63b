// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

pub use davsync_carddav::{ETag, Href};

/// Which server property a [`CollectionTag`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagKind {
    /// `CS:getctag`.
    CTag,
    /// `DAV:sync-token`.
    SyncToken,
}

impl TagKind {
    /// Stable name used when persisting the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CTag => "ctag",
            Self::SyncToken => "sync-token",
        }
    }

    /// Parses the persisted name back.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ctag" => Some(Self::CTag),
            "sync-token" => Some(Self::SyncToken),
            _ => None,
        }
    }
}

/// Opaque value that changes whenever anything in a remote collection changes.
///
/// Two tags are equal only if both kind and value match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CollectionTag {
    /// Property the value came from.
    pub kind: TagKind,
    /// Raw value as reported by the server.
    pub value: String,
}

impl CollectionTag {
    /// A `CS:getctag` value.
    pub fn ctag(value: impl Into<String>) -> Self {
        Self {
            kind: TagKind::CTag,
            value: value.into(),
        }
    }

    /// A `DAV:sync-token` value.
    pub fn sync_token(value: impl Into<String>) -> Self {
        Self {
            kind: TagKind::SyncToken,
            value: value.into(),
        }
    }
}

impl fmt::Display for CollectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.value)
    }
}

/// Serialized record payload (vCard text), compared only for equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Body(String);

impl Body {
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Stable id of a record inside the local store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct LocalId(pub i64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A record as held by the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub local_id: LocalId,
    /// Remote identity, `None` until the record was first pushed.
    pub href: Option<Href>,
    /// Remote `ETag` last seen for this record.
    pub etag: Option<ETag>,
    /// Modified locally since the last sync.
    pub dirty: bool,
    /// Tombstone: deleted locally, remote deletion pending.
    pub deleted: bool,
    pub body: Body,
}

/// A remote resource fetched but not yet materialized locally.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RemoteResource {
    pub href: Href,
    pub etag: ETag,
    pub body: Body,
}
