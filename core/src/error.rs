// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use davsync_carddav::CardDavError;

use crate::types::{Href, LocalId};

/// Errors raised while synchronizing a collection pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Network failure, timeout or server-side (5xx) error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected answer from the remote.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote resource changed since its `ETag` was last seen.
    #[error("precondition failed for {0}")]
    PreconditionFailed(Href),

    /// A create was refused because the resource already exists.
    #[error("resource already exists: {0}")]
    Conflict(Href),

    /// The local store failed to read or write.
    #[error("local store error: {0}")]
    StoreWrite(String),

    /// The addressed record or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Discriminant of [`SyncError`], reported per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Transport,
    Protocol,
    PreconditionFailed,
    Conflict,
    StoreWrite,
    NotFound,
}

impl SyncError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::StoreWrite(_) => ErrorKind::StoreWrite,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        Self::StoreWrite(e.to_string())
    }
}

impl From<CardDavError> for SyncError {
    fn from(e: CardDavError) -> Self {
        match e {
            CardDavError::PreconditionFailed(href) => Self::PreconditionFailed(href),
            CardDavError::NotFound(href) => Self::NotFound(href.into_string()),
            e if e.is_transient() => Self::Transport(e.to_string()),
            e => Self::Protocol(e.to_string()),
        }
    }
}

/// Identity a per-record error is reported against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(untagged)]
pub enum Identity {
    /// A remote resource.
    Remote(Href),
    /// A local record never pushed.
    Local(LocalId),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(href) => href.fmt(f),
            Self::Local(id) => write!(f, "local:{id}"),
        }
    }
}

/// A failure that affected a single record and left its state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RecordError {
    pub identity: Identity,
    pub kind: ErrorKind,
    pub message: String,
}

impl RecordError {
    pub fn new(identity: Identity, error: &SyncError) -> Self {
        Self {
            identity,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}
