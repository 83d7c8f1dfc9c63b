// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::types::Href;

/// `CardDAV` client errors.
#[non_exhaustive]
#[derive(Debug)]
pub enum CardDavError {
    /// Network-level failure: connection, timeout, TLS, body read.
    Transport(String),

    /// The server answered with an unexpected HTTP status.
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// XML parsing/writing error.
    Xml(String),

    /// Authentication error.
    Auth(String),

    /// Resource not found.
    NotFound(Href),

    /// Precondition failed (`If-Match`/`If-None-Match` not satisfied).
    PreconditionFailed(Href),

    /// Server doesn't support `CardDAV`.
    NotACardDavServer,

    /// Invalid response from server.
    InvalidResponse(String),

    /// Configuration error.
    Config(String),
}

impl CardDavError {
    /// Whether retrying the same request later could succeed.
    ///
    /// Network failures and server-side (5xx) errors are transient; everything
    /// else reflects a problem with the request or the server's answer.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for CardDavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {e}"),
            Self::Status { code, body } => write!(f, "HTTP error {code}: {body}"),
            Self::Xml(e) => write!(f, "XML error: {e}"),
            Self::Auth(e) => write!(f, "Authentication failed: {e}"),
            Self::NotFound(href) => write!(f, "Resource not found: {href}"),
            Self::PreconditionFailed(href) => write!(f, "Precondition failed: {href}"),
            Self::NotACardDavServer => write!(f, "Server doesn't support CardDAV"),
            Self::InvalidResponse(e) => write!(f, "Invalid server response: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for CardDavError {}

impl From<reqwest::Error> for CardDavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<quick_xml::Error> for CardDavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for CardDavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
