// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Settings for reaching one remote address book.

use std::fmt;
use std::time::Duration;

use crate::error::CardDavError;
use crate::types::Href;

const DEFAULT_USER_AGENT: &str = concat!("davsync-carddav/", env!("CARGO_PKG_VERSION"));

const fn default_timeout() -> u64 {
    30
}

/// How requests authenticate against the server.
///
/// Secrets are never printed by the `Debug` implementation.
#[derive(Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    /// Anonymous access.
    #[default]
    None,
    /// HTTP basic authentication.
    Basic {
        /// Account name.
        username: String,
        /// Account or app password.
        password: String,
    },
    /// OAuth bearer token.
    Bearer {
        /// Access token.
        token: String,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// The address book collection to sync and the server that hosts it.
///
/// When `addressbook_home` is left out, the home set is discovered from the
/// server root the first time it is needed.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CardDavConfig {
    /// Server root, e.g. `https://dav.example.com`.
    pub base_url: String,
    /// Address book home set, e.g. `/dav/addressbooks/user/`.
    #[serde(default)]
    pub addressbook_home: Option<Href>,
    /// The address book collection, e.g. `/dav/addressbooks/user/contacts/`.
    pub collection: Href,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Overrides the `User-Agent` header.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl CardDavConfig {
    /// Settings for `collection` on `base_url`, anonymous and with defaults elsewhere.
    #[must_use]
    pub fn new(base_url: impl Into<String>, collection: impl Into<Href>) -> Self {
        Self {
            base_url: base_url.into(),
            addressbook_home: None,
            collection: collection.into(),
            auth: AuthMethod::None,
            timeout_secs: default_timeout(),
            user_agent: None,
        }
    }

    /// Checks the settings before any request is made.
    ///
    /// # Errors
    ///
    /// Returns [`CardDavError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), CardDavError> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(CardDavError::Config(format!(
                "base_url must be an http or https URL, got {:?}",
                self.base_url
            )));
        }
        if !self.collection.starts_with('/') {
            return Err(CardDavError::Config(format!(
                "collection must be an absolute path, got {:?}",
                self.collection.as_str()
            )));
        }
        if let Some(home) = self.home().filter(|h| !h.starts_with('/')) {
            return Err(CardDavError::Config(format!(
                "addressbook_home must be an absolute path, got {:?}",
                home.as_str()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(CardDavError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// The configured home set, `None` when it has to be discovered.
    #[must_use]
    pub fn home(&self) -> Option<&Href> {
        self.addressbook_home.as_ref().filter(|h| !h.is_empty())
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Value of the `User-Agent` header.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Full URL of `href` on this server.
    #[must_use]
    pub fn url(&self, href: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), href)
    }
}
