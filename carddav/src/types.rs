// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "` from a string.")]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the value, returning the inner string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_newtype!(
    /// Resource href (path).
    ///
    /// A `Href` is the server-side path of a `WebDAV` resource, such as
    /// `/addressbooks/user/contacts/alice.vcf`. It is the stable remote identity
    /// of a contact.
    Href
);

string_newtype!(
    /// Entity tag for change detection.
    ///
    /// Used for optimistic concurrency control (`If-Match`) and to notice that
    /// a resource changed since it was last seen. Kept verbatim, weak tags included.
    ETag
);

impl Href {
    /// Normalizes an href reported by a server.
    ///
    /// Some servers answer with absolute URLs; only the path is kept so that
    /// hrefs compare equal regardless of how they were reported.
    #[must_use]
    pub fn from_server(raw: &str) -> Self {
        let raw = raw.trim();
        let path = match raw.find("://") {
            Some(idx) => {
                let rest = raw.get(idx + 3..).unwrap_or_default();
                rest.find('/').and_then(|i| rest.get(i..)).unwrap_or("/")
            }
            None => raw,
        };
        Self(path.to_string())
    }

    /// Whether both hrefs name the same resource, ignoring a trailing slash.
    #[must_use]
    pub fn same_resource(&self, other: &Href) -> bool {
        self.0.trim_end_matches('/') == other.0.trim_end_matches('/')
    }

    /// Appends a member name to this collection href.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let base = self.0.trim_end_matches('/');
        Self(format!("{base}/{}", name.trim_start_matches('/')))
    }

    /// Returns the last non-empty path segment, or `/` for the root.
    #[must_use]
    pub fn last_segment(&self) -> &str {
        self.0
            .split('/')
            .rev()
            .find(|s| !s.is_empty())
            .unwrap_or("/")
    }
}

/// An address object resource.
///
/// A single contact stored on a `CardDAV` server: its href, `ETag` and raw
/// vCard data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressObject {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag of the resource.
    pub etag: ETag,
    /// The vCard data, exactly as served.
    pub data: String,
}

impl AddressObject {
    /// Creates a new `AddressObject`.
    #[must_use]
    pub const fn new(href: Href, etag: ETag, data: String) -> Self {
        Self { href, etag, data }
    }
}

/// Address book collection metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBookCollection {
    /// The href of the address book collection.
    pub href: Href,
    /// The display name of the address book.
    pub display_name: Option<String>,
    /// The description of the address book.
    pub description: Option<String>,
    /// The collection tag (`CS:getctag`) for change detection.
    pub ctag: Option<String>,
    /// The `DAV:sync-token` (RFC 6578), if the server supports collection sync.
    pub sync_token: Option<String>,
}

impl AddressBookCollection {
    /// Creates a new `AddressBookCollection`.
    #[must_use]
    pub const fn new(href: Href) -> Self {
        Self {
            href,
            display_name: None,
            description: None,
            ctag: None,
            sync_token: None,
        }
    }
}
