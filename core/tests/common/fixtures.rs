// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories for integration tests.

use std::path::Path;

use davsync_carddav::{AuthMethod, CardDavConfig};
use davsync_core::{Body, Config, Href, SyncConfig, SyncOptions};

/// Href of the remote collection used by the in-memory remote.
pub const COLLECTION: &str = "/ab/contacts/";

/// Href of a member of [`COLLECTION`].
#[must_use]
pub fn member(name: &str) -> Href {
    Href::from(format!("{COLLECTION}{name}.vcf"))
}

/// A minimal vCard for a person called `name`.
#[must_use]
pub fn vcard(name: &str) -> Body {
    Body::from(format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:{name}\r\nFN:{name}\r\nEND:VCARD\r\n"
    ))
}

#[must_use]
pub fn options(multiget_batch_size: usize, max_in_flight: usize) -> SyncOptions {
    SyncOptions {
        max_in_flight,
        multiget_batch_size,
    }
}

/// Creates a configuration pointing at `base_url`, keeping state in `state_dir`.
#[must_use]
pub fn test_config(base_url: &str, state_dir: &Path) -> Config {
    Config {
        remote: CardDavConfig {
            addressbook_home: Some(Href::from("/ab/")),
            auth: AuthMethod::Basic {
                username: "alice".to_string(),
                password: "secret".to_string(),
            },
            ..CardDavConfig::new(base_url, COLLECTION)
        },
        sync: SyncConfig {
            state_dir: Some(state_dir.to_path_buf()),
            ..SyncConfig::default()
        },
    }
}
