// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use davsync_carddav::{AddressBookCollection, CardDavClient};
use tokio::fs;

use crate::localdb::{AddressBook, LocalDb, SqliteStateStore};
use crate::reconciler::Reconciler;
use crate::remote::DavAddressBook;
use crate::result::SyncResult;
use crate::state::{StateStore, SyncState};
use crate::{Config, SyncError};

/// A local address book paired with a remote `CardDAV` collection.
#[derive(Debug, Clone)]
pub struct Davsync {
    config: Config,
    db: LocalDb,
    address_book: AddressBook,
    remote: DavAddressBook,
}

impl Davsync {
    /// Opens the local database and prepares the remote client.
    pub async fn new(mut config: Config) -> Result<Self, Box<dyn Error>> {
        config.normalize()?;
        prepare(&config).await?;

        let db = LocalDb::open(config.database_path().as_deref())
            .await
            .map_err(|e| format!("Failed to initialize db: {e}"))?;

        let client = CardDavClient::new(config.remote.clone())
            .map_err(|e| format!("Failed to create CardDAV client: {e}"))?;
        let remote = DavAddressBook::new(client, config.remote.collection.clone());
        let address_book = db.address_book(remote.collection().as_str());

        Ok(Self {
            config,
            db,
            address_book,
            remote,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The local contacts of the configured collection.
    pub fn address_book(&self) -> &AddressBook {
        &self.address_book
    }

    pub fn remote(&self) -> &DavAddressBook {
        &self.remote
    }

    /// Runs one sync pass with the configured policy.
    pub async fn sync(&self) -> Result<SyncResult, SyncError> {
        let reconciler = Reconciler::new(self.config.sync.options(), self.config.sync.conflict);
        reconciler
            .run(&self.address_book, &self.remote, &self.state_store())
            .await
    }

    /// What the last completed pass saw of the remote collection.
    pub async fn sync_state(&self) -> Result<SyncState, SyncError> {
        self.state_store().load().await
    }

    /// Lists the address books in the configured home set.
    pub async fn list_address_books(&self) -> Result<Vec<AddressBookCollection>, SyncError> {
        Ok(self.remote.client().list_address_books().await?)
    }

    /// Close the instance, saving any pending changes.
    pub async fn close(self) -> Result<(), Box<dyn Error>> {
        self.db.close().await?;
        Ok(())
    }

    fn state_store(&self) -> SqliteStateStore {
        self.db.state_store(self.remote.collection().as_str())
    }
}

async fn prepare(config: &Config) -> Result<(), Box<dyn Error>> {
    if let Some(state_dir) = &config.sync.state_dir {
        tracing::info!(path = %state_dir.display(), "ensuring state directory exists");
        fs::create_dir_all(state_dir).await?;
    }
    Ok(())
}
