// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

mod address_book;
mod sync_state;

use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use crate::localdb::address_book::AddressBook;
pub use crate::localdb::sync_state::SqliteStateStore;

/// Distinguishes in-memory databases opened by the same process.
static IN_MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// The local SQLite database: contact records and sync state.
#[derive(Debug, Clone)]
pub struct LocalDb {
    pool: SqlitePool,
}

impl LocalDb {
    /// Opens a sqlite database connection.
    /// If `filename` is `None`, it opens an in-memory database.
    pub async fn open(filename: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let options = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            SqliteConnectOptions::new()
                .filename(filename.to_str().ok_or("Invalid path encoding")?)
                .create_if_missing(true)
        } else {
            // Shared cache, so that every pooled connection sees the same database
            let db_id = IN_MEMORY_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
            tracing::info!(db_id, "connecting to in-memory SQLite database");
            SqliteConnectOptions::new()
                .filename(format!("file:davsync_memdb_{db_id}:?mode=memory&cache=shared"))
                .in_memory(true)
                .create_if_missing(true)
        };

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| format!("Failed to connect to SQLite database: {e}"))?;

        sqlx::migrate!("src/localdb/migrations") // relative path from the crate root
            .run(&pool)
            .await
            .map_err(|e| format!("Failed to run migrations: {e}"))?;

        Ok(LocalDb { pool })
    }

    /// Contacts paired with the remote collection `collection`.
    pub fn address_book(&self, collection: impl Into<String>) -> AddressBook {
        AddressBook::new(self.pool.clone(), collection.into())
    }

    /// State store for the remote collection `collection`.
    pub fn state_store(&self, collection: impl Into<String>) -> SqliteStateStore {
        SqliteStateStore::new(self.pool.clone(), collection.into())
    }

    pub async fn close(self) -> Result<(), Box<dyn Error>> {
        tracing::debug!("closing database connection");
        self.pool.close().await;
        Ok(())
    }
}
