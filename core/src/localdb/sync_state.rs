// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::SyncError;
use crate::state::{StateStore, SyncState};
use crate::types::{CollectionTag, ETag, Href, TagKind};

/// [`StateStore`] keeping the state of one remote collection in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool, collection: String) -> Self {
        Self { pool, collection }
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self) -> Result<SyncState, SyncError> {
        const TAG: &str = "SELECT tag_kind, tag_value FROM sync_state WHERE collection = ?;";
        const ENTRIES: &str = "SELECT href, etag FROM sync_entries WHERE collection = ?;";

        let tag: Option<(Option<String>, Option<String>)> = sqlx::query_as(TAG)
            .bind(&self.collection)
            .fetch_optional(&self.pool)
            .await?;

        let last_collection_tag = match tag {
            Some((Some(kind), Some(value))) => match TagKind::parse(&kind) {
                Some(kind) => Some(CollectionTag { kind, value }),
                None => {
                    tracing::warn!(%kind, "unknown collection tag kind, doing a full sync");
                    None
                }
            },
            _ => None,
        };

        let rows: Vec<(String, String)> = sqlx::query_as(ENTRIES)
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(SyncState {
            last_collection_tag,
            entries: rows
                .into_iter()
                .map(|(href, etag)| (Href::new(href), ETag::new(etag)))
                .collect(),
        })
    }

    async fn save(&self, state: &SyncState) -> Result<(), SyncError> {
        const UPSERT_TAG: &str = "\
INSERT INTO sync_state (collection, tag_kind, tag_value)
VALUES (?, ?, ?)
ON CONFLICT(collection) DO UPDATE SET
    tag_kind  = excluded.tag_kind,
    tag_value = excluded.tag_value;
";
        const CLEAR_ENTRIES: &str = "DELETE FROM sync_entries WHERE collection = ?;";
        const INSERT_ENTRY: &str =
            "INSERT INTO sync_entries (collection, href, etag) VALUES (?, ?, ?);";

        let mut tx = self.pool.begin().await?;

        let tag = state.last_collection_tag.as_ref();
        sqlx::query(UPSERT_TAG)
            .bind(&self.collection)
            .bind(tag.map(|t| t.kind.as_str()))
            .bind(tag.map(|t| t.value.as_str()))
            .execute(&mut *tx)
            .await?;

        sqlx::query(CLEAR_ENTRIES)
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        for (href, etag) in &state.entries {
            sqlx::query(INSERT_ENTRY)
                .bind(&self.collection)
                .bind(href.as_str())
                .bind(etag.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            collection = %self.collection,
            entries = state.entries.len(),
            "sync state saved"
        );
        Ok(())
    }
}
