// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::collection::LocalCollection;
use crate::error::SyncError;
use crate::types::{Body, ETag, Href, LocalId, LocalRecord};

/// Contact records of one remote collection, stored in SQLite.
///
/// Every query is scoped by the collection, so records pulled from one
/// address book never take part in a sync with another.
#[derive(Debug, Clone)]
pub struct AddressBook {
    pool: SqlitePool,
    collection: String,
}

impl AddressBook {
    pub fn new(pool: SqlitePool, collection: String) -> Self {
        Self { pool, collection }
    }

    /// The remote collection these records belong to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Adds a contact created by the user. It is pushed by the next sync.
    pub async fn create(&self, body: &Body) -> Result<LocalId, SyncError> {
        const SQL: &str =
            "INSERT INTO records (collection, dirty, body) VALUES (?, 1, ?) RETURNING id;";

        let id: i64 = sqlx::query_scalar(SQL)
            .bind(&self.collection)
            .bind(body.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(LocalId(id))
    }

    /// Replaces the body of a contact and marks it dirty.
    pub async fn edit(&self, local_id: LocalId, body: &Body) -> Result<(), SyncError> {
        const SQL: &str = "\
UPDATE records SET body = ?, dirty = 1
WHERE id = ? AND collection = ? AND deleted = 0;
";

        let done = sqlx::query(SQL)
            .bind(body.as_str())
            .bind(local_id.0)
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        ensure_found(done.rows_affected(), local_id)
    }

    /// Removes a contact. A contact that was synced before is kept as a
    /// tombstone until the deletion reaches the remote.
    pub async fn remove(&self, local_id: LocalId) -> Result<(), SyncError> {
        const SQL: &str = "\
DELETE FROM records WHERE id = ? AND collection = ? AND href IS NULL;
";
        const TOMBSTONE: &str = "\
UPDATE records SET deleted = 1
WHERE id = ? AND collection = ? AND href IS NOT NULL AND deleted = 0;
";

        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query(SQL)
            .bind(local_id.0)
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let tombstoned = sqlx::query(TOMBSTONE)
            .bind(local_id.0)
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        ensure_found(removed + tombstoned, local_id)
    }

    /// Gets a contact, tombstones included.
    pub async fn get(&self, local_id: LocalId) -> Result<Option<LocalRecord>, SyncError> {
        const SQL: &str = "\
SELECT id, href, etag, dirty, deleted, body
FROM records
WHERE id = ? AND collection = ?;
";

        let row: Option<RecordRow> = sqlx::query_as(SQL)
            .bind(local_id.0)
            .bind(&self.collection)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Lists all live contacts.
    pub async fn list(&self) -> Result<Vec<LocalRecord>, SyncError> {
        const SQL: &str = "\
SELECT id, href, etag, dirty, deleted, body
FROM records
WHERE collection = ? AND deleted = 0
ORDER BY id;
";

        let rows: Vec<RecordRow> = sqlx::query_as(SQL)
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Counts live contacts and contacts waiting to be pushed.
    pub async fn count(&self) -> Result<(i64, i64), SyncError> {
        const SQL: &str = "\
SELECT
    COALESCE(SUM(CASE WHEN deleted = 0 THEN 1 ELSE 0 END), 0),
    COALESCE(SUM(CASE WHEN dirty = 1 OR deleted = 1 THEN 1 ELSE 0 END), 0)
FROM records
WHERE collection = ?;
";

        let row: (i64, i64) = sqlx::query_as(SQL)
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl LocalCollection for AddressBook {
    async fn list_dirty(&self) -> Result<Vec<LocalRecord>, SyncError> {
        const SQL: &str = "\
SELECT id, href, etag, dirty, deleted, body
FROM records
WHERE collection = ? AND (dirty = 1 OR deleted = 1)
ORDER BY id;
";

        let rows: Vec<RecordRow> = sqlx::query_as(SQL)
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_remote_identity(&self) -> Result<HashMap<Href, LocalRecord>, SyncError> {
        const SQL: &str = "\
SELECT id, href, etag, dirty, deleted, body
FROM records
WHERE collection = ? AND href IS NOT NULL;
";

        let rows: Vec<RecordRow> = sqlx::query_as(SQL)
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(LocalRecord::from)
            .filter_map(|r| Some((r.href.clone()?, r)))
            .collect())
    }

    async fn insert(&self, href: &Href, etag: &ETag, body: &Body) -> Result<LocalId, SyncError> {
        const SQL: &str = "\
INSERT INTO records (collection, href, etag, dirty, deleted, body)
VALUES (?, ?, ?, 0, 0, ?)
ON CONFLICT(collection, href) DO UPDATE SET
    etag    = excluded.etag,
    body    = excluded.body,
    dirty   = 0,
    deleted = 0
RETURNING id;
";

        let id: i64 = sqlx::query_scalar(SQL)
            .bind(&self.collection)
            .bind(href.as_str())
            .bind(etag.as_str())
            .bind(body.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(LocalId(id))
    }

    async fn update(&self, local_id: LocalId, etag: &ETag, body: &Body) -> Result<(), SyncError> {
        const SQL: &str = "\
UPDATE records
SET etag = ?, body = ?, dirty = 0, deleted = 0
WHERE id = ? AND collection = ?;
";

        let done = sqlx::query(SQL)
            .bind(etag.as_str())
            .bind(body.as_str())
            .bind(local_id.0)
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        ensure_found(done.rows_affected(), local_id)
    }

    async fn delete(&self, local_id: LocalId) -> Result<(), SyncError> {
        let done = sqlx::query("DELETE FROM records WHERE id = ? AND collection = ?;")
            .bind(local_id.0)
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        ensure_found(done.rows_affected(), local_id)
    }

    async fn clear_dirty(
        &self,
        local_id: LocalId,
        href: &Href,
        etag: &ETag,
    ) -> Result<(), SyncError> {
        const SQL: &str = "\
UPDATE records
SET href = ?, etag = ?, dirty = 0
WHERE id = ? AND collection = ?;
";

        let done = sqlx::query(SQL)
            .bind(href.as_str())
            .bind(etag.as_str())
            .bind(local_id.0)
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        ensure_found(done.rows_affected(), local_id)
    }
}

fn ensure_found(rows_affected: u64, local_id: LocalId) -> Result<(), SyncError> {
    match rows_affected {
        0 => Err(SyncError::NotFound(format!("local record {local_id}"))),
        _ => Ok(()),
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: i64,
    href: Option<String>,
    etag: Option<String>,
    dirty: bool,
    deleted: bool,
    body: String,
}

impl From<RecordRow> for LocalRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            local_id: LocalId(row.id),
            href: row.href.map(Href::new),
            etag: row.etag.map(ETag::new),
            dirty: row.dirty,
            deleted: row.deleted,
            body: Body::new(row.body),
        }
    }
}
