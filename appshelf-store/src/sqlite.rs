//! SQLite-backed [`EntryStore`].
//!
//! Two tables emulate a key-value store: `kv_entry` holds JSON values with an
//! absolute expiry, `kv_index` is a scored set (score = save time) per index
//! key. Expired rows are purged lazily whenever the index is listed.
use std::str::FromStr;

use appshelf_common::StoredEntry;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::{EntryStore, StoreError, StoreLayout};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS kv_entry (
        key        TEXT PRIMARY KEY,
        value      TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS kv_index (
        index_key TEXT NOT NULL,
        member    TEXT NOT NULL,
        score     INTEGER NOT NULL,
        PRIMARY KEY (index_key, member)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS kv_index_score ON kv_index (index_key, score DESC)"#,
];

pub struct SqliteEntryStore {
    pool: SqlitePool,
    layout: StoreLayout,
}

impl SqliteEntryStore {
    /// Open (creating if needed) the database at `database_url`.
    pub async fn connect(database_url: &str, layout: StoreLayout) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // every connection to :memory: would get its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::from_pool(pool, layout).await
    }

    /// Wrap an existing pool, making sure the schema exists.
    pub async fn from_pool(pool: SqlitePool, layout: StoreLayout) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        debug!(index_key=%layout.index_key(), "store.schema_ready");
        Ok(Self { pool, layout })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    async fn purge_expired(&self, now: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let entries = sqlx::query("DELETE FROM kv_entry WHERE expires_at <= ?1")
            .bind(now)
            .execute(&mut *tx)
            .await?;
        let members = sqlx::query(
            r#"DELETE FROM kv_index
               WHERE index_key = ?1
                 AND member NOT IN (SELECT key FROM kv_entry)"#,
        )
        .bind(self.layout.index_key())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        if entries.rows_affected() > 0 || members.rows_affected() > 0 {
            info!(
                expired_entries = entries.rows_affected(),
                stale_members = members.rows_affected(),
                "store.purge_expired"
            );
        }
        Ok(())
    }
}

fn decode(key: &str, value: &str) -> Result<StoredEntry, StoreError> {
    serde_json::from_str(value).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

#[async_trait::async_trait]
impl EntryStore for SqliteEntryStore {
    async fn save(&self, entry: &StoredEntry) -> Result<(), StoreError> {
        let key = self.layout.entry_key(entry.url());
        let value = serde_json::to_string(entry).map_err(StoreError::Encode)?;
        let expires_at = self.layout.expires_at(entry.timestamp);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO kv_entry (key, value, expires_at)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET
                 value=excluded.value,
                 expires_at=excluded.expires_at"#,
        )
        .bind(&key)
        .bind(&value)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"INSERT INTO kv_index (index_key, member, score)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(index_key, member) DO UPDATE SET score=excluded.score"#,
        )
        .bind(self.layout.index_key())
        .bind(&key)
        .bind(entry.timestamp)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            key=%key,
            index_key=%self.layout.index_key(),
            categories=entry.category.len(),
            expires_at,
            "store.save"
        );
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<StoredEntry>, StoreError> {
        let key = self.layout.entry_key(url);
        let now = Utc::now().timestamp_millis();
        let row = sqlx::query("SELECT value FROM kv_entry WHERE key = ?1 AND expires_at > ?2")
            .bind(&key)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let value: String = row.try_get("value")?;
                debug!(key=%key, "store.get.hit");
                decode(&key, &value).map(Some)
            }
            None => {
                debug!(key=%key, "store.get.miss");
                Ok(None)
            }
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredEntry>, StoreError> {
        let now = Utc::now().timestamp_millis();
        self.purge_expired(now).await?;

        let rows = sqlx::query(
            r#"SELECT e.key, e.value
               FROM kv_index i
               JOIN kv_entry e ON e.key = i.member
               WHERE i.index_key = ?1
                 AND e.expires_at > ?2
               ORDER BY i.score DESC, e.key ASC
               LIMIT ?3"#,
        )
        .bind(self.layout.index_key())
        .bind(now)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            match decode(&key, &value) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(key=%key, error=%err, "store.list_recent.skip_corrupt"),
            }
        }
        info!(
            index_key=%self.layout.index_key(),
            limit,
            rows=entries.len(),
            "store.list_recent"
        );
        Ok(entries)
    }

    async fn remove(&self, url: &str) -> Result<bool, StoreError> {
        let key = self.layout.entry_key(url);
        let mut tx = self.pool.begin().await?;
        let entry = sqlx::query("DELETE FROM kv_entry WHERE key = ?1")
            .bind(&key)
            .execute(&mut *tx)
            .await?;
        let member = sqlx::query("DELETE FROM kv_index WHERE index_key = ?1 AND member = ?2")
            .bind(self.layout.index_key())
            .bind(&key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let removed = entry.rows_affected() > 0 || member.rows_affected() > 0;
        info!(key=%key, removed, "store.remove");
        Ok(removed)
    }
}
