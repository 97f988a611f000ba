//! Persistence for confirmed web app entries.
//!
//! Entries behave like a key-value store with per-key expiry plus one index
//! set per layout version that enumerates saved keys, newest first. Callers
//! construct a store once and hand it around as `Arc<dyn EntryStore>`.
use appshelf_common::StoredEntry;
use chrono::Duration;

mod sqlite;

pub use sqlite::SqliteEntryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode entry: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored value no longer deserializes as an entry.
    #[error("corrupt entry at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key naming and retention for saved entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub namespace: String,
    pub index_version: String,
    pub ttl: Duration,
}

impl StoreLayout {
    pub fn new(namespace: impl Into<String>, index_version: impl Into<String>, ttl_days: u32) -> Self {
        Self {
            namespace: namespace.into(),
            index_version: index_version.into(),
            ttl: Duration::days(i64::from(ttl_days)),
        }
    }

    /// ```
    /// use appshelf_store::StoreLayout;
    ///
    /// let layout = StoreLayout::new("webapp", "v4", 30);
    /// assert_eq!(layout.entry_key("https://podle.audio/"), "webapp:https://podle.audio/");
    /// ```
    pub fn entry_key(&self, url: &str) -> String {
        format!("{}:{}", self.namespace, url)
    }

    /// ```
    /// use appshelf_store::StoreLayout;
    ///
    /// assert_eq!(StoreLayout::new("webapp", "v4", 30).index_key(), "webapp:index:v4");
    /// ```
    pub fn index_key(&self) -> String {
        format!("{}:index:{}", self.namespace, self.index_version)
    }

    /// Epoch ms after which an entry saved at `timestamp` is gone.
    pub fn expires_at(&self, timestamp: i64) -> i64 {
        timestamp.saturating_add(self.ttl.num_milliseconds())
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::new("webapp", "v4", 30)
    }
}

#[async_trait::async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert or replace the entry for `entry.descriptor.url` and refresh its expiry.
    async fn save(&self, entry: &StoredEntry) -> Result<(), StoreError>;

    /// The live entry saved for `url`, if any.
    async fn get(&self, url: &str) -> Result<Option<StoredEntry>, StoreError>;

    /// Up to `limit` live entries from the index, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredEntry>, StoreError>;

    /// Drop the entry and its index membership. Returns whether anything was removed.
    async fn remove(&self, url: &str) -> Result<bool, StoreError>;
}
