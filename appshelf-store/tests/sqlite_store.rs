use appshelf_common::{Icon, StoredEntry, WebAppDescriptor};
use appshelf_store::{EntryStore, SqliteEntryStore, StoreLayout};
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;

async fn memory_store(layout: StoreLayout) -> SqliteEntryStore {
    SqliteEntryStore::connect("sqlite::memory:", layout)
        .await
        .expect("in-memory store")
}

fn entry(url: &str, name: &str, age: Duration) -> StoredEntry {
    StoredEntry {
        descriptor: WebAppDescriptor {
            name: Some(name.to_string()),
            icons: Some(Icon {
                src: format!("{url}icon512.png"),
                sizes: Some(512),
            }),
            theme_color: Some("#4E3F30".into()),
            ..WebAppDescriptor::new(url)
        },
        category: vec!["podcasts".into()],
        timestamp: (Utc::now() - age).timestamp_millis(),
    }
}

#[tokio::test]
async fn save_then_get() {
    let store = memory_store(StoreLayout::default()).await;
    let saved = entry("https://podle.audio/", "Podle", Duration::zero());
    store.save(&saved).await.unwrap();

    let got = store.get("https://podle.audio/").await.unwrap();
    assert_eq!(got, Some(saved));
    assert_eq!(store.get("https://elsewhere.test/").await.unwrap(), None);
}

#[tokio::test]
async fn lists_newest_first_with_limit() {
    let store = memory_store(StoreLayout::default()).await;
    store
        .save(&entry("https://a.test/", "A", Duration::hours(3)))
        .await
        .unwrap();
    store
        .save(&entry("https://b.test/", "B", Duration::hours(1)))
        .await
        .unwrap();
    store
        .save(&entry("https://c.test/", "C", Duration::hours(2)))
        .await
        .unwrap();

    let names: Vec<_> = store
        .list_recent(10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.descriptor.name.unwrap())
        .collect();
    assert_eq!(names, ["B", "C", "A"]);

    assert_eq!(store.list_recent(2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn expired_entries_disappear() {
    let store = memory_store(StoreLayout::new("webapp", "v4", 30)).await;
    store
        .save(&entry("https://old.test/", "Old", Duration::days(31)))
        .await
        .unwrap();
    store
        .save(&entry("https://fresh.test/", "Fresh", Duration::days(29)))
        .await
        .unwrap();

    assert_eq!(store.get("https://old.test/").await.unwrap(), None);
    let listed = store.list_recent(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].url(), "https://fresh.test/");
}

#[tokio::test]
async fn saving_again_replaces_entry() {
    let store = memory_store(StoreLayout::default()).await;
    store
        .save(&entry("https://podle.audio/", "Podle", Duration::hours(5)))
        .await
        .unwrap();
    let mut updated = entry("https://podle.audio/", "Podle 2", Duration::zero());
    updated.category = vec!["audio".into(), "podcasts".into()];
    store.save(&updated).await.unwrap();

    let listed = store.list_recent(10).await.unwrap();
    assert_eq!(listed, vec![updated]);
}

#[tokio::test]
async fn remove_drops_entry_and_membership() {
    let store = memory_store(StoreLayout::default()).await;
    store
        .save(&entry("https://podle.audio/", "Podle", Duration::zero()))
        .await
        .unwrap();

    assert!(store.remove("https://podle.audio/").await.unwrap());
    assert!(!store.remove("https://podle.audio/").await.unwrap());
    assert!(store.list_recent(10).await.unwrap().is_empty());
    assert_eq!(store.get("https://podle.audio/").await.unwrap(), None);
}

#[tokio::test]
async fn index_versions_are_isolated() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let v3 = SqliteEntryStore::from_pool(pool.clone(), StoreLayout::new("webapp", "v3", 30))
        .await
        .unwrap();
    let v4 = SqliteEntryStore::from_pool(pool, StoreLayout::new("webapp", "v4", 30))
        .await
        .unwrap();

    v3.save(&entry("https://legacy.test/", "Legacy", Duration::zero()))
        .await
        .unwrap();

    assert!(v4.list_recent(10).await.unwrap().is_empty());
    assert_eq!(v3.list_recent(10).await.unwrap().len(), 1);
    // entry keys are not versioned, only the index is
    assert!(v4.get("https://legacy.test/").await.unwrap().is_some());
}
