//! Subcommand handlers. Each writes pretty JSON to `out` so the binary and the
//! tests share one code path.
use std::io::Write;

use anyhow::{Context, Result};
use appshelf_common::{StoredEntry, WebAppDescriptor};
use appshelf_store::EntryStore;
use appshelf_web::Scraper;
use serde::Serialize;

use crate::featured::featured_apps;

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

async fn scrape_descriptor(scraper: &Scraper, url: &str) -> Result<WebAppDescriptor> {
    let scraped = scraper
        .scrape(url)
        .await
        .with_context(|| format!("could not read web app data from {url}"))?;
    Ok(scraped.descriptor)
}

pub async fn scrape(scraper: &Scraper, url: &str, out: &mut impl Write) -> Result<()> {
    let descriptor = scrape_descriptor(scraper, url).await?;
    print_json(out, &descriptor)
}

/// Scrape `url` and keep the result. Nothing is written when the scrape fails.
pub async fn save(
    scraper: &Scraper,
    store: &dyn EntryStore,
    url: &str,
    categories: Vec<String>,
    out: &mut impl Write,
) -> Result<()> {
    let descriptor = scrape_descriptor(scraper, url).await?;
    let entry = StoredEntry::now(descriptor, categories);
    store.save(&entry).await.context("saving entry")?;
    tracing::info!(url=%entry.url(), "app.saved");
    print_json(out, &entry)
}

/// Up to `limit` saved entries; the featured apps when nothing is saved.
pub async fn list(store: &dyn EntryStore, limit: usize, out: &mut impl Write) -> Result<()> {
    let entries = store.list_recent(limit).await.context("listing entries")?;
    // with a zero limit an empty result says nothing about the store
    if entries.is_empty() && limit > 0 {
        tracing::debug!("app.list.empty_showing_featured");
        return featured(out);
    }
    print_json(out, &entries)
}

pub fn featured(out: &mut impl Write) -> Result<()> {
    print_json(out, &featured_apps())
}

pub async fn remove(store: &dyn EntryStore, url: &str, out: &mut impl Write) -> Result<()> {
    let removed = store.remove(url).await.context("removing entry")?;
    print_json(out, &serde_json::json!({ "url": url, "removed": removed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use appshelf_http::HttpClient;
    use appshelf_store::{SqliteEntryStore, StoreLayout};
    use serde_json::Value;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn memory_store() -> SqliteEntryStore {
        SqliteEntryStore::connect("sqlite::memory:", StoreLayout::default())
            .await
            .unwrap()
    }

    async fn app_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><head><title>Horn</title>
                   <meta name="description" content="Loud">
                   <link rel="manifest" href="/manifest.json"></head></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "The Air Horner",
                "icons": [{ "src": "/icon-512.png", "sizes": "512x512" }],
                "theme_color": "#2196F3"
            })))
            .mount(&server)
            .await;
        server
    }

    fn parse(out: Vec<u8>) -> Value {
        serde_json::from_slice(&out).unwrap()
    }

    #[tokio::test]
    async fn empty_store_lists_featured_apps() {
        let store = memory_store().await;
        let mut out = Vec::new();
        list(&store, 10, &mut out).await.unwrap();

        let v = parse(out);
        assert_eq!(v.as_array().map(Vec::len), Some(3));
        assert_eq!(v[0]["name"], "Podle");
        assert_eq!(v[0]["icons"]["sizes"], 512);
    }

    #[tokio::test]
    async fn zero_limit_lists_nothing_even_with_saved_entries() {
        let store = memory_store().await;
        let entry = StoredEntry::now(WebAppDescriptor::new("https://podle.audio/"), Vec::new());
        store.save(&entry).await.unwrap();

        let mut out = Vec::new();
        list(&store, 0, &mut out).await.unwrap();
        assert_eq!(parse(out), serde_json::json!([]));

        let mut out = Vec::new();
        list(&store, 5, &mut out).await.unwrap();
        assert_eq!(parse(out)[0]["url"], "https://podle.audio/");
    }

    #[tokio::test]
    async fn save_then_list_and_remove() {
        let server = app_server().await;
        let url = format!("{}/", server.uri());
        let scraper = Scraper::new(HttpClient::new().unwrap());
        let store = memory_store().await;

        let mut out = Vec::new();
        save(&scraper, &store, &url, vec!["music".into()], &mut out)
            .await
            .unwrap();
        let saved = parse(out);
        assert_eq!(saved["name"], "The Air Horner");
        assert_eq!(saved["category"], serde_json::json!(["music"]));
        assert!(saved["timestamp"].as_i64().is_some());

        let mut out = Vec::new();
        list(&store, 10, &mut out).await.unwrap();
        let listed = parse(out);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["url"], url.as_str());
        assert_eq!(
            listed[0]["icons"]["src"],
            format!("{}/icon-512.png", server.uri()).as_str()
        );

        let mut out = Vec::new();
        remove(&store, &url, &mut out).await.unwrap();
        assert_eq!(parse(out)["removed"], true);
        assert!(store.get(&url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_scrape_saves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><head><title>Plain</title></head></html>", "text/html"),
            )
            .mount(&server)
            .await;
        let url = format!("{}/", server.uri());
        let scraper = Scraper::new(HttpClient::new().unwrap());
        let store = memory_store().await;

        let mut out = Vec::new();
        let err = save(&scraper, &store, &url, Vec::new(), &mut out)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("no manifest"));
        assert!(out.is_empty());
        assert!(store.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scrape_prints_descriptor() {
        let server = app_server().await;
        let scraper = Scraper::new(HttpClient::new().unwrap());
        let mut out = Vec::new();
        scrape(&scraper, &format!("{}/", server.uri()), &mut out)
            .await
            .unwrap();
        let v = parse(out);
        assert_eq!(v["description"], "Loud");
        assert_eq!(v["theme_color"], "#2196F3");
        assert!(v.get("category").is_none());
    }
}
