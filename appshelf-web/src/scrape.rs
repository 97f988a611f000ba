//! The fetch + merge pipeline: load a page, follow its manifest link, merge.
use std::sync::Arc;

use appshelf_common::WebAppDescriptor;
use appshelf_http::{HttpClient, RequestOpts};
use serde_json::Value;
use url::Url;

use crate::error::ScrapeError;
use crate::extract::{PageMetadata, extract_page_metadata};
use crate::manifest::{ManifestDocument, merge};
use crate::page::{HttpPageLoader, PageLoader};

/// Result of a successful scrape.
#[derive(Debug, Clone)]
pub struct ScrapedApp {
    pub page: PageMetadata,
    pub descriptor: WebAppDescriptor,
}

/// Builds web app descriptors from URLs.
///
/// Holds no per-request state; one instance can serve concurrent callers.
#[derive(Clone)]
pub struct Scraper {
    loader: Arc<dyn PageLoader>,
    http: HttpClient,
}

impl Scraper {
    /// Scraper that loads pages and manifests with the same client.
    pub fn new(http: HttpClient) -> Self {
        Self {
            loader: Arc::new(HttpPageLoader::new(http.clone())),
            http,
        }
    }

    pub fn with_loader(loader: Arc<dyn PageLoader>, http: HttpClient) -> Self {
        Self { loader, http }
    }

    /// Load `url`, fetch the manifest it links, and merge the two.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedApp, ScrapeError> {
        let requested = url.trim();
        let parsed =
            Url::parse(requested).map_err(|e| ScrapeError::InvalidUrl(format!("{requested}: {e}")))?;
        tracing::info!(url=%requested, "scrape.start");

        let page = self.loader.load(&parsed).await?;
        let metadata = extract_page_metadata(&page.html, &page.url, requested);
        tracing::debug!(
            url=%requested,
            final_url=%page.url,
            title=?metadata.title,
            icon_count=metadata.icons.len(),
            manifest=?metadata.manifest_href,
            "scrape.page.extracted"
        );

        let Some(manifest_href) = metadata.manifest_href.clone() else {
            tracing::info!(url=%requested, "scrape.no_manifest");
            return Err(ScrapeError::NoManifest {
                url: requested.to_string(),
            });
        };

        let raw: Value = self
            .http
            .get_json(&manifest_href, RequestOpts::default())
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    url=%requested,
                    manifest=%manifest_href,
                    error=%e,
                    "scrape.manifest.failed"
                )
            })?;
        let manifest = ManifestDocument::from_value(&raw);
        let descriptor = merge(&manifest, &metadata);

        tracing::info!(
            url=%requested,
            name=?descriptor.name,
            icon=?descriptor.icons.as_ref().map(|i| i.src.as_str()),
            "scrape.done"
        );
        Ok(ScrapedApp {
            page: metadata,
            descriptor,
        })
    }
}
