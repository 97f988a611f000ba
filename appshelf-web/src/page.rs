use appshelf_http::{HttpClient, RequestOpts};
use url::Url;

use crate::error::ScrapeError;

/// A loaded document, ready for extraction.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    /// Where the HTML was actually served from, after redirects.
    pub url: Url,
    pub html: String,
}

/// Something that can turn a URL into an HTML document.
///
/// The default loader fetches static HTML without running scripts; a
/// browser-backed loader can be swapped in behind the same trait.
#[async_trait::async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &Url) -> Result<LoadedPage, ScrapeError>;
}

/// Static HTML over plain HTTP.
#[derive(Clone)]
pub struct HttpPageLoader {
    http: HttpClient,
}

impl HttpPageLoader {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &Url) -> Result<LoadedPage, ScrapeError> {
        let resp = self
            .http
            .get_text(url.as_str(), RequestOpts::default())
            .await?;
        if let Some(ct) = resp.content_type.as_deref() {
            if !ct.contains("html") && !ct.contains("xml") {
                tracing::debug!(url=%url, content_type=%ct, "page.load.unexpected_content_type");
            }
        }
        Ok(LoadedPage {
            url: resp.final_url,
            html: resp.body,
        })
    }
}
