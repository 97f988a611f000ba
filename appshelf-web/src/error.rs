use appshelf_http::HttpError;
use thiserror::Error;

/// Terminal outcomes of a scrape. Nothing is retried and no partial result is
/// returned alongside an error.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The page links no web-app manifest, so it is not a web app.
    #[error("no manifest file linked from {url}")]
    NoManifest { url: String },

    #[error("bad response from {url}. {status}: {status_text}")]
    BadResponse {
        url: String,
        status: u16,
        status_text: String,
    },

    /// Network failure, timeout, or an oversized body.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A body could not be decoded (for example malformed manifest JSON).
    #[error("parse failed: {0}")]
    Parse(String),
}

impl From<HttpError> for ScrapeError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status {
                url,
                status,
                status_text,
            } => ScrapeError::BadResponse {
                url,
                status: status.as_u16(),
                status_text,
            },
            HttpError::Url(msg) => ScrapeError::InvalidUrl(msg),
            HttpError::Decode(msg, _) => ScrapeError::Parse(msg),
            other @ (HttpError::Network(_)
            | HttpError::Timeout(_)
            | HttpError::Build(_)
            | HttpError::TooLarge { .. }) => {
                ScrapeError::Fetch(other.to_string())
            }
        }
    }
}
