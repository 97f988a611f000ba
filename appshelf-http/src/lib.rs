//! Minimal HTTP client for fetching pages and manifests from arbitrary URLs.
//!
//! - Absolute-URL GETs returning text or JSON
//! - Per-request timeout on top of a connect timeout; no retries
//! - Non-2xx responses surface as [`HttpError::Status`] with code and reason
//! - Optional *raw* request/response logging via `APPSHELF_HTTP_RAW=1`
//!
//! ```no_run
//! # async fn demo() -> Result<(), appshelf_http::HttpError> {
//! let client = appshelf_http::HttpClient::new()?;
//! let manifest: serde_json::Value = client
//!     .get_json("https://example.com/manifest.json", appshelf_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Every request gets a process-unique `req_id` that ties its `http.*` events
//! together.

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const RAW_ENV: &str = "APPSHELF_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;

pub const DEFAULT_USER_AGENT: &str = concat!("appshelf/", env!("CARGO_PKG_VERSION"));

fn raw_enabled() -> bool {
    env::var(RAW_ENV).is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

/// Equivalent `curl` invocation for reproducing a request by hand.
fn make_curl(url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), "-XGET".to_string()];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

const SECRET_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(name, value)| {
            let name = name.as_str();
            let shown = if SECRET_HEADERS.contains(&name) {
                "<redacted>"
            } else {
                value.to_str().unwrap_or("")
            };
            (name.to_string(), shown.to_string())
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("{url} body exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
    #[error("{url} returned {status}: {status_text}")]
    Status {
        url: String,
        status: StatusCode,
        status_text: String,
    },
}

/// Overrides for a single request. Extra headers replace same-named defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub headers: Option<HeaderMap>,
}

/// A successful GET, decoded as text.
#[derive(Debug, Clone)]
pub struct TextResponse {
    /// URL after redirects.
    pub final_url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

/// Largest body read by default: 5 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    pub default_timeout: Duration,
    /// Bodies longer than this fail with [`HttpError::TooLarge`].
    pub max_body_bytes: usize,
}

impl HttpClient {
    /// Client with the default user agent and a 5 s connect timeout.
    ///
    /// ```no_run
    /// use appshelf_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        Self::build(DEFAULT_USER_AGENT, Duration::from_secs(5))
    }

    pub fn build(user_agent: &str, connect_timeout: Duration) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            default_timeout: Duration::from_secs(15),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Total time allowed for a request when [`RequestOpts::timeout`] is unset.
    pub fn with_timeout(self, default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            ..self
        }
    }

    pub fn with_max_body_bytes(self, max_body_bytes: usize) -> Self {
        Self {
            max_body_bytes,
            ..self
        }
    }

    /// GET `url` and return the body as text, decoded with the `charset` of
    /// its `Content-Type` (UTF-8 when absent or unknown). Non-2xx is an error.
    pub async fn get_text(&self, url: &str, opts: RequestOpts) -> Result<TextResponse, HttpError> {
        let fetched = self.get_checked(url, opts, "text/html,*/*;q=0.8").await?;
        let content_type = fetched
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = decode_text(&fetched.body, content_type.as_deref());
        Ok(TextResponse {
            final_url: fetched.final_url,
            status: fetched.status,
            content_type,
            body,
        })
    }

    /// GET `url` and decode the body as JSON. Non-2xx is an error.
    pub async fn get_json<T>(&self, url: &str, opts: RequestOpts) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let fetched = self
            .get_checked(url, opts, "application/manifest+json,application/json,*/*;q=0.5")
            .await?;
        serde_json::from_slice::<T>(&fetched.body).map_err(|err| {
            let snippet = snip_body(&fetched.body);
            tracing::warn!(
                req_id=%fetched.req_id,
                line=err.line(),
                column=err.column(),
                error=%err,
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(err.to_string(), snippet)
        })
    }

    async fn get_checked(
        &self,
        url: &str,
        opts: RequestOpts,
        accept: &'static str,
    ) -> Result<Fetched, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(format!("{url}: {e}")))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Some(extra) = &opts.headers {
            for (k, v) in extra.iter() {
                headers.insert(k, v.clone());
            }
        }

        let req_id = format!("r{}", NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            req_id=%req_id,
            method="GET",
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.as_millis() as u64,
            "http.request.start"
        );
        if raw_enabled() {
            let curl = make_curl(&url, &headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let started = Instant::now();
        let mut resp = self
            .inner
            .get(url.clone())
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| network_error(&req_id, timeout, err, "send"))?;

        let status = resp.status();
        let final_url = resp.url().clone();
        let resp_headers = resp.headers().clone();
        let limit = self.max_body_bytes;
        let too_large = |seen: u64| {
            tracing::warn!(req_id=%req_id, url=%url, seen, limit, "http.response.too_large");
            HttpError::TooLarge {
                url: url.to_string(),
                limit,
            }
        };
        if let Some(declared) = resp.content_length().filter(|&n| n > limit as u64) {
            return Err(too_large(declared));
        }
        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|err| network_error(&req_id, timeout, err, "body"))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large((body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }
        let duration_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms,
            body_len=body.len(),
            final_url=%final_url,
            "http.response.headers"
        );

        if raw_enabled() {
            log_raw_response(&req_id, status, duration_ms, &resp_headers, &body);
        }

        let snippet = snip_body(&body);
        tracing::trace!(req_id=%req_id, body_snippet=%snippet, "http.response.body_snippet");

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("").to_string();
            tracing::warn!(
                req_id=%req_id,
                %status,
                url=%url,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Status {
                url: url.to_string(),
                status,
                status_text,
            });
        }

        Ok(Fetched {
            req_id,
            final_url,
            status,
            headers: resp_headers,
            body,
        })
    }
}

struct Fetched {
    req_id: String,
    final_url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

fn log_raw_response(
    req_id: &str,
    status: StatusCode,
    duration_ms: u64,
    headers: &HeaderMap,
    body: &[u8],
) {
    let truncated = body.len() > RAW_MAX_BODY;
    let shown = &body[..body.len().min(RAW_MAX_BODY)];
    tracing::info!(
        target: "http.raw",
        req_id,
        %status,
        duration_ms,
        headers=?redact_headers(headers),
        body=%String::from_utf8_lossy(shown),
        truncated,
        "response"
    );
}

fn network_error(
    req_id: &str,
    timeout: Duration,
    err: reqwest::Error,
    stage: &'static str,
) -> HttpError {
    let message = err.to_string();
    tracing::warn!(
        req_id,
        timed_out=err.is_timeout(),
        error=%message,
        stage,
        "http.network_error"
    );
    if err.is_timeout() {
        HttpError::Timeout(timeout)
    } else {
        HttpError::Network(message)
    }
}

fn decode_text(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

/// The `charset` parameter of a `Content-Type` value, unquoted.
fn charset_label(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\'']))
        })
        .filter(|label| !label.is_empty())
}

const SNIPPET_MAX: usize = 500;

/// First `SNIPPET_MAX` bytes of `body` as text, cut on a char boundary.
fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= SNIPPET_MAX {
        return text.into_owned();
    }
    let cut = (0..=SNIPPET_MAX)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, COOKIE};

    #[test]
    fn redacts_credentials_in_headers() {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        h.insert(COOKIE, HeaderValue::from_static("sid=abc"));
        h.insert(ACCEPT, HeaderValue::from_static("text/html"));
        let redacted = redact_headers(&h);
        assert!(redacted.iter().all(|(_, v)| !v.contains("secret") && !v.contains("sid")));
        assert!(redacted.contains(&("accept".to_string(), "text/html".to_string())));
    }

    #[test]
    fn curl_includes_url_and_quotes() {
        let url = Url::parse("https://example.com/manifest.json").unwrap();
        let curl = make_curl(&url, &HeaderMap::new());
        assert_eq!(curl, "curl -XGET 'https://example.com/manifest.json'");
    }

    #[test]
    fn reads_charset_parameter() {
        assert_eq!(charset_label("text/html; charset=ISO-8859-1"), Some("ISO-8859-1"));
        assert_eq!(charset_label(r#"text/html;charset="utf-8""#), Some("utf-8"));
        assert_eq!(charset_label("text/html"), None);
        assert_eq!(charset_label("text/html; charset="), None);
    }

    #[test]
    fn decodes_latin1_and_falls_back_to_utf8() {
        assert_eq!(decode_text(b"Caf\xE9", Some("text/html; charset=iso-8859-1")), "Café");
        assert_eq!(decode_text("Café".as_bytes(), None), "Café");
        assert_eq!(decode_text("Café".as_bytes(), Some("text/html; charset=bogus")), "Café");
    }

    #[test]
    fn snip_body_truncates_on_char_boundary() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= 503);
    }
}
