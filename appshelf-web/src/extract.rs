//! Page-level metadata extraction over a parsed HTML tree.
//!
//! Everything here is synchronous: the `scraper::Html` tree never crosses an
//! `.await`, so callers can extract inside async code without losing `Send`.
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

/// Description sources, most preferred first.
const DESCRIPTION_SELECTORS: [&str; 3] = [
    r#"meta[name="og:description"], meta[property="og:description"]"#,
    r#"meta[name="twitter:description"]"#,
    r#"meta[name="description"]"#,
];

/// A `<link rel="icon">` as found on the page. `sizes` is the raw attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageIcon {
    pub href: String,
    pub sizes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    /// The URL the caller asked for, not the post-redirect one.
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub theme_color: Option<String>,
    pub icons: Vec<PageIcon>,
    /// Absolute URL of the linked web-app manifest.
    pub manifest_href: Option<String>,
    /// Directory holding the manifest, always ending in `/`.
    pub manifest_base_path: Option<String>,
    /// Origin of the manifest, without a trailing `/`.
    pub site_base_path: Option<String>,
}

/// Extract metadata from `html`.
///
/// Relative hrefs resolve against `document_url` (the URL the HTML was
/// actually served from) or a `<base href>` when the page declares one.
pub fn extract_page_metadata(html: &str, document_url: &Url, requested_url: &str) -> PageMetadata {
    let doc = Html::parse_document(html);
    let base = document_base(&doc, document_url);

    let manifest_href = first_attr(&doc, r#"link[rel="manifest"]"#, "href")
        .and_then(|href| resolve_href(&base, &href));
    let (manifest_base_path, site_base_path) = match manifest_href
        .as_deref()
        .and_then(|href| Url::parse(href).ok())
    {
        Some(manifest) => (
            Some(manifest_base_path(&manifest)),
            Some(manifest.origin().ascii_serialization()),
        ),
        None => (None, None),
    };

    PageMetadata {
        url: requested_url.to_string(),
        title: extract_title(&doc),
        description: extract_description(&doc),
        theme_color: extract_meta_content(&doc, r#"meta[name="theme-color"]"#),
        icons: extract_icons(&doc, &base),
        manifest_href,
        manifest_base_path,
        site_base_path,
    }
}

fn document_base(doc: &Html, document_url: &Url) -> Url {
    first_attr(doc, "base[href]", "href")
        .and_then(|href| document_url.join(&href).ok())
        .unwrap_or_else(|| document_url.clone())
}

fn extract_title(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn extract_description(doc: &Html) -> Option<String> {
    DESCRIPTION_SELECTORS
        .iter()
        .find_map(|selector| extract_meta_content(doc, selector))
}

fn extract_meta_content(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn extract_icons(doc: &Html, base: &Url) -> Vec<PageIcon> {
    let selector = match Selector::parse(r#"link[rel="icon"]"#) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    doc.select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            Some(PageIcon {
                href: resolve_href(base, href)?,
                sizes: el
                    .value()
                    .attr("sizes")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_href(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(String::from)
}

fn manifest_base_path(manifest: &Url) -> String {
    manifest
        .join("./")
        .map(String::from)
        .unwrap_or_else(|_| format!("{}/", manifest.origin().ascii_serialization()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<!doctype html>
<html>
<head>
  <title>
    Air Horner
  </title>
  <meta name="description" content="Plain description">
  <meta name="twitter:description" content="Twitter description">
  <meta name="theme-color" content="#2196F3">
  <link rel="icon" href="/favicon-32.png" sizes="32x32">
  <link rel="icon" href="images/icon-192.png" sizes="192x192">
  <link rel="icon" href="https://cdn.example.com/no-size.png">
  <link rel="manifest" href="app/manifest.json?v=3">
</head>
<body></body>
</html>"##;

    fn page_url() -> Url {
        Url::parse("https://airhorner.com/index.html").unwrap()
    }

    #[test]
    fn extracts_full_page() {
        let meta = extract_page_metadata(PAGE, &page_url(), "https://airhorner.com");
        assert_eq!(meta.url, "https://airhorner.com");
        assert_eq!(meta.title.as_deref(), Some("Air Horner"));
        assert_eq!(meta.description.as_deref(), Some("Twitter description"));
        assert_eq!(meta.theme_color.as_deref(), Some("#2196F3"));
        assert_eq!(
            meta.icons,
            vec![
                PageIcon {
                    href: "https://airhorner.com/favicon-32.png".into(),
                    sizes: Some("32x32".into()),
                },
                PageIcon {
                    href: "https://airhorner.com/images/icon-192.png".into(),
                    sizes: Some("192x192".into()),
                },
                PageIcon {
                    href: "https://cdn.example.com/no-size.png".into(),
                    sizes: None,
                },
            ]
        );
        assert_eq!(
            meta.manifest_href.as_deref(),
            Some("https://airhorner.com/app/manifest.json?v=3")
        );
        assert_eq!(
            meta.manifest_base_path.as_deref(),
            Some("https://airhorner.com/app/")
        );
        assert_eq!(meta.site_base_path.as_deref(), Some("https://airhorner.com"));
    }

    #[test]
    fn og_description_wins_over_others() {
        let html = r#"<head>
            <meta name="description" content="plain">
            <meta property="og:description" content="open graph">
            <meta name="twitter:description" content="twitter">
        </head>"#;
        let meta = extract_page_metadata(html, &page_url(), "https://airhorner.com/");
        assert_eq!(meta.description.as_deref(), Some("open graph"));
    }

    #[test]
    fn falls_back_to_plain_description() {
        let html = r#"<head><meta name="description" content="plain"></head>"#;
        let meta = extract_page_metadata(html, &page_url(), "https://airhorner.com/");
        assert_eq!(meta.description.as_deref(), Some("plain"));
    }

    #[test]
    fn page_without_manifest_has_no_base_paths() {
        let html = "<html><head><title>No app</title></head></html>";
        let meta = extract_page_metadata(html, &page_url(), "https://airhorner.com/");
        assert_eq!(meta.title.as_deref(), Some("No app"));
        assert!(meta.manifest_href.is_none());
        assert!(meta.manifest_base_path.is_none());
        assert!(meta.site_base_path.is_none());
        assert!(meta.icons.is_empty());
    }

    #[test]
    fn base_element_changes_resolution() {
        let html = r#"<head>
            <base href="https://static.example.com/pwa/">
            <link rel="manifest" href="manifest.webmanifest">
        </head>"#;
        let meta = extract_page_metadata(html, &page_url(), "https://airhorner.com/");
        assert_eq!(
            meta.manifest_href.as_deref(),
            Some("https://static.example.com/pwa/manifest.webmanifest")
        );
        assert_eq!(
            meta.site_base_path.as_deref(),
            Some("https://static.example.com")
        );
    }

    #[test]
    fn inner_whitespace_is_kept_as_written() {
        let html = "<head><title> Air\n  Horner </title>\
            <meta name=\"description\" content=\"  Loud  and clear \"></head>";
        let meta = extract_page_metadata(html, &page_url(), "https://airhorner.com/");
        assert_eq!(meta.title.as_deref(), Some("Air\n  Horner"));
        assert_eq!(meta.description.as_deref(), Some("Loud  and clear"));
    }

    #[test]
    fn empty_title_reads_as_missing() {
        let html = "<head><title>   </title></head>";
        let meta = extract_page_metadata(html, &page_url(), "https://airhorner.com/");
        assert!(meta.title.is_none());
    }
}
