//! Web-app manifest reading and the page + manifest merge.
//!
//! The manifest is an untrusted document: every field is optional, and a
//! field of the wrong JSON type reads as absent. [`merge`] never fails.
use appshelf_common::{Icon, WebAppDescriptor};
use serde_json::Value;

use crate::extract::PageMetadata;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestIcon {
    pub src: String,
    pub sizes: Option<String>,
}

/// The fields of a web-app manifest that feed a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDocument {
    pub name: Option<String>,
    /// Non-standard spelling some older manifests use; read before `short_name`.
    pub shortname: Option<String>,
    pub short_name: Option<String>,
    pub icons: Vec<ManifestIcon>,
    pub background_color: Option<String>,
    pub theme_color: Option<String>,
}

impl ManifestDocument {
    pub fn from_value(v: &Value) -> Self {
        let icons = v
            .get("icons")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(manifest_icon).collect())
            .unwrap_or_default();

        Self {
            name: string_field(v, "name"),
            shortname: string_field(v, "shortname"),
            short_name: string_field(v, "short_name"),
            icons,
            background_color: string_field(v, "background_color"),
            theme_color: string_field(v, "theme_color"),
        }
    }
}

fn manifest_icon(v: &Value) -> Option<ManifestIcon> {
    let src = string_field(v, "src")?;
    let sizes = match v.get("sizes") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Some(ManifestIcon { src, sizes })
}

fn string_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Merge a manifest with the metadata of the page that linked it.
///
/// Icons: manifest icons first, then page icons that declare `sizes`; every
/// `src` is made absolute and only the largest survives. Ties go to the later
/// candidate and an unparseable size ranks as 0.
pub fn merge(manifest: &ManifestDocument, page: &PageMetadata) -> WebAppDescriptor {
    let manifest_icons = manifest
        .icons
        .iter()
        .map(|icon| (icon.src.as_str(), icon.sizes.as_deref()));
    let page_icons = page
        .icons
        .iter()
        .filter_map(|icon| icon.sizes.as_deref().map(|s| (icon.href.as_str(), Some(s))));

    let icons = manifest_icons
        .chain(page_icons)
        .map(|(src, sizes)| Icon {
            src: resolve_icon_src(
                src,
                page.manifest_base_path.as_deref().unwrap_or_default(),
                page.site_base_path.as_deref().unwrap_or_default(),
            ),
            sizes: sizes.and_then(parse_size),
        })
        .reduce(|best, next| {
            if size_rank(&best) > size_rank(&next) {
                best
            } else {
                next
            }
        });

    let name = manifest
        .name
        .clone()
        .or_else(|| manifest.shortname.clone())
        .or_else(|| manifest.short_name.clone())
        .or_else(|| page.title.clone());

    WebAppDescriptor {
        name,
        description: page.description.clone(),
        icons,
        background_color: manifest.background_color.clone(),
        theme_color: manifest
            .theme_color
            .clone()
            .or_else(|| page.theme_color.clone()),
        url: page.url.clone(),
    }
}

fn size_rank(icon: &Icon) -> u32 {
    icon.sizes.unwrap_or(0)
}

/// Make an icon `src` absolute.
///
/// `http(s):` URLs are kept, `/`-rooted paths hang off the site origin, and
/// anything else is relative to the manifest's directory.
pub fn resolve_icon_src(src: &str, manifest_base_path: &str, site_base_path: &str) -> String {
    let lower = src.get(..6).unwrap_or(src).to_ascii_lowercase();
    if lower.starts_with("http:") || lower.starts_with("https:") {
        src.to_string()
    } else if src.starts_with('/') {
        format!("{site_base_path}{src}")
    } else {
        format!("{manifest_base_path}{src}")
    }
}

/// Leading decimal integer of a `sizes` value: `"192x192"` is 192, `"any"` is `None`.
/// Values past `u32::MAX` saturate.
pub fn parse_size(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}
