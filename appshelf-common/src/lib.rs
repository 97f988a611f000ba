//! Common types and utilities shared across appshelf crates.
//!
//! This crate defines the web app data model and the observability helpers
//! used throughout the workspace. It stays dependency-light so that every
//! crate can depend on it.
//!
//! # Overview
//!
//! - [`WebAppDescriptor`]: normalized output of a page + manifest scrape
//! - [`Icon`]: the single best icon kept on a descriptor
//! - [`StoredEntry`]: a descriptor confirmed by the user and persisted
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use appshelf_common::{Icon, WebAppDescriptor};
//!
//! let descriptor = WebAppDescriptor {
//!     name: Some("Podle".into()),
//!     icons: Some(Icon { src: "https://podle.audio/static/icon512.png".into(), sizes: Some(512) }),
//!     ..WebAppDescriptor::new("https://podle.audio/")
//! };
//! assert_eq!(descriptor.icons.unwrap().sizes, Some(512));
//! ```
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub mod observability;

/// An icon after merge, with its `src` resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub src: String,
    /// Leading integer of the `sizes` attribute; `None` when it did not parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<u32>,
}

/// Normalized record produced by merging page metadata with a web-app manifest.
///
/// `icons` holds one icon, not a collection. The field keeps its plural name so
/// the JSON shape matches what saved entries have always looked like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    pub url: String,
}

impl WebAppDescriptor {
    /// Empty descriptor for `url`; every optional field unset.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            description: None,
            icons: None,
            background_color: None,
            theme_color: None,
            url: url.into(),
        }
    }
}

/// A descriptor the user chose to keep, with its categories and save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    #[serde(flatten)]
    pub descriptor: WebAppDescriptor,
    #[serde(default)]
    pub category: Vec<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl StoredEntry {
    /// Stamp `descriptor` with the current time.
    pub fn now(descriptor: WebAppDescriptor, category: Vec<String>) -> Self {
        Self {
            descriptor,
            category,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn url(&self) -> &str {
        &self.descriptor.url
    }
}
