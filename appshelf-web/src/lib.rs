//! Web app discovery: page loading, metadata extraction, and manifest merge.
//!
//! - Page loader trait and the static-HTML implementation (`page`)
//! - Typed extraction of title, description, colors, icons and manifest link (`extract`)
//! - Manifest reading and the page + manifest merge (`manifest`)
//! - The end-to-end pipeline (`scrape`)
//!
//! ```
//! use appshelf_web::manifest::resolve_icon_src;
//!
//! assert_eq!(
//!     resolve_icon_src("/icon.png", "https://example.com/app/", "https://example.com"),
//!     "https://example.com/icon.png"
//! );
//! ```

pub mod error;
pub mod extract;
pub mod manifest;
pub mod page;
pub mod scrape;

pub use error::ScrapeError;
pub use extract::{PageIcon, PageMetadata};
pub use manifest::ManifestDocument;
pub use page::{HttpPageLoader, LoadedPage, PageLoader};
pub use scrape::{ScrapedApp, Scraper};
