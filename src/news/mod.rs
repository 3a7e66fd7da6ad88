//! Getting news text off the portal and onto disk.
//!
//! - `fetcher` - one GET with the configured headers, no retries
//! - `extractor` - CSS-selector link-text extraction behind the [`Extractor`] trait
//! - `export` - the BOM-prefixed single-column CSV written on every run

mod export;
mod extractor;
mod fetcher;

pub use export::{parse_export, read_export, to_export_bytes, write_export, ExportError, EXPORT_HEADER};
pub use extractor::{ExtractError, Extractor, SelectorExtractor, DEFAULT_SELECTORS};
pub use fetcher::{FetchError, Fetcher, DEFAULT_USER_AGENT};
