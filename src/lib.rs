//! newscloud: scrape a news portal, count word frequencies, render a word cloud.
//!
//! The crate is organised leaf-first:
//!
//! - [`auth`] - flat-file credential store and login sessions
//! - [`news`] - page fetching, link-text extraction and the CSV export
//! - [`analysis`] - Chinese word segmentation and frequency counting
//! - [`render`] - word cloud layout and PNG rasterization
//! - [`pipeline`] - the fetch → extract → export → analyze → render run
//! - [`config`] - TOML configuration with defaults for every key

pub mod analysis;
pub mod auth;
pub mod config;
pub mod news;
pub mod pipeline;
pub mod render;
pub mod util;
