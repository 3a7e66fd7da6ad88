//! Word frequency analysis of scraped news text.
//!
//! Pure computation: given the same texts, dictionary and stop-words the
//! resulting [`FrequencyTable`] is identical, including tie order.

mod frequency;
mod segment;

pub use frequency::{Analyzer, FrequencyTable, WordCount, DEFAULT_MAX_WORDS, DEFAULT_STOPWORDS};
pub use segment::{JiebaSegmenter, Segmenter, WhitespaceSegmenter};
