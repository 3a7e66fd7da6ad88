use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::segment::{JiebaSegmenter, Segmenter};

/// How many words a frequency table keeps by default.
pub const DEFAULT_MAX_WORDS: usize = 100;

/// Common Chinese function words that never make it into the table.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "的", "了", "和", "是", "在", "我", "有", "也", "都", "这", "就", "要", "不", "你", "他", "她",
    "我们", "他们", "这个", "那个", "可以", "因为",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Words ordered by descending count; equal counts keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    entries: Vec<WordCount>,
}

impl FrequencyTable {
    pub fn entries(&self) -> &[WordCount] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordCount> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count for an exact word, if it made the table.
    pub fn get(&self, word: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.word == word).map(|e| e.count)
    }

    /// Highest count in the table, 0 when empty.
    pub fn max_count(&self) -> usize {
        self.entries.first().map_or(0, |e| e.count)
    }
}

impl FromIterator<(String, usize)> for FrequencyTable {
    /// Build a table from pairs that are already in table order.
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(word, count)| WordCount { word, count })
                .collect(),
        }
    }
}

/// Segments, filters and counts news text.
pub struct Analyzer {
    segmenter: Box<dyn Segmenter>,
    stopwords: HashSet<String>,
    max_words: usize,
}

impl Analyzer {
    /// Jieba segmentation, default stop-words, top 100.
    pub fn new() -> Self {
        Self::with_segmenter(Box::new(JiebaSegmenter::new()))
    }

    pub fn with_segmenter(segmenter: Box<dyn Segmenter>) -> Self {
        Self {
            segmenter,
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            max_words: DEFAULT_MAX_WORDS,
        }
    }

    pub fn max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words;
        self
    }

    /// Add stop-words on top of the defaults.
    pub fn extra_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords.extend(words.into_iter().map(Into::into));
        self
    }

    /// Build the frequency table for `texts`.
    ///
    /// Texts are joined with a space and segmented. A token is dropped if
    /// it is blank, a stop-word, a single character, or all digits.
    pub fn analyze<S: AsRef<str>>(&self, texts: &[S]) -> FrequencyTable {
        let joined = texts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");

        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(&str, usize)> = Vec::new();

        for token in self.segmenter.segment(&joined) {
            if !self.keep(token) {
                continue;
            }
            match slots.get(token) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    slots.insert(token, counts.len());
                    counts.push((token, 1));
                }
            }
        }

        let distinct = counts.len();
        // Stable: ties stay in first-occurrence order.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(self.max_words);

        tracing::debug!(
            texts = texts.len(),
            distinct = distinct,
            kept = counts.len(),
            "Analyzed word frequencies"
        );

        counts
            .into_iter()
            .map(|(word, count)| (word.to_string(), count))
            .collect()
    }

    fn keep(&self, token: &str) -> bool {
        !token.trim().is_empty()
            && !self.stopwords.contains(token)
            && token.chars().count() > 1
            && !token.chars().all(is_decimal_digit)
    }
}

/// ASCII and full-width decimal digits. Circled numbers (`①`) and `〇`
/// are not decimal digits and are kept as words.
fn is_decimal_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::WhitespaceSegmenter;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::OnceLock;

    fn jieba_analyzer() -> &'static Analyzer {
        static ANALYZER: OnceLock<Analyzer> = OnceLock::new();
        ANALYZER.get_or_init(Analyzer::new)
    }

    fn ws_analyzer() -> Analyzer {
        Analyzer::with_segmenter(Box::new(WhitespaceSegmenter))
    }

    fn pairs(table: &FrequencyTable) -> Vec<(&str, usize)> {
        table.iter().map(|e| (e.word.as_str(), e.count)).collect()
    }

    #[test]
    fn test_descending_with_first_occurrence_ties() {
        let table = ws_analyzer().analyze(&["乙乙 甲甲 丙丙 甲甲", "丙丙 丁丁"]);
        assert_eq!(
            pairs(&table),
            vec![("甲甲", 2), ("丙丙", 2), ("乙乙", 1), ("丁丁", 1)]
        );
        assert_eq!(table.max_count(), 2);
    }

    #[test]
    fn test_filters_stopwords_short_and_numeric_tokens() {
        let table = ws_analyzer().analyze(&["我们 经济 2024 ２０ x 的 经济 因为 12a"]);
        assert_eq!(pairs(&table), vec![("经济", 2), ("12a", 1)]);
    }

    #[test]
    fn test_only_decimal_digit_runs_are_numeric() {
        let table = ws_analyzer().analyze(&["2024 ２０２４ ①② 〇〇 三五 12a"]);
        assert_eq!(
            pairs(&table),
            vec![("①②", 1), ("〇〇", 1), ("三五", 1), ("12a", 1)]
        );
    }

    #[test]
    fn test_truncates_to_max_words() {
        let words: Vec<String> = (0..150).map(|i| format!("词{i:03}")).collect();
        let table = ws_analyzer().analyze(&words);
        assert_eq!(table.len(), DEFAULT_MAX_WORDS);
        assert_eq!(table.entries()[0].word, "词000");

        let small = ws_analyzer().max_words(3).analyze(&words);
        assert_eq!(small.len(), 3);
    }

    #[test]
    fn test_extra_stopwords() {
        let table = ws_analyzer()
            .extra_stopwords(["新闻"])
            .analyze(&["新闻 头条 新闻"]);
        assert_eq!(pairs(&table), vec![("头条", 1)]);
    }

    #[test]
    fn test_empty_input_gives_empty_table() {
        let empty: Vec<String> = Vec::new();
        let table = jieba_analyzer().analyze(&empty);
        assert!(table.is_empty());
        assert_eq!(table.max_count(), 0);
    }

    #[test]
    fn test_repeated_word_across_texts_is_counted() {
        let table = jieba_analyzer().analyze(&["中国发展前景", "中国", "经济"]);
        let with_china: usize = table
            .iter()
            .filter(|e| e.word.contains("中国"))
            .map(|e| e.count)
            .sum();
        assert!(with_china >= 2, "table: {table:?}");
    }

    #[test]
    fn test_jieba_analysis_is_deterministic() {
        let texts = [
            "国务院常务会议部署稳经济一揽子政策措施",
            "科技创新引领产业发展 中国经济稳中向好",
            "我们的经济在发展，他们的科技也在进步。",
        ];
        let first = jieba_analyzer().analyze(&texts);
        let second = Analyzer::new().analyze(&texts);
        assert_eq!(first, second);
        assert!(!first.is_empty());
        assert!(first.get("，").is_none());
        assert!(first.get("我们").is_none());
    }

    #[test]
    fn test_table_serializes_as_list() {
        let table = ws_analyzer().analyze(&["经济 经济 科技"]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(
            json,
            r#"[{"word":"经济","count":2},{"word":"科技","count":1}]"#
        );
    }

    proptest! {
        #[test]
        fn prop_table_respects_limits(
            texts in prop::collection::vec("[甲乙丙的了是我 0-9a]{0,16}", 0..20),
            max_words in 1usize..8,
        ) {
            let table = ws_analyzer().max_words(max_words).analyze(&texts);

            prop_assert!(table.len() <= max_words);
            for entry in table.iter() {
                prop_assert!(entry.word.chars().count() > 1);
                prop_assert!(!DEFAULT_STOPWORDS.contains(&entry.word.as_str()));
                prop_assert!(!entry.word.chars().all(|c| c.is_ascii_digit()));
            }
            for pair in table.entries().windows(2) {
                prop_assert!(pair[0].count >= pair[1].count);
            }
        }

        #[test]
        fn prop_analysis_is_deterministic(
            texts in prop::collection::vec("[甲乙丙丁 ]{0,24}", 0..10),
        ) {
            let analyzer = ws_analyzer();
            prop_assert_eq!(analyzer.analyze(&texts), analyzer.analyze(&texts));
        }
    }
}
