use jieba_rs::Jieba;

/// Splits running text into word tokens.
///
/// Implementations must be deterministic: the same input always yields
/// the same token sequence.
pub trait Segmenter: Send + Sync {
    fn segment<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Dictionary-based Chinese segmentation with HMM for unknown words.
pub struct JiebaSegmenter {
    jieba: Jieba,
}

impl JiebaSegmenter {
    /// Load the bundled dictionary.
    pub fn new() -> Self {
        Self {
            jieba: Jieba::new(),
        }
    }
}

impl Default for JiebaSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for JiebaSegmenter {
    fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.jieba.cut(text, true)
    }
}

/// Splits on whitespace only. Useful for pre-tokenized input.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceSegmenter;

impl Segmenter for WhitespaceSegmenter {
    fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jieba_splits_common_words() {
        let segmenter = JiebaSegmenter::new();
        let tokens = segmenter.segment("国务院常务会议部署稳经济一揽子政策措施");
        assert!(tokens.len() > 1, "tokens: {tokens:?}");
        assert_eq!(tokens.concat(), "国务院常务会议部署稳经济一揽子政策措施");
    }

    #[test]
    fn test_jieba_keeps_separators_as_tokens() {
        let segmenter = JiebaSegmenter::new();
        let tokens = segmenter.segment("经济 科技");
        assert_eq!(tokens.concat(), "经济 科技");
    }

    #[test]
    fn test_whitespace_segmenter() {
        assert_eq!(
            WhitespaceSegmenter.segment("  a bb\tccc \n"),
            vec!["a", "bb", "ccc"]
        );
    }
}
