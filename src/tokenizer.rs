use std::sync::Arc;

use jieba_rs::Jieba;

use crate::{frequency::FrequencyTable, stopwords::StopwordSet};

/// 分词接口, 返回的子串按顺序覆盖输入
pub trait Segmenter: Send + Sync {
    fn segment<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

impl Segmenter for Jieba {
    fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.cut(text, true)
    }
}

pub struct ChineseTokenizer {
    segmenter: Box<dyn Segmenter>,
    stopwords: Arc<StopwordSet>,
    pub min_word_length: usize,
    pub exclude_numbers: bool,
}

impl Default for ChineseTokenizer {
    fn default() -> Self {
        ChineseTokenizer::new(Jieba::new())
    }
}

impl<'a> ChineseTokenizer {
    pub fn new(segmenter: impl Segmenter + 'static) -> Self {
        ChineseTokenizer {
            segmenter: Box::new(segmenter),
            stopwords: Default::default(),
            min_word_length: 2,
            exclude_numbers: false,
        }
    }

    pub fn with_stopwords(mut self, value: Arc<StopwordSet>) -> Self {
        self.stopwords = value;
        self
    }

    pub fn with_min_word_leng(mut self, size: usize) -> Self {
        self.min_word_length = size;
        self
    }

    pub fn with_exclude_numbers(mut self, value: bool) -> Self {
        self.exclude_numbers = value;
        self
    }

    fn tokenize(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> {
        let mut iter: Box<dyn Iterator<Item = &'a str> + 'a> = Box::new(
            self.segmenter
                .segment(text)
                .into_iter()
                .filter(|str| !str.is_empty()),
        );

        if self.min_word_length > 0 {
            iter = Box::new(iter.filter(move |str| {
                let chars = str.chars().count();
                chars >= self.min_word_length
            }));
        }

        if self.exclude_numbers {
            iter = Box::new(iter.filter(move |word| !word.chars().all(char::is_numeric)));
        }

        if !self.stopwords.is_empty() {
            iter = Box::new(iter.filter(move |str| !self.stopwords.contains(str)));
        }

        iter
    }

    pub fn get_word_frequencies(&'a self, text: &'a str) -> FrequencyTable {
        self.tokenize(text).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ChineseTokenizer, Segmenter};
    use crate::{normalize::Normalizer, stopwords::StopwordSet};

    /// 每两个字切一刀
    struct Pairs;

    impl Segmenter for Pairs {
        fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
            let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).step_by(2).collect();
            bounds.push(text.len());
            bounds.windows(2).map(|w| &text[w[0]..w[1]]).collect()
        }
    }

    struct Chars;

    impl Segmenter for Chars {
        fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        }
    }

    #[test]
    fn hello_world_scenario() {
        let text = Normalizer::default().normalize("<p>你好你好世界世界</p>");
        let tokenizer = ChineseTokenizer::new(Pairs);

        let table = tokenizer.get_word_frequencies(&text);
        let filtered = table.filter(1);

        assert_eq!(filtered.len(), 2);
        assert_eq!(table.get("你好"), Some(2));
        assert_eq!(table.get("世界"), Some(2));
        assert_eq!(filtered.words(), vec!["你好", "世界"]);
    }

    #[test]
    fn drops_single_characters() {
        let tokenizer = ChineseTokenizer::new(Chars);
        assert!(tokenizer.get_word_frequencies("你好世界").is_empty());
    }

    #[test]
    fn longer_minimum_length() {
        let tokenizer = ChineseTokenizer::new(Pairs).with_min_word_leng(3);
        assert!(tokenizer.get_word_frequencies("你好世界").is_empty());
    }

    #[test]
    fn drops_stopwords() {
        let stopwords = Arc::new(StopwordSet::from_text("我们\n世界"));
        let tokenizer = ChineseTokenizer::new(Pairs)
            .with_stopwords(stopwords.clone());

        let table = tokenizer.get_word_frequencies("我们你好世界你好我们");
        let filtered = table.filter(0);

        assert_eq!(filtered.words(), vec!["你好"]);
        assert!(filtered
            .entries()
            .iter()
            .all(|e| e.word.chars().count() >= 2 && !stopwords.contains(&e.word)));
    }

    #[test]
    fn optional_number_filter() {
        let tokenizer = ChineseTokenizer::new(Pairs);
        assert_eq!(tokenizer.get_word_frequencies("2024新闻").get("20"), Some(1));

        let tokenizer = tokenizer.with_exclude_numbers(true);
        let table = tokenizer.get_word_frequencies("2024新闻");
        assert_eq!(table.get("20"), None);
        assert_eq!(table.get("新闻"), Some(1));
    }

    #[test]
    fn jieba_properties() {
        let stopwords = Arc::new(StopwordSet::from_text("我们\n的"));
        let tokenizer = ChineseTokenizer::default().with_stopwords(stopwords.clone());
        let text = Normalizer::default()
            .normalize("我们是中国人，我们爱中国。中国的经济发展很快，经济增长稳定。");

        let filtered = tokenizer.get_word_frequencies(&text).filter(1);

        assert!(!filtered.is_empty());
        for entry in filtered.entries() {
            assert!(entry.word.chars().count() >= 2);
            assert!(!stopwords.contains(&entry.word));
        }
        assert!(filtered.counts().windows(2).all(|w| w[0] >= w[1]));
    }
}
