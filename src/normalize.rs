use regex::Regex;

pub struct Normalizer {
    tags: Regex,
    non_word: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        let tags = Regex::new("<.*?>").expect("Unable to compile tag regex");
        //只保留中文和 \w 字符
        let non_word =
            Regex::new(r"[^\w\x{4e00}-\x{9fa5}]+").expect("Unable to compile non-word regex");

        Normalizer { tags, non_word }
    }
}

impl Normalizer {
    pub fn clean_html_tags(&self, text: &str) -> String {
        self.tags.replace_all(text, "").into_owned()
    }

    // 直接删掉, 不换成空格, 只隔着标点的词会连在一起
    pub fn remove_non_word(&self, text: &str) -> String {
        self.non_word.replace_all(text, "").into_owned()
    }

    pub fn normalize(&self, text: &str) -> String {
        let text = self.clean_html_tags(text);
        self.remove_non_word(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::Normalizer;

    #[test]
    fn strips_tags() {
        let n = Normalizer::default();
        assert_eq!(n.clean_html_tags("<p>你好</p><br/>世界"), "你好世界");
        assert_eq!(n.clean_html_tags("a < b"), "a < b");
    }

    #[test]
    fn strips_punctuation_and_space() {
        let n = Normalizer::default();
        assert_eq!(n.remove_non_word("你好，世界！ hello world_1"), "你好世界helloworld_1");
        assert_eq!(n.remove_non_word("——「」。、"), "");
    }

    #[test]
    fn full_normalization() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("<p>你好你好世界世界</p>"), "你好你好世界世界");
        assert_eq!(n.normalize("<div class=\"x\">新闻：今天</div> <a>更多</a>"), "新闻今天更多");
    }

    #[test]
    fn normalization_is_idempotent() {
        let n = Normalizer::default();
        for input in ["你好你好世界世界", "abc123_中文", "", "<b>中国，人民</b>"] {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once);
        }
    }
}
