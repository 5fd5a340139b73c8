use std::collections::HashMap;

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// 词频表，保留词第一次出现的顺序
#[derive(Clone, Debug, Default)]
pub struct FrequencyTable {
    entries: Vec<WordCount>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str) {
        match self.index.get(word) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(word.to_string(), self.entries.len());
                self.entries.push(WordCount {
                    word: word.to_string(),
                    count: 1,
                });
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.index.get(word).map(|&i| self.entries[i].count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordCount> {
        self.entries.iter()
    }

    // 只留 count >= threshold 的词, 从高到低, 相同词频保持出现顺序
    pub fn filter(&self, threshold: usize) -> FilteredFrequencyTable {
        let mut entries: Vec<WordCount> = self
            .entries
            .iter()
            .filter(|entry| entry.count >= threshold)
            .cloned()
            .collect();

        entries.sort_by(|a, b| b.count.cmp(&a.count));

        FilteredFrequencyTable { entries, threshold }
    }
}

impl<'a> FromIterator<&'a str> for FrequencyTable {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut table = FrequencyTable::new();
        for word in iter {
            table.add(word);
        }
        table
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FilteredFrequencyTable {
    entries: Vec<WordCount>,
    threshold: usize,
}

impl FilteredFrequencyTable {
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn entries(&self) -> &[WordCount] {
        &self.entries
    }

    pub fn top(&self, n: usize) -> &[WordCount] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn words(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.word.as_str()).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.count).collect()
    }

    pub fn max_count(&self) -> Option<usize> {
        self.entries.first().map(|e| e.count)
    }

    /// 归一化词频, 最高的为 1.0
    pub fn normalized(&self) -> Vec<(&str, f32)> {
        let max_freq = match self.max_count() {
            Some(max) if max > 0 => max as f32,
            _ => return vec![],
        };

        self.entries
            .iter()
            .map(|e| (e.word.as_str(), e.count as f32 / max_freq))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::FrequencyTable;

    fn sample() -> FrequencyTable {
        "北京 上海 北京 广州 上海 北京 深圳 广州 上海 杭州"
            .split(' ')
            .collect()
    }

    #[test]
    fn counts_words() {
        let table = sample();
        assert_eq!(table.len(), 5);
        assert_eq!(table.get("北京"), Some(3));
        assert_eq!(table.get("杭州"), Some(1));
        assert_eq!(table.get("天津"), None);
    }

    #[test]
    fn filter_respects_threshold() {
        let table = sample();
        for threshold in 0..5 {
            let filtered = table.filter(threshold);
            assert!(filtered.entries().iter().all(|e| e.count >= threshold));
            assert_eq!(filtered.threshold(), threshold);
        }
    }

    #[test]
    fn raising_threshold_only_shrinks() {
        let table = sample();
        let mut previous: Option<HashSet<String>> = None;
        for threshold in 0..6 {
            let words: HashSet<String> = table
                .filter(threshold)
                .words()
                .into_iter()
                .map(String::from)
                .collect();
            if let Some(prev) = &previous {
                assert!(words.is_subset(prev));
            }
            previous = Some(words);
        }
    }

    #[test]
    fn sorted_descending_ties_first_seen() {
        let filtered = sample().filter(1);

        let counts = filtered.counts();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        // 北京 和 上海 都是 3 次, 北京先出现
        assert_eq!(
            filtered.words(),
            vec!["北京", "上海", "广州", "深圳", "杭州"]
        );
    }

    #[test]
    fn top_is_bounded() {
        let filtered = sample().filter(1);
        assert_eq!(filtered.top(2).len(), 2);
        assert_eq!(filtered.top(20).len(), 5);
        assert_eq!(filtered.top(2)[0].word, "北京");
    }

    #[test]
    fn normalized_weights() {
        let filtered = sample().filter(2);
        let normalized = filtered.normalized();

        assert_eq!(normalized[0], ("北京", 1.0));
        assert_eq!(normalized[2].0, "广州");
        assert!((normalized[2].1 - 2.0 / 3.0).abs() < f32::EPSILON);

        assert!(FrequencyTable::new().filter(1).normalized().is_empty());
    }
}
