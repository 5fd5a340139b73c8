use std::{collections::HashSet, fs, path::Path};

use tracing::info;

use crate::{Error, Result};

/// 停用词表，启动时读取一次，之后只读
#[derive(Clone, Debug, Default)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| Error::Stopwords {
            path: path.to_path_buf(),
            source,
        })?;

        let set = Self::from_text(&raw);
        info!(path = %path.display(), words = set.len(), "loaded stopwords");

        Ok(set)
    }

    /// 每行一个词
    pub fn from_text(text: &str) -> Self {
        text.lines().collect()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for StopwordSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let words = iter
            .into_iter()
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect();

        StopwordSet { words }
    }
}
