use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{chart::ChartKind, Error, Result};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen: String,
    pub stopwords_path: PathBuf,
    pub font_path: Option<PathBuf>,
    /// 追加到分词词典里的词
    pub extra_words: Vec<String>,
    pub exclude_numbers: bool,
    pub fetch: FetchConfig,
    pub threshold: ThresholdRange,
    pub charts: Vec<ChartKind>,
    pub mask_support: bool,
    pub top_n: usize,
    pub chart_height: u32,
    pub max_upload_bytes: usize,
    pub cloud: CloudConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen: "127.0.0.1:8501".to_string(),
            stopwords_path: PathBuf::from("stopwords.txt"),
            font_path: Some(PathBuf::from("fonts/Dengb.ttf")),
            extra_words: vec![],
            exclude_numbers: false,
            fetch: FetchConfig::default(),
            threshold: ThresholdRange::default(),
            charts: ChartKind::ALL.to_vec(),
            mask_support: true,
            top_n: 20,
            chart_height: 600,
            max_upload_bytes: 10 * 1024 * 1024,
            cloud: CloudConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            user_agent: "Mozilla/5.0".to_string(),
            timeout_secs: 10,
        }
    }
}

/// 最小词频滑块的范围
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThresholdRange {
    pub min: usize,
    pub max: usize,
    pub default: usize,
}

impl Default for ThresholdRange {
    fn default() -> Self {
        ThresholdRange {
            min: 1,
            max: 20,
            default: 1,
        }
    }
}

impl ThresholdRange {
    pub fn check(&self, value: usize) -> Result<usize> {
        if value < self.min || value > self.max {
            return Err(Error::ThresholdOutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(value)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CloudConfig {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub max_words: usize,
    pub min_font_size: f32,
    pub max_font_size: Option<f32>,
    pub font_step: f32,
    pub word_margin: u32,
    pub rotate_chance: f64,
    pub relative_font_scaling: f32,
    pub seed: Option<u64>,
    /// 掩模最多多少像素, 超过就拒绝
    pub max_mask_pixels: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        CloudConfig {
            width: 800,
            height: 600,
            background: "white".to_string(),
            max_words: 200,
            min_font_size: 4.0,
            max_font_size: None,
            font_step: 1.0,
            word_margin: 2,
            rotate_chance: 0.10,
            relative_font_scaling: 0.5,
            seed: None,
            max_mask_pixels: 4_000_000,
        }
    }
}

impl AppConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        let config: AppConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let range = &self.threshold;
        if range.min > range.max {
            return Err(Error::config(format!(
                "threshold range [{}, {}] is inverted",
                range.min, range.max
            )));
        }
        if range.default < range.min || range.default > range.max {
            return Err(Error::config(format!(
                "threshold default {} is outside [{}, {}]",
                range.default, range.min, range.max
            )));
        }
        if self.charts.is_empty() {
            return Err(Error::config("no chart kinds enabled"));
        }
        if self.cloud.width == 0 || self.cloud.height == 0 {
            return Err(Error::config("word cloud dimensions must be non-zero"));
        }
        if self.cloud.font_step <= 0.0 {
            return Err(Error::config("cloud.font_step must be positive"));
        }
        if self.cloud.max_mask_pixels == 0 {
            return Err(Error::config("cloud.max_mask_pixels must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.charts.len(), 9);
        assert_eq!(config.top_n, 20);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.cloud.max_mask_pixels, 4_000_000);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"threshold": {"min": 30, "max": 200, "default": 30}, "charts": ["bar", "pie"]}"#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.threshold.max, 200);
        assert_eq!(config.charts, vec![ChartKind::Bar, ChartKind::Pie]);
        assert_eq!(config.cloud.width, 800);
        assert!(config.mask_support);
    }

    #[test]
    fn rejects_default_outside_range() {
        let mut config = AppConfig::default();
        config.threshold = ThresholdRange {
            min: 30,
            max: 200,
            default: 10,
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.threshold = ThresholdRange {
            min: 20,
            max: 1,
            default: 5,
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_empty_chart_list() {
        let config = AppConfig {
            charts: vec![],
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_check() {
        let range = ThresholdRange::default();
        assert_eq!(range.check(1).unwrap(), 1);
        assert_eq!(range.check(20).unwrap(), 20);
        assert!(matches!(
            range.check(21),
            Err(Error::ThresholdOutOfRange { value: 21, min: 1, max: 20 })
        ));
        assert!(range.check(0).is_err());
    }
}
