use std::{sync::Arc, time::Instant};

use image::Rgba;
use jieba_rs::Jieba;
use tracing::{info, warn};

use crate::{
    chart::{self, Chart, ChartKind},
    config::AppConfig,
    fetch::Fetcher,
    frequency::{FilteredFrequencyTable, WordCount},
    mask::MaskImage,
    normalize::Normalizer,
    stopwords::StopwordSet,
    tokenizer::{ChineseTokenizer, Segmenter},
    font_candidates, Error, Result, WordCloud,
};

#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub url: String,
    pub chart: ChartKind,
    pub threshold: usize,
    /// 上传的掩模原始字节, 只对词云有效
    pub mask: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct AnalysisReport {
    pub table: FilteredFrequencyTable,
    pub chart: Chart,
    top_n: usize,
}

impl AnalysisReport {
    pub fn top(&self) -> &[WordCount] {
        self.table.top(self.top_n)
    }
}

pub struct Pipeline {
    config: AppConfig,
    charts: Vec<ChartKind>,
    fetcher: Fetcher,
    normalizer: Normalizer,
    tokenizer: ChineseTokenizer,
    cloud: Option<WordCloud>,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let stopwords = Arc::new(StopwordSet::from_path(&config.stopwords_path)?);

        let mut jieba = Jieba::new();
        for word in &config.extra_words {
            jieba.add_word(word, None, None);
        }

        let candidates = font_candidates(config.font_path.as_deref());
        let cloud = match WordCloud::from_font_candidates(candidates) {
            Ok((cloud, path)) => {
                info!(font = %path.display(), "word cloud font loaded");
                Some(configure_cloud(cloud, &config)?)
            }
            Err(e) => {
                warn!(error = %e, "word cloud disabled");
                None
            }
        };

        Self::assemble(config, jieba, stopwords, cloud)
    }

    // 用已经加载好的部件组装
    pub fn assemble(
        config: AppConfig,
        segmenter: impl Segmenter + 'static,
        stopwords: Arc<StopwordSet>,
        cloud: Option<WordCloud>,
    ) -> Result<Self> {
        let tokenizer = ChineseTokenizer::new(segmenter)
            .with_stopwords(stopwords)
            .with_exclude_numbers(config.exclude_numbers);

        let charts: Vec<ChartKind> = config
            .charts
            .iter()
            .copied()
            .filter(|kind| *kind != ChartKind::WordCloud || cloud.is_some())
            .collect();
        if charts.is_empty() {
            return Err(Error::config("no usable chart kinds"));
        }

        Ok(Pipeline {
            fetcher: Fetcher::new(&config.fetch)?,
            normalizer: Normalizer::default(),
            tokenizer,
            cloud,
            charts,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 实际可用的图表类型
    pub fn charts(&self) -> &[ChartKind] {
        &self.charts
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        self.fetcher.fetch_text(url).await
    }

    pub fn analyze(&self, raw_text: &str, threshold: usize) -> Result<FilteredFrequencyTable> {
        let threshold = self.config.threshold.check(threshold)?;
        if raw_text.trim().is_empty() {
            return Err(Error::EmptyContent);
        }

        let now = Instant::now();
        let text = self.normalizer.normalize(raw_text);
        let frequencies = self.tokenizer.get_word_frequencies(&text);
        let filtered = frequencies.filter(threshold);

        info!(
            words = frequencies.len(),
            kept = filtered.len(),
            threshold,
            elapsed_ms = now.elapsed().as_millis() as u64,
            "computed word frequencies"
        );

        Ok(filtered)
    }

    pub fn render(
        &self,
        kind: ChartKind,
        table: &FilteredFrequencyTable,
        mask: Option<&MaskImage>,
    ) -> Result<Chart> {
        if !self.charts.contains(&kind) {
            return Err(Error::UnsupportedChart(kind.label().to_string()));
        }

        match (kind, &self.cloud) {
            (ChartKind::WordCloud, Some(cloud)) => {
                let now = Instant::now();
                let chart = chart::render_word_cloud(
                    cloud,
                    table,
                    self.config.cloud.width,
                    self.config.cloud.height,
                    mask,
                )?;
                info!(elapsed_ms = now.elapsed().as_millis() as u64, "rendered word cloud");
                Ok(chart)
            }
            (ChartKind::WordCloud, None) => {
                Err(Error::UnsupportedChart(kind.label().to_string()))
            }
            _ => chart::render_echarts(kind, table),
        }
    }

    /// 取网页之前的检查: 最小词频, 掩模, 图表类型
    pub fn check_request(&self, request: &AnalysisRequest) -> Result<Option<MaskImage>> {
        self.config.threshold.check(request.threshold)?;

        // 掩模无效时直接拒绝, 不退回无掩模的词云
        let mask = match (&request.mask, request.chart) {
            (Some(bytes), ChartKind::WordCloud) if self.config.mask_support => Some(
                MaskImage::from_png_bytes(bytes, self.config.cloud.max_mask_pixels)?,
            ),
            _ => None,
        };

        if !self.charts.contains(&request.chart) {
            return Err(Error::UnsupportedChart(request.chart.label().to_string()));
        }

        Ok(mask)
    }

    /// 同步部分: 检查请求, 统计词频, 画图
    pub fn process(&self, raw_text: &str, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let mask = self.check_request(request)?;
        self.process_checked(raw_text, request, mask.as_ref())
    }

    fn process_checked(
        &self,
        raw_text: &str,
        request: &AnalysisRequest,
        mask: Option<&MaskImage>,
    ) -> Result<AnalysisReport> {
        let table = self.analyze(raw_text, request.threshold)?;
        let chart = self.render(request.chart, &table, mask)?;

        Ok(AnalysisReport {
            table,
            chart,
            top_n: self.config.top_n,
        })
    }
}

fn configure_cloud(cloud: WordCloud, config: &AppConfig) -> Result<WordCloud> {
    let c = &config.cloud;
    let background = csscolorparser::parse(&c.background)
        .map_err(|e| Error::config(format!("cloud.background: {e}")))?
        .to_rgba8();

    Ok(cloud
        .with_background_color(Rgba(background))
        .with_min_font_size(c.min_font_size)
        .with_max_font_size(c.max_font_size)
        .with_font_step(c.font_step)
        .with_word_margin(c.word_margin)
        .with_word_rotate_chance(c.rotate_chance)
        .with_relative_font_scaling(c.relative_font_scaling)
        .with_max_words(c.max_words)
        .with_rng_seed(c.seed))
}

/// 先检查请求, 再取网页, 然后在阻塞线程上跑统计和画图
pub async fn run(pipeline: Arc<Pipeline>, request: AnalysisRequest) -> Result<AnalysisReport> {
    let now = Instant::now();
    let mask = pipeline.check_request(&request)?;
    let raw_text = pipeline.fetch(&request.url).await?;

    let report = tokio::task::spawn_blocking(move || {
        pipeline.process_checked(&raw_text, &request, mask.as_ref())
    })
    .await
    .map_err(|e| Error::render(e.to_string()))??;

    info!(
        chart = %report.chart.kind(),
        kept = report.table.len(),
        elapsed_ms = now.elapsed().as_millis() as u64,
        "request finished"
    );

    Ok(report)
}
