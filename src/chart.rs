use std::{fmt, str::FromStr};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    frequency::{FilteredFrequencyTable, WordCount},
    mask::MaskImage,
    Error, Result, WordCloud, WordCloudSize,
};

const SERIES_NAME: &str = "词频";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    WordCloud,
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
    Funnel,
    Heatmap,
    Boxplot,
}

impl ChartKind {
    pub const ALL: [ChartKind; 9] = [
        ChartKind::WordCloud,
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Area,
        ChartKind::Funnel,
        ChartKind::Heatmap,
        ChartKind::Boxplot,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ChartKind::WordCloud => "wordcloud",
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "area",
            ChartKind::Funnel => "funnel",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Boxplot => "boxplot",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::WordCloud => "词云",
            ChartKind::Bar => "条形图",
            ChartKind::Line => "折线图",
            ChartKind::Pie => "饼图",
            ChartKind::Scatter => "散点图",
            ChartKind::Area => "面积图",
            ChartKind::Funnel => "瀑布图",
            ChartKind::Heatmap => "热力图",
            ChartKind::Boxplot => "箱线图",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::WordCloud => "词云",
            ChartKind::Bar => "词频柱状图",
            ChartKind::Line => "词频折线图",
            ChartKind::Pie => "词频饼图",
            ChartKind::Scatter => "词频散点图",
            ChartKind::Area => "词频面积图",
            ChartKind::Funnel => "词频瀑布图",
            ChartKind::Heatmap => "词频热力图",
            ChartKind::Boxplot => "词频箱线图",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ChartKind {
    type Err = Error;

    /// 接受英文 key 或中文名
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        ChartKind::ALL
            .iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s) || kind.label() == s)
            .copied()
            .ok_or_else(|| Error::UnsupportedChart(s.to_string()))
    }
}

#[derive(Debug)]
pub enum Chart {
    ECharts {
        kind: ChartKind,
        option: Value,
    },
    Image {
        kind: ChartKind,
        png: Vec<u8>,
        width: u32,
        height: u32,
    },
}

impl Chart {
    pub fn kind(&self) -> ChartKind {
        match self {
            Chart::ECharts { kind, .. } | Chart::Image { kind, .. } => *kind,
        }
    }

    /// 固定高度、可滚动的图表面板
    pub fn to_html(&self, height: u32) -> String {
        match self {
            Chart::ECharts { option, .. } => {
                // 防止 JSON 里的 </ 提前结束 <script>
                let option = option.to_string().replace("</", "<\\/");
                format!(
                    r#"<div class="chart-panel" style="height:{height}px;overflow:auto">
<div id="chart" style="width:100%;height:{height}px"></div>
</div>
<script>
var chart = echarts.init(document.getElementById("chart"));
chart.setOption({option});
</script>"#
                )
            }
            Chart::Image {
                kind,
                png,
                width,
                height: image_height,
            } => format!(
                r#"<div class="chart-panel" style="height:{height}px;overflow:auto">
<img alt="{alt}" width="{width}" height="{image_height}" src="data:image/png;base64,{data}">
</div>"#,
                alt = kind.title(),
                data = BASE64_STANDARD.encode(png),
            ),
        }
    }
}

pub fn render_word_cloud(
    cloud: &WordCloud,
    table: &FilteredFrequencyTable,
    width: u32,
    height: u32,
    mask: Option<&MaskImage>,
) -> Result<Chart> {
    let size = match mask {
        Some(mask) => WordCloudSize::FromMask(mask.to_occupancy()),
        None => WordCloudSize::FromDimensions { width, height },
    };

    let image = cloud.generate_from_frequencies(&table.normalized(), size);
    let png = encode_png(&image)?;

    Ok(Chart::Image {
        kind: ChartKind::WordCloud,
        png,
        width: image.width(),
        height: image.height(),
    })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| Error::render(e.to_string()))?;

    Ok(bytes)
}

pub fn render_echarts(kind: ChartKind, table: &FilteredFrequencyTable) -> Result<Chart> {
    let option = match kind {
        ChartKind::WordCloud => {
            return Err(Error::render("word clouds are rendered as images"));
        }
        ChartKind::Bar => cartesian(kind, table.entries(), json!({"type": "bar"})),
        ChartKind::Line => cartesian(kind, table.entries(), json!({"type": "line"})),
        ChartKind::Scatter => cartesian(kind, table.entries(), json!({"type": "scatter"})),
        ChartKind::Area => {
            let mut entries = table.entries().to_vec();
            entries.sort_by(|a, b| a.word.cmp(&b.word));
            cartesian(
                kind,
                &entries,
                json!({"type": "line", "areaStyle": {"opacity": 0.5}}),
            )
        }
        ChartKind::Pie => json!({
            "title": {"text": kind.title()},
            "tooltip": {"trigger": "item"},
            "series": [{
                "type": "pie",
                "radius": "60%",
                "data": named_values(table.entries()),
            }],
        }),
        ChartKind::Funnel => json!({
            "title": {"text": kind.title()},
            "tooltip": {"trigger": "item"},
            "series": [{
                "name": SERIES_NAME,
                "type": "funnel",
                "sort": "descending",
                "label": {"position": "right"},
                "data": named_values(table.entries()),
            }],
        }),
        ChartKind::Heatmap => heatmap(kind, table),
        ChartKind::Boxplot => boxplot(kind, table),
    };

    Ok(Chart::ECharts { kind, option })
}

fn cartesian(kind: ChartKind, entries: &[WordCount], series: Value) -> Value {
    let words: Vec<&str> = entries.iter().map(|e| e.word.as_str()).collect();
    let counts: Vec<usize> = entries.iter().map(|e| e.count).collect();

    let mut series = series;
    series["name"] = json!(SERIES_NAME);
    series["data"] = json!(counts);

    json!({
        "title": {"text": kind.title()},
        "tooltip": {"trigger": "axis"},
        "legend": {"data": [SERIES_NAME]},
        "xAxis": {"type": "category", "data": words},
        "yAxis": {"type": "value"},
        "series": [series],
    })
}

fn named_values(entries: &[WordCount]) -> Vec<Value> {
    entries
        .iter()
        .map(|e| json!({"name": e.word, "value": e.count}))
        .collect()
}

/// 按方阵排布每个词, 颜色表示词频
fn heatmap(kind: ChartKind, table: &FilteredFrequencyTable) -> Value {
    let n = table.len();
    let columns = (n as f64).sqrt().ceil().max(1.0) as usize;
    let rows = (n + columns - 1) / columns;

    let data: Vec<Value> = table
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| json!({"name": e.word, "value": [i % columns, i / columns, e.count]}))
        .collect();

    let min = table.entries().last().map_or(0, |e| e.count);
    let max = table.max_count().unwrap_or(0);

    json!({
        "title": {"text": kind.title()},
        "tooltip": {"position": "top"},
        "xAxis": {"type": "category", "data": (0..columns).collect::<Vec<_>>()},
        "yAxis": {"type": "category", "data": (0..rows).collect::<Vec<_>>()},
        "visualMap": {
            "min": min,
            "max": max,
            "calculable": true,
            "orient": "horizontal",
            "left": "center",
            "bottom": 0,
        },
        "series": [{
            "name": SERIES_NAME,
            "type": "heatmap",
            "label": {"show": true, "formatter": "{b}"},
            "data": data,
        }],
    })
}

fn boxplot(kind: ChartKind, table: &FilteredFrequencyTable) -> Value {
    let data: Vec<[f64; 5]> = five_number_summary(&table.counts()).into_iter().collect();

    json!({
        "title": {"text": kind.title()},
        "tooltip": {"trigger": "item"},
        "xAxis": {"type": "category", "data": [SERIES_NAME]},
        "yAxis": {"type": "value"},
        "series": [{
            "name": SERIES_NAME,
            "type": "boxplot",
            "data": data,
        }],
    })
}

/// min, Q1, median, Q3, max
pub fn five_number_summary(values: &[usize]) -> Option<[f64; 5]> {
    if values.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Some([
        sorted[0],
        quantile(&sorted, 0.25),
        quantile(&sorted, 0.5),
        quantile(&sorted, 0.75),
        sorted[sorted.len() - 1],
    ])
}

// 相邻两个秩之间线性插值
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
