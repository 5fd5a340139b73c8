use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    response::Html,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    chart::ChartKind,
    config::ThresholdRange,
    pipeline::{AnalysisReport, AnalysisRequest, Pipeline},
};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

// 页面需要的配置
pub struct PageContext<'a> {
    pub charts: &'a [ChartKind],
    pub threshold: ThresholdRange,
    pub mask_support: bool,
    pub top_n: usize,
    pub chart_height: u32,
}

impl<'a> PageContext<'a> {
    pub fn from_pipeline(pipeline: &'a Pipeline) -> Self {
        let config = pipeline.config();
        PageContext {
            charts: pipeline.charts(),
            threshold: config.threshold,
            mask_support: config.mask_support,
            top_n: config.top_n,
            chart_height: config.chart_height,
        }
    }
}

#[derive(Debug, Default)]
pub struct FormInput {
    pub url: String,
    pub chart: Option<String>,
    pub threshold: Option<String>,
    pub mask: Option<Vec<u8>>,
}

impl FormInput {
    pub fn into_request(self, context: &PageContext) -> Result<AnalysisRequest, String> {
        let chart = match &self.chart {
            Some(chart) => chart.parse::<ChartKind>().map_err(|e| e.to_string())?,
            None => context.charts[0],
        };
        let threshold = match &self.threshold {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("最小词频必须是整数: {raw}"))?,
            None => context.threshold.default,
        };

        Ok(AnalysisRequest {
            url: self.url,
            chart,
            threshold,
            mask: self.mask,
        })
    }
}

pub enum Outcome<'a> {
    Empty,
    Report(&'a AnalysisReport),
    Error(String),
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let limit = pipeline.config().max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(pipeline)
}

pub async fn serve(pipeline: Arc<Pipeline>, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(pipeline)).await
}

async fn index(State(pipeline): State<Arc<Pipeline>>) -> Html<String> {
    let context = PageContext::from_pipeline(&pipeline);
    Html(render_page(&context, &FormInput::default(), Outcome::Empty))
}

async fn analyze(State(pipeline): State<Arc<Pipeline>>, multipart: Multipart) -> Html<String> {
    let context = PageContext::from_pipeline(&pipeline);

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "bad form upload");
            let outcome = Outcome::Error(format!("表单读取失败: {e}"));
            return Html(render_page(&context, &FormInput::default(), outcome));
        }
    };

    // 没有网址就只显示表单
    if form.url.is_empty() {
        return Html(render_page(&context, &form, Outcome::Empty));
    }

    let shown = FormInput {
        url: form.url.clone(),
        chart: form.chart.clone(),
        threshold: form.threshold.clone(),
        mask: None,
    };

    let request = match form.into_request(&context) {
        Ok(request) => request,
        Err(message) => return Html(render_page(&context, &shown, Outcome::Error(message))),
    };

    let url = request.url.clone();
    match crate::pipeline::run(pipeline.clone(), request).await {
        Ok(report) => Html(render_page(&context, &shown, Outcome::Report(&report))),
        Err(e) => {
            warn!(url, error = %e, "analysis failed");
            Html(render_page(&context, &shown, Outcome::Error(e.to_string())))
        }
    }
}

async fn read_form(mut multipart: Multipart) -> Result<FormInput, MultipartError> {
    let mut form = FormInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "url" => form.url = field.text().await?.trim().to_string(),
            "chart" => form.chart = Some(field.text().await?),
            "threshold" => form.threshold = Some(field.text().await?),
            "mask" => {
                let has_file = field.file_name().map_or(false, |name| !name.is_empty());
                let bytes = field.bytes().await?;
                if has_file && !bytes.is_empty() {
                    form.mask = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

pub fn render_page(context: &PageContext, form: &FormInput, outcome: Outcome) -> String {
    let selected = form
        .chart
        .as_deref()
        .and_then(|chart| chart.parse::<ChartKind>().ok());

    let chart_options: String = context
        .charts
        .iter()
        .map(|kind| {
            let mark = if Some(*kind) == selected { " selected" } else { "" };
            format!(r#"<option value="{}"{mark}>{}</option>"#, kind.key(), kind.label())
        })
        .collect();

    let threshold = form
        .threshold
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| context.threshold.check(*value).is_ok())
        .unwrap_or(context.threshold.default);

    let mask_input = if context.mask_support {
        r#"<label>上传词云掩模图片 (PNG 格式)<input type="file" name="mask" accept="image/png,.png"></label>"#
    } else {
        ""
    };

    let result = match outcome {
        Outcome::Empty => String::new(),
        Outcome::Error(message) => {
            format!(r#"<div class="error">{}</div>"#, html_escape(&message))
        }
        Outcome::Report(report) => render_report(context, report),
    };

    let min = context.threshold.min.to_string();
    let max = context.threshold.max.to_string();
    let value = threshold.to_string();
    let url = html_escape(&form.url);

    fill_template(
        INDEX_TEMPLATE,
        &[
            ("CHART_OPTIONS", chart_options.as_str()),
            ("THRESHOLD_MIN", min.as_str()),
            ("THRESHOLD_MAX", max.as_str()),
            ("THRESHOLD_VALUE", value.as_str()),
            ("MASK_INPUT", mask_input),
            ("URL", url.as_str()),
            ("RESULT", result.as_str()),
        ],
    )
}

// 一次扫描模板, 填进去的内容不会再被当成占位符
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn render_report(context: &PageContext, report: &AnalysisReport) -> String {
    let rows: String = report
        .top()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "<tr><td>{i}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&entry.word),
                entry.count
            )
        })
        .collect();

    format!(
        r#"<h2>词频排名前{top_n}的词汇：</h2>
<table><tr><th></th><th>词语</th><th>词频</th></tr>{rows}</table>
<h2>{label}:</h2>
{chart}"#,
        top_n = context.top_n,
        label = report.chart.kind().label(),
        chart = report.chart.to_html(context.chart_height),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
