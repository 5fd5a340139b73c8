use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_wfreq::{
    pipeline::run,
    web::{self, FormInput, Outcome, PageContext},
    AnalysisRequest, AppConfig, ChartKind, Pipeline,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 抓取网页, 统计中文词频, 画图
#[derive(Parser, Debug)]
#[clap(name = "rust_wfreq", version, about)]
struct Cli {
    /// JSON 配置文件
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 启动浏览器界面
    Serve {
        #[clap(long)]
        listen: Option<String>,
    },
    /// 分析一个网页并写出 HTML 报告
    Render {
        #[clap(long)]
        url: String,

        /// wordcloud, bar, line, pie, scatter, area, funnel, heatmap, boxplot
        #[clap(long)]
        chart: Option<ChartKind>,

        #[clap(long)]
        threshold: Option<usize>,

        /// PNG 掩模, 只用于词云
        #[clap(long)]
        mask: Option<PathBuf>,

        #[clap(long, default_value = "report.html")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rust_wfreq=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };

    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;

    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen = listen;
            }
            let addr = config.listen.clone();
            let pipeline = Arc::new(Pipeline::new(config).context("building pipeline")?);

            runtime
                .block_on(web::serve(pipeline, &addr))
                .with_context(|| format!("serving on {addr}"))?;
        }
        Command::Render {
            url,
            chart,
            threshold,
            mask,
            output,
        } => {
            let pipeline = Arc::new(Pipeline::new(config).context("building pipeline")?);

            let mask = match mask {
                Some(path) => Some(
                    fs::read(&path).with_context(|| format!("reading mask {}", path.display()))?,
                ),
                None => None,
            };
            let request = AnalysisRequest {
                url,
                chart: chart.unwrap_or(pipeline.charts()[0]),
                threshold: threshold.unwrap_or(pipeline.config().threshold.default),
                mask,
            };

            let form = FormInput {
                url: request.url.clone(),
                chart: Some(request.chart.key().to_string()),
                threshold: Some(request.threshold.to_string()),
                mask: None,
            };

            let report = runtime.block_on(run(pipeline.clone(), request))?;

            println!("词频排名前{}的词汇：", pipeline.config().top_n);
            for (i, entry) in report.top().iter().enumerate() {
                println!("{i:>3}  {:<12} {}", entry.word, entry.count);
            }

            let context = PageContext::from_pipeline(&pipeline);
            let page = web::render_page(&context, &form, Outcome::Report(&report));
            fs::write(&output, page)
                .with_context(|| format!("writing report {}", output.display()))?;
            info!(output = %output.display(), "report written");
        }
    }

    Ok(())
}
