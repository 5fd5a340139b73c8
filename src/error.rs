use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// 网页获取失败，包括超时和非 2xx 状态码
    #[error("网页获取失败: {0}")]
    Network(#[from] reqwest::Error),

    #[error("未能从该网址获取到有效的文本内容，请检查网址是否有效。")]
    EmptyContent,

    #[error("请上传 PNG 格式的图片文件作为掩模图像: {0}")]
    InvalidImage(String),

    #[error("最小词频 {value} 超出范围 [{min}, {max}]")]
    ThresholdOutOfRange { value: usize, min: usize, max: usize },

    #[error("不支持的图表类型: {0}")]
    UnsupportedChart(String),

    #[error("无法读取停用词文件 {path}: {source}")]
    Stopwords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("字体加载失败: {0}")]
    Font(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("图表生成失败: {0}")]
    Render(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Error::Render(msg.into())
    }

    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Error::InvalidImage(msg.into())
    }
}
