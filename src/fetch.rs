use std::time::Duration;

use reqwest::{header, Client};
use scraper::{node::Node, ElementRef, Html, Selector};
use tracing::debug;

use crate::{config::FetchConfig, Error, Result};

/// 只从这些标签里取文字
const TEXT_TAGS: &str = "p, div, span, h1, h2, li, a";

const SKIPPED_PARENTS: [&str; 3] = ["script", "style", "noscript"];

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Fetcher { client })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!(url, "fetching page");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?
            .error_for_status()?;
        let html = response.text_with_charset("utf-8").await?;

        debug!(url, bytes = html.len(), "fetched page");

        let text = extract_text(&html);
        if text.trim().is_empty() {
            return Err(Error::EmptyContent);
        }

        Ok(text)
    }
}

pub fn extract_text(html: &str) -> String {
    let selector = Selector::parse(TEXT_TAGS).expect("Unable to parse text selector");
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .map(visible_text)
        .collect::<Vec<_>>()
        .join(" ")
}

fn visible_text(element: ElementRef) -> String {
    element
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element())
                    .map(|parent| SKIPPED_PARENTS.contains(&parent.name()))
                    .unwrap_or(false);
                (!hidden).then(|| &**text)
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{extract_text, Fetcher};
    use crate::{config::FetchConfig, Error};

    #[test]
    fn selects_allow_listed_tags() {
        let html = r#"<html><head><title>标题</title><style>p { color: red }</style></head>
            <body><h1>新闻</h1><p>今天<b>天气</b>很好</p><table><td>表格</td></table>
            <ul><li>列表</li></ul><script>var x = "脚本";</script></body></html>"#;

        assert_eq!(extract_text(html), "新闻 今天天气很好 列表");
    }

    #[test]
    fn nested_tags_repeat_text() {
        let html = "<div><p>你好</p></div>";
        assert_eq!(extract_text(html), "你好 你好");
    }

    #[test]
    fn skips_scripts_inside_selected_tags() {
        let html = "<div>正文<script>alert('脚本')</script><noscript>提示</noscript></div>";
        assert_eq!(extract_text(html), "正文");
    }

    #[test]
    fn no_selected_tags_yields_empty() {
        assert_eq!(extract_text("<html><body><table><td>x</td></table></body></html>"), "");
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let fetcher = Fetcher::new(&FetchConfig {
            timeout_secs: 2,
            ..FetchConfig::default()
        })
        .unwrap();

        let err = fetcher.fetch_text("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn malformed_url_is_network_error() {
        let fetcher = Fetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch_text("not a url").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
