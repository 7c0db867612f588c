use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::config::SearchConfig;
use crate::db::Article;

pub const SIMULATED_SOURCE: &str = "simulated-feed";
pub const WEB_SEARCH_SOURCE: &str = "web-search";

/// Bounds for the number of search results requested per search.
pub const MIN_RESULTS: usize = 1;
pub const MAX_RESULTS: usize = 10;

/// Stand-in for a real feed integration: always the same two articles.
pub fn simulated_articles(collected_at: DateTime<Utc>) -> Vec<Article> {
    vec![
        Article::collected(
            "WeChat article: New trends in AI",
            "http://wx.qq.com/1",
            SIMULATED_SOURCE,
            collected_at,
        ),
        Article::collected(
            "WeChat article: Getting started with Python",
            "http://wx.qq.com/2",
            SIMULATED_SOURCE,
            collected_at,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search provider returned status {0}")]
    Status(u16),
    #[error("could not parse search results: {0}")]
    Parse(String),
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

pub fn clamp_result_count(count: usize) -> usize {
    count.clamp(MIN_RESULTS, MAX_RESULTS)
}

/// Queries the provider and turns every hit into an unclassified article.
pub async fn search_articles(
    provider: &dyn SearchProvider,
    keyword: &str,
    count: usize,
    region: &str,
    collected_at: DateTime<Utc>,
) -> Result<Vec<Article>, SearchError> {
    let count = clamp_result_count(count);
    let hits = provider.search(keyword, region, count).await?;

    Ok(hits
        .into_iter()
        .take(count)
        .map(|hit| Article::collected(hit.title, hit.url, WEB_SEARCH_SOURCE, collected_at))
        .collect())
}

/// DuckDuckGo's JavaScript-free HTML endpoint.
pub struct DuckDuckGo {
    client: Client,
    endpoint: String,
}

impl DuckDuckGo {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Extract result links from a DuckDuckGo HTML results page.
    pub fn parse_results(html: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let selector =
            Selector::parse("a.result__a").map_err(|e| SearchError::Parse(e.to_string()))?;
        let document = Html::parse_document(html);

        let hits = document
            .select(&selector)
            .filter_map(|anchor| {
                let title = anchor.text().collect::<String>().trim().to_string();
                let url = Self::resolve_link(anchor.value().attr("href")?)?;
                if title.is_empty() {
                    return None;
                }
                Some(SearchHit { title, url })
            })
            .take(limit)
            .collect();

        Ok(hits)
    }

    /// Resolve a result href to the target URL.
    ///
    /// DuckDuckGo wraps results in `//duckduckgo.com/l/?uddg=<target>`
    /// redirects. Ads and other links back into DuckDuckGo yield `None`.
    pub fn resolve_link(href: &str) -> Option<String> {
        let absolute = if href.starts_with("//") {
            format!("https:{}", href)
        } else if href.starts_with('/') {
            format!("https://duckduckgo.com{}", href)
        } else {
            href.to_string()
        };

        let url = Url::parse(&absolute).ok()?;
        let internal = url
            .host_str()
            .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));

        if internal {
            if url.path() != "/l/" {
                return None;
            }
            return url
                .query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
                .filter(|target| target.starts_with("http://") || target.starts_with("https://"));
        }

        match url.scheme() {
            "http" | "https" => Some(absolute),
            _ => None,
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    async fn search(
        &self,
        query: &str,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        info!("Searching for '{}' (region {}, max {})", query, region, max_results);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("kl", region)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let hits = Self::parse_results(&body, max_results)?;
        debug!("Search for '{}' returned {} hits", query, hits.len());
        Ok(hits)
    }
}
