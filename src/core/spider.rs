use crate::http::{HttpRequest, HttpResponse};
use crate::ScraperResult;
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

const DEFAULT_MAX_DEPTH: usize = 999;
const DEFAULT_MAX_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpiderCallback {
    /// Seed pages from `start_urls`.
    Bootstrap,
    /// Pages reached through a "next page" link.
    ParsePagination,
}

#[derive(Debug, Clone)]
pub struct SpiderResponse {
    pub response: HttpResponse,
    pub callback: SpiderCallback,
}

/// What a spider hands back for one page: scraped items and the requests to follow.
#[derive(Debug)]
pub struct ParseResult<I> {
    pub items: Vec<I>,
    pub requests: Vec<HttpRequest>,
}

impl<I> ParseResult<I> {
    pub fn new(items: Vec<I>, requests: Vec<HttpRequest>) -> Self {
        Self { items, requests }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.requests.is_empty()
    }
}

impl<I> Default for ParseResult<I> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct SpiderConfig {
    pub max_depth: usize,
    pub max_concurrency: usize,
    pub allow_url_revisit: bool,
    pub headers: Vec<(String, String)>,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            allow_url_revisit: false,
            headers: Vec::new(),
        }
    }
}

impl SpiderConfig {
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Clamped to at least one request in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.max(1);
        self
    }

    pub fn with_allow_url_revisit(mut self, allow: bool) -> Self {
        self.allow_url_revisit = allow;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(&str, &str)>) -> Self {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }
}

#[async_trait]
pub trait Spider {
    type Item: Serialize + Send + 'static;

    fn name(&self) -> String;
    fn start_urls(&self) -> Vec<Url>;
    fn config(&self) -> &SpiderConfig;
    fn set_config(&mut self, config: SpiderConfig);

    fn with_config(mut self, config: SpiderConfig) -> Self
    where
        Self: Sized,
    {
        self.set_config(config);
        self
    }

    fn start_requests(&self) -> Vec<HttpRequest> {
        self.start_urls()
            .into_iter()
            .map(|url| HttpRequest::new(url, SpiderCallback::Bootstrap, 0))
            .collect()
    }

    async fn parse(&self, response: &SpiderResponse) -> ScraperResult<ParseResult<Self::Item>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SpiderConfig::default()
            .with_depth(3)
            .with_concurrency(0)
            .with_allow_url_revisit(true)
            .with_headers(vec![("User-Agent", "QuotesBot/1.0")]);

        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_concurrency, 1);
        assert!(config.allow_url_revisit);
        assert_eq!(
            config.headers,
            vec![("User-Agent".to_string(), "QuotesBot/1.0".to_string())]
        );
    }

    #[test]
    fn test_empty_parse_result() {
        let result: ParseResult<String> = ParseResult::default();
        assert!(result.is_empty());
    }
}
