use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::Scraper;
use crate::core::SpiderConfig;
use crate::http::{HttpRequest, HttpResponse, ResponseType};
use crate::{ScraperError, ScraperResult, StatsTracker};

const DEFAULT_USER_AGENT: &str = concat!("quotes-spider/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum HttpScraperError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] header::InvalidHeaderName),
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] header::InvalidHeaderValue),
    #[error("Failed to decode response body: {0}")]
    DecodingError(String),
}

impl From<HttpScraperError> for ScraperError {
    fn from(err: HttpScraperError) -> Self {
        match err {
            HttpScraperError::HttpError(e) => ScraperError::HttpError(e),
            e @ (HttpScraperError::InvalidHeaderName(_)
            | HttpScraperError::InvalidHeaderValue(_)) => ScraperError::HeaderError(e.to_string()),
            HttpScraperError::DecodingError(e) => ScraperError::ParsingError(e),
        }
    }
}

/// GET fetcher over a shared reqwest client.
#[derive(Clone)]
pub struct HttpScraper {
    client: Client,
    stats: Arc<StatsTracker>,
}

impl HttpScraper {
    pub fn new() -> Result<Self, HttpScraperError> {
        let client = ClientBuilder::new()
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            stats: Arc::new(StatsTracker::new()),
        })
    }

    /// Spider-wide headers first, then the request's own. A name present in
    /// both ends up with the request's value only. The client's User-Agent
    /// applies when neither sets one.
    fn request_headers(
        config: &SpiderConfig,
        request: &HttpRequest,
    ) -> Result<HeaderMap, HttpScraperError> {
        let mut headers = HeaderMap::new();

        for (key, value) in config.headers.iter().map(|(k, v)| (k, v)).chain(request.headers.iter()) {
            let name = HeaderName::from_bytes(key.as_bytes())?;
            let value = HeaderValue::from_str(value)?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    fn extract_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
            .collect()
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch_single(
        &self,
        request: HttpRequest,
        config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse> {
        let headers = Self::request_headers(config, &request)?;
        let timestamp = Utc::now();

        let response = self
            .client
            .get(request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(HttpScraperError::from)?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(&response);

        let raw_body = response.bytes().await.map_err(HttpScraperError::from)?;
        let decoded_body = String::from_utf8(raw_body.to_vec())
            .map_err(|e| HttpScraperError::DecodingError(e.to_string()))?;

        let response_type = ResponseType::detect(&headers, &decoded_body);

        Ok(HttpResponse {
            url: request.url.clone(),
            status,
            headers,
            raw_body: raw_body.to_vec(),
            decoded_body,
            timestamp,
            response_type,
            from_request: Box::new(request),
        })
    }

    fn box_clone(&self) -> Box<dyn Scraper> {
        Box::new(self.clone())
    }

    fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    fn set_stats(&mut self, stats: Arc<StatsTracker>) {
        self.stats = stats;
    }
}
