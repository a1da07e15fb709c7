use crate::core::SpiderConfig;
use crate::http::{HttpRequest, HttpResponse, ResponseType};
use crate::{ScraperResult, StatsTracker};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use super::Scraper;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Serves canned responses keyed by URL; unknown URLs get a 404.
#[derive(Clone)]
pub struct MockScraper {
    responses: Arc<HashMap<String, MockResponse>>,
    requested: Arc<Mutex<Vec<Url>>>,
    stats: Arc<StatsTracker>,
}

impl MockScraper {
    pub fn new(responses: Vec<(Url, MockResponse)>) -> Self {
        Self {
            responses: Arc::new(
                responses
                    .into_iter()
                    .map(|(url, response)| (url.to_string(), response))
                    .collect(),
            ),
            requested: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(StatsTracker::new()),
        }
    }

    /// Every URL fetched so far, in fetch order. Shared between clones.
    pub fn requested(&self) -> Vec<Url> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch_single(
        &self,
        request: HttpRequest,
        _config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse> {
        self.requested.lock().push(request.url.clone());

        let response = self
            .responses
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| MockResponse::html("Not Found").with_status(404));

        if let Some(delay) = response.delay {
            sleep(delay).await;
        }

        let headers = HashMap::from([(
            "content-type".to_string(),
            "text/html; charset=utf-8".to_string(),
        )]);

        Ok(HttpResponse {
            url: request.url.clone(),
            status: response.status,
            headers,
            raw_body: response.body.clone().into_bytes(),
            decoded_body: response.body,
            timestamp: Utc::now(),
            response_type: ResponseType::Html,
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
