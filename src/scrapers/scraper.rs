use crate::core::SpiderConfig;
use crate::http::{HttpRequest, HttpResponse};
use crate::{ScraperResult, StatsTracker};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

#[async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch_single(
        &self,
        request: HttpRequest,
        config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse>;
    fn box_clone(&self) -> Box<dyn Scraper>;
    fn stats(&self) -> &StatsTracker;
    fn set_stats(&mut self, stats: Arc<StatsTracker>);

    async fn fetch(
        &self,
        request: HttpRequest,
        config: &SpiderConfig,
    ) -> ScraperResult<HttpResponse> {
        let start_time = Utc::now();
        let url = request.url.clone();

        info!("Fetching URL: {}", url);
        let response = match self.fetch_single(request, config).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed for URL: {} ({})", url, e);
                self.stats().record_failure();
                return Err(e);
            }
        };
        debug!(
            "Received response: status={}, body_length={}",
            response.status,
            response.raw_body.len()
        );

        let duration = Utc::now().signed_duration_since(start_time);
        self.stats()
            .record_request(response.status, response.raw_body.len(), duration);

        Ok(response)
    }
}
