use crate::core::spider::{ParseResult, SpiderResponse};
use crate::http::HttpRequest;
use crate::stats::StatsTracker;
use crate::storage::StorageBackend;
use crate::{Scraper, ScraperResult, Spider};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, trace, warn};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::spawn;
use tokio::task::JoinHandle;

type ParseTask<I> = JoinHandle<ScraperResult<ParseResult<I>>>;

/// Drives a spider: fetches its requests, feeds responses to `Spider::parse`,
/// sends items to the storage backend and queues the follow-up requests.
pub struct Crawler {
    scraper: Box<dyn Scraper>,
    storage: Box<dyn StorageBackend>,
    visited_urls: Arc<RwLock<HashSet<String>>>,
    stats: Arc<StatsTracker>,
}

impl Crawler {
    pub fn new(scraper: Box<dyn Scraper>, storage: Box<dyn StorageBackend>) -> Self {
        info!("Initializing crawler");
        let stats = Arc::new(StatsTracker::new());
        let mut scraper = scraper;
        scraper.set_stats(Arc::clone(&stats));

        Self {
            scraper,
            storage,
            visited_urls: Arc::new(RwLock::new(HashSet::new())),
            stats,
        }
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub async fn run<S: Spider + Send + Sync + 'static>(&self, spider: S) -> ScraperResult<()> {
        let spider = Arc::new(spider);
        let mut futures = FuturesUnordered::new();
        let mut pending: VecDeque<HttpRequest> = spider.start_requests().into();

        info!("Starting spider: {}", spider.name());
        debug!(
            "Max depth: {}, max concurrency: {}",
            spider.config().max_depth,
            spider.config().max_concurrency
        );

        loop {
            self.schedule_pending(&mut pending, Arc::clone(&spider), &mut futures);

            let Some(result) = futures.next().await else {
                break;
            };

            match result {
                Ok(Ok(parse_result)) => {
                    debug!(
                        "Parsed {} items and {} new requests",
                        parse_result.items.len(),
                        parse_result.requests.len()
                    );
                    self.store_items(parse_result.items).await;
                    pending.extend(parse_result.requests);
                }
                Ok(Err(e)) => warn!("Error processing request: {}", e),
                Err(e) => warn!("Task error: {}", e),
            }
        }

        self.storage.flush().await?;
        self.stats.finish();

        info!(
            "Spider {} completed. Total URLs processed: {}",
            spider.name(),
            self.visited_urls.read().len()
        );
        Ok(())
    }

    /// Moves requests from `pending` into flight until the concurrency limit is hit
    /// or nothing is left to schedule.
    fn schedule_pending<S: Spider + Send + Sync + 'static>(
        &self,
        pending: &mut VecDeque<HttpRequest>,
        spider: Arc<S>,
        futures: &mut FuturesUnordered<ParseTask<S::Item>>,
    ) {
        let config = spider.config();

        while futures.len() < config.max_concurrency {
            let Some(request) = pending.pop_front() else {
                break;
            };

            if request.depth >= config.max_depth {
                debug!("Skipping URL {} - max depth reached", request.url);
                continue;
            }

            let url_str = request.url.to_string();
            if !config.allow_url_revisit && self.visited_urls.read().contains(&url_str) {
                debug!("Skipping URL {} - already visited", url_str);
                continue;
            }

            info!("Processing URL: {} at depth {}", url_str, request.depth);
            if let Some(meta) = &request.meta {
                trace!("Request metadata: {:?}", meta);
            }

            self.visited_urls.write().insert(url_str);
            self.process_request(request, Arc::clone(&spider), futures);
        }
    }

    fn process_request<S: Spider + Send + Sync + 'static>(
        &self,
        request: HttpRequest,
        spider: Arc<S>,
        futures: &mut FuturesUnordered<ParseTask<S::Item>>,
    ) {
        let scraper = self.scraper.box_clone();
        let config = spider.config().clone();

        futures.push(spawn(async move {
            let response = scraper.fetch(request, &config).await?;
            if !response.is_success() {
                warn!(
                    "Dropping response for URL: {} (status {})",
                    response.url, response.status
                );
                return Ok(ParseResult::default());
            }

            let spider_response = SpiderResponse {
                callback: response.from_request.callback.clone(),
                response,
            };
            spider.parse(&spider_response).await
        }));
    }

    async fn store_items<I: Serialize>(&self, items: Vec<I>) {
        for item in items {
            let value = match serde_json::to_value(&item) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Failed to serialize item: {}", e);
                    self.stats.increment_storage_errors();
                    continue;
                }
            };

            match self.storage.store(value).await {
                Ok(()) => self.stats.record_items(1),
                Err(e) => {
                    warn!("Failed to store item: {}", e);
                    self.stats.increment_storage_errors();
                }
            }
        }
    }
}
