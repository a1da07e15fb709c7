use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ScrapingStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub responses_received: usize,
    pub bytes_downloaded: usize,
    pub status_codes: HashMap<u16, usize>,
    pub items_scraped: usize,
    pub storage_errors: usize,
    pub average_response_time: f64, // in milliseconds
}

#[derive(Debug, Clone)]
pub struct StatsTracker {
    stats: Arc<RwLock<ScrapingStats>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(ScrapingStats {
                start_time: Utc::now(),
                end_time: None,
                total_requests: 0,
                successful_requests: 0,
                failed_requests: 0,
                responses_received: 0,
                bytes_downloaded: 0,
                status_codes: HashMap::new(),
                items_scraped: 0,
                storage_errors: 0,
                average_response_time: 0.0,
            })),
        }
    }

    pub fn record_request(&self, status: u16, size: usize, duration: Duration) {
        let mut stats = self.stats.write();
        stats.total_requests += 1;
        stats.responses_received += 1;

        if (200..300).contains(&status) {
            stats.successful_requests += 1;
        } else {
            stats.failed_requests += 1;
        }

        *stats.status_codes.entry(status).or_insert(0) += 1;
        stats.bytes_downloaded += size;

        let received = stats.responses_received as f64;
        let current_total = stats.average_response_time * (received - 1.0);
        let new_duration = duration.num_milliseconds() as f64;
        stats.average_response_time = (current_total + new_duration) / received;
    }

    /// A request that never produced a response (connection refused, timeout, bad body).
    pub fn record_failure(&self) {
        let mut stats = self.stats.write();
        stats.total_requests += 1;
        stats.failed_requests += 1;
    }

    pub fn record_items(&self, count: usize) {
        self.stats.write().items_scraped += count;
    }

    pub fn increment_storage_errors(&self) {
        self.stats.write().storage_errors += 1;
    }

    pub fn finish(&self) {
        self.stats.write().end_time = Some(Utc::now());
    }

    pub fn get_stats(&self) -> ScrapingStats {
        self.stats.read().clone()
    }

    /// Written to stderr so stdout can carry the scraped items.
    pub fn print_summary(&self) {
        let stats = self.stats.read();
        let duration = stats
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(stats.start_time);

        eprintln!("\nScraping Statistics:");
        eprintln!("===================");
        eprintln!("Duration: {} seconds", duration.num_seconds());
        eprintln!("Total Requests: {}", stats.total_requests);
        eprintln!("Successful Requests: {}", stats.successful_requests);
        eprintln!("Failed Requests: {}", stats.failed_requests);
        eprintln!("Items Scraped: {}", stats.items_scraped);
        eprintln!("Storage Errors: {}", stats.storage_errors);
        eprintln!(
            "Data Downloaded: {:.2} MB",
            stats.bytes_downloaded as f64 / 1_000_000.0
        );
        eprintln!(
            "Average Response Time: {:.2}ms",
            stats.average_response_time
        );

        eprintln!("\nStatus Codes:");
        let mut codes: Vec<_> = stats.status_codes.iter().collect();
        codes.sort();
        for (code, count) in codes {
            eprintln!("  {}: {}", code, count);
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
