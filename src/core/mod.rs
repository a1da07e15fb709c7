mod crawler;
mod errors;
pub mod spider;

pub use crawler::Crawler;
pub use errors::{ScraperError, ScraperResult};
pub use spider::{ParseResult, Spider, SpiderCallback, SpiderConfig, SpiderResponse};
