use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use quotes_spider::core::SpiderConfig;
use quotes_spider::scrapers::HttpScraper;
use quotes_spider::spiders::QuotesSpider;
use quotes_spider::{Crawler, JsonLinesStorage, Spider, StorageBackend};
use url::Url;

/// Scrape quotes, authors and tags from quotes.toscrape.com
#[derive(Debug, Parser)]
#[command(name = "quotes", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    Crawl(CrawlArgs),
    Parse(ParseArgs),
}

/// Crawl from the seed pages and write one JSON object per quote
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// JSON Lines output file, stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Maximum number of requests in flight
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,
    /// Requests at this depth or deeper are not fetched
    #[arg(long, default_value_t = 999)]
    pub max_depth: usize,
    /// Override the User-Agent header
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Only log errors
    #[arg(long, short)]
    pub quiet: bool,
}

/// Run the extraction on a saved HTML page and print what it yields
#[derive(Debug, clap::Args)]
pub struct ParseArgs {
    /// Saved HTML page
    #[arg(long, short)]
    pub input: PathBuf,
    /// URL the page was fetched from, used to resolve next links
    #[arg(long, default_value = "http://quotes.toscrape.com/page/1/")]
    pub url: Url,
}

fn init_logging(level: LevelFilter) {
    env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter_module("quotes_spider", level)
        .filter_module("quotes", level)
        .filter_module("selectors", LevelFilter::Warn)
        .filter_module("html5ever", LevelFilter::Error)
        .parse_default_env()
        .init();
}

async fn run_crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let mut headers = Vec::new();
    if let Some(user_agent) = args.user_agent.as_deref() {
        headers.push(("User-Agent", user_agent));
    }

    let spider_config = SpiderConfig::default()
        .with_depth(args.max_depth)
        .with_concurrency(args.concurrency)
        .with_headers(headers);

    let storage: Box<dyn StorageBackend> = match &args.output {
        Some(path) => Box::new(
            JsonLinesStorage::create(path)
                .with_context(|| format!("Couldn't create {}", path.display()))?,
        ),
        None => Box::new(JsonLinesStorage::stdout()),
    };

    let spider = QuotesSpider::new()?.with_config(spider_config);
    let scraper = Box::new(HttpScraper::new()?);
    let crawler = Crawler::new(scraper, storage);
    crawler.run(spider).await?;
    crawler.stats().print_summary();

    Ok(())
}

fn run_parse(args: ParseArgs) -> anyhow::Result<()> {
    let body = fs::read_to_string(&args.input)
        .with_context(|| format!("Couldn't read {}", args.input.display()))?;

    let result = QuotesSpider::new()?.extract(&body, &args.url, 0);
    for item in &result.items {
        println!("{}", serde_json::to_string(item)?);
    }
    for request in &result.requests {
        eprintln!("next: {}", request.url);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            init_logging(if args.quiet {
                LevelFilter::Error
            } else {
                LevelFilter::Info
            });
            run_crawl(args).await
        }
        SubCommand::Parse(args) => {
            init_logging(LevelFilter::Warn);
            run_parse(args)
        }
    }
}
