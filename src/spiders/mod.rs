pub mod quotes;

pub use quotes::{QuoteItem, QuotesSpider};
