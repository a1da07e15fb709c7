use crate::core::{ParseResult, Spider, SpiderCallback, SpiderConfig, SpiderResponse};
use crate::http::{HttpRequest, ResponseType};
use crate::{ScraperError, ScraperResult};
use async_trait::async_trait;
use log::{debug, info};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

pub const SPIDER_NAME: &str = "quotes2";

pub const START_URLS: [&str; 2] = [
    "http://quotes.toscrape.com/page/1/",
    "http://quotes.toscrape.com/page/2/",
];

/// One scraped quote block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub text: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

/// Compiled selectors. Attribute selectors compare the whole `class` value,
/// so `class="quote featured"` is not a quote container.
struct QuoteSelectors {
    quote: Selector,
    text: Selector,
    author: Selector,
    next_link: Selector,
}

impl QuoteSelectors {
    fn new() -> ScraperResult<Self> {
        Ok(Self {
            quote: parse_selector(r#"div[class="quote"]"#)?,
            text: parse_selector(r#"span[class="text"]"#)?,
            author: parse_selector(r#"small[class="author"]"#)?,
            next_link: parse_selector(r#"li[class="next"] > a"#)?,
        })
    }
}

fn parse_selector(selector: &str) -> ScraperResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScraperError::ParsingError(format!("invalid selector {selector}: {e}")))
}

pub struct QuotesSpider {
    config: SpiderConfig,
    start_urls: Vec<Url>,
    selectors: QuoteSelectors,
}

impl QuotesSpider {
    pub fn new() -> ScraperResult<Self> {
        let start_urls = START_URLS
            .iter()
            .map(|url| Url::parse(url))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config: SpiderConfig::default(),
            start_urls,
            selectors: QuoteSelectors::new()?,
        })
    }

    pub fn with_start_urls(mut self, start_urls: Vec<Url>) -> Self {
        self.start_urls = start_urls;
        self
    }

    /// Pulls every quote record and every "next page" request out of one page.
    ///
    /// `text` and `author` are looked up across the whole document, not inside
    /// each container, so every record on a page repeats the first quote's text
    /// and author. Only `tags` is read from the container itself.
    ///
    /// Markup that doesn't match yields fewer records, never an error.
    pub fn extract(&self, body: &str, page_url: &Url, depth: usize) -> ParseResult<QuoteItem> {
        let document = Html::parse_document(body);

        let text = first_text(&document, &self.selectors.text);
        let author = first_text(&document, &self.selectors.author);

        let items = document
            .select(&self.selectors.quote)
            .map(|quote| QuoteItem {
                text: text.clone(),
                author: author.clone(),
                tags: container_tags(quote),
            })
            .collect();

        let requests = document
            .select(&self.selectors.next_link)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| match page_url.join(href) {
                Ok(url) => Some(url),
                Err(e) => {
                    debug!("Skipping next link {:?} on {}: {}", href, page_url, e);
                    None
                }
            })
            .map(|url| {
                HttpRequest::new(url, SpiderCallback::ParsePagination, depth + 1)
                    .with_header("Referer", page_url.as_str())
                    .with_meta(json!({ "parent_url": page_url.as_str() }))
            })
            .collect();

        ParseResult::new(items, requests)
    }
}

/// Earliest text node in the document whose parent element matches `selector`.
/// With nested matches the inner element's text can come before the outer one's.
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .root_element()
        .descendants()
        .filter(|node| {
            node.parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| selector.matches(&parent))
        })
        .find_map(|node| node.value().as_text().map(|text| text.to_string()))
}

/// Tags of one container: `a class="tag"` under the container's own `div class="tags"`.
fn container_tags(quote: ElementRef<'_>) -> Vec<String> {
    child_elements(quote, "div", "tags")
        .flat_map(|tags| child_elements(tags, "a", "tag"))
        .flat_map(own_text)
        .collect()
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    name: &'a str,
    class: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent.children().filter_map(ElementRef::wrap).filter(move |el| {
        el.value().name() == name && el.value().attr("class") == Some(class)
    })
}

/// Text nodes that are direct children of `element`, skipping nested elements.
fn own_text(element: ElementRef<'_>) -> Vec<String> {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|text| text.to_string()))
        .collect()
}

#[async_trait]
impl Spider for QuotesSpider {
    type Item = QuoteItem;

    fn name(&self) -> String {
        SPIDER_NAME.to_string()
    }

    fn start_urls(&self) -> Vec<Url> {
        self.start_urls.clone()
    }

    fn config(&self) -> &SpiderConfig {
        &self.config
    }

    fn set_config(&mut self, config: SpiderConfig) {
        self.config = config;
    }

    async fn parse(&self, spider_response: &SpiderResponse) -> ScraperResult<ParseResult<QuoteItem>> {
        let response = &spider_response.response;

        if response.response_type != ResponseType::Html {
            debug!(
                "Not parsing {} - {:?} response",
                response.url, response.response_type
            );
            return Ok(ParseResult::default());
        }

        match spider_response.callback {
            SpiderCallback::Bootstrap | SpiderCallback::ParsePagination => {
                let result = self.extract(
                    &response.decoded_body,
                    &response.url,
                    response.from_request.depth,
                );
                info!(
                    "Scraped {} quotes from {} ({} next links)",
                    result.items.len(),
                    response.url,
                    result.requests.len()
                );
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use chrono::Utc;
    use std::collections::HashMap;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<body>
<div class="container">
    <div class="quote" itemscope itemtype="http://schema.org/CreativeWork">
        <span class="text" itemprop="text">“The world as we have created it is a process of our thinking.”</span>
        <span>by <small class="author" itemprop="author">Albert Einstein</small>
        <a href="/author/Albert-Einstein">(about)</a>
        </span>
        <div class="tags">
            Tags:
            <a class="tag" href="/tag/change/page/1/">change</a>
            <a class="tag" href="/tag/deep-thoughts/page/1/">deep-thoughts</a>
            <a class="tag" href="/tag/thinking/page/1/">thinking</a>
        </div>
    </div>
    <div class="quote" itemscope itemtype="http://schema.org/CreativeWork">
        <span class="text" itemprop="text">“It is our choices, Harry, that show what we truly are.”</span>
        <span>by <small class="author" itemprop="author">J.K. Rowling</small></span>
        <div class="tags">
            Tags:
            <a class="tag" href="/tag/abilities/page/1/">abilities</a>
            <a class="tag" href="/tag/choices/page/1/">choices</a>
        </div>
    </div>
    <div class="quote">
        <span class="text">“A day without sunshine is like, you know, night.”</span>
        <span>by <small class="author">Steve Martin</small></span>
        <div class="tags">
            Tags:
        </div>
    </div>
    <nav>
        <ul class="pager">
            <li class="next">
                <a href="/page/2/">Next <span aria-hidden="true">&rarr;</span></a>
            </li>
        </ul>
    </nav>
</div>
</body>
</html>"#;

    const FIRST_TEXT: &str = "“The world as we have created it is a process of our thinking.”";

    fn page_url() -> Url {
        Url::parse("http://quotes.toscrape.com/page/1/").unwrap()
    }

    fn spider() -> QuotesSpider {
        QuotesSpider::new().unwrap()
    }

    #[test]
    fn test_one_record_per_quote_container() {
        let result = spider().extract(PAGE, &page_url(), 0);
        assert_eq!(result.items.len(), 3);
    }

    #[test]
    fn test_text_and_author_come_from_first_quote() {
        let result = spider().extract(PAGE, &page_url(), 0);

        for item in &result.items {
            assert_eq!(item.text.as_deref(), Some(FIRST_TEXT));
            assert_eq!(item.author.as_deref(), Some("Albert Einstein"));
        }
    }

    #[test]
    fn test_tags_are_scoped_to_each_container() {
        let result = spider().extract(PAGE, &page_url(), 0);

        assert_eq!(
            result.items[0].tags,
            vec!["change", "deep-thoughts", "thinking"]
        );
        assert_eq!(result.items[1].tags, vec!["abilities", "choices"]);
        assert!(result.items[2].tags.is_empty());
    }

    #[test]
    fn test_next_link_becomes_one_request() {
        let result = spider().extract(PAGE, &page_url(), 0);

        assert_eq!(result.requests.len(), 1);
        let request = &result.requests[0];
        assert_eq!(request.url.as_str(), "http://quotes.toscrape.com/page/2/");
        assert_eq!(request.callback, SpiderCallback::ParsePagination);
        assert_eq!(request.depth, 1);
        assert_eq!(
            request.meta,
            Some(json!({"parent_url": "http://quotes.toscrape.com/page/1/"}))
        );
    }

    #[test]
    fn test_next_request_carries_referer() {
        let result = spider().extract(PAGE, &page_url(), 0);

        assert_eq!(
            result.requests[0].headers.get("Referer").map(String::as_str),
            Some("http://quotes.toscrape.com/page/1/")
        );
    }

    #[test]
    fn test_page_without_quotes_still_follows_next() {
        let body = r#"<html><body>
            <p>No quotes found!</p>
            <ul class="pager"><li class="next"><a href="/page/11/">Next</a></li></ul>
        </body></html>"#;
        let result = spider().extract(body, &page_url(), 4);

        assert!(result.items.is_empty());
        assert_eq!(result.requests.len(), 1);
        assert_eq!(
            result.requests[0].url.as_str(),
            "http://quotes.toscrape.com/page/11/"
        );
        assert_eq!(result.requests[0].depth, 5);
    }

    #[test]
    fn test_no_next_link_no_requests() {
        let body = r#"<html><body>
            <div class="quote"><span class="text">only</span></div>
        </body></html>"#;
        let result = spider().extract(body, &page_url(), 0);

        assert_eq!(result.items.len(), 1);
        assert!(result.requests.is_empty());
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let result = spider().extract("<html><body><p>nothing here</p></body></html>", &page_url(), 0);
        assert!(result.is_empty());

        let result = spider().extract("", &page_url(), 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let body = r#"<div class="quote"><div class="tags"></div></div>"#;
        let result = spider().extract(body, &page_url(), 0);

        assert_eq!(
            result.items,
            vec![QuoteItem {
                text: None,
                author: None,
                tags: vec![],
            }]
        );
    }

    #[test]
    fn test_class_match_is_exact() {
        let body = r#"
            <div class="quote featured"><span class="text">nope</span></div>
            <div class="quote">
                <div class="tags extra"><a class="tag">hidden</a></div>
                <div class="tags"><a class="tag big">skipped</a><a class="tag">kept</a></div>
            </div>
        "#;
        let result = spider().extract(body, &page_url(), 0);

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].tags, vec!["kept"]);
        // span.text inside the non-matching container is still found document-wide
        assert_eq!(result.items[0].text.as_deref(), Some("nope"));
    }

    #[test]
    fn test_text_is_first_in_document_order() {
        let body = r#"
            <div class="quote">
                <span class="text"><span class="text">inner</span>outer</span>
                <small class="author"><b>bold</b></small>
            </div>
            <div class="quote"><small class="author">second</small></div>
        "#;
        let result = spider().extract(body, &page_url(), 0);

        assert_eq!(result.items[0].text.as_deref(), Some("inner"));
        // the first author element has no text child of its own
        assert_eq!(result.items[0].author.as_deref(), Some("second"));
    }

    #[test]
    fn test_tags_must_be_direct_children() {
        let body = r#"
            <div class="quote">
                <section><div class="tags"><a class="tag">nested</a></div></section>
            </div>
        "#;
        let result = spider().extract(body, &page_url(), 0);
        assert!(result.items[0].tags.is_empty());
    }

    #[test]
    fn test_next_without_href_is_ignored() {
        let body = r#"<ul><li class="next"><a>Next</a></li></ul>"#;
        let result = spider().extract(body, &page_url(), 0);
        assert!(result.requests.is_empty());
    }

    #[test]
    fn test_item_serializes_absent_fields_as_null() {
        let item = QuoteItem {
            text: None,
            author: Some("Albert Einstein".to_string()),
            tags: vec![],
        };
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"text": null, "author": "Albert Einstein", "tags": []})
        );
    }

    #[test]
    fn test_seeds() {
        let spider = spider();
        assert_eq!(spider.name(), "quotes2");

        let requests = spider.start_requests();
        let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, START_URLS);
        assert!(requests
            .iter()
            .all(|r| r.callback == SpiderCallback::Bootstrap && r.depth == 0));
    }

    fn response(url: &str, depth: usize, body: &str, response_type: ResponseType) -> HttpResponse {
        let url = Url::parse(url).unwrap();
        let request = HttpRequest::new(url.clone(), SpiderCallback::ParsePagination, depth);
        HttpResponse {
            url,
            status: 200,
            headers: HashMap::new(),
            raw_body: body.as_bytes().to_vec(),
            decoded_body: body.to_string(),
            timestamp: Utc::now(),
            response_type,
            from_request: Box::new(request),
        }
    }

    #[tokio::test]
    async fn test_parse_uses_request_depth() {
        let response = response(
            "http://quotes.toscrape.com/page/3/",
            2,
            PAGE,
            ResponseType::Html,
        );

        let result = spider()
            .parse(&SpiderResponse {
                response,
                callback: SpiderCallback::ParsePagination,
            })
            .await
            .unwrap();

        assert_eq!(result.items.len(), 3);
        assert_eq!(result.requests[0].depth, 3);
    }

    #[tokio::test]
    async fn test_parse_skips_non_html_responses() {
        let response = response(
            "http://quotes.toscrape.com/api/quotes?page=1",
            0,
            PAGE,
            ResponseType::Json,
        );

        let result = spider()
            .parse(&SpiderResponse {
                response,
                callback: SpiderCallback::Bootstrap,
            })
            .await
            .unwrap();

        assert!(result.is_empty());
    }
}
