use crate::core::SpiderCallback;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub callback: SpiderCallback,
    pub meta: Option<Value>,
    pub depth: usize,
}

impl HttpRequest {
    pub fn new(url: Url, callback: SpiderCallback, depth: usize) -> Self {
        Self {
            url,
            headers: HashMap::new(),
            callback,
            meta: None,
            depth,
        }
    }

    /// Replaces any spider-wide header of the same name when fetched.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}
