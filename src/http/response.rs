use super::HttpRequest;
use chrono::prelude::*;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Html,
    Json,
    Text,
    Binary,
}

impl ResponseType {
    /// Picks a type from the `content-type` header, sniffing the body when the header is missing.
    pub fn detect(headers: &HashMap<String, String>, body: &str) -> Self {
        if let Some(content_type) = headers.get("content-type") {
            if content_type.contains("text/html") {
                ResponseType::Html
            } else if content_type.contains("application/json") {
                ResponseType::Json
            } else if content_type.contains("text/") {
                ResponseType::Text
            } else {
                ResponseType::Binary
            }
        } else {
            let trimmed = body.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                ResponseType::Json
            } else if trimmed.starts_with("<!DOCTYPE")
                || trimmed.starts_with("<!doctype")
                || trimmed.starts_with("<html")
            {
                ResponseType::Html
            } else {
                ResponseType::Text
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: Url,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub raw_body: Vec<u8>,
    pub decoded_body: String,
    pub timestamp: DateTime<Utc>,
    pub response_type: ResponseType,
    pub from_request: Box<HttpRequest>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
