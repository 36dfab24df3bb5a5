#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use smap_validator::{Fetch, FetchError, FetchResponse};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

pub const SCRIPT_URL: &str = "http://example.com/static/app.min.js";

enum Page {
    Body {
        status: u16,
        headers: HeaderMap,
        body: String,
    },
    Hang,
}

/// An in-memory web site. Unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct Site {
    pages: HashMap<String, Page>,
    requested: Mutex<Vec<String>>,
}

impl Site {
    pub fn page(self, url: &str, body: impl Into<String>) -> Self {
        self.insert(url, 200, HeaderMap::new(), body.into())
    }

    pub fn page_with_header(
        self,
        url: &str,
        body: impl Into<String>,
        name: &'static str,
        value: &'static str,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_static(value),
        );
        self.insert(url, 200, headers, body.into())
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.insert(url, status, HeaderMap::new(), String::new())
    }

    /// Requests for `url` never complete.
    pub fn hang(mut self, url: &str) -> Self {
        self.pages.insert(url.to_owned(), Page::Hang);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    fn insert(mut self, url: &str, status: u16, headers: HeaderMap, body: String) -> Self {
        self.pages.insert(
            url.to_owned(),
            Page::Body {
                status,
                headers,
                body,
            },
        );
        self
    }
}

#[async_trait]
impl Fetch for Site {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url.as_str()) {
            None => Err(FetchError::new("connection refused")),
            Some(Page::Hang) => futures::future::pending().await,
            Some(Page::Body {
                status,
                headers,
                body,
            }) => Ok(FetchResponse::new(
                url.clone(),
                *status,
                headers.clone(),
                Bytes::from(body.clone()),
            )),
        }
    }
}
