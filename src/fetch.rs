use crate::config::ValidatorConfig;
use async_trait::async_trait;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// What a [Fetch] implementation hands back for one URL.
///
/// `text` is `body` decoded with the charset advertised in `Content-Type`
/// (UTF-8 otherwise), with trailing newlines removed.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub text: String,
}

impl FetchResponse {
    pub fn new(url: Url, status: u16, headers: HeaderMap, body: Bytes) -> Self {
        let encoding = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&body);
        let text = text.trim_end_matches('\n').to_owned();
        Self {
            url,
            status,
            headers,
            body,
            text,
        }
    }

    /// A `200 OK` response without headers.
    pub fn ok(url: Url, body: impl Into<Bytes>) -> Self {
        Self::new(url, 200, HeaderMap::new(), body.into())
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// The transport failed before any HTTP status was received.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct FetchError {
    pub reason: String,
}

impl FetchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        Self::new(value.to_string())
    }
}

/// Retrieves remote resources.
///
/// Implementations must tolerate concurrent calls; original sources are
/// fetched as a batch.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}

#[async_trait]
impl<T> Fetch for &T
where
    T: Fetch + ?Sized,
{
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        (**self).fetch(url).await
    }
}

/// [Fetch] over HTTP(S) with `reqwest`. Gzip bodies are inflated before decoding.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ValidatorConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(%url, status, bytes = body.len(), "fetched");
        Ok(FetchResponse::new(url.clone(), status, headers, body))
    }
}
