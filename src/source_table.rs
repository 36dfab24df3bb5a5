use crate::error::{FailedSource, Result, ValidationError};
use crate::fetch::Fetch;
use crate::token::DecodedIndex;
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// How the original sources of one run are fetched.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FetchStrategy {
    /// One fetch after another.
    Sequential,
    /// At most `limit` fetches in flight.
    Concurrent { limit: usize },
}

impl Default for FetchStrategy {
    fn default() -> Self {
        Self::Concurrent {
            limit: crate::config::DEFAULT_CONCURRENCY,
        }
    }
}

/// Original sources split into lines, keyed by absolute URL.
///
/// Built once per run and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    sources: HashMap<String, Vec<String>>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source. A later insert for the same URL replaces the earlier one.
    pub fn insert(&mut self, url: &Url, text: &str) {
        self.sources.insert(url.as_str().to_owned(), split_lines(text));
    }

    #[inline]
    pub fn lines(&self, url: &Url) -> Option<&[String]> {
        self.sources.get(url.as_str()).map(Vec::as_slice)
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Splits on `\n` (and `\r\n`) without a trailing empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// Resolves a source reference the way a browser resolves a link found in
/// the document at `base`.
#[inline]
pub fn resolve_source(base: &Url, source: &str) -> Option<Url> {
    base.join(source).ok()
}

/// Collects the text of every source of `index`.
///
/// Embedded `sourcesContent` is used where present; the remaining sources are
/// fetched according to `strategy`. Fails with
/// [ValidationError::SourcesUnreachable] listing every source that could not be
/// loaded.
pub async fn build_source_table<F>(
    fetcher: &F,
    index: &DecodedIndex,
    base: &Url,
    sourcemap_url: &Url,
    strategy: FetchStrategy,
) -> Result<SourceTable>
where
    F: Fetch + ?Sized,
{
    let mut table = SourceTable::new();
    let mut pending: Vec<Url> = Vec::new();
    let mut failures = Vec::new();

    for (id, source) in index.sources().iter().enumerate() {
        let Some(url) = resolve_source(base, source) else {
            failures.push(FailedSource {
                url: source.clone(),
                status: None,
                reason: "not a valid URL reference".into(),
            });
            continue;
        };
        match index.source_content(id as u32) {
            Some(content) => table.insert(&url, content),
            None => {
                if !pending.contains(&url) {
                    pending.push(url);
                }
            }
        }
    }
    pending.retain(|url| table.lines(url).is_none());

    debug!(
        embedded = table.len(),
        fetching = pending.len(),
        ?strategy,
        "building source table"
    );

    let fetched = match strategy {
        FetchStrategy::Sequential => {
            let mut fetched = Vec::with_capacity(pending.len());
            for url in pending {
                fetched.push(fetch_source(fetcher, url).await);
            }
            fetched
        }
        FetchStrategy::Concurrent { limit } => {
            stream::iter(pending.into_iter().map(|url| fetch_source(fetcher, url)))
                .buffered(limit.max(1))
                .collect::<Vec<_>>()
                .await
        }
    };

    for result in fetched {
        match result {
            Ok((url, text)) => table.insert(&url, &text),
            Err(failure) => {
                warn!(url = %failure.url, status = failure.status, reason = %failure.reason, "source unreachable");
                failures.push(failure)
            }
        }
    }

    if !failures.is_empty() {
        return Err(ValidationError::SourcesUnreachable {
            sourcemap_url: sourcemap_url.to_string(),
            failures,
        });
    }
    Ok(table)
}

async fn fetch_source<F>(
    fetcher: &F,
    url: Url,
) -> std::result::Result<(Url, String), FailedSource>
where
    F: Fetch + ?Sized,
{
    match fetcher.fetch(&url).await {
        Ok(response) if response.is_success() => Ok((url, response.text)),
        Ok(response) => Err(FailedSource {
            url: url.to_string(),
            status: Some(response.status),
            reason: StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unexpected status")
                .to_owned(),
        }),
        Err(err) => Err(FailedSource {
            url: url.to_string(),
            status: None,
            reason: err.reason,
        }),
    }
}
