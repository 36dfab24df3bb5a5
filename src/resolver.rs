use crate::config::ValidatorConfig;
use crate::decoder::{Decode, DecodeError, SourcemapDecoder};
use crate::error::{Result, ValidationError};
use crate::fetch::{Fetch, FetchError, FetchResponse, HttpFetcher};
use crate::report::{generate_report, Report, SourceListing};
use crate::source_table::{build_source_table, FetchStrategy};
use crate::token::DecodedIndex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Response headers that may carry the source map reference, in order of preference.
const SOURCEMAP_HEADERS: [&str; 2] = ["SourceMap", "X-SourceMap"];

/// A minified script together with its decoded source map.
#[derive(Debug, Clone)]
pub struct ResolvedSourceMap {
    /// Text of the minified script.
    pub minified: String,
    /// Absolute URL the source map was loaded from.
    pub url: Url,
    pub index: DecodedIndex,
}

/// Finds, loads and decodes the source map of a minified script.
pub struct SourceMapResolver<'a, F: ?Sized, D: ?Sized> {
    fetcher: &'a F,
    decoder: &'a D,
}

impl<'a, F, D> SourceMapResolver<'a, F, D>
where
    F: Fetch + ?Sized,
    D: Decode + ?Sized,
{
    pub fn new(fetcher: &'a F, decoder: &'a D) -> Self {
        Self { fetcher, decoder }
    }

    pub async fn resolve(&self, url: &Url) -> Result<ResolvedSourceMap> {
        let minified = match self.fetcher.fetch(url).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                return Err(ValidationError::source_unreachable(
                    url.as_str(),
                    Some(response.status),
                ))
            }
            Err(err) => {
                warn!(%url, reason = %err, "minified script unreachable");
                return Err(ValidationError::source_unreachable(url.as_str(), None));
            }
        };

        let reference = self.discover(&minified).ok_or_else(|| {
            ValidationError::SourceMapReferenceMissing {
                url: url.to_string(),
            }
        })?;
        let sourcemap_url = url
            .join(&reference)
            .map_err(|_| ValidationError::source_map_unreachable(reference.as_str(), None))?;
        debug!(%url, %reference, %sourcemap_url, "source map reference found");

        let sourcemap = match self.fetcher.fetch(&sourcemap_url).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                return Err(ValidationError::source_map_unreachable(
                    sourcemap_url.as_str(),
                    Some(response.status),
                ))
            }
            Err(err) => {
                warn!(url = %sourcemap_url, reason = %err, "source map unreachable");
                return Err(ValidationError::source_map_unreachable(
                    sourcemap_url.as_str(),
                    None,
                ));
            }
        };

        let index = self
            .decoder
            .decode(&sourcemap.body)
            .map_err(|err| match err {
                DecodeError::Malformed(reason) => ValidationError::SourceMapMalformed {
                    url: sourcemap_url.to_string(),
                    reason,
                },
                DecodeError::Internal(reason) => ValidationError::SourceMapDecoderInternal {
                    url: sourcemap_url.to_string(),
                    reason,
                },
            })?;
        debug!(
            url = %sourcemap_url,
            tokens = index.len(),
            sources = index.sources().len(),
            "source map decoded"
        );

        Ok(ResolvedSourceMap {
            minified: minified.text,
            url: sourcemap_url,
            index,
        })
    }

    /// Headers win over a directive in the body.
    fn discover(&self, minified: &FetchResponse) -> Option<String> {
        SOURCEMAP_HEADERS
            .iter()
            .find_map(|name| minified.header(name))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .or_else(|| self.decoder.discover(&minified.text))
    }
}

/// The result of validating one minified script, successful or not.
///
/// Serializes as `{url, sourcemap_url, sources, report}` or, for a failed
/// run, with `error` in place of `report`.
#[derive(Debug, Serialize)]
pub struct Validation {
    pub url: String,
    pub sourcemap_url: Option<String>,
    pub sources: SourceListing,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Report(Report),
    Error(ValidationError),
}

impl Validation {
    #[inline]
    pub fn report(&self) -> Option<&Report> {
        match &self.outcome {
            Outcome::Report(report) => Some(report),
            Outcome::Error(_) => None,
        }
    }

    #[inline]
    pub fn error(&self) -> Option<&ValidationError> {
        match &self.outcome {
            Outcome::Report(_) => None,
            Outcome::Error(err) => Some(err),
        }
    }
}

/// Runs the whole pipeline: resolve, collect sources, verify.
#[derive(Debug, Clone)]
pub struct Validator<F = HttpFetcher, D = SourcemapDecoder> {
    fetcher: F,
    decoder: D,
    strategy: FetchStrategy,
}

impl Validator {
    /// A validator over HTTP with the `sourcemap` crate as decoder.
    pub fn from_config(config: &ValidatorConfig) -> std::result::Result<Self, FetchError> {
        Ok(Self::new(HttpFetcher::new(config)?, SourcemapDecoder).with_strategy(config.strategy))
    }
}

impl<F, D> Validator<F, D>
where
    F: Fetch,
    D: Decode,
{
    pub fn new(fetcher: F, decoder: D) -> Self {
        Self {
            fetcher,
            decoder,
            strategy: FetchStrategy::default(),
        }
    }

    #[inline(always)]
    pub fn with_strategy(self, strategy: FetchStrategy) -> Self {
        Self { strategy, ..self }
    }

    pub fn resolver(&self) -> SourceMapResolver<'_, F, D> {
        SourceMapResolver::new(&self.fetcher, &self.decoder)
    }

    /// Validates the minified script at `url`.
    ///
    /// Cancelling `cancel` drops every in-flight fetch and yields
    /// [ValidationError::Cancelled].
    pub async fn validate(&self, url: &Url, cancel: &CancellationToken) -> Validation {
        let mut validation = Validation {
            url: url.to_string(),
            sourcemap_url: None,
            sources: SourceListing::default(),
            outcome: Outcome::Error(ValidationError::Cancelled),
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ValidationError::Cancelled),
            result = self.run(url, &mut validation) => result,
        };

        validation.outcome = match result {
            Ok(report) => Outcome::Report(report),
            Err(err) => {
                warn!(%url, kind = %err.kind(), "validation failed: {err}");
                Outcome::Error(err)
            }
        };
        validation
    }

    async fn run(&self, url: &Url, validation: &mut Validation) -> Result<Report> {
        let resolved = self.resolver().resolve(url).await?;
        validation.sourcemap_url = Some(resolved.url.to_string());

        let sources = build_source_table(
            &self.fetcher,
            &resolved.index,
            url,
            &resolved.url,
            self.strategy,
        )
        .await?;
        validation.sources = SourceListing::from_urls(sources.urls());

        generate_report(url, &resolved.minified, resolved.index, &sources)
    }
}
