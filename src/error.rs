use crate::token::MappingToken;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, ValidationError>;

/// A terminal failure of one validation run.
///
/// Per-token mismatches are not errors; they end up as
/// [Diagnostic](crate::Diagnostic)s inside a [Report](crate::Report).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("unable to fetch '{url}'")]
    SourceUnreachable { url: String, status: Option<u16> },
    #[error("unable to locate a SourceMap in '{url}'")]
    SourceMapReferenceMissing { url: String },
    #[error("unable to fetch SourceMap '{url}'")]
    SourceMapUnreachable { url: String, status: Option<u16> },
    #[error("invalid SourceMap format '{url}': {reason}")]
    SourceMapMalformed { url: String, reason: String },
    #[error("SourceMap decoder failed on '{url}': {reason}")]
    SourceMapDecoderInternal { url: String, reason: String },
    #[error(
        "unable to fetch {} source(s) referenced by '{sourcemap_url}'",
        .failures.len()
    )]
    SourcesUnreachable {
        sourcemap_url: String,
        failures: Vec<FailedSource>,
    },
    #[error("token {token} points into the comment at the top of the minified file")]
    BrokenComment { token: MappingToken },
    #[error("token {token} references line {line} which does not exist in '{source_url}'")]
    InvalidLineReference {
        token: MappingToken,
        source_url: String,
        line: u32,
    },
    #[error("validation was cancelled")]
    Cancelled,
}

/// Stable tag of a [ValidationError], usable as a machine-readable code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnreachable,
    SourceMapReferenceMissing,
    SourceMapUnreachable,
    SourceMapMalformed,
    SourceMapDecoderInternal,
    SourcesUnreachable,
    BrokenComment,
    InvalidLineReference,
    Cancelled,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceUnreachable => "source_unreachable",
            ErrorKind::SourceMapReferenceMissing => "source_map_reference_missing",
            ErrorKind::SourceMapUnreachable => "source_map_unreachable",
            ErrorKind::SourceMapMalformed => "source_map_malformed",
            ErrorKind::SourceMapDecoderInternal => "source_map_decoder_internal",
            ErrorKind::SourcesUnreachable => "sources_unreachable",
            ErrorKind::BrokenComment => "broken_comment",
            ErrorKind::InvalidLineReference => "invalid_line_reference",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One original source that could not be fetched.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FailedSource {
    pub url: String,
    /// HTTP status, when the server answered at all.
    pub status: Option<u16>,
    pub reason: String,
}

impl Display for FailedSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}): {}", self.url, self.reason),
            None => write!(f, "{}: {}", self.url, self.reason),
        }
    }
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::SourceUnreachable { .. } => ErrorKind::SourceUnreachable,
            ValidationError::SourceMapReferenceMissing { .. } => {
                ErrorKind::SourceMapReferenceMissing
            }
            ValidationError::SourceMapUnreachable { .. } => ErrorKind::SourceMapUnreachable,
            ValidationError::SourceMapMalformed { .. } => ErrorKind::SourceMapMalformed,
            ValidationError::SourceMapDecoderInternal { .. } => {
                ErrorKind::SourceMapDecoderInternal
            }
            ValidationError::SourcesUnreachable { .. } => ErrorKind::SourcesUnreachable,
            ValidationError::BrokenComment { .. } => ErrorKind::BrokenComment,
            ValidationError::InvalidLineReference { .. } => ErrorKind::InvalidLineReference,
            ValidationError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Ordered hints shown to the user next to the message.
    pub fn resolutions(&self) -> &'static [&'static str] {
        match self.kind() {
            ErrorKind::SourceUnreachable => &["Is your url correct?"],
            ErrorKind::SourceMapReferenceMissing => &["//# sourceMappingURL=", "SourceMap header"],
            ErrorKind::SourceMapUnreachable => {
                &["SourceMap declaration found, but could not load the file."]
            }
            ErrorKind::SourceMapMalformed | ErrorKind::SourceMapDecoderInternal => {
                &["Everything is broken. Is this really a sourcemap?"]
            }
            ErrorKind::SourcesUnreachable => &[
                "Are your sources publicly accessible?",
                "Embed them in the SourceMap with sourcesContent",
            ],
            ErrorKind::BrokenComment => &[
                "Add the banner comment before generating the SourceMap",
                "Strip the comment from the top of the minified file",
            ],
            ErrorKind::InvalidLineReference => {
                &["Your sources may have changed since the SourceMap was generated"]
            }
            ErrorKind::Cancelled => &[],
        }
    }

    pub(crate) fn source_unreachable(url: impl Into<String>, status: Option<u16>) -> Self {
        Self::SourceUnreachable {
            url: url.into(),
            status,
        }
    }

    pub(crate) fn source_map_unreachable(url: impl Into<String>, status: Option<u16>) -> Self {
        Self::SourceMapUnreachable {
            url: url.into(),
            status,
        }
    }

    pub(crate) fn invalid_line_reference(
        token: &MappingToken,
        source_url: impl Into<String>,
        line: u32,
    ) -> Self {
        Self::InvalidLineReference {
            token: token.clone(),
            source_url: source_url.into(),
            line,
        }
    }
}

impl Serialize for ValidationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ValidationError", 4)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("resolutions", self.resolutions())?;
        match self {
            ValidationError::SourcesUnreachable { failures, .. } => {
                state.serialize_field("failures", failures)?
            }
            ValidationError::BrokenComment { token }
            | ValidationError::InvalidLineReference { token, .. } => {
                state.serialize_field("token", token)?
            }
            _ => state.skip_field("details")?,
        }
        state.end()
    }
}
