use crate::banner::banner_line_count;
use crate::error::Result;
use crate::source_table::SourceTable;
use crate::token::DecodedIndex;
use crate::verify::{Diagnostic, Severity, TokenVerifier};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

/// Diagnostics kept per severity; later ones are dropped.
pub const MAX_DIAGNOSTICS: usize = 1000;

/// Outcome of a completed validation run.
///
/// `tokens` is kept for rendering and never serialized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    #[serde(skip)]
    pub tokens: DecodedIndex,
}

impl Report {
    /// Records a diagnostic unless its list is already full.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        let list = match diagnostic.severity {
            Severity::Error => &mut self.errors,
            Severity::Warning => &mut self.warnings,
        };
        if list.len() < MAX_DIAGNOSTICS {
            list.push(diagnostic);
        }
    }

    /// A report without error diagnostics. Warnings are allowed.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Verifies every token of `index`, in index order, against `sources`.
///
/// `base` is the URL source references are resolved against. A token pointing
/// into the banner comment or past the end of its source aborts the run.
pub fn generate_report(
    base: &Url,
    minified: &str,
    index: DecodedIndex,
    sources: &SourceTable,
) -> Result<Report> {
    let banner_lines = banner_line_count(minified);
    debug!(banner_lines, tokens = index.len(), "verifying tokens");

    let mut report = Report::default();
    {
        let verifier = TokenVerifier::new(&index, sources, base, banner_lines);
        for token in &index {
            if let Some(diagnostic) = verifier.verify(token)? {
                report.push(diagnostic);
            }
        }
    }

    info!(
        tokens = index.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "report generated"
    );
    report.tokens = index;
    Ok(report)
}

/// Source URLs for display, with their shared prefix cut off.
///
/// The prefix always ends at a `/`, so a lone source keeps its file name.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct SourceListing {
    pub prefix: String,
    pub sources: Vec<String>,
}

impl SourceListing {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sources = urls.into_iter().map(Into::into).collect::<Vec<String>>();
        sources.sort_unstable();

        let prefix = match sources.split_first() {
            None => String::new(),
            Some((first, rest)) => {
                let mut len = rest
                    .iter()
                    .fold(first.len(), |len, s| common_prefix_len(&first[..len], s));
                len = first[..len].rfind('/').map_or(0, |idx| idx + 1);
                first[..len].to_owned()
            }
        };

        for source in &mut sources {
            source.replace_range(..prefix.len(), "");
        }
        Self { prefix, sources }
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((idx, _), _)| idx)
}
