use crate::context::{char_slice, extract_context, narrow_line, ContextWindow, CONTEXT_LINES};
use crate::error::{Result, ValidationError};
use crate::source_table::{resolve_source, SourceTable};
use crate::token::{DecodedIndex, MappingToken};
use serde::Serialize;
use url::Url;

/// Original lines longer than this are most likely minified themselves.
pub const LONG_LINE: usize = 200;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The name is on the referenced line, but not at the referenced column.
    Warning,
    /// The name is nowhere on the referenced line.
    Error,
}

/// A token whose name was not found where the source map says it is.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub token: MappingToken,
    pub source_url: String,
    /// What the original line actually holds at the referenced column.
    pub found: String,
    pub line: String,
    pub pre_context: Vec<String>,
    pub post_context: Vec<String>,
    /// Zero-based line of the first line of the window.
    pub context_start_line: u32,
}

impl Diagnostic {
    #[inline]
    pub fn expected(&self) -> &str {
        self.token.name().unwrap_or_default()
    }
}

/// Checks tokens of one [DecodedIndex] against its original sources.
#[derive(Debug)]
pub struct TokenVerifier<'a> {
    sources: &'a SourceTable,
    index: &'a DecodedIndex,
    source_urls: Vec<Option<Url>>,
    banner_lines: u32,
}

impl<'a> TokenVerifier<'a> {
    /// `banner_lines` comes from [banner_line_count](crate::banner_line_count)
    /// over the minified script.
    pub fn new(
        index: &'a DecodedIndex,
        sources: &'a SourceTable,
        base: &Url,
        banner_lines: u32,
    ) -> Self {
        let source_urls = index
            .sources()
            .iter()
            .map(|source| resolve_source(base, source))
            .collect();
        Self {
            index,
            sources,
            source_urls,
            banner_lines,
        }
    }

    /// Verifies one token.
    ///
    /// Returns `Ok(None)` for tokens without a name and for names found at the
    /// referenced column or one column to its right. Fails the whole run when
    /// the token points into the banner comment or past the end of its source.
    pub fn verify(&self, token: &MappingToken) -> Result<Option<Diagnostic>> {
        let Some(name) = token.name() else {
            return Ok(None);
        };
        if token.generated().line < self.banner_lines {
            return Err(ValidationError::BrokenComment {
                token: token.clone(),
            });
        }
        let Some(source_info) = token.source_info() else {
            return Ok(None);
        };
        let position = source_info.position;

        let url = self.source_urls.get(source_info.id as usize).and_then(Option::as_ref);
        let source_url = match url {
            Some(url) => url.to_string(),
            None => self
                .index
                .source(source_info.id)
                .unwrap_or_default()
                .to_owned(),
        };
        let lines = url.and_then(|url| self.sources.lines(url));
        let Some(line) = lines.and_then(|lines| lines.get(position.line as usize)) else {
            return Err(ValidationError::invalid_line_reference(
                token,
                source_url,
                position.line,
            ));
        };
        let lines = lines.unwrap_or_default();

        let start = position.column as usize;
        let end = start + name.chars().count();
        let found = char_slice(line, start, end);
        if found == name || char_slice(line, start + 1, end + 1) == name {
            return Ok(None);
        }

        let row = position.line as usize;
        let (window, context_start_line) = if line.chars().count() > LONG_LINE {
            (narrow_line(line, position.column), position.line)
        } else {
            let pre = &lines[row.saturating_sub(CONTEXT_LINES)..row];
            let post = &lines[row + 1..(row + 1 + CONTEXT_LINES).min(lines.len())];
            (
                extract_context(pre, line, post),
                (row - pre.len()) as u32,
            )
        };
        let ContextWindow {
            pre_context,
            line,
            post_context,
        } = window;

        let severity = if line.contains(name) {
            Severity::Warning
        } else {
            Severity::Error
        };

        Ok(Some(Diagnostic {
            severity,
            token: token.clone(),
            source_url,
            found: found.to_owned(),
            line,
            pre_context,
            post_context,
            context_start_line,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{Severity, TokenVerifier};
    use crate::error::ValidationError;
    use crate::source_table::SourceTable;
    use crate::token::{DecodedIndex, MappingToken};
    use url::Url;

    fn fixture(source: &str) -> (DecodedIndex, SourceTable, Url) {
        let base = Url::parse("http://example.com/app.min.js").unwrap();
        let index = DecodedIndex::new(vec![], vec!["app.js".into()], vec![]);
        let mut table = SourceTable::new();
        table.insert(&base.join("app.js").unwrap(), source);
        (index, table, base)
    }

    fn named(name: &str, line: u32, column: u32) -> MappingToken {
        MappingToken::new(3, 10)
            .with_source(0, line, column)
            .with_name(name)
    }

    #[test]
    fn test_unnamed_token_is_skipped() {
        let (index, table, base) = fixture("");
        let verifier = TokenVerifier::new(&index, &table, &base, 5);
        let token = MappingToken::new(0, 0).with_source(0, 99, 99);
        assert_eq!(verifier.verify(&token).unwrap(), None);
    }

    #[test]
    fn test_exact_and_shifted_match() {
        let (index, table, base) = fixture("var foo = 1;\nvar fooo = 1;\nvar  foo = 1;");
        let verifier = TokenVerifier::new(&index, &table, &base, 0);
        assert_eq!(verifier.verify(&named("foo", 0, 4)).unwrap(), None);
        assert_eq!(verifier.verify(&named("foo", 1, 4)).unwrap(), None);
        assert_eq!(verifier.verify(&named("foo", 2, 4)).unwrap(), None);
    }

    #[test]
    fn test_name_elsewhere_on_line_is_a_warning() {
        let (index, table, base) = fixture("a(bar);  x = 1 + 2;");
        let verifier = TokenVerifier::new(&index, &table, &base, 0);
        let diagnostic = verifier.verify(&named("bar", 0, 10)).unwrap().unwrap();
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.found, " = ");
        assert_eq!(diagnostic.expected(), "bar");
        assert_eq!(diagnostic.source_url, "http://example.com/app.js");
    }

    #[test]
    fn test_missing_name_is_an_error() {
        let (index, table, base) = fixture("one();\ntwo();\nvar qux = 1 + 2;\nthree();");
        let verifier = TokenVerifier::new(&index, &table, &base, 0);
        let diagnostic = verifier.verify(&named("baz", 2, 10)).unwrap().unwrap();
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.pre_context, ["one();", "two();"]);
        assert_eq!(diagnostic.line, "var qux = 1 + 2;");
        assert_eq!(diagnostic.post_context, ["three();"]);
        assert_eq!(diagnostic.context_start_line, 0);
    }

    #[test]
    fn test_long_line_is_narrowed() {
        let line = format!("{}bar{}", "a".repeat(300), "b".repeat(300));
        let (index, table, base) = fixture(&format!("first();\n{line}\nlast();"));
        let verifier = TokenVerifier::new(&index, &table, &base, 0);

        let diagnostic = verifier.verify(&named("bar", 1, 290)).unwrap().unwrap();
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert!(diagnostic.pre_context.is_empty() && diagnostic.post_context.is_empty());
        assert_eq!(diagnostic.line.chars().count(), 55);
        assert_eq!(diagnostic.context_start_line, 1);

        // the name is on the line, but outside of the narrowed slice
        let diagnostic = verifier.verify(&named("bar", 1, 500)).unwrap().unwrap();
        assert_eq!(diagnostic.severity, Severity::Error);
    }

    #[test]
    fn test_long_line_near_column_zero() {
        let line = format!("bar{}", "a".repeat(300));
        let (index, table, base) = fixture(&format!("first();\n{line}"));
        let verifier = TokenVerifier::new(&index, &table, &base, 0);

        // the slice starts at the line start instead of wrapping around
        let diagnostic = verifier.verify(&named("bar", 1, 3)).unwrap().unwrap();
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert!(diagnostic.line.starts_with("baraaa"));
        assert_eq!(diagnostic.line.chars().count(), 53);

        let diagnostic = verifier.verify(&named("qux", 1, 0)).unwrap().unwrap();
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.line.chars().count(), 50);
    }

    #[test]
    fn test_unresolvable_source_keeps_its_reference() {
        let base = Url::parse("http://example.com/app.min.js").unwrap();
        let index = DecodedIndex::new(vec![], vec!["http://[oops/a.js".into()], vec![]);
        let table = SourceTable::new();
        let verifier = TokenVerifier::new(&index, &table, &base, 0);
        let err = verifier.verify(&named("foo", 0, 0)).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"token 3:10 -> 0:0:0 (foo) references line 0 which does not exist in 'http://[oops/a.js'");
    }

    #[test]
    fn test_token_inside_banner() {
        let (index, table, base) = fixture("var foo = 1;");
        let verifier = TokenVerifier::new(&index, &table, &base, 2);
        let token = MappingToken::new(1, 0).with_source(0, 0, 4).with_name("foo");
        assert!(matches!(
            verifier.verify(&token),
            Err(ValidationError::BrokenComment { .. })
        ));
        let token = MappingToken::new(2, 0).with_source(0, 0, 4).with_name("foo");
        assert_eq!(verifier.verify(&token).unwrap(), None);
    }

    #[test]
    fn test_line_out_of_range() {
        let (index, table, base) = fixture("var foo = 1;");
        let verifier = TokenVerifier::new(&index, &table, &base, 0);
        let err = verifier.verify(&named("foo", 1, 4)).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"token 3:10 -> 0:1:4 (foo) references line 1 which does not exist in 'http://example.com/app.js'");
    }
}
