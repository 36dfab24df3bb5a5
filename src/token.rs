use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};

/// `Position` represents a zero-based line and zero-based column in a file.
///
/// # Note
///
/// Tools disagree on the base of lines and columns:
///
/// - devtools and `Error.prototype.stack` report 1-based lines and columns.
/// - the `sourcemap` crate, `esbuild` and this crate use 0-based lines and columns.
///
/// Convert at the presentation boundary, never inside the verifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn min() -> Self {
        Self { line: 0, column: 0 }
    }

    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Presents a specific position in a specific source, by index into
/// [DecodedIndex::sources].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct SourceInfo {
    pub id: u32,
    pub position: Position,
}

impl SourceInfo {
    pub const fn new(id: u32, position: Position) -> Self {
        Self { id, position }
    }
}

/// One entry of a decoded source map.
///
/// Lines and columns start at 0. See [Position].
#[derive(Clone, Eq, PartialEq, Serialize)]
pub struct MappingToken {
    generated: Position,
    source: Option<SourceInfo>,
    name: Option<String>,
}

impl Debug for MappingToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.generated)?;
        if let Some(source_info) = self.source {
            write!(f, " -> {}:{}", source_info.id, source_info.position)?;
            if let Some(name) = &self.name {
                write!(f, " ({name})")?;
            }
        }
        Ok(())
    }
}

impl Display for MappingToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl MappingToken {
    #[inline(always)]
    pub const fn new(generated_line: u32, generated_col: u32) -> Self {
        Self {
            generated: Position::new(generated_line, generated_col),
            source: None,
            name: None,
        }
    }

    #[inline(always)]
    pub fn with_source(self, source_id: u32, source_line: u32, source_col: u32) -> Self {
        Self {
            source: Some(SourceInfo::new(
                source_id,
                Position::new(source_line, source_col),
            )),
            ..self
        }
    }

    #[inline(always)]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }
}

impl MappingToken {
    /// Returns the position of the token in the minified output.
    #[inline]
    pub fn generated(&self) -> Position {
        self.generated
    }

    #[inline]
    pub fn source_info(&self) -> Option<SourceInfo> {
        self.source
    }

    /// Returns the identifier name recorded for the token, if any.
    ///
    /// A name is only meaningful when the source information is present.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// The decoded form of a source map: its tokens in encoding order plus the
/// source list and any embedded `sourcesContent`.
///
/// `sources_content` is always as long as `sources`; missing entries are `None`.
#[derive(Debug, Clone, Default)]
pub struct DecodedIndex {
    tokens: Vec<MappingToken>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
}

impl DecodedIndex {
    pub fn new(
        tokens: Vec<MappingToken>,
        sources: Vec<String>,
        mut sources_content: Vec<Option<String>>,
    ) -> Self {
        sources_content.resize(sources.len(), None);
        Self {
            tokens,
            sources,
            sources_content,
        }
    }

    #[inline]
    pub fn tokens(&self) -> &[MappingToken] {
        &self.tokens
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, MappingToken> {
        self.tokens.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    #[inline]
    pub fn source(&self, id: u32) -> Option<&str> {
        self.sources.get(id as usize).map(String::as_str)
    }

    #[inline]
    pub fn source_content(&self, id: u32) -> Option<&str> {
        self.sources_content.get(id as usize)?.as_deref()
    }
}

impl<'a> IntoIterator for &'a DecodedIndex {
    type Item = &'a MappingToken;
    type IntoIter = std::slice::Iter<'a, MappingToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
