use crate::token::{DecodedIndex, MappingToken, Position};
use memchr::memmem;
use serde::Deserialize;
use sourcemap::vlq::parse_vlq_segment;
use sourcemap::DecodedMap;

const DIRECTIVE: &str = "sourceMappingURL=";

/// How many lines at either end of a script are searched for a directive.
const DIRECTIVE_SCAN_LINES: usize = 5;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The input is not a valid source map, either as JSON or in its `mappings`.
    #[error("{0}")]
    Malformed(String),
    /// The decoder failed for a reason unrelated to the input format.
    #[error("{0}")]
    Internal(String),
}

/// Decodes source maps and locates their references in scripts.
pub trait Decode: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedIndex, DecodeError>;

    /// Returns the value of the `sourceMappingURL` directive of a script.
    fn discover(&self, script: &str) -> Option<String> {
        discover_directive(script)
    }
}

impl<T> Decode for &T
where
    T: Decode + ?Sized,
{
    fn decode(&self, bytes: &[u8]) -> Result<DecodedIndex, DecodeError> {
        (**self).decode(bytes)
    }

    fn discover(&self, script: &str) -> Option<String> {
        (**self).discover(script)
    }
}

/// [Decode] backed by the `sourcemap` crate.
///
/// The crate validates the map and resolves sources, names and
/// `sourcesContent`. Tokens are then read back from the raw `mappings` so they
/// keep their encoding order; the crate itself hands them out sorted. Index
/// maps are walked section by section, each section's sources appended after
/// the previous ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourcemapDecoder;

impl Decode for SourcemapDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedIndex, DecodeError> {
        let decoded = sourcemap::decode_slice(bytes).map_err(classify)?;
        let raw = serde_json::from_slice::<RawMap>(strip_junk_header(bytes))
            .map_err(|err| DecodeError::Malformed(err.to_string()))?;

        let mut builder = IndexBuilder::default();
        builder.add_map(&decoded, &raw, Position::min())?;
        Ok(DecodedIndex::new(
            builder.tokens,
            builder.sources,
            builder.sources_content,
        ))
    }
}

/// The parts of a source map needed to replay its segments in order.
#[derive(Debug, Deserialize)]
struct RawMap {
    mappings: Option<String>,
    sections: Option<Vec<RawSection>>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    offset: RawOffset,
    map: Option<Box<RawMap>>,
}

#[derive(Debug, Deserialize)]
struct RawOffset {
    line: u32,
    column: u32,
}

/// Drops an XSSI guard line such as `)]}'`.
fn strip_junk_header(bytes: &[u8]) -> &[u8] {
    match bytes.first() {
        Some(b')' | b']' | b'}' | b'\'') => match memchr::memchr(b'\n', bytes) {
            Some(idx) => &bytes[idx..],
            None => &[],
        },
        _ => bytes,
    }
}

#[derive(Default)]
struct IndexBuilder {
    tokens: Vec<MappingToken>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
}

impl IndexBuilder {
    fn add_map(
        &mut self,
        map: &DecodedMap,
        raw: &RawMap,
        offset: Position,
    ) -> Result<(), DecodeError> {
        match map {
            DecodedMap::Regular(sm) => self.add_regular(sm, raw, offset),
            DecodedMap::Hermes(smh) => self.add_regular(smh, raw, offset),
            DecodedMap::Index(index) => {
                // same stable order the crate sorted its sections into
                let mut raw_sections = raw.sections.iter().flatten().collect::<Vec<_>>();
                raw_sections.sort_by_key(|section| (section.offset.line, section.offset.column));

                for (section, raw_section) in index.sections().zip(raw_sections) {
                    let (line, column) = section.get_offset();
                    let (Some(map), Some(raw_map)) =
                        (section.get_sourcemap(), raw_section.map.as_deref())
                    else {
                        return Err(DecodeError::Malformed(format!(
                            "section at {line}:{column} does not embed its map ({})",
                            section.get_url().unwrap_or("no url"),
                        )));
                    };
                    self.add_map(map, raw_map, shift(offset, line, column))?;
                }
                Ok(())
            }
        }
    }

    fn add_regular(
        &mut self,
        sm: &sourcemap::SourceMap,
        raw: &RawMap,
        offset: Position,
    ) -> Result<(), DecodeError> {
        let first_source = self.sources.len() as u32;
        for id in 0..sm.get_source_count() {
            self.sources
                .push(sm.get_source(id).unwrap_or_default().to_owned());
            self.sources_content
                .push(sm.get_source_contents(id).map(str::to_owned));
        }

        // source id, source line, source column and name are running values
        // across the whole map; the generated column restarts on every line
        let (mut src_id, mut src_line, mut src_col, mut name_id) = (0i64, 0i64, 0i64, 0i64);
        let mappings = raw.mappings.as_deref().unwrap_or_default();
        for (line, segments) in mappings.split(';').enumerate() {
            let mut column = 0i64;
            for segment in segments.split(',').filter(|s| !s.is_empty()) {
                let values = parse_vlq_segment(segment).map_err(classify)?;
                column += values[0];

                let generated = shift(offset, line as u32, column as u32);
                let mut token = MappingToken::new(generated.line, generated.column);
                match values.len() {
                    1 => {}
                    4 | 5 => {
                        src_id += values[1];
                        src_line += values[2];
                        src_col += values[3];
                        token = token.with_source(
                            first_source + src_id as u32,
                            src_line as u32,
                            src_col as u32,
                        );
                        if let Some(delta) = values.get(4) {
                            name_id += delta;
                            if let Some(name) =
                                sm.get_name(name_id as u32).filter(|name| !name.is_empty())
                            {
                                token = token.with_name(name);
                            }
                        }
                    }
                    len => return Err(classify(sourcemap::Error::BadSegmentSize(len as u32))),
                }
                self.tokens.push(token);
            }
        }
        Ok(())
    }
}

/// Moves `line:column` of a section into the coordinates of its parent.
/// The column offset only applies to the section's first line.
fn shift(offset: Position, line: u32, column: u32) -> Position {
    if line == 0 {
        Position::new(offset.line, offset.column + column)
    } else {
        Position::new(offset.line + line, column)
    }
}

fn classify(err: sourcemap::Error) -> DecodeError {
    use sourcemap::Error;

    match &err {
        Error::BadJson(..)
        | Error::VlqLeftover
        | Error::VlqNoValues
        | Error::VlqOverflow
        | Error::BadSegmentSize(..)
        | Error::BadSourceReference(..)
        | Error::BadNameReference(..)
        | Error::InvalidBase64(..)
        | Error::InvalidRangeMappingIndex(..)
        | Error::CannotFlatten(..)
        | Error::IncompatibleSourceMap => DecodeError::Malformed(err.to_string()),
        _ => DecodeError::Internal(err.to_string()),
    }
}

/// Scans the last and then the first lines of a script for a
/// `sourceMappingURL` directive.
///
/// Accepts `//# `, the legacy `//@ ` and the block forms `/*# ... */`.
pub fn discover_directive(script: &str) -> Option<String> {
    memmem::find(script.as_bytes(), DIRECTIVE.as_bytes())?;

    script
        .lines()
        .rev()
        .take(DIRECTIVE_SCAN_LINES)
        .chain(script.lines().take(DIRECTIVE_SCAN_LINES))
        .find_map(parse_directive)
        .map(str::to_owned)
}

fn parse_directive(line: &str) -> Option<&str> {
    let line = line.trim();
    let (rest, block) = match line.strip_prefix("//") {
        Some(rest) => (rest, false),
        None => (line.strip_prefix("/*")?, true),
    };
    let rest = rest.strip_prefix(&['#', '@'][..])?.trim_start();
    let mut value = rest.strip_prefix(DIRECTIVE)?;
    if block {
        value = value.trim_end().strip_suffix("*/")?;
    }
    let value = value.split_whitespace().next()?;
    Some(value)
}
