use memchr::memmem;

/// Counts the generated lines taken by a block comment at the very start of
/// the minified script.
///
/// Banners are often injected after the source map was generated, which shifts
/// every generated line without the map knowing. A named token whose generated
/// line is below the returned count points into the comment.
///
/// The comment must hold at least one character between `/*` and the first
/// `*/`. A single `\n` right after the comment is part of the banner.
pub fn banner_line_count(minified: &str) -> u32 {
    let bytes = minified.as_bytes();
    if !bytes.starts_with(b"/*") || bytes.len() < 5 {
        return 0;
    }

    let Some(close) = memmem::find(&bytes[3..], b"*/") else {
        return 0;
    };
    let mut end = 3 + close + 2;
    if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }

    memchr::memchr_iter(b'\n', &bytes[..end]).count() as u32
}
