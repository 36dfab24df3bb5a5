use serde::Serialize;

/// Lines shown before and after a flagged line.
pub const CONTEXT_LINES: usize = 3;

/// Uniform indentation up to this width is kept as is.
const KEPT_INDENT: usize = 3;

/// A flagged line with its surrounding lines, ready for display.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct ContextWindow {
    pub pre_context: Vec<String>,
    pub line: String,
    pub post_context: Vec<String>,
}

/// Builds a display window around `line`.
///
/// When every non-blank line of the window shares more than three characters
/// of leading whitespace, that shared run is removed from all lines, blank
/// ones included.
pub fn extract_context<S>(pre: &[S], line: &str, post: &[S]) -> ContextWindow
where
    S: AsRef<str>,
{
    let candidates = pre
        .iter()
        .map(AsRef::as_ref)
        .chain(post.iter().map(AsRef::as_ref))
        .chain(std::iter::once(line));
    let shared = candidates
        .filter(|l| !l.trim().is_empty())
        .map(indent_width)
        .min()
        .unwrap_or(0);
    let strip = if shared > KEPT_INDENT { shared } else { 0 };

    let trim = |l: &str| skip_chars(l, strip).to_owned();
    ContextWindow {
        pre_context: pre.iter().map(|l| trim(l.as_ref())).collect(),
        line: trim(line),
        post_context: post.iter().map(|l| trim(l.as_ref())).collect(),
    }
}

/// Takes a horizontal slice of a very long line around `column`, for sources
/// that are themselves minified. No surrounding lines are kept.
pub fn narrow_line(line: &str, column: u32) -> ContextWindow {
    let column = column as usize;
    ContextWindow {
        pre_context: Vec::new(),
        line: char_slice(line, column.saturating_sub(5), column + 50).to_owned(),
        post_context: Vec::new(),
    }
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn skip_chars(line: &str, n: usize) -> &str {
    if n == 0 {
        return line;
    }
    match line.char_indices().nth(n) {
        Some((idx, _)) => &line[idx..],
        None => "",
    }
}

/// Returns the characters `start..end` of `line`, clamped to its length.
pub(crate) fn char_slice(line: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let mut indices = line.char_indices().map(|(idx, _)| idx).skip(start);
    let Some(from) = indices.next() else {
        return "";
    };
    let to = indices.nth(end - start - 1).unwrap_or(line.len());
    &line[from..to]
}

#[cfg(test)]
mod tests {
    use super::{char_slice, extract_context, narrow_line};

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("var foo = 1;", 4, 7), "foo");
        assert_eq!(char_slice("var foo = 1;", 10, 20), "1;");
        assert_eq!(char_slice("var foo = 1;", 12, 20), "");
        assert_eq!(char_slice("var foo = 1;", 5, 5), "");
        assert_eq!(char_slice("été = ça;", 6, 8), "ça");
    }

    #[test]
    fn test_deep_indent_is_stripped() {
        let pre = ["        function a() {", "", "            var x;"];
        let post = ["        }", "    "];
        let window = extract_context(&pre, "            return foo;", &post);
        assert_eq!(window.pre_context, ["function a() {", "", "    var x;"]);
        assert_eq!(window.line, "    return foo;");
        assert_eq!(window.post_context, ["}", ""]);
    }

    #[test]
    fn test_shallow_indent_is_kept() {
        let pre = ["   a();", "     b();"];
        let post: [&str; 0] = [];
        let window = extract_context(&pre, "   c();", &post);
        assert_eq!(window.pre_context, ["   a();", "     b();"]);
        assert_eq!(window.line, "   c();");
    }

    #[test]
    fn test_unindented_line_blocks_stripping() {
        let pre = ["        a();"];
        let post = ["        c();"];
        let window = extract_context(&pre, "b();", &post);
        assert_eq!(window.pre_context, ["        a();"]);
        assert_eq!(window.line, "b();");
    }

    #[test]
    fn test_all_blank() {
        let empty: [&str; 0] = [];
        let window = extract_context(&empty, "      ", &empty);
        assert_eq!(window.line, "      ");
    }

    #[test]
    fn test_narrow_line() {
        let line = "x".repeat(100) + "needle" + &"y".repeat(200);
        let window = narrow_line(&line, 100);
        assert!(window.pre_context.is_empty() && window.post_context.is_empty());
        assert_eq!(window.line.chars().count(), 55);
        assert!(window.line.starts_with("xxxxxneedle"));

        let window = narrow_line(&line, 3);
        assert_eq!(window.line.chars().count(), 53);
        assert!(window.line.starts_with("xxx"));

        let window = narrow_line("abcdef", 2);
        assert_eq!(window.line, "abcdef");
    }
}
