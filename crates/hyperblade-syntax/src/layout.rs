//! Whitespace and indentation around constructs.
//!
//! Generated code has to keep the template author's formatting, so every
//! construct claims the whitespace that leads up to it and hands its
//! indentation to the output helper.

use crate::names::is_word_char;

/// Start of the leading whitespace claimed by a construct whose marker sits
/// at `at`.
///
/// The whitespace run is never extended below `floor` (the end of the
/// previous rewrite). A construct glued to a word character is not a
/// construct at all (`None`); when the whitespace run itself follows a word
/// character, the run loses its first character so that it no longer
/// touches the word.
pub fn leading_space_start(source: &str, floor: usize, at: usize) -> Option<usize> {
    let mut start = at;
    for (i, c) in source[floor..at].char_indices().rev() {
        if !c.is_whitespace() {
            break;
        }
        start = floor + i;
    }
    match source[..start].chars().next_back() {
        Some(prev) if is_word_char(prev) => {
            if start == at {
                None
            } else {
                let first = source[start..].chars().next().map_or(0, char::len_utf8);
                Some(start + first)
            }
        }
        _ => Some(start),
    }
}

/// Start of the indentation of a construct at `at` when it is the first
/// thing on its line, otherwise `at` itself.
pub fn line_indent_start(source: &str, floor: usize, at: usize) -> usize {
    let before = &source[floor..at];
    let start = before
        .trim_end_matches(|c: char| c == ' ' || c == '\t')
        .len()
        + floor;
    let at_line_start = start == 0 || source[..start].ends_with('\n') || source[..start].ends_with('\r');
    if at_line_start {
        start
    } else {
        at
    }
}

/// The indentation after the last line break of a whitespace run, or the
/// empty string when the run holds no line break.
pub fn trailing_indent(space: &str) -> &str {
    match space.rfind(|c: char| c == '\n' || c == '\r') {
        Some(i) => &space[i + 1..],
        None => "",
    }
}

/// Remove `indent` from the start of every line that begins with it.
pub fn dedent(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    text.split_inclusive('\n')
        .map(|line| line.strip_prefix(indent).unwrap_or(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_space_claims_whitespace_run() {
        let source = "<p>\n  @@a.b";
        assert_eq!(leading_space_start(source, 0, 6), Some(3));
        assert_eq!(leading_space_start(source, 5, 6), Some(5));
    }

    #[test]
    fn test_leading_space_after_word() {
        assert_eq!(leading_space_start("mail@@x", 0, 4), None);
        assert_eq!(leading_space_start("Hi  @@x", 0, 4), Some(3));
        assert_eq!(leading_space_start("@@x", 0, 0), Some(0));
    }

    #[test]
    fn test_line_indent_start() {
        let source = "<div>\n    <a:b>";
        assert_eq!(line_indent_start(source, 0, 10), 6);
        assert_eq!(line_indent_start("x <a:b>", 0, 2), 2);
        assert_eq!(line_indent_start("  <a:b>", 0, 2), 0);
    }

    #[test]
    fn test_trailing_indent() {
        assert_eq!(trailing_indent("\n\n    "), "    ");
        assert_eq!(trailing_indent("  "), "");
        assert_eq!(trailing_indent("\r\n\t"), "\t");
    }

    #[test]
    fn test_dedent() {
        assert_eq!(dedent("a\n    b\n  c\n", "    "), "a\nb\n  c\n");
        assert_eq!(dedent("a\n b", ""), "a\n b");
    }
}
