//! The rewrite passes, in the order [`compile`](crate::compile) runs them.
//!
//! The directive passes are linear regex scans. Macros and components need
//! nesting-aware matching and use the scanners from `hyperblade-syntax`.

pub mod components;
pub mod directives;
pub mod macros;

use crate::error::CompileResult;
use hyperblade_syntax::Span;
use regex::{Captures, Regex};

/// Replace every match of `re` in `text` with what `replace` returns.
///
/// Returning `None` rejects a match; scanning resumes one character after
/// where it started, so a later, shorter match can still be found. This is
/// how the passes express conditions on the text before a match. Errors get
/// the match's span and text attached.
pub(crate) fn rewrite<F>(re: &Regex, text: &str, mut replace: F) -> CompileResult<String>
where
    F: FnMut(&Captures<'_>) -> CompileResult<Option<String>>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;
    while pos <= text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        let replacement = replace(&caps)
            .map_err(|err| err.at(Span::from_range(whole.range())).with_fragment(whole.as_str().trim()))?;
        match replacement {
            Some(replacement) => {
                out.push_str(&text[last..whole.start()]);
                out.push_str(&replacement);
                last = whole.end();
                pos = if whole.is_empty() {
                    next_char_boundary(text, whole.end())
                } else {
                    whole.end()
                };
            }
            None => pos = next_char_boundary(text, whole.start()),
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// The character before byte offset `at`.
pub(crate) fn char_before(text: &str, at: usize) -> Option<char> {
    text[..at].chars().next_back()
}

/// Offset of the character after the one at `at`; past the end at EOF.
pub(crate) fn next_char_boundary(text: &str, at: usize) -> usize {
    at + text[at..].chars().next().map_or(1, char::len_utf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompileError, CompileErrorKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rewrite_with_rejection() {
        let re = Regex::new(r"(\s*)@x").unwrap();
        let out = rewrite(&re, "a@x  @x b", |caps| {
            let start = caps.get(0).map_or(0, |m| m.start());
            if char_before("a@x  @x b", start).is_some_and(char::is_alphanumeric) {
                return Ok(None);
            }
            Ok(Some(format!("{}X", &caps[1])))
        })
        .unwrap();
        assert_eq!(out, "a@x  X b");
    }

    #[test]
    fn test_rewrite_error_carries_match() {
        let re = Regex::new(r"@bad").unwrap();
        let err = rewrite(&re, "ok @bad", |_| {
            Err(CompileError::new(CompileErrorKind::MalformedDirective, "bad"))
        })
        .unwrap_err();
        assert_eq!(err.span, Span::new(3, 7));
        assert_eq!(err.fragment.as_deref(), Some("@bad"));
    }
}
