//! Macro scanning.
//!
//! A macro head is `PREFIX [alias DELIM] method [(args)]`. A block macro adds
//! a body marker, its content and a closing `PREFIX end [alias DELIM] method`
//! tag that must repeat the opener's alias and method tokens. When the
//! opener's own prefix shows up again inside the content, that nested block
//! is skipped whole, so same-named blocks pair up innermost first.
//!
//! [`BlockIndex`] matches every opener of a text in one right-to-left sweep:
//! by the time an opener is scanned, each block that starts after it is
//! already known, so nothing is matched twice.

use std::collections::HashMap;

use crate::args::find_group_end;
use crate::cursor::Cursor;
use crate::names::{is_name_char, is_word_char};
use crate::span::Span;
use crate::syntax::Syntax;

/// The head of a macro invocation, as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroHead<'a> {
    /// Alias token, without its delimiter.
    pub alias: Option<&'a str>,
    /// Method token, still dash-cased.
    pub method: &'a str,
    /// Raw argument text between the parentheses.
    pub args: Option<&'a str>,
    /// From the prefix to the end of the method token.
    pub name_span: Span,
    /// From the prefix to the end of the head (arguments included).
    pub span: Span,
}

impl MacroHead<'_> {
    /// Heads whose first token starts with the end keyword are closing tags.
    pub fn is_end_tag(&self, syntax: &Syntax) -> bool {
        self.alias
            .unwrap_or(self.method)
            .starts_with(syntax.end_keyword.as_str())
    }
}

/// A complete block macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMacro<'a> {
    pub head: MacroHead<'a>,
    /// Content between the body marker (leading whitespace skipped) and the
    /// closing tag.
    pub content: &'a str,
    pub content_span: Span,
    /// From the prefix to the end of the closing tag.
    pub span: Span,
}

/// Parse a macro head whose prefix starts at `at`.
///
/// Returns `None` when there is no name after the prefix or when an
/// argument list is opened but never closed.
pub fn parse_macro_head<'a>(source: &'a str, at: usize, syntax: &Syntax) -> Option<MacroHead<'a>> {
    let mut cursor = Cursor::at(source, at);
    if !cursor.consume(&syntax.macro_prefix) {
        return None;
    }
    let first = cursor.read_while(is_name_char);
    if first.is_empty() {
        return None;
    }

    let (alias, method) = match (cursor.peek(), cursor.peek_second()) {
        (Some(delim), Some(next)) if syntax.is_alias_delimiter(delim) && is_name_char(next) => {
            cursor.advance();
            (Some(first), cursor.read_while(is_name_char))
        }
        _ => (None, first),
    };
    let name_end = cursor.pos();

    let mut lookahead = cursor.clone();
    lookahead.skip_whitespace();
    let args = if lookahead.peek() == Some('(') {
        let open = lookahead.pos();
        let close = find_group_end(source, open)?;
        cursor = Cursor::at(source, close);
        Some(&source[open + 1..close - 1])
    } else {
        None
    };

    Some(MacroHead {
        alias,
        method,
        args,
        name_span: Span::from_range(at..name_end),
        span: Span::from_range(at..cursor.pos()),
    })
}

/// The complete block macros of a text, by the offset of their prefix.
#[derive(Debug, Default)]
pub struct BlockIndex<'a> {
    blocks: HashMap<usize, BlockMacro<'a>>,
}

impl<'a> BlockIndex<'a> {
    /// Match every block macro whose prefix starts at or after `from` and
    /// is not glued to a word.
    pub fn new(source: &'a str, from: usize, syntax: &Syntax) -> Self {
        let mut starts = Vec::new();
        let mut pos = from;
        while let Some(i) = source.get(pos..).and_then(|rest| rest.find(syntax.macro_prefix.as_str())) {
            let at = pos + i;
            if !source[..at].chars().next_back().is_some_and(is_word_char) {
                starts.push(at);
            }
            pos = at + source[at..].chars().next().map_or(1, char::len_utf8);
        }

        let mut index = Self::default();
        for &at in starts.iter().rev() {
            if let Some(block) = index.scan(source, at, syntax) {
                index.blocks.insert(at, block);
            }
        }
        index
    }

    /// The block whose prefix starts at `at`, if it has a closing tag.
    pub fn get(&self, at: usize) -> Option<&BlockMacro<'a>> {
        self.blocks.get(&at)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn scan(&self, source: &'a str, at: usize, syntax: &Syntax) -> Option<BlockMacro<'a>> {
        let head = parse_macro_head(source, at, syntax)?;
        if head.is_end_tag(syntax) {
            return None;
        }

        let mut cursor = Cursor::at(source, head.span.end as usize);
        cursor.skip_whitespace();
        if !cursor.consume_char(syntax.body_start) {
            return None;
        }
        cursor.skip_whitespace();
        let content_start = cursor.pos();
        let opener = &source[head.name_span.to_range()];

        while !cursor.is_eof() {
            let pos = cursor.pos();
            if cursor.starts_with(opener) {
                if let Some(nested) = self.blocks.get(&pos) {
                    cursor = Cursor::at(source, nested.span.end as usize);
                    continue;
                }
            }
            if let Some(end) = match_end_tag(source, pos, &head, syntax) {
                return Some(BlockMacro {
                    content: &source[content_start..pos],
                    content_span: Span::from_range(content_start..pos),
                    span: Span::from_range(at..end),
                    head,
                });
            }
            cursor.advance();
        }
        None
    }
}

/// Match a complete block macro whose prefix starts at `at`.
///
/// An opener whose closing tag is missing yields `None`; the caller leaves
/// it untouched. Use [`BlockIndex`] to match many openers of one text.
pub fn match_block_macro<'a>(source: &'a str, at: usize, syntax: &Syntax) -> Option<BlockMacro<'a>> {
    BlockIndex::new(source, at, syntax).blocks.remove(&at)
}

/// If the closing tag for `head` starts at `at`, return its end offset.
pub fn match_end_tag(source: &str, at: usize, head: &MacroHead<'_>, syntax: &Syntax) -> Option<usize> {
    let mut cursor = Cursor::at(source, at);
    if !(cursor.consume(&syntax.macro_prefix) && cursor.consume(&syntax.end_keyword)) {
        return None;
    }
    cursor.skip_blanks();
    if let Some(alias) = head.alias {
        if !cursor.consume(alias) {
            return None;
        }
        match cursor.advance() {
            Some(delim) if syntax.is_alias_delimiter(delim) => {}
            _ => return None,
        }
    }
    if !cursor.consume(head.method) || cursor.peek().is_some_and(is_name_char) {
        return None;
    }
    // `@@end b:y` names another method; it does not close `@@b`.
    if let (Some(delim), Some(next)) = (cursor.peek(), cursor.peek_second()) {
        if syntax.is_alias_delimiter(delim) && is_name_char(next) {
            return None;
        }
    }
    Some(cursor.pos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn syntax() -> Syntax {
        Syntax::default()
    }

    #[test]
    fn test_parse_simple_head() {
        let head = parse_macro_head("@@util.greet(name) tail", 0, &syntax()).unwrap();
        assert_eq!(head.alias, Some("util"));
        assert_eq!(head.method, "greet");
        assert_eq!(head.args, Some("name"));
        assert_eq!(head.span, Span::new(0, 18));
        assert_eq!(head.name_span, Span::new(0, 12));
    }

    #[test]
    fn test_parse_head_without_alias() {
        let head = parse_macro_head("@@say-hello rest", 0, &syntax()).unwrap();
        assert_eq!(head.alias, None);
        assert_eq!(head.method, "say-hello");
        assert_eq!(head.args, None);
    }

    #[test]
    fn test_body_marker_is_not_an_alias_delimiter() {
        let head = parse_macro_head("@@panel: body", 0, &syntax()).unwrap();
        assert_eq!(head.alias, None);
        assert_eq!(head.method, "panel");
    }

    #[test]
    fn test_unclosed_args_is_no_head() {
        assert_eq!(parse_macro_head("@@a.b(x", 0, &syntax()), None);
        assert_eq!(parse_macro_head("@@ nothing", 0, &syntax()), None);
    }

    #[test]
    fn test_end_tag_heads() {
        let syntax = syntax();
        assert!(parse_macro_head("@@end a:b", 0, &syntax).unwrap().is_end_tag(&syntax));
        assert!(parse_macro_head("@@enda:b", 0, &syntax).unwrap().is_end_tag(&syntax));
        assert!(!parse_macro_head("@@a:end", 0, &syntax).unwrap().is_end_tag(&syntax));
    }

    #[test]
    fn test_match_block() {
        let source = "@@ui:panel('x'):\n  <b>hi</b>\n@@end ui:panel after";
        let block = match_block_macro(source, 0, &syntax()).unwrap();
        assert_eq!(block.head.alias, Some("ui"));
        assert_eq!(block.head.args, Some("'x'"));
        assert_eq!(block.content, "<b>hi</b>\n");
        assert_eq!(&source[block.span.to_range()], "@@ui:panel('x'):\n  <b>hi</b>\n@@end ui:panel");
    }

    #[test]
    fn test_nested_same_name_blocks_pair_innermost_first() {
        let source = "@@a:b: @@a:b: x @@end a:b @@end a:b";
        let block = match_block_macro(source, 0, &syntax()).unwrap();
        assert_eq!(block.span.end as usize, source.len());
        assert_eq!(block.content, "@@a:b: x @@end a:b ");

        let inner = match_block_macro(block.content, 0, &syntax()).unwrap();
        assert_eq!(inner.content, "x ");
    }

    #[test]
    fn test_mismatched_end_tag_is_content() {
        let source = "@@a:b: one @@end c:b two @@end a:bc three @@end a:b";
        let block = match_block_macro(source, 0, &syntax()).unwrap();
        assert_eq!(block.content, "one @@end c:b two @@end a:bc three ");
    }

    #[test]
    fn test_end_tag_with_extra_alias_is_content() {
        assert_eq!(match_block_macro("@@b: x @@end b:y tail", 0, &syntax()), None);
        let block = match_block_macro("@@b: x @@end b.y @@end b, z", 0, &syntax()).unwrap();
        assert_eq!(block.content, "x @@end b.y ");
    }

    #[test]
    fn test_block_index() {
        let source = "@@a:b: 1 @@a:b: 2 @@end a:b @@end a:b then @@c: 3 @@end c @@d: open";
        let index = BlockIndex::new(source, 0, &syntax());
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(0).unwrap().content, "1 @@a:b: 2 @@end a:b ");
        assert_eq!(index.get(9).unwrap().content, "2 ");
        let c = source.find("@@c").unwrap();
        assert_eq!(index.get(c).unwrap().content, "3 ");
        assert!(index.get(source.find("@@d").unwrap()).is_none());
    }

    #[test]
    fn test_many_unterminated_openers() {
        let source = "@@a:b: x ".repeat(400);
        let index = BlockIndex::new(&source, 0, &syntax());
        assert!(index.is_empty());

        let one_closed = format!("{}@@end a:b", source);
        let index = BlockIndex::new(&one_closed, 0, &syntax());
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(399 * 9).unwrap().content, "x ");

        let all_closed = format!("{}{}", source, "@@end a:b ".repeat(400));
        let index = BlockIndex::new(&all_closed, 0, &syntax());
        assert_eq!(index.len(), 400);
        assert_eq!(index.get(0).unwrap().span.end as usize, all_closed.len() - 1);
    }

    #[test]
    fn test_unterminated_block() {
        assert_eq!(match_block_macro("@@a:b: never closed", 0, &syntax()), None);
        assert_eq!(match_block_macro("@@a:b no body", 0, &syntax()), None);
    }

    #[test]
    fn test_unspaced_end_tag() {
        let block = match_block_macro("@@box: x @@endbox", 0, &syntax()).unwrap();
        assert_eq!(block.content, "x ");
    }
}
