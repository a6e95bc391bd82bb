//! Tag scanning.
//!
//! Only two kinds of tags are ever paired: `prefix:name` component tags and
//! ordinary tags that carry attribute directives. Everything else is markup
//! the compiler passes through untouched, so this is deliberately not an
//! HTML parser.

use crate::cursor::Cursor;
use crate::names::{is_name_char, is_word_char};
use crate::span::Span;

/// Prefixes that belong to XML itself and never name a directive.
pub const XML_PREFIXES: &[&str] = &["xml", "xlink", "xmlns"];

/// Elements that never have a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name))
}

pub fn is_xml_prefix(prefix: &str) -> bool {
    XML_PREFIXES.iter().any(|xml| xml.eq_ignore_ascii_case(prefix))
}

/// An attribute value as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue<'a> {
    /// `name="text"` or `name='text'`; `text` excludes the quotes.
    Quoted { quote: char, text: &'a str },
    /// `name=token`: a number, constant, boolean or `$variable`.
    Bare(&'a str),
    /// `name=text` where the text is not a single token; it is a string.
    Unquoted(&'a str),
    /// `name` with no value at all.
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub name: &'a str,
    pub value: RawValue<'a>,
    pub span: Span,
}

impl<'a> RawAttribute<'a> {
    /// Split a `prefix:name` attribute into its parts when it is a
    /// directive.
    pub fn directive(&self) -> Option<(&'a str, &'a str)> {
        let (prefix, name) = self.name.split_once(':')?;
        let valid = |s: &str| !s.is_empty() && s.chars().all(is_name_char);
        (valid(prefix) && valid(name) && !is_xml_prefix(prefix)).then_some((prefix, name))
    }
}

/// An opening (or self-closing) tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOpen<'a> {
    pub prefix: Option<&'a str>,
    pub name: &'a str,
    /// `prefix:name` or `name`, as written.
    pub qualified: &'a str,
    pub attrs: Vec<RawAttribute<'a>>,
    /// Raw text between the tag name and the closing `>` or `/>`.
    pub attrs_src: &'a str,
    pub self_closing: bool,
    /// From `<` to just past `>`.
    pub span: Span,
}

impl<'a> TagOpen<'a> {
    /// The `(prefix, name)` of every directive attribute, in source order.
    pub fn directives(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.attrs.iter().filter_map(RawAttribute::directive)
    }
}

/// A tag together with its content and closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    pub open: TagOpen<'a>,
    /// Empty and positioned at the end of the opening tag for self-closing
    /// tags.
    pub content_span: Span,
    /// From the start of the opening tag to the end of the closing tag.
    pub span: Span,
}

/// Parse the tag opening at `at` (which must hold `<`).
///
/// Returns `None` for closing tags, comments, processing instructions and
/// tags whose attribute list is malformed or never closed.
pub fn parse_tag_open(source: &str, at: usize) -> Option<TagOpen<'_>> {
    let mut cursor = Cursor::at(source, at);
    if !cursor.consume_char('<') {
        return None;
    }
    let name_start = cursor.pos();
    let first = cursor.read_while(is_name_char);
    if first.is_empty() {
        return None;
    }
    let (prefix, name) = match (cursor.peek(), cursor.peek_second()) {
        (Some(':'), Some(next)) if is_name_char(next) => {
            cursor.advance();
            (Some(first), cursor.read_while(is_name_char))
        }
        _ => (None, first),
    };
    let qualified = &source[name_start..cursor.pos()];
    match cursor.peek() {
        Some(c) if c.is_whitespace() || c == '>' || c == '/' => {}
        _ => return None,
    }

    let attrs_start = cursor.pos();
    let mut attrs = Vec::new();
    loop {
        cursor.skip_whitespace();
        let attrs_end = cursor.pos();
        if cursor.consume("/>") {
            return Some(TagOpen {
                prefix,
                name,
                qualified,
                attrs,
                attrs_src: &source[attrs_start..attrs_end],
                self_closing: true,
                span: Span::from_range(at..cursor.pos()),
            });
        }
        if cursor.consume_char('>') {
            return Some(TagOpen {
                prefix,
                name,
                qualified,
                attrs,
                attrs_src: &source[attrs_start..attrs_end],
                self_closing: false,
                span: Span::from_range(at..cursor.pos()),
            });
        }
        attrs.push(parse_attribute(&mut cursor)?);
    }
}

fn is_attribute_name_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '=' | '>' | '/' | '"' | '\'' | '<'))
}

fn parse_attribute<'a>(cursor: &mut Cursor<'a>) -> Option<RawAttribute<'a>> {
    let source = cursor.source();
    let start = cursor.pos();
    let name = cursor.read_while(is_attribute_name_char);
    if name.is_empty() {
        return None;
    }

    let mut lookahead = cursor.clone();
    lookahead.skip_whitespace();
    if !lookahead.consume_char('=') {
        return Some(RawAttribute {
            name,
            value: RawValue::Flag,
            span: Span::from_range(start..cursor.pos()),
        });
    }
    lookahead.skip_whitespace();
    *cursor = lookahead;

    let value = match cursor.peek() {
        Some(quote @ ('"' | '\'')) => {
            cursor.advance();
            let text = cursor.read_until_char(quote)?;
            cursor.advance();
            RawValue::Quoted { quote, text }
        }
        _ => {
            let value_start = cursor.pos();
            while let Some(c) = cursor.peek() {
                if c.is_whitespace() || c == '>' || cursor.starts_with("/>") {
                    break;
                }
                cursor.advance();
            }
            if cursor.pos() == value_start {
                return None;
            }
            let text = &source[value_start..cursor.pos()];
            if is_bare_token(text) {
                RawValue::Bare(text)
            } else {
                RawValue::Unquoted(text)
            }
        }
    };
    Some(RawAttribute {
        name,
        value,
        span: Span::from_range(start..cursor.pos()),
    })
}

/// `$name`, a constant or a number.
fn is_bare_token(text: &str) -> bool {
    let name = text.strip_prefix('$').unwrap_or(text);
    (!name.is_empty() && name.chars().all(is_word_char)) || text.parse::<f64>().is_ok()
}

/// Pair `open` with its closing tag, skipping nested tags of the same name.
///
/// Returns `None` when the closing tag is missing.
pub fn match_element<'a>(source: &'a str, open: TagOpen<'a>) -> Option<Element<'a>> {
    let content_start = open.span.end as usize;
    if open.self_closing {
        return Some(Element {
            content_span: Span::from_range(content_start..content_start),
            span: open.span,
            open,
        });
    }

    let mut depth = 1usize;
    let mut cursor = Cursor::at(source, content_start);
    while cursor.read_until_char('<').is_some() {
        let pos = cursor.pos();
        if let Some(end) = closing_tag_end(source, pos, open.qualified) {
            depth -= 1;
            if depth == 0 {
                return Some(Element {
                    content_span: Span::from_range(content_start..pos),
                    span: Span::from_range(open.span.start as usize..end),
                    open,
                });
            }
            cursor = Cursor::at(source, end);
            continue;
        }
        if let Some(nested) = parse_tag_open(source, pos).filter(|tag| tag.qualified == open.qualified) {
            if !nested.self_closing {
                depth += 1;
            }
            cursor = Cursor::at(source, nested.span.end as usize);
            continue;
        }
        cursor.advance();
    }
    None
}

/// If `</qualified>` (whitespace allowed before `>`) starts at `at`,
/// return its end offset.
pub fn closing_tag_end(source: &str, at: usize, qualified: &str) -> Option<usize> {
    let mut cursor = Cursor::at(source, at);
    if !(cursor.consume("</") && cursor.consume(qualified)) {
        return None;
    }
    cursor.skip_whitespace();
    cursor.consume_char('>').then(|| cursor.pos())
}
