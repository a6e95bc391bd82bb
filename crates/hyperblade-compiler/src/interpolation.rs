//! Attribute value interpolation.
//!
//! A component attribute like `class="btn {{ $size }} {{ active ? 'on' : 'off' }}"`
//! has to become a single PHP expression. Literal runs turn into
//! double-quoted strings, simple variables are folded into the adjacent
//! string and everything else is concatenated in parentheses:
//!
//! ```text
//! "btn {$size} ".(active ? 'on' : 'off')
//! ```

use crate::emit::double_quoted_body;
use crate::error::{CompileError, CompileResult};
use hyperblade_syntax::names::is_word_char;
use hyperblade_syntax::Syntax;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Escaped body of a double-quoted string.
    Str(String),
    /// An expression; `wrapped` when we added the parentheses.
    Expr { code: String, wrapped: bool },
}

impl Segment {
    fn render(&self) -> String {
        match self {
            Self::Str(body) => format!("\"{}\"", body),
            Self::Expr { code, .. } => code.clone(),
        }
    }
}

/// Compile an attribute value (already entity-decoded, quotes removed) to a
/// PHP expression.
pub fn compile_interpolation(value: &str, syntax: &Syntax) -> CompileResult<String> {
    let (open, close) = (&syntax.content_tags.0, &syntax.content_tags.1);
    let mut segments: Vec<Segment> = Vec::new();
    let mut rest = value;

    while !rest.is_empty() {
        let Some(start) = rest.find(open.as_str()) else {
            push_literal(&mut segments, rest);
            break;
        };
        let inner_start = start + open.len();
        let Some(len) = rest[inner_start..].find(close.as_str()) else {
            push_literal(&mut segments, rest);
            break;
        };
        push_literal(&mut segments, &rest[..start]);
        let expr = rest[inner_start..inner_start + len].trim();
        let end = inner_start + len + close.len();
        if expr.is_empty() {
            push_literal(&mut segments, &rest[start..end]);
        } else {
            push_expression(&mut segments, expr);
        }
        rest = &rest[end..];
    }

    let code = match segments.as_slice() {
        [] => "\"\"".to_string(),
        [Segment::Expr { code, wrapped: true }] => code[1..code.len() - 1].to_string(),
        _ => segments.iter().map(Segment::render).collect::<Vec<_>>().join("."),
    };
    if !is_valid_expression(&code) {
        return Err(CompileError::interpolation(value, &code));
    }
    Ok(code)
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    let escaped = double_quoted_body(text);
    match segments.last_mut() {
        Some(Segment::Str(body)) => body.push_str(&escaped),
        _ => segments.push(Segment::Str(escaped)),
    }
}

fn push_expression(segments: &mut Vec<Segment>, expr: &str) {
    if is_simple_variable(expr) {
        if let Some(Segment::Str(body)) = segments.last_mut() {
            body.push('{');
            body.push_str(expr);
            body.push('}');
            return;
        }
    }
    let standalone = is_simple_variable(expr) || expr.chars().all(is_word_char);
    segments.push(if standalone {
        Segment::Expr {
            code: expr.to_string(),
            wrapped: false,
        }
    } else {
        Segment::Expr {
            code: format!("({})", expr),
            wrapped: true,
        }
    });
}

fn is_simple_variable(expr: &str) -> bool {
    expr.strip_prefix('$')
        .is_some_and(|name| !name.is_empty() && name.chars().all(is_word_char))
}

/// Structural well-formedness: something to evaluate, balanced brackets,
/// terminated strings, and no dangling binary operator at either end.
pub fn is_valid_expression(code: &str) -> bool {
    let code = code.trim();
    if code.is_empty() {
        return false;
    }

    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in code.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(c) {
                    return false;
                }
            }
            _ => {}
        }
    }
    if quote.is_some() || !stack.is_empty() {
        return false;
    }

    let dangling_end = code.ends_with(|c: char| "+-*/%.=<>&|^?:,".contains(c))
        && !code.ends_with("++")
        && !code.ends_with("--");
    let leading_fraction = code.starts_with('.') && code[1..].starts_with(|c: char| c.is_ascii_digit());
    let dangling_start = code.starts_with(|c: char| "*/%.=<>&|^?:,".contains(c)) && !leading_fraction;
    !(dangling_end || dangling_start)
}

/// Decode the HTML entities a template author is likely to write inside an
/// attribute value.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi))) {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "lbrace" => '{',
        "rbrace" => '}',
        "dollar" => '$',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use pretty_assertions::assert_eq;

    fn compile(value: &str) -> String {
        compile_interpolation(value, &Syntax::default()).unwrap()
    }

    #[test]
    fn test_literal_and_conditional() {
        assert_eq!(compile("btn {{active ? 'on' : 'off'}}"), r#""btn ".(active ? 'on' : 'off')"#);
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(compile("x"), r#""x""#);
        assert_eq!(compile(""), r#""""#);
        assert_eq!(compile(r#"say "$5""#), r#""say \"\$5\"""#);
    }

    #[test]
    fn test_variables_fold_into_strings() {
        assert_eq!(compile("a {{ $b }} c {{$d}}"), r#""a {$b} c {$d}""#);
        assert_eq!(compile("{{ $b }} c"), r#"$b." c""#);
        assert_eq!(compile("{{ $b }}"), "$b");
        assert_eq!(compile("n-{{ COUNT }}"), r#""n-".COUNT"#);
    }

    #[test]
    fn test_single_complex_expression_is_unwrapped() {
        assert_eq!(compile("{{ $a + $b }}"), "$a + $b");
        assert_eq!(compile("{{ f($a) }}{{ $b }}"), "(f($a)).$b");
        assert_eq!(compile("{{ .5 }}"), ".5");
    }

    #[test]
    fn test_empty_and_unclosed_markers_are_literal() {
        assert_eq!(compile("a {{ }} b"), r#""a {{ }} b""#);
        assert_eq!(compile("a {{ b"), r#""a {{ b""#);
    }

    #[test]
    fn test_invalid_expression() {
        let err = compile_interpolation("{{ $a + }}", &Syntax::default()).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::InterpolationSyntaxError);
        assert!(err.message.contains("{{ $a + }}"));
        assert!(err.message.contains("$a +"));

        assert!(compile_interpolation("x {{ f(1 }}", &Syntax::default()).is_err());
        assert!(compile_interpolation("{{ 'open }}", &Syntax::default()).is_err());
    }

    #[test]
    fn test_is_valid_expression() {
        assert!(is_valid_expression("$a['x'] ?? [1, 2]"));
        assert!(is_valid_expression("$i++"));
        assert!(!is_valid_expression("(a]"));
        assert!(!is_valid_expression("* 2"));
        assert!(is_valid_expression(".5"));
        assert!(is_valid_expression(".5 * $x"));
        assert!(!is_valid_expression(". $x"));
        assert!(!is_valid_expression("  "));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp;&amp; b &lt;3 &#39;x&#x27;"), "a && b <3 'x'");
        assert_eq!(decode_entities("fish & chips &unknown;"), "fish & chips &unknown;");
    }
}
