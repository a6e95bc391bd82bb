//! Generated code fragments.
//!
//! Every construct ends up as one PHP output statement. In pretty mode the
//! statement re-emits the construct's leading whitespace and writes through
//! `_h\out`, which re-indents every line after the first by the construct's
//! own indentation. In compact mode it is a bare `echo`.
//!
//! The trailing space after every `?>` is part of the format: PHP swallows a
//! single newline right after a closing tag, and the space keeps the line
//! structure of the template intact.

use crate::options::OutputMode;
use hyperblade_syntax::Syntax;

/// Compiled content of a block macro or component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledContent {
    /// Plain markup, passed to the handler as a string literal.
    Literal(String),
    /// Contains code the host engine runs; captured with an output buffer.
    Dynamic(String),
}

impl CompiledContent {
    pub fn classify(text: String, syntax: &Syntax) -> Self {
        if syntax.is_dynamic(&text) {
            Self::Dynamic(text)
        } else {
            Self::Literal(text)
        }
    }
}

/// Quote `text` as a PHP single-quoted string.
pub fn single_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Escape `text` for the inside of a PHP double-quoted string.
pub fn double_quoted_body(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Write the value of `expr` to the output.
///
/// `lead` is the whitespace the construct replaced; `indent` is what
/// `_h\out` prefixes to continuation lines.
pub fn output(mode: OutputMode, lead: &str, indent: &str, expr: &str) -> String {
    match mode {
        OutputMode::Pretty => format!("{}<?php _h\\out({}, {}) ?> ", lead, expr, single_quoted(indent)),
        OutputMode::Compact => format!("<?php echo {} ?> ", expr),
    }
}

/// Capture `content` in an output buffer and write the value of the
/// expression `call` builds from the captured text.
pub fn buffered(
    mode: OutputMode,
    lead: &str,
    indent: &str,
    content: &str,
    closing_lead: &str,
    call: impl FnOnce(&str) -> String,
) -> String {
    let expr = call("ob_get_clean()");
    let lead = if mode.is_pretty() { lead } else { "" };
    format!(
        "{}<?php ob_start() ?>{}{}{}",
        lead,
        content,
        closing_lead,
        output(mode, "", indent, &expr)
    )
}
