//! Simple and block macros.
//!
//! ```text
//! @@util.greet($name)
//! @@ui:panel('Title'):
//!     <p>body</p>
//! @@end ui:panel
//! ```
//!
//! Both compile to a static call on the handler the alias is bound to. A
//! block macro's content is compiled first and passed as the first
//! argument, either as a string literal or, when it holds code, through an
//! output buffer.

use super::{char_before, next_char_boundary};
use crate::compiler::compile;
use crate::context::{CompilationContext, ResolvedHandler};
use crate::emit::{buffered, output, single_quoted, CompiledContent};
use crate::error::{CompileError, CompileResult};
use hyperblade_syntax::args::count_arguments;
use hyperblade_syntax::layout::{leading_space_start, trailing_indent};
use hyperblade_syntax::macros::{parse_macro_head, BlockIndex, MacroHead};
use hyperblade_syntax::names::{camel, is_word_char};
use hyperblade_syntax::Syntax;

/// Resolve a macro's handler and method and check the call's arity.
fn resolve_call<'r>(
    ctx: &CompilationContext<'r>,
    head: &MacroHead<'_>,
    call: &str,
    extra_args: usize,
) -> CompileResult<(ResolvedHandler<'r>, String)> {
    let handler = ctx.get_macro_handler(head.alias.unwrap_or(""))?;
    let method = camel(head.method);
    let signature = handler
        .info
        .method(&method)
        .ok_or_else(|| CompileError::method_not_found(&handler.info.path, &method))?;
    let given = head.args.map_or(0, count_arguments) + extra_args;
    if given < signature.required() {
        return Err(CompileError::arity(
            call.trim(),
            &handler.info.path,
            &method,
            signature.required(),
            given,
        ));
    }
    Ok((handler, method))
}

/// Find the next macro prefix at or after `from` that is not glued to a
/// word.
fn next_prefix(text: &str, from: usize, syntax: &Syntax) -> Option<usize> {
    let mut pos = from;
    while let Some(i) = text.get(pos..)?.find(syntax.macro_prefix.as_str()) {
        let at = pos + i;
        if !char_before(text, at).is_some_and(is_word_char) {
            return Some(at);
        }
        pos = next_char_boundary(text, at);
    }
    None
}

/// `@@[alias:]method[(args)]` without a body.
pub fn compile_simple_macros(ctx: &mut CompilationContext<'_>, text: &str) -> CompileResult<String> {
    let options = ctx.options;
    let syntax = &options.syntax;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;

    while let Some(at) = next_prefix(text, pos, syntax) {
        pos = next_char_boundary(text, at);
        let Some(head) = parse_macro_head(text, at, syntax) else {
            continue;
        };
        if head.is_end_tag(syntax) {
            pos = head.name_span.end as usize;
            continue;
        }
        let after_name = &text[head.name_span.end as usize..];
        if !after_name.is_empty() && !after_name.starts_with(|c: char| c == '(' || c.is_whitespace()) {
            continue;
        }
        let after_head = text[head.span.end as usize..].trim_start();
        if after_head.starts_with(syntax.body_start) || after_head.starts_with('(') {
            continue;
        }

        let Some(lead_start) = leading_space_start(text, last, at) else {
            continue;
        };
        let lead = &text[lead_start..at];
        let call = &text[at..head.span.end as usize];
        let (handler, method) =
            resolve_call(ctx, &head, call, 0).map_err(|err| err.at(head.span).with_fragment(call))?;
        let expr = format!("{}::{}({})", handler.symbol, method, head.args.unwrap_or(""));
        tracing::trace!(call, "simple macro");

        out.push_str(&text[last..lead_start]);
        out.push_str(&output(options.output_mode, lead, trailing_indent(lead), &expr));
        last = head.span.end as usize;
        pos = last;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// `@@[alias:]method[(args)]: content @@end [alias:]method`.
///
/// Content is compiled with the full pipeline before the call is built.
pub fn compile_block_macros(ctx: &mut CompilationContext<'_>, text: &str) -> CompileResult<String> {
    let options = ctx.options;
    let syntax = &options.syntax;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;
    let blocks = BlockIndex::new(text, 0, syntax);

    while let Some(at) = next_prefix(text, pos, syntax) {
        pos = next_char_boundary(text, at);
        let Some(block) = blocks.get(at) else {
            continue;
        };
        let Some(lead_start) = leading_space_start(text, last, at) else {
            continue;
        };
        let lead = &text[lead_start..at];
        let indent = trailing_indent(lead);
        let call = &text[at..block.head.span.end as usize];
        let located = |err: CompileError| err.at(block.span).with_fragment(call);

        let content = block.content.trim_end();
        let compiled = compile(ctx, content).map_err(|err| err.shifted(block.content_span.start as usize))?;
        let (handler, method) = resolve_call(ctx, &block.head, call, 1).map_err(located)?;
        let args = match block.head.args.map(str::trim) {
            Some(args) if !args.is_empty() => format!(", {}", args),
            _ => String::new(),
        };
        tracing::trace!(call, "block macro");

        let code = match CompiledContent::classify(compiled, syntax) {
            CompiledContent::Literal(content) => {
                let expr = format!("{}::{}({}{})", handler.symbol, method, single_quoted(&content), args);
                output(options.output_mode, lead, indent, &expr)
            }
            CompiledContent::Dynamic(content) => buffered(options.output_mode, lead, indent, &content, "", |captured| {
                format!("{}::{}({}{})", handler.symbol, method, captured, args)
            }),
        };
        out.push_str(&text[last..lead_start]);
        out.push_str(&code);
        last = block.span.end as usize;
        pos = last;
    }
    out.push_str(&text[last..]);
    Ok(out)
}
