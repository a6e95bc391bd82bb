//! Components and attribute directives.
//!
//! `<prefix:tag attr="…" mixin:name="…">content</prefix:tag>` constructs the
//! handler `Tag` from the namespace bound to `prefix`:
//!
//! ```text
//! (new Form\Field(['name'=>"x"],'content',get_defined_vars()))->mixin(new My\Tip("hi"))->run()
//! ```
//!
//! Ordinary tags carrying attribute directives are first promoted to the
//! runtime's generic `<_h:html>` component so their mixins apply too.

use super::next_char_boundary;
use crate::context::{CompilationContext, RESERVED_ALIAS};
use crate::emit::{buffered, output, single_quoted, CompiledContent};
use crate::error::{CompileError, CompileResult};
use crate::interpolation::{compile_interpolation, decode_entities};
use crate::registry::COMPONENT_PARAMS;
use hyperblade_syntax::layout::{dedent, line_indent_start};
use hyperblade_syntax::names::alias_key;
use hyperblade_syntax::tags::{is_void_element, is_xml_prefix, match_element, parse_tag_open, RawValue, TagOpen};
use indexmap::IndexMap;

/// Prefix that promotes a plain tag explicitly: `<html:div>` is
/// `<_h:html tag="div">`, unless the template binds `html` itself.
const HTML_PREFIX: &str = "html";

/// Name of the generic markup component in the runtime namespace.
const HTML_COMPONENT: &str = "html";

/// Rewrite unprefixed tags whose attributes include a directive with a
/// bound prefix into `<_h:html tag="name" …>` components.
pub fn promote_directive_tags(ctx: &CompilationContext<'_>, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;

    while let Some(i) = text[pos..].find('<') {
        let at = pos + i;
        pos = next_char_boundary(text, at);
        let Some(tag) = parse_tag_open(text, at).filter(|tag| is_promotable(ctx, tag)) else {
            continue;
        };
        let name = tag.name;
        let attrs = tag.attrs_src;

        if tag.self_closing || is_void_element(name) {
            out.push_str(&text[last..at]);
            out.push_str(&format!("<{}:{} tag=\"{}\"{} />", RESERVED_ALIAS, HTML_COMPONENT, name, attrs));
            last = tag.span.end as usize;
            pos = last;
            continue;
        }
        let Some(element) = match_element(text, tag) else {
            continue;
        };
        let content = promote_directive_tags(ctx, &text[element.content_span.to_range()]);
        out.push_str(&text[last..at]);
        out.push_str(&format!(
            "<{0}:{1} tag=\"{2}\"{3}>{4}</{0}:{1}>",
            RESERVED_ALIAS, HTML_COMPONENT, name, attrs, content
        ));
        last = element.span.end as usize;
        pos = last;
    }
    out.push_str(&text[last..]);
    out
}

fn is_promotable(ctx: &CompilationContext<'_>, tag: &TagOpen<'_>) -> bool {
    tag.prefix.is_none() && tag.directives().any(|(prefix, _)| ctx.binding(prefix).is_ok())
}

/// Replace every `<prefix:tag>` element with its construction code.
///
/// Content is compiled by this pass alone, recursively.
pub fn compile_components(ctx: &mut CompilationContext<'_>, text: &str) -> CompileResult<String> {
    let mut ctx = ctx.enter();
    let options = ctx.options;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;

    while let Some(i) = text[pos..].find('<') {
        let at = pos + i;
        pos = next_char_boundary(text, at);
        let Some(tag) = parse_tag_open(text, at) else {
            continue;
        };
        let Some(prefix) = tag.prefix.filter(|prefix| !is_xml_prefix(prefix)) else {
            continue;
        };
        let Some(element) = match_element(text, tag) else {
            continue;
        };
        let tag = &element.open;
        let indent_start = line_indent_start(text, last, at);
        let indent = &text[indent_start..at];
        let open_tag = &text[tag.span.to_range()];
        let located = |err: CompileError| err.at(tag.span).with_fragment(open_tag);

        let (prefix, name, synthetic_tag) = if alias_key(prefix) == HTML_PREFIX && ctx.binding(prefix).is_err() {
            (RESERVED_ALIAS, HTML_COMPONENT, Some(tag.name))
        } else {
            (prefix, tag.name, None)
        };
        let handler = ctx.get_handler_identifier(prefix, name).map_err(located)?;
        let params = handler.info.constructor.as_ref().map_or(0, |c| c.len());
        if params != COMPONENT_PARAMS.len() {
            return Err(located(CompileError::constructor_arity(
                &handler.info.path,
                COMPONENT_PARAMS.len(),
                params,
            )));
        }

        let mut attrs: IndexMap<&str, String> = IndexMap::new();
        if let Some(tag_name) = synthetic_tag {
            attrs.insert("tag", single_quoted(tag_name));
        }
        let mut mixins = Vec::new();
        for attr in &tag.attrs {
            let value = match attr.value {
                RawValue::Quoted { text: raw, .. } | RawValue::Unquoted(raw) => {
                    compile_interpolation(&decode_entities(raw), &options.syntax).map_err(located)?
                }
                RawValue::Bare(raw) => raw.to_string(),
                RawValue::Flag => "true".to_string(),
            };
            match attr.directive() {
                Some((mixin_prefix, mixin_name)) => {
                    let mixin = ctx.get_handler_identifier(mixin_prefix, mixin_name).map_err(located)?;
                    if !mixin.info.constructor.as_ref().is_some_and(|c| c.accepts(1)) {
                        let found = mixin.info.constructor.as_ref().map_or(0, |c| c.len());
                        return Err(located(CompileError::constructor_arity(&mixin.info.path, 1, found)));
                    }
                    mixins.push(format!("new {}({})", mixin.symbol, value));
                }
                None => {
                    attrs.insert(attr.name, value);
                }
            }
        }

        let content_start = element.content_span.start as usize;
        let raw_content = &text[element.content_span.to_range()];
        let content = skip_first_line_break(raw_content);
        let content_offset = content_start + raw_content.len() - content.len();
        let compiled = compile_components(&mut ctx, &dedent(content, indent))
            .map_err(|err| err.shifted(content_offset))?;

        let attr_list = attrs
            .iter()
            .map(|(key, value)| format!("{}=>{}", single_quoted(key), value))
            .collect::<Vec<_>>()
            .join(",");
        let mixin_list = if mixins.is_empty() {
            String::new()
        } else {
            format!("->mixin({})", mixins.join(","))
        };
        let construct = |content: &str| {
            format!(
                "(new {}([{}],{},get_defined_vars())){}->run()",
                handler.symbol, attr_list, content, mixin_list
            )
        };
        tracing::trace!(tag = tag.qualified, handler = handler.info.path.as_str(), "component");

        let code = match CompiledContent::classify(compiled, &options.syntax) {
            CompiledContent::Literal(content) => {
                output(options.output_mode, indent, indent, &construct(&single_quoted(content.trim())))
            }
            CompiledContent::Dynamic(content) => {
                buffered(options.output_mode, indent, indent, &content, indent, construct)
            }
        };
        out.push_str(&text[last..indent_start]);
        out.push_str(&code);
        last = element.span.end as usize;
        pos = last;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Drop one line break right after the opening tag, and the whitespace
/// that follows it.
fn skip_first_line_break(content: &str) -> &str {
    content
        .strip_prefix("\r\n")
        .or_else(|| content.strip_prefix('\n'))
        .map_or(content, str::trim_start)
}
