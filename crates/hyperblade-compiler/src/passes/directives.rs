//! `@use`, `xmlns:`, `@config` and `@content`.

use super::{char_before, rewrite};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use hyperblade_syntax::names::is_word_char;
use once_cell::sync::Lazy;
use regex::Regex;

static USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mR)(\s*)@use\s*\(\s*(\S+?)\s*(?:as\s+([\w\-]+)\s*)?\)[ \t]*$").unwrap()
});

static XMLNS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bxmlns:([\w\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')\s*"#).unwrap()
});

static CONFIG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?smR)@config[ \t]*$(.*?)^[ \t]*@endconfig\b\s*").unwrap());

static CONFIG_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([\w\-]+)\s*:\s*(\S.*?)\s*,?\s*$").unwrap());

static CONTENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\s*)@content\b(\s*)").unwrap());

/// `@use(Target)` and `@use(Target as alias)`, one per line.
///
/// The directive is replaced by its leading whitespace.
pub fn compile_uses(ctx: &mut CompilationContext<'_>, text: &str) -> CompileResult<String> {
    rewrite(&USE_RE, text, |caps| {
        let Some(whole) = caps.get(0) else {
            return Ok(None);
        };
        if char_before(text, whole.start()).is_some_and(is_word_char) {
            return Ok(None);
        }
        let alias = caps.get(3).map_or("", |m| m.as_str());
        ctx.register_namespace(alias, &caps[2])?;
        tracing::trace!(alias, namespace = &caps[2], "@use");
        Ok(Some(caps[1].to_string()))
    })
}

/// `xmlns:prefix="target"` attributes, removed from the markup.
pub fn compile_namespaces(ctx: &mut CompilationContext<'_>, text: &str) -> CompileResult<String> {
    rewrite(&XMLNS_RE, text, |caps| {
        let target = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        ctx.register_namespace(&caps[1], target)?;
        tracing::trace!(prefix = &caps[1], namespace = target, "xmlns");
        Ok(Some(String::new()))
    })
}

/// `@config` blocks of `key: value` lines.
///
/// Each block becomes a `$my->config([...])` statement in the preamble.
pub fn compile_config_blocks(ctx: &mut CompilationContext<'_>, text: &str) -> CompileResult<String> {
    rewrite(&CONFIG_RE, text, |caps| {
        let mut entries = Vec::new();
        for line in caps[1].lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = CONFIG_ENTRY_RE
                .captures(line)
                .ok_or_else(|| CompileError::malformed_directive("config", line))?;
            entries.push(format!("'{}' => {}", &entry[1], &entry[2]));
        }
        ctx.push_prolog(format!("$my->config([{}]);", entries.join(", ")));
        Ok(Some(String::new()))
    })
}

/// `@content`, keeping the whitespace around it.
pub fn compile_content_injectors(text: &str) -> CompileResult<String> {
    rewrite(&CONTENT_RE, text, |caps| {
        let Some(whole) = caps.get(0) else {
            return Ok(None);
        };
        match char_before(text, whole.start()) {
            Some(c) if is_word_char(c) => return Ok(None),
            Some('@') if caps[1].is_empty() => return Ok(None),
            _ => {}
        }
        Ok(Some(format!("{}<?php echo $my->getContent() ?>{}", &caps[1], &caps[2])))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::options::CompileOptions;
    use crate::registry::HandlerRegistry;
    use pretty_assertions::assert_eq;

    fn with_ctx<T>(f: impl FnOnce(&mut CompilationContext<'_>) -> T) -> T {
        let registry = HandlerRegistry::with_builtins();
        let options = CompileOptions::default();
        let mut ctx = CompilationContext::new(&registry, &options);
        f(&mut ctx)
    }

    #[test]
    fn test_use_directives() {
        with_ctx(|ctx| {
            let out = compile_uses(ctx, "<div>\n  @use(my\\neat\\Util as util)\n  @use (app\\Forms)\n</div>").unwrap();
            assert_eq!(out, "<div>\n  \n  \n</div>");
            assert_eq!(ctx.get_namespace("util").unwrap(), "my\\neat\\Util");
            assert_eq!(ctx.get_namespace("").unwrap(), "app\\Forms");
            assert_eq!(ctx.prolog(), ["use my\\neat\\Util as Util;"]);
        });
    }

    #[test]
    fn test_use_inside_a_word_is_text() {
        with_ctx(|ctx| {
            let source = "mail@use(x as y)";
            assert_eq!(compile_uses(ctx, source).unwrap(), source);
            assert!(ctx.get_namespace("y").is_err());
        });
    }

    #[test]
    fn test_use_conflict() {
        with_ctx(|ctx| {
            let err = compile_uses(ctx, "@use(a\\B as x)\n@use(c\\D as x)\n").unwrap_err();
            assert_eq!(err.kind, CompileErrorKind::AliasConflict);
            assert_eq!(err.fragment.as_deref(), Some("@use(c\\D as x)"));
        });
    }

    #[test]
    fn test_namespace_attributes() {
        with_ctx(|ctx| {
            let out = compile_namespaces(ctx, r#"<div xmlns:my-form="app\forms" class="x">"#).unwrap();
            assert_eq!(out, r#"<div class="x">"#);
            let out = compile_namespaces(ctx, "<p xmlns:ui='app\\ui'>").unwrap();
            assert_eq!(out, "<p >");
            assert_eq!(ctx.prolog(), ["use app\\forms as myForm;", "use app\\ui as ui;"]);
        });
    }

    #[test]
    fn test_invalid_namespace_target() {
        with_ctx(|ctx| {
            let err = compile_namespaces(ctx, r#"<a xmlns:x="not valid">"#).unwrap_err();
            assert_eq!(err.kind, CompileErrorKind::InvalidTarget);
        });
    }

    #[test]
    fn test_config_blocks() {
        with_ctx(|ctx| {
            let source = "<p>\n@config\n  title: 'Home'\n  items: [1, 2]\n\n@endconfig\n</p>";
            let out = compile_config_blocks(ctx, source).unwrap();
            assert_eq!(out, "<p>\n</p>");
            assert_eq!(ctx.prolog(), ["$my->config(['title' => 'Home', 'items' => [1, 2]]);"]);
        });
    }

    #[test]
    fn test_malformed_config_line() {
        with_ctx(|ctx| {
            let err = compile_config_blocks(ctx, "@config\n  just text\n@endconfig\n").unwrap_err();
            assert_eq!(err.kind, CompileErrorKind::MalformedDirective);
            assert_eq!(err.fragment.as_deref(), Some("just text"));
        });
    }

    #[test]
    fn test_content_injectors() {
        assert_eq!(
            compile_content_injectors("<div>\n  @content\n</div>").unwrap(),
            "<div>\n  <?php echo $my->getContent() ?>\n</div>"
        );
        assert_eq!(compile_content_injectors("@@content @contents x@content").unwrap(), "@@content @contents x@content");
    }
}
