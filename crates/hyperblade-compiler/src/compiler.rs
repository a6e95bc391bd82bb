//! The compile pipeline and the [`Compiler`] facade.

use crate::cache::CompileCache;
use crate::context::CompilationContext;
use crate::error::CompileResult;
use crate::options::CompileOptions;
use crate::passes::{components, directives, macros};
use crate::registry::HandlerRegistry;
use std::sync::Arc;

/// Compile a template segment against `ctx`.
///
/// Runs every pass in order. Block macro content comes back through here,
/// so the same context sees the whole template; only the outermost call
/// prepends the preamble.
pub fn compile(ctx: &mut CompilationContext<'_>, source: &str) -> CompileResult<String> {
    let mut ctx = ctx.enter();
    let _span = tracing::debug_span!("compile", level = ctx.nesting_level(), len = source.len()).entered();

    let text = directives::compile_uses(&mut ctx, source)?;
    let text = directives::compile_namespaces(&mut ctx, &text)?;
    let text = directives::compile_config_blocks(&mut ctx, &text)?;
    let text = directives::compile_content_injectors(&text)?;
    let text = macros::compile_simple_macros(&mut ctx, &text)?;
    let text = macros::compile_block_macros(&mut ctx, &text)?;
    let text = components::promote_directive_tags(&ctx, &text);
    let text = components::compile_components(&mut ctx, &text)?;
    tracing::debug!(prolog = ctx.prolog().len(), "passes done");

    Ok(match ctx.take_preamble() {
        Some(mut preamble) => {
            preamble.push_str(&text);
            preamble
        }
        None => text,
    })
}

/// Compile a whole template with a fresh context.
pub fn compile_template(
    source: &str,
    registry: &HandlerRegistry,
    options: &CompileOptions,
) -> CompileResult<String> {
    let mut ctx = CompilationContext::new(registry, options);
    compile(&mut ctx, source)
}

/// A registry and options bundled with a result cache.
#[derive(Debug)]
pub struct Compiler {
    registry: HandlerRegistry,
    options: CompileOptions,
    cache: CompileCache,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(HandlerRegistry::with_builtins(), CompileOptions::default())
    }
}

impl Compiler {
    pub fn new(registry: HandlerRegistry, options: CompileOptions) -> Self {
        Self {
            registry,
            options,
            cache: CompileCache::new(),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    /// Swap the registry. Cached results were validated against the old
    /// one, so they are dropped.
    pub fn set_registry(&mut self, registry: HandlerRegistry) {
        self.registry = registry;
        self.cache.clear();
    }

    pub fn set_options(&mut self, options: CompileOptions) {
        self.options = options;
        self.cache.clear();
    }

    /// Compile `source`, serving repeated sources from the cache when
    /// caching is enabled.
    pub fn compile_str(&self, source: &str) -> CompileResult<Arc<str>> {
        let caching = self.options.caching();
        if caching {
            if let Some(hit) = self.cache.get(source) {
                tracing::trace!("cache hit");
                return Ok(hit);
            }
        }
        let compiled: Arc<str> = compile_template(source, &self.registry, &self.options)?.into();
        if caching {
            self.cache.insert(source, Arc::clone(&compiled));
        }
        Ok(compiled)
    }
}
