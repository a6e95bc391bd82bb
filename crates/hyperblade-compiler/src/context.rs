//! Compilation context.
//!
//! One context lives for exactly one top-level compile and is threaded by
//! `&mut` through every recursive sub-compile. It owns the alias bindings
//! declared by `@use` and `xmlns:`, the preamble statements collected so
//! far, and the nesting depth that decides who emits the preamble.

use crate::error::{CompileError, CompileResult};
use crate::options::CompileOptions;
use crate::registry::{HandlerInfo, HandlerRegistry, RUNTIME_NAMESPACE};
use hyperblade_syntax::names::{alias_key, camel, canonical_path, studly, terminal_segment, ucfirst};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::ops::{Deref, DerefMut};

/// Alias reserved for the runtime namespace.
pub const RESERVED_ALIAS: &str = "_h";

/// An alias bound to a handler path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasBinding {
    /// The alias as first written.
    pub alias: SmolStr,
    /// Canonical target path.
    pub target: String,
    /// Whether the preamble imports the target under this alias. Only
    /// imported aliases can be used as a short symbol in generated code.
    pub imported: bool,
}

/// A handler resolved for code generation.
#[derive(Debug, Clone)]
pub struct ResolvedHandler<'r> {
    /// How generated code refers to the handler.
    pub symbol: String,
    pub info: &'r HandlerInfo,
}

/// Mutable state shared by one compile call chain.
#[derive(Debug)]
pub struct CompilationContext<'r> {
    pub registry: &'r HandlerRegistry,
    pub options: &'r CompileOptions,
    aliases: IndexMap<SmolStr, AliasBinding>,
    nesting_level: usize,
    prolog: Vec<String>,
}

impl<'r> CompilationContext<'r> {
    pub fn new(registry: &'r HandlerRegistry, options: &'r CompileOptions) -> Self {
        let mut aliases = IndexMap::new();
        aliases.insert(
            SmolStr::new_static(RESERVED_ALIAS),
            AliasBinding {
                alias: SmolStr::new_static(RESERVED_ALIAS),
                target: RUNTIME_NAMESPACE.to_string(),
                imported: false,
            },
        );
        Self {
            registry,
            options,
            aliases,
            nesting_level: 0,
            prolog: Vec::new(),
        }
    }

    pub fn nesting_level(&self) -> usize {
        self.nesting_level
    }

    /// Enter one level of compilation. The level is restored when the
    /// guard drops, on error paths too.
    pub fn enter(&mut self) -> NestingGuard<'_, 'r> {
        self.nesting_level += 1;
        NestingGuard { ctx: self }
    }

    /// Bind `alias` (empty for the default alias) to `target`.
    ///
    /// Rebinding an alias to the target it already has is a no-op, so a
    /// block can be compiled more than once against the same context.
    pub fn register_namespace(&mut self, alias: &str, target: &str) -> CompileResult<()> {
        let target = canonical_path(target).ok_or_else(|| CompileError::invalid_target(target))?;
        let key = alias_key(alias);

        if let Some(existing) = self.aliases.get(key.as_str()) {
            if existing.target.eq_ignore_ascii_case(&target) {
                return Ok(());
            }
            return Err(CompileError::alias_conflict(alias, &existing.target, &target));
        }
        self.check_default_shadowing(alias, &key, &target)?;

        tracing::trace!(alias, namespace = target.as_str(), "bind alias");
        let imported = !alias.is_empty();
        self.aliases.insert(
            SmolStr::new(&key),
            AliasBinding {
                alias: alias.into(),
                target,
                imported,
            },
        );
        if imported {
            let binding = &self.aliases[key.as_str()];
            let statement = format!("use {} as {};", binding.target, normalized_alias(binding));
            self.prolog.push(statement);
        }
        Ok(())
    }

    /// The default target's type name and a named alias would read the
    /// same in generated code.
    fn check_default_shadowing(&self, alias: &str, key: &str, target: &str) -> CompileResult<()> {
        if alias.is_empty() {
            let shadowed = terminal_segment(target).to_lowercase();
            if let Some(named) = self.aliases.get(shadowed.as_str()) {
                return Err(CompileError::alias_conflict(&named.alias, &named.target, target));
            }
        } else if let Some(default) = self.aliases.get("") {
            if terminal_segment(&default.target).to_lowercase() == key {
                return Err(CompileError::alias_conflict(alias, &default.target, target));
            }
        }
        Ok(())
    }

    pub fn binding(&self, alias: &str) -> CompileResult<&AliasBinding> {
        self.aliases
            .get(alias_key(alias).as_str())
            .ok_or_else(|| CompileError::unbound_alias(alias))
    }

    /// The target bound to `alias`.
    pub fn get_namespace(&self, alias: &str) -> CompileResult<&str> {
        self.binding(alias).map(|binding| binding.target.as_str())
    }

    /// The symbol generated code uses for the target of `alias`: the
    /// imported alias, or the fully qualified target for the default alias.
    pub fn get_normalized_prefix_alias(&self, alias: &str) -> CompileResult<String> {
        let binding = self.binding(alias)?;
        Ok(if binding.imported {
            normalized_alias(binding)
        } else {
            format!("\\{}", binding.target)
        })
    }

    /// Resolve the type `name` (dash-case) inside the namespace bound to
    /// `prefix`.
    pub fn get_handler_identifier(&self, prefix: &str, name: &str) -> CompileResult<ResolvedHandler<'r>> {
        let binding = self.binding(prefix)?;
        let type_name = studly(name);
        let path = format!("{}\\{}", binding.target, type_name);
        let info = self
            .registry
            .get(&path)
            .ok_or_else(|| CompileError::handler_not_found(&path))?;
        let symbol = if binding.imported {
            format!("{}\\{}", normalized_alias(binding), type_name)
        } else {
            format!("\\{}", info.path)
        };
        Ok(ResolvedHandler { symbol, info })
    }

    /// Resolve the handler a macro alias is bound to.
    pub fn get_macro_handler(&self, alias: &str) -> CompileResult<ResolvedHandler<'r>> {
        let target = self.get_namespace(alias)?;
        let info = self
            .registry
            .get(target)
            .ok_or_else(|| CompileError::handler_not_found(target))?;
        Ok(ResolvedHandler {
            symbol: self.get_normalized_prefix_alias(alias)?,
            info,
        })
    }

    pub fn push_prolog(&mut self, statement: impl Into<String>) {
        self.prolog.push(statement.into());
    }

    pub fn prolog(&self) -> &[String] {
        &self.prolog
    }

    /// The generated preamble, once, from the outermost compile only.
    pub fn take_preamble(&mut self) -> Option<String> {
        if self.nesting_level != 1 || self.prolog.is_empty() {
            return None;
        }
        let preamble = format!("<?php\n{}\n?>\n", self.prolog.join("\n"));
        self.prolog.clear();
        Some(preamble)
    }
}

/// The alias in camel case, upper-cased when the target's type name is.
fn normalized_alias(binding: &AliasBinding) -> String {
    let alias = camel(&binding.alias);
    let upper = terminal_segment(&binding.target)
        .chars()
        .next()
        .is_some_and(char::is_uppercase);
    if upper {
        ucfirst(&alias)
    } else {
        alias
    }
}

/// Restores the nesting level of a [`CompilationContext`] on drop.
pub struct NestingGuard<'c, 'r> {
    ctx: &'c mut CompilationContext<'r>,
}

impl<'r> Deref for NestingGuard<'_, 'r> {
    type Target = CompilationContext<'r>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<'r> DerefMut for NestingGuard<'_, 'r> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for NestingGuard<'_, '_> {
    fn drop(&mut self) {
        self.ctx.nesting_level -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::registry::Signature;
    use pretty_assertions::assert_eq;

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::with_builtins();
        registry.register(HandlerInfo::component("N\\Field")).unwrap();
        registry
            .register(HandlerInfo::new("U").with_method("greet", Signature::parse(["name"]).unwrap()))
            .unwrap();
        registry
    }

    #[test]
    fn test_rebinding_same_target_is_idempotent() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("util", "my\\Util").unwrap();
        ctx.register_namespace("util", "my\\Util").unwrap();
        ctx.register_namespace("U-TIL", "\\my\\Util").unwrap();
        assert_eq!(ctx.prolog(), ["use my\\Util as Util;"]);

        let err = ctx.register_namespace("util", "other\\Util").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::AliasConflict);
        assert_eq!(ctx.get_namespace("util").unwrap(), "my\\Util");
    }

    #[test]
    fn test_alias_normalization() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("my-form", "app\\forms").unwrap();
        for alias in ["my-form", "myform", "MyForm", "MY-FORM", "m-y-f-o-r-m"] {
            assert_eq!(ctx.get_namespace(alias).unwrap(), "app\\forms");
        }
        assert_eq!(ctx.get_normalized_prefix_alias("MY-FORM").unwrap(), "myForm");
        assert_eq!(ctx.prolog(), ["use app\\forms as myForm;"]);
    }

    #[test]
    fn test_invalid_and_unbound() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        let err = ctx.register_namespace("x", "bad-path!").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::InvalidTarget);
        let err = ctx.get_namespace("nope").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::UnboundAlias);
        assert!(ctx.prolog().is_empty());
    }

    #[test]
    fn test_default_alias_shadowing() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("", "my\\Util").unwrap();
        let err = ctx.register_namespace("util", "other\\Thing").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::AliasConflict);

        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("util", "other\\Thing").unwrap();
        let err = ctx.register_namespace("", "my\\Util").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::AliasConflict);
    }

    #[test]
    fn test_handler_identifiers() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("form", "N").unwrap();
        let field = ctx.get_handler_identifier("form", "field").unwrap();
        assert_eq!(field.symbol, "Form\\Field");
        assert_eq!(field.info.path, "N\\Field");

        let html = ctx.get_handler_identifier(RESERVED_ALIAS, "html").unwrap();
        assert_eq!(html.symbol, "\\hyperblade\\Html");

        let err = ctx.get_handler_identifier("form", "missing-field").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::HandlerNotFound);
        assert!(err.message.contains("N\\MissingField"));
    }

    #[test]
    fn test_macro_handlers() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("util", "U").unwrap();
        assert_eq!(ctx.get_macro_handler("util").unwrap().symbol, "Util");

        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("", "U").unwrap();
        assert_eq!(ctx.get_macro_handler("").unwrap().symbol, "\\U");
        assert!(ctx.prolog().is_empty());
    }

    #[test]
    fn test_nesting_guard_restores_level() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        {
            let mut outer = ctx.enter();
            assert_eq!(outer.nesting_level(), 1);
            let inner = outer.enter();
            assert_eq!(inner.nesting_level(), 2);
        }
        assert_eq!(ctx.nesting_level(), 0);
    }

    #[test]
    fn test_preamble_is_taken_once_at_level_one() {
        let (registry, options) = (registry(), CompileOptions::default());
        let mut ctx = CompilationContext::new(&registry, &options);
        ctx.register_namespace("form", "N").unwrap();
        let mut guard = ctx.enter();
        {
            let mut nested = guard.enter();
            assert_eq!(nested.take_preamble(), None);
        }
        assert_eq!(guard.take_preamble().as_deref(), Some("<?php\nuse N as Form;\n?>\n"));
        assert_eq!(guard.take_preamble(), None);
    }
}
