//! Error types for hyperblade compilation.

use hyperblade_syntax::Span;
use std::fmt;
use thiserror::Error;

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// An error that aborted a compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    /// The error code.
    pub kind: CompileErrorKind,
    /// The error message, quoting the offending fragment.
    pub message: String,
    /// Location within the segment being compiled when it was raised.
    pub span: Span,
    /// The offending source text, when one exists.
    pub fragment: Option<String>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: Span::default(),
            fragment: None,
        }
    }

    /// Attach a span unless a more precise one was already set.
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_empty() {
            self.span = span;
        }
        self
    }

    /// Re-base a span raised inside nested content onto the enclosing text.
    pub fn shifted(mut self, offset: usize) -> Self {
        if !self.span.is_empty() {
            self.span = self.span.shift(offset as u32);
        }
        self
    }

    /// Record the source text that triggered the error.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        if self.fragment.is_none() {
            self.fragment = Some(fragment.into());
        }
        self
    }

    pub fn invalid_target(target: &str) -> Self {
        Self::new(
            CompileErrorKind::InvalidTarget,
            format!("Invalid namespace or class name: `{}`", target),
        )
        .with_fragment(target)
    }

    pub fn alias_conflict(alias: &str, existing: &str, requested: &str) -> Self {
        let shown = if alias.is_empty() { "(default)" } else { alias };
        Self::new(
            CompileErrorKind::AliasConflict,
            format!(
                "Alias `{}` is already bound to `{}` and cannot be bound to `{}`",
                shown, existing, requested
            ),
        )
    }

    pub fn unbound_alias(alias: &str) -> Self {
        let message = if alias.is_empty() {
            "No default namespace was declared; use `@use(Target)` to declare one".to_string()
        } else {
            format!("Alias `{}` was not declared with `@use` or `xmlns:`", alias)
        };
        Self::new(CompileErrorKind::UnboundAlias, message)
    }

    pub fn handler_not_found(path: &str) -> Self {
        Self::new(
            CompileErrorKind::HandlerNotFound,
            format!("Handler `{}` is not registered", path),
        )
    }

    pub fn method_not_found(path: &str, method: &str) -> Self {
        Self::new(
            CompileErrorKind::HandlerNotFound,
            format!("Handler `{}` has no method `{}`", path, method),
        )
    }

    pub fn constructor_arity(path: &str, expected: usize, found: usize) -> Self {
        Self::new(
            CompileErrorKind::ConstructorArityError,
            format!(
                "The constructor of `{}` must take {} argument{}, it takes {}",
                path,
                expected,
                if expected == 1 { "" } else { "s" },
                found
            ),
        )
    }

    pub fn arity(call: &str, path: &str, method: &str, required: usize, given: usize) -> Self {
        Self::new(
            CompileErrorKind::ArityError,
            format!(
                "Error on macro call `{}`: `{}::{}` requires at least {} argument{}, this call passes {}",
                call,
                path,
                method,
                required,
                if required == 1 { "" } else { "s" },
                given
            ),
        )
        .with_fragment(call)
    }

    pub fn interpolation(value: &str, expression: &str) -> Self {
        Self::new(
            CompileErrorKind::InterpolationSyntaxError,
            format!(
                "Syntax error on interpolated attribute value `{}`; compiled expression: `{}`",
                value, expression
            ),
        )
        .with_fragment(value)
    }

    pub fn malformed_directive(directive: &str, line: &str) -> Self {
        Self::new(
            CompileErrorKind::MalformedDirective,
            format!("Malformed line in `@{}` block: `{}`", directive, line.trim()),
        )
        .with_fragment(line.trim())
    }
}

/// Error codes for hyperblade compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    /// A `@use` or `xmlns:` target is not a valid handler path.
    InvalidTarget,
    /// An alias is already bound to a different target.
    AliasConflict,
    /// A construct references an alias that was never declared.
    UnboundAlias,
    /// A resolved handler or method is not in the registry.
    HandlerNotFound,
    /// A component or mixin constructor has the wrong shape.
    ConstructorArityError,
    /// A macro call passes fewer arguments than the method requires.
    ArityError,
    /// A reduced attribute interpolation is not a valid expression.
    InterpolationSyntaxError,
    /// A directive block has content it cannot understand.
    MalformedDirective,
}

impl CompileErrorKind {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidTarget => "invalid-target",
            Self::AliasConflict => "alias-conflict",
            Self::UnboundAlias => "unbound-alias",
            Self::HandlerNotFound => "handler-not-found",
            Self::ConstructorArityError => "constructor-arity",
            Self::ArityError => "arity",
            Self::InterpolationSyntaxError => "interpolation-syntax",
            Self::MalformedDirective => "malformed-directive",
        }
    }
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
