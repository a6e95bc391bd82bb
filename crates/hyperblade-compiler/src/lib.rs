//! Hyperblade template compiler.
//!
//! Turns templates that mix HTML, `@@` macros, `prefix:tag` components and
//! `prefix:name` attribute directives into PHP for a Blade-style host
//! engine. The host engine's own `{{ }}` echoes and directives are left
//! alone; compiled output is handed back to it.
//!
//! ```text
//! @use(app\Forms as form)
//! <form:field name="email">{{ $email }}</form:field>
//! ```
//!
//! Handlers are never loaded; their constructor and method signatures come
//! from a [`HandlerRegistry`] filled in ahead of time.

pub mod cache;
pub mod compiler;
pub mod context;
pub mod emit;
pub mod error;
pub mod interpolation;
pub mod options;
pub mod passes;
pub mod registry;

pub use cache::{CacheStats, CompileCache};
pub use compiler::{compile, compile_template, Compiler};
pub use context::{CompilationContext, NestingGuard, RESERVED_ALIAS};
pub use emit::CompiledContent;
pub use error::{CompileError, CompileErrorKind, CompileResult};
pub use options::{CompileOptions, OutputMode};
pub use registry::{HandlerInfo, HandlerRegistry, Param, Signature};
