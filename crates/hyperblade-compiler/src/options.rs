//! Compiler options.

use hyperblade_syntax::Syntax;

/// How generated output statements are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum OutputMode {
    /// Keep the author's indentation: every construct re-emits its leading
    /// whitespace and writes through `_h\out`.
    #[default]
    Pretty,
    /// Drop indentation and `echo` directly.
    Compact,
}

impl OutputMode {
    pub fn is_pretty(self) -> bool {
        self == Self::Pretty
    }
}

/// Options for a compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Construct markers.
    pub syntax: Syntax,
    pub output_mode: OutputMode,
    /// Memoize results by source text. Pretty mode is the debugging mode,
    /// so it recompiles every time regardless.
    pub use_cache: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            syntax: Syntax::default(),
            output_mode: OutputMode::Pretty,
            use_cache: true,
        }
    }
}

impl CompileOptions {
    pub fn compact() -> Self {
        Self {
            output_mode: OutputMode::Compact,
            ..Self::default()
        }
    }

    /// Whether results may be served from the cache.
    pub fn caching(&self) -> bool {
        self.use_cache && !self.output_mode.is_pretty()
    }
}
