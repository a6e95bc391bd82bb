//! Output formatting for compile results.

use crate::cli::OutputFormat;
use crate::orchestrator::RunResult;
use hyperblade_compiler::CompileError;
use hyperblade_syntax::LineIndex;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// A compile error attached to its template for rendering.
#[derive(Debug, Error, Diagnostic)]
#[error("{kind}: {message}")]
#[diagnostic(code(hyperblade::compile))]
pub struct TemplateDiagnostic {
    kind: &'static str,
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: Option<SourceSpan>,
}

impl TemplateDiagnostic {
    pub fn new(file: &Path, source: &str, error: &CompileError) -> Self {
        Self {
            kind: error.kind.as_str(),
            message: error.message.clone(),
            src: NamedSource::new(file.display().to_string(), source.to_string()),
            span: locate(source, error).map(|(start, len)| SourceSpan::from((start, len))),
        }
    }
}

/// Byte offset and length of the error's fragment in the template.
///
/// Spans are relative to whatever text the failing pass saw, so the
/// fragment is the reliable way back to the template.
fn locate(source: &str, error: &CompileError) -> Option<(usize, usize)> {
    let fragment = error.fragment.as_deref().filter(|f| !f.is_empty())?;
    source.find(fragment).map(|start| (start, fragment.len()))
}

/// Formatter for run output.
pub struct OutputFormatter {
    format: OutputFormat,
    max_errors: Option<usize>,
    shown: AtomicUsize,
}

impl OutputFormatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, max_errors: Option<usize>) -> Self {
        Self {
            format,
            max_errors,
            shown: AtomicUsize::new(0),
        }
    }

    /// Start counting shown errors again.
    pub fn reset(&self) {
        self.shown.store(0, Ordering::Relaxed);
    }

    fn take_slot(&self) -> bool {
        let shown = self.shown.load(Ordering::Relaxed);
        if self.max_errors.is_some_and(|max| shown >= max) {
            return false;
        }
        self.shown.store(shown + 1, Ordering::Relaxed);
        true
    }

    /// Print a compile error.
    pub fn print_compile_error(&self, file: &Path, source: &str, error: &CompileError) {
        if !self.take_slot() {
            return;
        }
        match self.format {
            OutputFormat::Human => {
                let report = miette::Report::new(TemplateDiagnostic::new(file, source, error));
                eprintln!("{:?}", report);
            }
            OutputFormat::Json => println!("{}", compile_error_json(file, source, error)),
        }
    }

    /// Print a failure that is not a compile error, such as an I/O error.
    pub fn print_failure(&self, file: &Path, message: &str) {
        if !self.take_slot() {
            return;
        }
        match self.format {
            OutputFormat::Human => eprintln!("\x1b[31merror\x1b[0m: {}: {}", file.display(), message),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "failure",
                    "file": file.to_string_lossy(),
                    "message": message,
                });
                println!("{}", json);
            }
        }
    }

    /// Print a written file in verbose runs.
    pub fn print_written(&self, source: &Path, target: &Path) {
        if self.format == OutputFormat::Human {
            eprintln!("{} -> {}", source.display(), target.display());
        }
    }

    /// Print the summary.
    pub fn print_summary(&self, result: &RunResult) {
        match self.format {
            OutputFormat::Human => self.print_summary_human(result),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "type": "summary",
                    "files": result.file_count,
                    "written": result.written,
                    "errors": result.error_count,
                    "duration_ms": result.duration_ms
                });
                println!("{}", json);
            }
        }
    }

    fn print_summary_human(&self, result: &RunResult) {
        eprintln!();
        if result.error_count == 0 {
            eprintln!(
                "\x1b[32m✓\x1b[0m Compiled {} template{} ({}ms)",
                result.written,
                if result.written == 1 { "" } else { "s" },
                result.duration_ms
            );
        } else {
            eprintln!(
                "\x1b[31m✗\x1b[0m Found {} error{} in {} files",
                result.error_count,
                if result.error_count == 1 { "" } else { "s" },
                result.file_count
            );
            if let Some(hidden) = result.error_count.checked_sub(self.shown.load(Ordering::Relaxed)).filter(|n| *n > 0) {
                eprintln!("  ({} not shown)", hidden);
            }
            eprintln!("Time: {}ms", result.duration_ms);
        }
    }
}

fn compile_error_json(file: &Path, source: &str, error: &CompileError) -> serde_json::Value {
    let (line, column) = match locate(source, error) {
        Some((start, _)) => {
            let (line, column) = LineIndex::new(source).line_col(start as u32).to_display();
            (Some(line), Some(column))
        }
        None => (None, None),
    };
    serde_json::json!({
        "type": "error",
        "file": file.to_string_lossy(),
        "kind": error.kind.as_str(),
        "message": error.message,
        "fragment": error.fragment,
        "line": line,
        "column": column
    })
}
