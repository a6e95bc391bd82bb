//! Orchestrator for compile runs.

use crate::cli::Args;
use crate::config::Config;
use crate::output::OutputFormatter;
use hyperblade_compiler::{CompileError, Compiler};
use indexmap::IndexMap;
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Result of a compile run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Number of templates compiled.
    pub file_count: usize,
    /// Number of compiled files written.
    pub written: usize,
    /// Number of templates that failed.
    pub error_count: usize,
    /// Time taken.
    pub duration_ms: u64,
}

/// What happened to one template.
#[derive(Debug)]
enum Outcome {
    Written(PathBuf),
    CompileFailed { source: String, error: CompileError },
    Failed(String),
}

/// Orchestrator for running hyperblade.
pub struct Orchestrator {
    /// Inputs as given, made absolute.
    roots: Vec<PathBuf>,
    /// Directory the configuration was looked up from.
    workspace: PathBuf,
    config: Config,
    args: Args,
    formatter: OutputFormatter,
    compiler: Compiler,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(args: Args) -> Result<Self> {
        let cwd = std::env::current_dir().into_diagnostic()?;
        let roots: Vec<PathBuf> = args.paths.iter().map(|path| cwd.join(path)).collect();
        let workspace = match roots.first() {
            Some(root) if root.is_dir() => root.clone(),
            Some(root) => root.parent().map_or_else(|| cwd.clone(), Path::to_path_buf),
            None => cwd,
        };
        let config = Config::load(&workspace, &args)?;
        let compiler = Compiler::new(config.registry.clone(), config.options.clone());
        let formatter = OutputFormatter::new(args.output, args.max_errors);

        Ok(Self {
            roots,
            workspace,
            config,
            args,
            formatter,
            compiler,
        })
    }

    /// Compile every template once.
    pub fn run_once(&mut self) -> Result<RunResult> {
        let files = self.find_templates();
        tracing::debug!(count = files.len(), "found templates");
        Ok(self.compile_files(&files))
    }

    /// Run in watch mode.
    pub fn run_watch_mode(&mut self) -> Result<()> {
        use notify::{Config as NotifyConfig, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
        use std::sync::mpsc::{channel, RecvTimeoutError};
        use std::time::Duration;

        eprintln!("Starting watch mode...\n");
        let _ = self.run_once()?;

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
        )
        .into_diagnostic()?;

        for root in &self.roots {
            let mode = if root.is_dir() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(root, mode).into_diagnostic()?;
        }
        if let Some(path) = &self.config.config_path {
            watcher.watch(path, RecursiveMode::NonRecursive).into_diagnostic()?;
        }

        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        continue;
                    }
                    if !self.args.preserve_watch_output {
                        print!("\x1B[2J\x1B[1;1H");
                    }
                    if self.config_changed(&event.paths) {
                        eprintln!("Configuration changed. Recompiling everything...\n");
                        self.reload_config()?;
                        let _ = self.run_once()?;
                        continue;
                    }
                    let changed = self.changed_templates(&event.paths);
                    if !changed.is_empty() {
                        eprintln!("File change detected. Recompiling...\n");
                        let _ = self.compile_files(&changed);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(())
    }

    fn config_changed(&self, paths: &[PathBuf]) -> bool {
        self.config
            .config_path
            .as_ref()
            .is_some_and(|config| paths.iter().any(|path| path.ends_with(config) || config.ends_with(path)))
    }

    fn reload_config(&mut self) -> Result<()> {
        self.config = Config::load(&self.workspace, &self.args)?;
        self.compiler.set_registry(self.config.registry.clone());
        self.compiler.set_options(self.config.options.clone());
        Ok(())
    }

    /// Templates among `paths`, each with the root it was found under.
    fn changed_templates(&self, paths: &[PathBuf]) -> IndexMap<PathBuf, PathBuf> {
        let mut files = IndexMap::new();
        for path in paths {
            let Some(root) = self.roots.iter().find(|root| path.starts_with(root)) else {
                continue;
            };
            if path.is_file() && self.is_template_under(root, path) {
                files.insert(path.clone(), template_root(root));
            }
        }
        files
    }

    fn is_template_under(&self, root: &Path, path: &Path) -> bool {
        if path == root {
            return self.config.template_extension(path).is_some();
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.config.template_extension(path).is_some() && self.config.should_process(relative)
    }

    /// Find all templates under the inputs, mapped to the root their
    /// output layout is relative to.
    fn find_templates(&self) -> IndexMap<PathBuf, PathBuf> {
        let mut files = IndexMap::new();

        for root in &self.roots {
            if root.is_file() {
                if self.is_template_under(root, root) {
                    files.insert(root.clone(), template_root(root));
                }
                continue;
            }
            for entry in walkdir::WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !entry.file_type().is_file() || !self.is_template_under(root, path) {
                    continue;
                }
                files.entry(path.to_path_buf()).or_insert_with(|| root.clone());
            }
        }

        files
    }

    fn compile_files(&self, files: &IndexMap<PathBuf, PathBuf>) -> RunResult {
        let start = Instant::now();
        self.formatter.reset();

        let outcomes: Vec<(&PathBuf, Outcome)> = files
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(file, root)| (file, self.compile_file(root, file)))
            .collect();

        let mut result = RunResult {
            file_count: files.len(),
            ..RunResult::default()
        };
        for (file, outcome) in outcomes {
            match outcome {
                Outcome::Written(target) => {
                    result.written += 1;
                    if self.args.verbose {
                        self.formatter.print_written(file, &target);
                    }
                }
                Outcome::CompileFailed { source, error } => {
                    result.error_count += 1;
                    self.formatter.print_compile_error(file, &source, &error);
                }
                Outcome::Failed(message) => {
                    result.error_count += 1;
                    self.formatter.print_failure(file, &message);
                }
            }
        }
        result.duration_ms = start.elapsed().as_millis() as u64;

        if self.args.timings {
            let stats = self.compiler.cache().stats();
            eprintln!(
                "\nTiming: {}ms (cache: {} hits, {} misses)",
                result.duration_ms, stats.hits, stats.misses
            );
        }
        self.formatter.print_summary(&result);
        result
    }

    /// Compile one template and write the result.
    fn compile_file(&self, root: &Path, path: &Path) -> Outcome {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => return Outcome::Failed(format!("Failed to read: {}", e)),
        };
        let compiled = match self.compiler.compile_str(&source) {
            Ok(compiled) => compiled,
            Err(error) => {
                tracing::debug!(file = %path.display(), kind = error.kind.as_str(), "compile failed");
                return Outcome::CompileFailed { source, error };
            }
        };
        let Some(target) = self.config.output_path(root, path) else {
            return Outcome::Failed("No output path for this file".to_string());
        };
        if let Some(dir) = target.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                return Outcome::Failed(format!("Failed to create {}: {}", dir.display(), e));
            }
        }
        match std::fs::write(&target, compiled.as_bytes()) {
            Ok(()) => Outcome::Written(target),
            Err(e) => Outcome::Failed(format!("Failed to write {}: {}", target.display(), e)),
        }
    }
}

/// Output layout root for an input: the directory itself, or a file's
/// parent.
fn template_root(root: &Path) -> PathBuf {
    if root.is_file() {
        root.parent().map_or_else(|| root.to_path_buf(), Path::to_path_buf)
    } else {
        root.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"{ "handlers": { "app\\Util": { "methods": { "greet": ["name"] } } } }"#;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hyperblade.json"), CONFIG).unwrap();
        std::fs::create_dir_all(dir.path().join("views/partials")).unwrap();
        std::fs::write(
            dir.path().join("views/home.hyper.php"),
            "@use(app\\Util as util)\n<p>@@util.greet('x')</p>\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("views/partials/broken.hyper.php"), "<x:y></x:y>").unwrap();
        std::fs::write(dir.path().join("views/notes.txt"), "@@util.greet()").unwrap();
        dir
    }

    fn orchestrator(args: &[&str]) -> Orchestrator {
        let args = Args::parse_from(std::iter::once("hyperblade").chain(args.iter().copied()));
        Orchestrator::new(args).unwrap()
    }

    #[test]
    fn test_compiles_next_to_templates() {
        let dir = workspace();
        let root = dir.path().to_str().unwrap();
        let mut orchestrator = orchestrator(&[root, "--output", "json"]);

        let result = orchestrator.run_once().unwrap();
        assert_eq!((result.file_count, result.written, result.error_count), (2, 1, 1));

        let compiled = std::fs::read_to_string(dir.path().join("views/home.php")).unwrap();
        assert_eq!(
            compiled,
            "<?php\nuse app\\Util as Util;\n?>\n\n<p><?php _h\\out(Util::greet('x'), '') ?> </p>\n"
        );
        assert!(!dir.path().join("views/partials/broken.php").exists());
    }

    #[test]
    fn test_out_dir_mirrors_layout() {
        let dir = workspace();
        let views = dir.path().join("views");
        let build = dir.path().join("build");
        std::fs::write(views.join("partials/ok.hyper.php"), "<b>ok</b>").unwrap();
        let mut orchestrator = orchestrator(&[
            views.to_str().unwrap(),
            "--out-dir",
            build.to_str().unwrap(),
            "--compact",
            "--output",
            "json",
        ]);

        let result = orchestrator.run_once().unwrap();
        assert_eq!((result.written, result.error_count), (2, 1));
        assert_eq!(
            std::fs::read_to_string(build.join("home.php")).unwrap(),
            "<?php\nuse app\\Util as Util;\n?>\n\n<p><?php echo Util::greet('x') ?> </p>\n"
        );
        assert_eq!(std::fs::read_to_string(build.join("partials/ok.php")).unwrap(), "<b>ok</b>");
    }

    #[test]
    fn test_single_file_and_ignore() {
        let dir = workspace();
        let home = dir.path().join("views/home.hyper.php");
        let mut first = orchestrator(&[home.to_str().unwrap(), "--output", "json"]);
        assert_eq!(first.run_once().unwrap().written, 1);

        let root = dir.path().to_str().unwrap();
        let mut second = orchestrator(&[root, "--ignore", "**/partials/**", "--output", "json"]);
        let result = second.run_once().unwrap();
        assert_eq!((result.file_count, result.error_count), (1, 0));
    }

    #[test]
    fn test_changed_templates() {
        let dir = workspace();
        let root = dir.path().to_str().unwrap();
        let orchestrator = orchestrator(&[root]);
        let changed = orchestrator.changed_templates(&[
            dir.path().join("views/home.hyper.php"),
            dir.path().join("views/notes.txt"),
            PathBuf::from("/elsewhere/x.hyper.php"),
        ]);
        assert_eq!(changed.len(), 1);
        assert!(orchestrator.config_changed(&[dir.path().join("hyperblade.json")]));
    }
}
