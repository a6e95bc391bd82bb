//! Configuration loading and management.

use crate::cli::Args;
use camino::Utf8PathBuf;
use globset::{Glob, GlobSet, GlobSetBuilder};
use hyperblade_compiler::{CompileOptions, HandlerInfo, HandlerRegistry, OutputMode};
use indexmap::IndexMap;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up from the workspace upwards.
pub const CONFIG_FILE: &str = "hyperblade.json";

/// Extension of compiled templates.
pub const COMPILED_EXTENSION: &str = "php";

/// Contents of `hyperblade.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    /// Handler signatures by canonical path.
    pub handlers: IndexMap<String, HandlerInfo>,
    pub content_tags: Option<(String, String)>,
    pub macro_prefix: Option<String>,
    pub output_mode: Option<OutputMode>,
    /// Template file suffixes, including the leading dot.
    pub extensions: Vec<String>,
    pub ignore: Vec<String>,
    /// Relative to the directory holding the configuration file.
    pub out_dir: Option<Utf8PathBuf>,
}

impl FileConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))
    }

    /// Find `hyperblade.json` in a directory or its parents.
    pub fn find(dir: &Path) -> Option<Utf8PathBuf> {
        let mut current = dir;
        loop {
            let candidate = current.join(CONFIG_FILE);
            if candidate.is_file() {
                return Utf8PathBuf::from_path_buf(candidate).ok();
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }
}

/// Resolved configuration for a run.
#[derive(Debug)]
pub struct Config {
    /// Where the configuration was read from, if anywhere.
    pub config_path: Option<PathBuf>,
    pub registry: HandlerRegistry,
    pub options: CompileOptions,
    /// File suffixes to compile.
    pub extensions: Vec<String>,
    /// Ignore patterns, as written.
    pub ignore_patterns: Vec<String>,
    ignore: GlobSet,
    /// Compiled files go next to their template when unset.
    pub out_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from CLI arguments, looking for `hyperblade.json`
    /// from `workspace` upwards unless `--config` names one.
    pub fn load(workspace: &Path, args: &Args) -> Result<Self> {
        let config_path = args
            .config
            .clone()
            .or_else(|| FileConfig::find(workspace).map(Utf8PathBuf::into_std_path_buf));
        let file = match &config_path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let config_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(workspace)
            .to_path_buf();
        tracing::debug!(config = ?config_path, handlers = file.handlers.len(), "configuration");

        let mut registry = HandlerRegistry::with_builtins();
        registry
            .extend_from_manifest(file.handlers)
            .map_err(|e| miette::miette!("Invalid handler in configuration: {}", e))?;

        let mut options = CompileOptions::default();
        if let Some(prefix) = file.macro_prefix {
            options.syntax.macro_prefix = prefix;
        }
        if let Some(tags) = file.content_tags {
            options.syntax.content_tags = tags;
        }
        if let Some(mode) = file.output_mode {
            options.output_mode = mode;
        }
        if args.compact {
            options.output_mode = OutputMode::Compact;
        }

        let extensions = if file.extensions.is_empty() {
            vec![".hyper.php".to_string()]
        } else {
            file.extensions
        };

        let mut ignore_patterns = vec!["**/vendor/**".to_string(), "**/node_modules/**".to_string(), "**/.git/**".to_string()];
        ignore_patterns.extend(file.ignore);
        ignore_patterns.extend(args.ignore.iter().cloned());
        let mut builder = GlobSetBuilder::new();
        for pattern in &ignore_patterns {
            builder.add(
                Glob::new(pattern)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Invalid ignore pattern `{}`", pattern))?,
            );
        }
        let ignore = builder.build().into_diagnostic()?;

        let out_dir = match (&args.out_dir, file.out_dir) {
            (Some(dir), _) => Some(dir.clone()),
            (None, Some(dir)) => Some(config_dir.join(dir.as_std_path())),
            (None, None) => None,
        };

        Ok(Self {
            config_path,
            registry,
            options,
            extensions,
            ignore_patterns,
            ignore,
            out_dir,
        })
    }

    /// The template extension `path` carries, if any.
    pub fn template_extension(&self, path: &Path) -> Option<&str> {
        let name = path.file_name()?.to_str()?;
        self.extensions
            .iter()
            .map(String::as_str)
            .find(|ext| name.len() > ext.len() && name.ends_with(ext))
    }

    /// Check if a file should be compiled.
    pub fn should_process(&self, path: &Path) -> bool {
        self.template_extension(path).is_some() && !self.ignore.is_match(path)
    }

    /// Where the compiled form of `source`, found under `root`, is written:
    /// the template name with its extension replaced by `.php`.
    pub fn output_path(&self, root: &Path, source: &Path) -> Option<PathBuf> {
        let ext = self.template_extension(source)?;
        let name = source.file_name()?.to_str()?;
        let stem = &name[..name.len() - ext.len()];
        let mut file_name = format!("{}.{}", stem, COMPILED_EXTENSION);
        if file_name == name {
            file_name = format!("{}.compiled.{}", stem, COMPILED_EXTENSION);
        }

        let dir = match &self.out_dir {
            Some(out_dir) => {
                let parent = source.parent().unwrap_or(root);
                let relative = parent.strip_prefix(root).unwrap_or(Path::new(""));
                out_dir.join(relative)
            }
            None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        Some(dir.join(file_name))
    }
}
