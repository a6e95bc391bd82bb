//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Compile hyperblade templates into PHP for a Blade-style engine
#[derive(Parser, Debug, Clone)]
#[command(name = "hyperblade")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Template files or directories to compile
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to hyperblade.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory compiled files are written to (default: next to each template)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Emit compact output without indentation
    #[arg(long)]
    pub compact: bool,

    /// Output format
    #[arg(long, default_value = "human")]
    pub output: OutputFormat,

    /// Recompile templates when they change
    #[arg(short, long)]
    pub watch: bool,

    /// Show timing information
    #[arg(long)]
    pub timings: bool,

    /// Maximum number of errors to show
    #[arg(long)]
    pub max_errors: Option<usize>,

    /// Ignore patterns (glob)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Preserve watch output (don't clear screen)
    #[arg(long)]
    pub preserve_watch_output: bool,
}

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::parse_from(["hyperblade", "views", "--compact", "--output", "json", "--ignore", "**/vendor/**"]);
        assert_eq!(args.paths, [PathBuf::from("views")]);
        assert!(args.compact);
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.ignore, ["**/vendor/**"]);

        let args = Args::parse_from(["hyperblade"]);
        assert_eq!(args.paths, [PathBuf::from(".")]);
        assert_eq!(args.output, OutputFormat::Human);
    }
}
