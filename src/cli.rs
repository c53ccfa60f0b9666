use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "dctx")]
#[command(
    about = "Locate the code units touched by a diff and bundle their import context for test generation"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log debug output to stderr (overridden by DIFFCTX_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Localize a diff and bundle context for every changed code unit
    Localize(LocalizeArgs),

    /// Print the changed line numbers of a diff, per file
    Lines(LinesArgs),

    /// Resolve an import specifier as seen from a file
    Resolve(ResolveArgs),

    /// Bundle one code snippet with its transitive imports
    Bundle(BundleArgs),

    /// Initialize a diffctx.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct LocalizeArgs {
    /// Project root; changed paths are relative to it
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Ref to diff the working tree against (default from config)
    #[arg(long)]
    pub base: Option<String>,

    /// Fetch the base ref from origin before diffing
    #[arg(long)]
    pub fetch: bool,

    /// Read a unified diff from this file ('-' for stdin) instead of git
    #[arg(long, value_name = "PATH")]
    pub diff_file: Option<PathBuf>,

    /// Maximum import depth to follow
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Token ceiling per bundle
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Emit the full report as JSON instead of the bundle text
    #[arg(long)]
    pub json: bool,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct LinesArgs {
    /// Unified diff file ('-' for stdin)
    #[arg(default_value = "-")]
    pub diff_file: PathBuf,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// File containing the import
    pub file: PathBuf,

    /// Import specifier as written in the source
    pub specifier: String,
}

#[derive(Parser, Debug)]
pub struct BundleArgs {
    /// File the seed snippet lives in
    pub file: PathBuf,

    /// Code snippet to locate (read from a file when prefixed with '@')
    pub seed: String,

    /// Maximum import depth to follow (default from config)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Token ceiling for the bundle (default from config)
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script into this directory instead of stdout
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}
