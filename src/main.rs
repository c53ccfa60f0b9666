use anyhow::Result;
use clap::Parser;
use diffctx::cli::{AppContext, Cli, Commands};
use diffctx::cli_ext::{inspect_cmd, localize_cmd};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.no_color);

    // Build a context once, pass everywhere
    let ctx = AppContext { quiet: cli.quiet, no_color: cli.no_color, verbose: cli.verbose };

    match cli.command {
        Commands::Localize(args) => localize_cmd::run(args, &ctx),
        Commands::Lines(args) => localize_cmd::run_lines(args, &ctx),
        Commands::Resolve(args) => inspect_cmd::run_resolve(args, &ctx),
        Commands::Bundle(args) => inspect_cmd::run_bundle(args, &ctx),
        Commands::Init(args) => diffctx::infra::config::init(args, &ctx),
        Commands::Completions(args) => diffctx::completion::run(args, &ctx),
    }
}

/// Stderr logging; `DIFFCTX_LOG` wins over `--verbose`
fn init_tracing(verbose: bool, no_color: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("DIFFCTX_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}
