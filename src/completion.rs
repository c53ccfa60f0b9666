//! Shell completion scripts for `dctx`.

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Generator, Shell};
use std::path::PathBuf;

use crate::cli::{AppContext, Cli, CompletionsArgs};

/// Binary name completions are registered for
const BIN_NAME: &str = "dctx";

/// Completion script for `shell` as text
pub fn render(shell: Shell) -> Result<String> {
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, &mut buf);
    String::from_utf8(buf).context("completion script is not UTF-8")
}

/// Print the script, or write it into `--out-dir` under the shell's
/// conventional file name
pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    let script = render(args.shell)?;

    let Some(dir) = args.out_dir else {
        print!("{script}");
        return Ok(());
    };

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path: PathBuf = dir.join(args.shell.file_name(BIN_NAME));
    std::fs::write(&path, script)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if !ctx.quiet {
        eprintln!("Wrote completion to {}", path.display());
    }
    Ok(())
}
