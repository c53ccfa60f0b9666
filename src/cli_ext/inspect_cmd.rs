//! `resolve` and `bundle` command handlers: single pipeline stages
//! exposed for inspection.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::cli::{AppContext, BundleArgs, ResolveArgs};
use crate::core::bundle::ContextBundler;
use crate::core::resolve::{ImportResolver, ResolvedModulePath};
use crate::infra::config::load_config;
use crate::infra::io::write_output;

/// Print the resolved path, or the specifier unchanged on a miss
pub fn run_resolve(
    args: ResolveArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let cfg = load_config()?;
    let resolver = ImportResolver::new(cfg.resolve);

    let resolved = resolver.resolve(&args.file, &args.specifier);
    println!("{resolved}");

    if !ctx.quiet
        && let ResolvedModulePath::Unresolved(_) = resolved
    {
        let note = "unresolved: external package or missing file";
        if ctx.no_color
        {
            eprintln!("{note}");
        }
        else
        {
            eprintln!("{}", note.yellow());
        }
    }

    Ok(())
}

/// Bundle one seed from one file
pub fn run_bundle(
    args: BundleArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let mut cfg = load_config()?;
    if let Some(tokens) = args.max_tokens
    {
        cfg.bundle
            .max_tokens = tokens;
    }
    let max_depth = args
        .max_depth
        .unwrap_or(
            cfg.bundle
                .max_depth,
        );

    let seed = match args
        .seed
        .strip_prefix('@')
    {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file {path}"))?,
        None => args
            .seed
            .clone(),
    };

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let bundler =
        ContextBundler::new(cfg.bundle, ImportResolver::new(cfg.resolve))?.with_display_root(cwd);

    let bundle = bundler.extract_code_and_references(&[args.file.clone()], &[seed], max_depth);
    if bundle
        .text
        .is_empty()
    {
        anyhow::bail!("No code unit in {} matches the seed", args.file.display());
    }

    write_output(args.output.as_deref(), &bundle.text)?;

    if !ctx.quiet
    {
        let summary = format!(
            "{} fragments, {} tokens{}",
            bundle.fragments,
            bundle.token_count,
            if bundle.truncated { " (truncated)" } else { "" }
        );
        if ctx.no_color
        {
            eprintln!("{summary}");
        }
        else
        {
            eprintln!("{}", summary.dimmed());
        }
    }

    Ok(())
}
