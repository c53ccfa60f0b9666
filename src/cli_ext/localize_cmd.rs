//! `localize` and `lines` command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::instrument;

use crate::cli::{AppContext, LinesArgs, LocalizeArgs};
use crate::core::diff::{ChangedLine, parse_diff, split_by_file};
use crate::core::pipeline::{DiffSource, LocalizationReport, Pipeline, StaticDiffSource};
use crate::infra::config::{Config, load_config_from};
use crate::infra::git::GitDiffSource;
use crate::infra::io::{read_diff_input, write_output};

/// Run the `localize` command end-to-end
#[instrument(level = "debug", skip_all)]
pub fn run(
    args: LocalizeArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let mut cfg = load_config_from(&args.root)?;
    apply_overrides(&mut cfg, &args);

    let source: Box<dyn DiffSource> = match &args.diff_file
    {
        Some(path) =>
        {
            let diff = read_diff_input(path)?;
            Box::new(StaticDiffSource::new(&args.root, &diff))
        }
        None => Box::new(GitDiffSource::discover(
            &args.root,
            cfg.diff
                .base_ref
                .clone(),
            cfg.diff
                .fetch,
        )?),
    };

    let pipeline = Pipeline::new(cfg, source.root())?.with_progress(!ctx.quiet);
    let report = pipeline.run(source.as_ref())?;

    let rendered = if args.json
    {
        report
            .to_json()
            .context("Failed to serialize report")?
    }
    else
    {
        report.payload()
    };

    write_output(args.output.as_deref(), &rendered)?;

    if !ctx.quiet
    {
        print_summary(&report, args.output.as_deref(), ctx);
    }

    Ok(())
}

/// CLI flags win over config values
fn apply_overrides(
    cfg: &mut Config,
    args: &LocalizeArgs,
)
{
    if let Some(base) = &args.base
    {
        cfg.diff
            .base_ref = base.clone();
    }
    if args.fetch
    {
        cfg.diff
            .fetch = true;
    }
    if let Some(depth) = args.max_depth
    {
        cfg.bundle
            .max_depth = depth;
    }
    if let Some(tokens) = args.max_tokens
    {
        cfg.bundle
            .max_tokens = tokens;
    }
}

/// One-line result on stderr; stdout carries the payload
fn print_summary(
    report: &LocalizationReport,
    output: Option<&Path>,
    ctx: &AppContext,
)
{
    let mark = if ctx.no_color
    {
        "✓".to_string()
    }
    else
    {
        "✓".green()
            .to_string()
    };

    let target = output.map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
    eprintln!(
        "{} Localized {} snippets in {} files to {}",
        mark,
        report.snippet_count(),
        report
            .files
            .len(),
        target
    );

    if report.truncated()
    {
        let note = "Some bundles hit the token ceiling and were truncated";
        if ctx.no_color
        {
            eprintln!("{note}");
        }
        else
        {
            eprintln!("{}", note.yellow());
        }
    }
}

#[derive(Debug, Serialize)]
struct FileLines
{
    path: Option<String>,
    lines: Vec<ChangedLine>,
}

/// Changed lines per file section; a diff without file headers is one
/// anonymous section
fn changed_lines_by_file(diff: &str) -> Vec<FileLines>
{
    let files = split_by_file(diff);
    if files.is_empty()
    {
        return vec![FileLines { path: None, lines: parse_diff(diff) }];
    }

    files
        .into_iter()
        .map(|f| FileLines { path: Some(f.path.display().to_string()), lines: f.changed_lines })
        .collect()
}

/// Run the `lines` command
pub fn run_lines(
    args: LinesArgs,
    _ctx: &AppContext,
) -> Result<()>
{
    let diff = read_diff_input(&args.diff_file)?;
    let files = changed_lines_by_file(&diff);

    if args.json
    {
        let json = serde_json::to_string_pretty(&files).context("Failed to serialize lines")?;
        println!("{json}");
        return Ok(());
    }

    for file in files
    {
        let lines: Vec<String> = file
            .lines
            .iter()
            .map(ToString::to_string)
            .collect();
        match file.path
        {
            Some(path) => println!("{}: {}", path, lines.join(",")),
            None => println!("{}", lines.join(",")),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn headerless_diff_is_one_section()
    {
        let got = changed_lines_by_file("@@ -1,1 +1,2 @@\n a\n+b\n");
        assert_eq!(got.len(), 1);
        assert!(got[0].path.is_none());
        assert_eq!(got[0].lines, vec![2]);
    }

    #[test]
    fn sections_keep_diff_order()
    {
        let diff = "--- a/z.ts\n+++ b/z.ts\n@@ -0,0 +1 @@\n+z\n--- a/a.ts\n+++ b/a.ts\n@@ -3 +3 @@\n-x\n+y\n";
        let got = changed_lines_by_file(diff);
        let paths: Vec<_> = got
            .iter()
            .map(|f| f.path.as_deref().unwrap())
            .collect();
        assert_eq!(paths, vec!["z.ts", "a.ts"]);
        assert_eq!(got[1].lines, vec![3]);
    }

    #[test]
    fn overrides_replace_config_values()
    {
        let mut cfg = Config::default();
        let args = LocalizeArgs {
            root: ".".into(),
            base: Some("develop".into()),
            fetch: true,
            diff_file: None,
            max_depth: Some(1),
            max_tokens: None,
            json: false,
            output: None,
        };
        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg.diff.base_ref, "develop");
        assert!(cfg.diff.fetch);
        assert_eq!(cfg.bundle.max_depth, 1);
        assert_eq!(cfg.bundle.max_tokens, Config::default().bundle.max_tokens);
    }
}
