//! Change localization pipeline
//!
//! changed files → per-file diff → changed lines → enclosing nodes →
//! snippets → one context bundle per snippet (in parallel) → report.
//!
//! Per-file failures (unreadable diff, parse errors, deleted files) are
//! logged and skipped. Only an entirely empty result is an error.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle}; // CLI progress
use rayon::prelude::*; // per-snippet bundling
use serde::Serialize; // JSON report
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::bundle::{ContextBundle, ContextBundler};
use crate::core::diff::{ChangedLine, FileDiff, parse_diff, split_by_file};
use crate::core::locate::find_enclosing_nodes;
use crate::core::resolve::ImportResolver;
use crate::core::snippet::extract_all;
use crate::core::source::SourceIndex;
use crate::core::testfile::{TestLocator, TestTarget};
use crate::infra::config::{Config, FilesConfig};
use crate::infra::utils::PathUtils;

/// Errors visible to the caller of a whole run
#[derive(Debug, Error)]
pub enum PipelineError
{
    #[error("nothing to do: no changed source file produced a snippet")]
    NothingToDo,

    #[error("failed to obtain diff: {0}")]
    Diff(String),

    #[error("failed to set up bundler: {0}")]
    Setup(String),
}

/// Version-control collaborator: changed files and their diffs
pub trait DiffSource
{
    /// Directory changed paths are relative to
    fn root(&self) -> &Path;

    /// Changed paths relative to [`DiffSource::root`]
    fn changed_files(&self) -> anyhow::Result<Vec<PathBuf>>;

    /// Unified diff text of one changed path
    fn diff_for(
        &self,
        path: &Path,
    ) -> anyhow::Result<String>;
}

/// Serves a pre-computed (possibly multi-file) diff
pub struct StaticDiffSource
{
    root: PathBuf,
    files: IndexMap<PathBuf, FileDiff>,
}

impl StaticDiffSource
{
    pub fn new(
        root: impl Into<PathBuf>,
        diff: &str,
    ) -> Self
    {
        let files = split_by_file(diff)
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect();
        Self { root: root.into(), files }
    }

    /// Parsed sections, in diff order
    pub fn files(&self) -> impl Iterator<Item = &FileDiff>
    {
        self.files
            .values()
    }
}

impl DiffSource for StaticDiffSource
{
    fn root(&self) -> &Path
    {
        &self.root
    }

    fn changed_files(&self) -> anyhow::Result<Vec<PathBuf>>
    {
        Ok(self
            .files
            .keys()
            .cloned()
            .collect())
    }

    fn diff_for(
        &self,
        path: &Path,
    ) -> anyhow::Result<String>
    {
        self.files
            .get(path)
            .map(|f| {
                f.text
                    .clone()
            })
            .ok_or_else(|| anyhow::anyhow!("no diff section for {}", path.display()))
    }
}

/// Everything gathered for one changed file
#[derive(Debug, Clone, Serialize)]
pub struct FileContext
{
    /// Path relative to the diff root
    pub path: PathBuf,

    pub diff: String,

    pub changed_lines: Vec<ChangedLine>,

    /// Changed code units, without references
    pub snippets: Vec<String>,

    /// One bundle per snippet, same order
    pub bundles: Vec<ContextBundle>,

    pub test_target: TestTarget,
}

/// Result of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocalizationReport
{
    pub files: Vec<FileContext>,
}

impl LocalizationReport
{
    /// Concatenated bundle texts, the prompt context handed downstream
    pub fn payload(&self) -> String
    {
        self.files
            .iter()
            .flat_map(|f| {
                f.bundles
                    .iter()
            })
            .map(|b| {
                b.text
                    .as_str()
            })
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn snippet_count(&self) -> usize
    {
        self.files
            .iter()
            .map(|f| {
                f.snippets
                    .len()
            })
            .sum()
    }

    pub fn truncated(&self) -> bool
    {
        self.files
            .iter()
            .flat_map(|f| &f.bundles)
            .any(|b| b.truncated)
    }

    pub fn to_json(&self) -> serde_json::Result<String>
    {
        serde_json::to_string_pretty(self)
    }
}

/// Changed lines and snippets of one file version
#[derive(Debug, Clone, Default)]
pub struct Localized
{
    pub changed_lines: Vec<ChangedLine>,
    pub snippets: Vec<String>,
}

/// Localize a diff against already-loaded file text
pub fn localize(
    index: &SourceIndex,
    diff: &str,
) -> Localized
{
    let changed_lines = parse_diff(diff);
    let matches = find_enclosing_nodes(index.root(), &changed_lines, index);
    let snippets = extract_all(&matches, index);
    Localized { changed_lines, snippets }
}

/// Top-level orchestration
pub struct Pipeline
{
    files: FilesConfig,
    max_depth: usize,
    bundler: ContextBundler,
    tests: TestLocator,
    show_progress: bool,
}

impl Pipeline
{
    /// Build a pipeline for a project rooted at `root`
    pub fn new(
        config: Config,
        root: &Path,
    ) -> Result<Self, PipelineError>
    {
        let resolver = ImportResolver::new(config.resolve);
        let bundler = ContextBundler::new(config.bundle.clone(), resolver)
            .map_err(|e| PipelineError::Setup(format!("{e:#}")))?
            .with_display_root(root);

        Ok(Self {
            files: config.files,
            max_depth: config
                .bundle
                .max_depth,
            bundler,
            tests: TestLocator::new(config.tests),
            show_progress: false,
        })
    }

    /// Show a per-file progress bar on stderr
    pub fn with_progress(
        mut self,
        show: bool,
    ) -> Self
    {
        self.show_progress = show;
        self
    }

    pub fn bundler(&self) -> &ContextBundler
    {
        &self.bundler
    }

    /// Run every changed source file through localization and bundling
    #[instrument(level = "info", skip_all, fields(root = %source.root().display()))]
    pub fn run(
        &self,
        source: &dyn DiffSource,
    ) -> Result<LocalizationReport, PipelineError>
    {
        let changed = source
            .changed_files()
            .map_err(|e| PipelineError::Diff(format!("{e:#}")))?;

        let candidates: Vec<PathBuf> = changed
            .into_iter()
            .filter(|p| {
                self.files
                    .accepts(p)
            })
            .collect();
        info!(files = candidates.len(), "changed source files");

        let pb = self.progress_bar(candidates.len());
        let mut report = LocalizationReport::default();

        for rel in &candidates
        {
            pb.set_message(PathUtils::display(rel));
            if let Some(ctx) = self.process_file(source, rel)
            {
                report
                    .files
                    .push(ctx);
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if report
            .files
            .is_empty()
        {
            return Err(PipelineError::NothingToDo);
        }

        Ok(report)
    }

    /// One file end to end; None when it contributes nothing
    fn process_file(
        &self,
        source: &dyn DiffSource,
        rel: &Path,
    ) -> Option<FileContext>
    {
        let diff = match source.diff_for(rel)
        {
            Ok(d) => d,
            Err(e) =>
            {
                warn!(path = %rel.display(), error = %format!("{e:#}"), "skipping file without diff");
                return None;
            }
        };

        let full = source
            .root()
            .join(rel);
        let index = match SourceIndex::open(&full)
        {
            Ok(i) => i,
            Err(e) =>
            {
                warn!(path = %rel.display(), error = %e, "skipping file");
                return None;
            }
        };

        let Localized { changed_lines, snippets } = localize(&index, &diff);
        if snippets.is_empty()
        {
            debug!(path = %rel.display(), "no enclosing code units for changed lines");
            return None;
        }

        // Each snippet gets its own bundling context
        let files = [full.clone()];
        let bundles: Vec<ContextBundle> = snippets
            .par_iter()
            .map(|snippet| {
                self.bundler
                    .extract_code_and_references(&files, std::slice::from_ref(snippet), self.max_depth)
            })
            .collect();

        Some(FileContext {
            path: rel.to_path_buf(),
            diff,
            changed_lines,
            snippets,
            bundles,
            test_target: self
                .tests
                .target_for(&full),
        })
    }

    fn progress_bar(
        &self,
        len: usize,
    ) -> ProgressBar
    {
        if !self.show_progress
        {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}
