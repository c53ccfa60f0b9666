//! Git-backed diff source
//!
//! Shells out to the `git` binary in a working directory:
//! `git diff --name-only <base>` for the changed file list and
//! `git diff <base> -- <path>` per file, optionally after
//! `git fetch origin <base>` (then diffing against `FETCH_HEAD`).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::core::pipeline::DiffSource;

/// Diffs the working tree against a base ref
pub struct GitDiffSource {
    root: PathBuf,
    base_ref: String,
    fetch: bool,
}

impl GitDiffSource {
    pub fn new(root: impl Into<PathBuf>, base_ref: impl Into<String>, fetch: bool) -> Self {
        Self { root: root.into(), base_ref: base_ref.into(), fetch }
    }

    /// Source rooted at the top level of the repository containing `dir`,
    /// since `git diff --name-only` reports toplevel-relative paths
    pub fn discover(dir: &Path, base_ref: impl Into<String>, fetch: bool) -> Result<Self> {
        let probe = Self::new(dir, "", false);
        let top = probe.git(&["rev-parse", "--show-toplevel"])?;
        let root = PathBuf::from(top.trim());
        debug!(root = %root.display(), "repository root");
        Ok(Self::new(dunce::simplified(&root), base_ref, fetch))
    }

    /// Ref that diffs are taken against
    fn target(&self) -> &str {
        if self.fetch { "FETCH_HEAD" } else { &self.base_ref }
    }

    /// Fetch the base ref from `origin` when configured
    pub fn prepare(&self) -> Result<()> {
        if !self.fetch {
            return Ok(());
        }
        info!(base = %self.base_ref, "fetching base ref");
        self.git(&["fetch", "origin", &self.base_ref]).map(|_| ())
    }

    /// Run git with `args` in the working directory and return stdout
    fn git(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .context("Git executable not found in PATH")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }

        String::from_utf8(output.stdout)
            .with_context(|| format!("git {} produced non-UTF-8 output", args.join(" ")))
    }
}

impl DiffSource for GitDiffSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn changed_files(&self) -> Result<Vec<PathBuf>> {
        self.prepare()?;
        let out = self.git(&["diff", "--name-only", self.target()])?;
        Ok(out.lines().filter(|l| !l.trim().is_empty()).map(PathBuf::from).collect())
    }

    fn diff_for(&self, path: &Path) -> Result<String> {
        let path = path.to_string_lossy();
        self.git(&["diff", self.target(), "--", &path])
    }
}
