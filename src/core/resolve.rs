//! Import specifier resolution with an ordered pipeline
//!
//! 1. Path aliases from the nearest tsconfig/jsconfig (`baseUrl` + `paths`)
//! 2. Relative to the importing file's directory
//! 3. Each attempt tries the bare path, then configured extensions, then
//!    `index.<ext>`; a directly repeated directory run is collapsed first
//! 4. Anything inside an excluded directory is treated as external
//!
//! A miss is not an error: the specifier comes back unchanged.

use crate::infra::config::ResolveConfig;
use crate::infra::utils::PathUtils;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Outcome of resolving one module specifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResolvedModulePath {
    /// Existing source file outside excluded directories
    File(PathBuf),
    /// Raw specifier, returned unchanged on a miss
    Unresolved(String),
}

impl ResolvedModulePath {
    pub fn as_file(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl fmt::Display for ResolvedModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", PathUtils::display(p)),
            Self::Unresolved(s) => f.write_str(s),
        }
    }
}

/// Parsed `compilerOptions` alias mapping
#[derive(Debug, Clone, Default)]
pub struct AliasConfig {
    /// Directory alias targets are relative to
    pub base_dir: PathBuf,
    /// Whether `baseUrl` was set (enables bare non-relative lookups)
    pub has_base_url: bool,
    /// Alias pattern → target patterns, in file order
    pub paths: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    extends: Option<Extends>,
    compiler_options: Option<RawCompilerOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Extends {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    paths: Option<IndexMap<String, Vec<String>>>,
}

fn read_raw(path: &Path) -> Result<RawTsConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json_lenient::from_str_lenient(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

impl AliasConfig {
    /// Load a tsconfig/jsconfig, following one relative `extends` hop for
    /// settings the file itself leaves out
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_raw(path)?;
        let dir = path.parent().unwrap_or(Path::new("."));

        let parent = raw
            .extends
            .as_ref()
            .and_then(|e| match e {
                Extends::One(s) => Some(s.as_str()),
                Extends::Many(v) => v.first().map(String::as_str),
            })
            .filter(|s| s.starts_with('.'))
            .map(|s| {
                if s.ends_with(".json") { dir.join(s) } else { dir.join(format!("{s}.json")) }
            });

        let parent_opts = match parent {
            Some(p) => match read_raw(&p) {
                Ok(raw) => raw.compiler_options.map(|o| (p, o)),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable extended config");
                    None
                }
            },
            None => None,
        };

        let own = raw.compiler_options.unwrap_or_default();

        // baseUrl is relative to the config that declares it
        let base_url = match (&own.base_url, &parent_opts) {
            (Some(b), _) => Some(dir.join(b)),
            (None, Some((p, o))) => o.base_url.as_ref().map(|b| p.parent().unwrap_or(dir).join(b)),
            _ => None,
        };

        let paths = own
            .paths
            .or_else(|| parent_opts.and_then(|(_, o)| o.paths))
            .unwrap_or_default();

        Ok(Self {
            has_base_url: base_url.is_some(),
            base_dir: PathUtils::normalize(&base_url.unwrap_or_else(|| dir.to_path_buf())),
            paths,
        })
    }

    /// Candidate base paths for a specifier, most specific alias first
    pub fn candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let mut best: Option<(usize, &str, &Vec<String>)> = None;

        for (pattern, targets) in &self.paths {
            let Some(capture) = match_alias(pattern, specifier) else {
                continue;
            };
            // Longest matched prefix wins, first declared wins ties
            let prefix_len = pattern.find('*').unwrap_or(pattern.len());
            if best.is_none_or(|(len, _, _)| prefix_len > len) {
                best = Some((prefix_len, capture, targets));
            }
        }

        let mut out: Vec<PathBuf> = best
            .map(|(_, capture, targets)| {
                targets
                    .iter()
                    .map(|t| self.base_dir.join(t.replacen('*', capture, 1)))
                    .collect()
            })
            .unwrap_or_default();

        // With baseUrl, bare specifiers are also looked up beneath it
        if self.has_base_url && !specifier.starts_with('.') {
            out.push(self.base_dir.join(specifier));
        }

        out
    }
}

/// Text captured by `*` when `specifier` matches `pattern`
fn match_alias<'a>(pattern: &str, specifier: &'a str) -> Option<&'a str> {
    match pattern.split_once('*') {
        None => (pattern == specifier).then_some(""),
        Some((prefix, suffix)) => specifier
            .strip_prefix(prefix)?
            .strip_suffix(suffix)
            .filter(|_| specifier.len() >= prefix.len() + suffix.len()),
    }
}

/// Resolves specifiers for files in one project; safe to share across threads
pub struct ImportResolver {
    settings: ResolveConfig,
    /// Directory → nearest alias config (None when there is none)
    configs: Cache<PathBuf, Option<Arc<AliasConfig>>>,
}

impl ImportResolver {
    pub fn new(settings: ResolveConfig) -> Self {
        Self { settings, configs: Cache::new(256) }
    }

    /// Resolve `specifier` as imported from `importing_file`
    #[instrument(level = "debug", skip(self), fields(file = %importing_file.display()))]
    pub fn resolve(&self, importing_file: &Path, specifier: &str) -> ResolvedModulePath {
        let dir = importing_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());

        let found = self
            .try_alias(&dir, specifier)
            .or_else(|| self.try_relative(&dir, specifier));

        match found {
            Some(path) => {
                debug!(resolved = %path.display(), "resolved import");
                ResolvedModulePath::File(path)
            }
            None => {
                debug!("import left unresolved");
                ResolvedModulePath::Unresolved(specifier.to_string())
            }
        }
    }

    /// Step 1: alias mapping from the nearest config
    fn try_alias(&self, dir: &Path, specifier: &str) -> Option<PathBuf> {
        let config = self.alias_config_for(dir)?;
        config.candidates(specifier).into_iter().find_map(|base| self.existing_file(&base, dir))
    }

    /// Step 2: plain relative resolution
    fn try_relative(&self, dir: &Path, specifier: &str) -> Option<PathBuf> {
        if !specifier.starts_with('.') {
            return None;
        }
        self.existing_file(&PathUtils::normalize(&dir.join(specifier)), dir)
    }

    /// First existing, non-excluded file for a base path. Only the part
    /// of a candidate below its common ancestor with `importer_dir` is
    /// checked against the excluded directory names.
    fn existing_file(&self, base: &Path, importer_dir: &Path) -> Option<PathBuf> {
        let base = PathUtils::normalize(base);

        for candidate in self.file_candidates(&base) {
            // Prefer the collapsed form of a doubled directory run
            let corrected = PathUtils::collapse_repeated_segments(&candidate);

            for path in corrected.iter().chain(std::iter::once(&candidate)) {
                if !path.is_file() {
                    continue;
                }
                let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.clone());
                if self.is_excluded(&canonical, importer_dir) || self.is_excluded(path, importer_dir) {
                    trace!(path = %path.display(), "candidate in excluded directory");
                    return None;
                }
                return Some(canonical);
            }
        }

        None
    }

    /// Bare path, then `path.<ext>`, then `path/index.<ext>`
    fn file_candidates(&self, base: &Path) -> Vec<PathBuf> {
        let exts = &self.settings.extensions;
        let mut out = Vec::with_capacity(1 + 2 * exts.len());
        out.push(base.to_path_buf());

        for ext in exts {
            let mut s = base.as_os_str().to_os_string();
            s.push(".");
            s.push(ext);
            out.push(PathBuf::from(s));
        }
        for ext in exts {
            out.push(base.join(format!("index.{ext}")));
        }
        out
    }

    fn is_excluded(&self, path: &Path, importer_dir: &Path) -> bool {
        let below = PathUtils::below_common_ancestor(path, importer_dir);
        PathUtils::in_excluded_dir(&below, &self.settings.excluded_dirs)
    }

    /// Nearest alias config at or above `dir`, cached per directory
    fn alias_config_for(&self, dir: &Path) -> Option<Arc<AliasConfig>> {
        let key = dir.to_path_buf();
        if let Some(hit) = self.configs.get(&key) {
            return hit;
        }

        let loaded = dir
            .ancestors()
            .find_map(|d| {
                self.settings.config_files.iter().map(|name| d.join(name)).find(|p| p.is_file())
            })
            .and_then(|path| match AliasConfig::load(&path) {
                Ok(cfg) => Some(Arc::new(cfg)),
                Err(e) => {
                    // Unreadable config behaves like a missing one
                    warn!(error = %e, "skipping path-alias config");
                    None
                }
            });

        self.configs.insert(key, loaded.clone());
        loaded
    }
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self::new(ResolveConfig::default())
    }
}
