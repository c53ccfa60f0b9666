use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

/// File names probed in the working directory, in priority order
pub const CONFIG_FILES: [&str; 4] = ["diffctx.toml", "diffctx.yaml", "diffctx.json", ".diffctx.toml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Where diffs come from
    pub diff: DiffConfig,

    /// Which changed files are analyzed
    pub files: FilesConfig,

    /// Context bundling limits
    pub bundle: BundleConfig,

    /// Import specifier resolution
    pub resolve: ResolveConfig,

    /// Test file discovery
    pub tests: TestsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig
{
    /// Ref the working tree is compared against
    pub base_ref: String,

    /// Run `git fetch origin <base_ref>` before diffing
    pub fetch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig
{
    /// Source extensions (without dot)
    pub extensions: Vec<String>,

    /// Path substrings that disqualify a changed file
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig
{
    pub max_depth: usize,
    pub max_tokens: usize,

    /// Model or encoding name used for token counting
    pub model: String,

    /// Seeds longer than this are cut before matching
    pub seed_max_chars: usize,

    pub fingerprint_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig
{
    /// Path-alias configuration files, searched upward from the importing file
    pub config_files: Vec<String>,

    /// Directory names whose contents are never resolved into
    pub excluded_dirs: Vec<String>,

    /// Extensions appended to extensionless specifiers, in order
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsConfig
{
    /// Test file globs; the part after `*` is the test suffix
    pub patterns: Vec<String>,

    /// Directories (relative to the source file) holding tests
    pub dirs: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String>
{
    items
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for DiffConfig
{
    fn default() -> Self
    {
        Self { base_ref: "main".to_string(), fetch: false }
    }
}

impl Default for FilesConfig
{
    fn default() -> Self
    {
        Self {
            extensions: strings(&["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"]),
            exclude: strings(&[".test.", ".spec.", ".d.ts"]),
        }
    }
}

impl Default for BundleConfig
{
    fn default() -> Self
    {
        Self {
            max_depth: 3,
            max_tokens: 24_000,
            model: "gpt-4o".to_string(),
            seed_max_chars: 4_000,
            fingerprint_len: 120,
        }
    }
}

impl Default for ResolveConfig
{
    fn default() -> Self
    {
        Self {
            config_files: strings(&["tsconfig.json", "jsconfig.json"]),
            excluded_dirs: strings(&[
                "node_modules",
                "bower_components",
                "jspm_packages",
                "vendor",
                "dist",
                "build",
                "out",
                ".next",
            ]),
            extensions: strings(&["ts", "js"]),
        }
    }
}

impl Default for TestsConfig
{
    fn default() -> Self
    {
        Self { patterns: strings(&["*.spec.ts", "*.test.ts"]), dirs: strings(&["", "__tests__", "tests"]) }
    }
}

impl FilesConfig
{
    /// Whether a changed path is a source file worth analyzing
    pub fn accepts(
        &self,
        path: &Path,
    ) -> bool
    {
        let has_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|x| x.eq_ignore_ascii_case(ext))
            });

        let display = path.to_string_lossy();
        has_ext
            && !self
                .exclude
                .iter()
                .any(|pat| display.contains(pat.as_str()))
    }
}

/// Load config from the current directory
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load config from `dir`, layered with `DIFFCTX_*` environment variables
/// (`DIFFCTX_BUNDLE__MAX_DEPTH=2`). Missing files yield defaults.
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // Environment overrides; `__` separates nested keys
    builder = builder.add_source(
        config::Environment::with_prefix("DIFFCTX")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

/// Write the default config as pretty TOML
pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path: PathBuf = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn missing_file_gives_defaults() -> Result<()>
    {
        let dir = tempfile::tempdir()?;
        let cfg = load_config_from(dir.path())?;

        assert_eq!(cfg.bundle.max_depth, 3);
        assert_eq!(cfg.diff.base_ref, "main");
        assert_eq!(cfg.resolve.extensions, vec!["ts", "js"]);
        Ok(())
    }

    #[test]
    fn partial_file_overrides_only_given_keys() -> Result<()>
    {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path()
                .join("diffctx.toml"),
            "[bundle]\nmax_depth = 5\n\n[diff]\nbase_ref = \"develop\"\n",
        )?;

        let cfg = load_config_from(dir.path())?;
        assert_eq!(cfg.bundle.max_depth, 5);
        assert_eq!(cfg.bundle.max_tokens, 24_000);
        assert_eq!(cfg.diff.base_ref, "develop");
        assert!(!cfg.diff.fetch);
        Ok(())
    }

    #[test]
    fn default_config_round_trips_through_toml() -> Result<()>
    {
        let text = toml::to_string_pretty(&Config::default())?;
        let back: Config = toml::from_str(&text)?;
        assert_eq!(back.tests.dirs, vec!["", "__tests__", "tests"]);
        Ok(())
    }

    #[test]
    fn files_filter_drops_tests_and_foreign_extensions()
    {
        let files = FilesConfig::default();
        assert!(files.accepts(Path::new("src/app/service.ts")));
        assert!(files.accepts(Path::new("web/App.TSX")));
        assert!(!files.accepts(Path::new("src/app/service.spec.ts")));
        assert!(!files.accepts(Path::new("src/types/global.d.ts")));
        assert!(!files.accepts(Path::new("README.md")));
    }
}
