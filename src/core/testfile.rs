//! Test file targeting for a changed source file.
//!
//! Order of preference:
//! 1. an existing `<dir>/<test-dir>/<base><suffix>` file
//! 2. a new `<dir>/<base><suffix>` using the first suffix already used by
//!    a file in the source directory
//! 3. the first file matching a test glob in any test dir, used as the
//!    template for a new file named after the first pattern
//!
//! `<suffix>` is the pattern without `*`, ending in the source extension.

use std::path::{Path, PathBuf};

use globset::Glob;
use serde::Serialize;
use tracing::debug;

use crate::infra::config::TestsConfig;

/// Where generated tests for a source file should go
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestTarget
{
    /// Matching test file already exists
    Existing
    {
        path: PathBuf,
    },

    /// A test file should be created; `template` is an existing test file
    /// nearby whose style can be followed
    New
    {
        path: PathBuf,
        template: Option<PathBuf>,
    },

    /// Neither an existing test file nor a naming convention was found
    Unknown,
}

/// Test discovery for one configuration
pub struct TestLocator
{
    config: TestsConfig,
}

impl TestLocator
{
    pub fn new(config: TestsConfig) -> Self
    {
        Self { config }
    }

    /// Decide where tests for `source` belong
    pub fn target_for(
        &self,
        source: &Path,
    ) -> TestTarget
    {
        if let Some(path) = self.find_test_file(source)
        {
            return TestTarget::Existing { path };
        }

        let template = self.find_first_test_file(source);
        let dir = source
            .parent()
            .unwrap_or(Path::new(""));

        let name = self
            .generate_test_file_name(source)
            .or_else(|| {
                // Fall back to the first pattern when only a template exists
                template.as_ref()?;
                let ext = extension_of(source);
                let pattern = self
                    .config
                    .patterns
                    .first()?;
                Some(format!("{}{}", base_name(source), clean_pattern(pattern, &ext)))
            });

        match name
        {
            Some(name) => TestTarget::New { path: dir.join(name), template },
            None => TestTarget::Unknown,
        }
    }

    /// Existing test file named after `source` in one of the test dirs
    pub fn find_test_file(
        &self,
        source: &Path,
    ) -> Option<PathBuf>
    {
        let dir = source.parent()?;
        let base = base_name(source);
        let ext = extension_of(source);

        for test_dir in &self.config.dirs
        {
            for pattern in &self.config.patterns
            {
                let candidate = dir
                    .join(test_dir)
                    .join(format!("{base}{}", clean_pattern(pattern, &ext)));

                if candidate.is_file()
                {
                    return Some(candidate);
                }
            }
        }

        None
    }

    /// `<base><suffix>` for the first pattern whose suffix already appears
    /// on a file in the source directory
    pub fn generate_test_file_name(
        &self,
        source: &Path,
    ) -> Option<String>
    {
        if self
            .config
            .dirs
            .is_empty()
        {
            return None;
        }

        let dir = source.parent()?;
        let names = file_names(dir);
        let ext = extension_of(source);

        self.config
            .patterns
            .iter()
            .map(|p| clean_pattern(p, &ext))
            .find(|suffix| {
                names
                    .iter()
                    .any(|n| n.contains(suffix.as_str()))
            })
            .map(|suffix| format!("{}{}", base_name(source), suffix))
    }

    /// First file matching a test glob in any test dir next to `source`
    pub fn find_first_test_file(
        &self,
        source: &Path,
    ) -> Option<PathBuf>
    {
        let dir = source.parent()?;

        for test_dir in &self.config.dirs
        {
            let test_path = dir.join(test_dir);
            let names = file_names(&test_path);

            for pattern in &self.config.patterns
            {
                let matcher = match Glob::new(pattern)
                {
                    Ok(g) => g.compile_matcher(),
                    Err(e) =>
                    {
                        debug!(pattern, error = %e, "skipping invalid test pattern");
                        continue;
                    }
                };

                if let Some(hit) = names
                    .iter()
                    .find(|n| matcher.is_match(n.as_str()))
                {
                    return Some(test_path.join(hit));
                }
            }
        }

        None
    }
}

/// Pattern without wildcards, ending in the source extension
/// (`*.spec.ts` + `.tsx` → `.spec.tsx`)
pub fn clean_pattern(
    pattern: &str,
    extension: &str,
) -> String
{
    let cleaned = pattern.replace('*', "");
    if extension.is_empty() || cleaned.ends_with(extension)
    {
        return cleaned;
    }

    match cleaned.rfind('.')
    {
        Some(i) if i > 0 => format!("{}{}", &cleaned[..i], extension),
        _ => format!("{cleaned}{extension}"),
    }
}

/// Sorted names of regular files in `dir`; unreadable dirs are empty
fn file_names(dir: &Path) -> Vec<String>
{
    let Ok(entries) = std::fs::read_dir(dir)
    else
    {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type()
                .is_ok_and(|t| t.is_file())
        })
        .filter_map(|e| {
            e.file_name()
                .into_string()
                .ok()
        })
        .collect();

    names.sort();
    names
}

fn base_name(path: &Path) -> String
{
    path.file_stem()
        .map(|s| {
            s.to_string_lossy()
                .into_owned()
        })
        .unwrap_or_default()
}

/// `.ts` style extension, empty when there is none
fn extension_of(path: &Path) -> String
{
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests
{
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    fn locator() -> TestLocator
    {
        TestLocator::new(TestsConfig::default())
    }

    #[test]
    fn clean_pattern_matches_source_extension()
    {
        assert_eq!(clean_pattern("*.spec.ts", ".ts"), ".spec.ts");
        assert_eq!(clean_pattern("*.spec.ts", ".tsx"), ".spec.tsx");
        assert_eq!(clean_pattern("*.test", ".js"), ".test.js");
    }

    #[test]
    fn existing_test_in_tests_dir_wins()
    {
        let tmp = TempDir::new().unwrap();
        tmp.child("src/cart.ts").write_str("").unwrap();
        tmp.child("src/__tests__/cart.test.ts").write_str("").unwrap();

        let got = locator().target_for(&tmp.path().join("src/cart.ts"));
        assert_eq!(got, TestTarget::Existing { path: tmp.path().join("src/__tests__/cart.test.ts") });
    }

    #[test]
    fn new_name_follows_convention_in_directory()
    {
        let tmp = TempDir::new().unwrap();
        tmp.child("src/cart.ts").write_str("").unwrap();
        tmp.child("src/price.test.ts").write_str("").unwrap();

        let got = locator().target_for(&tmp.path().join("src/cart.ts"));
        assert_eq!(
            got,
            TestTarget::New {
                path: tmp.path().join("src/cart.test.ts"),
                template: Some(tmp.path().join("src/price.test.ts")),
            }
        );
    }

    #[test]
    fn template_in_test_dir_gives_first_pattern_name()
    {
        let tmp = TempDir::new().unwrap();
        tmp.child("src/cart.ts").write_str("").unwrap();
        tmp.child("src/tests/price.spec.ts").write_str("").unwrap();

        let got = locator().target_for(&tmp.path().join("src/cart.ts"));
        assert_eq!(
            got,
            TestTarget::New {
                path: tmp.path().join("src/cart.spec.ts"),
                template: Some(tmp.path().join("src/tests/price.spec.ts")),
            }
        );
    }

    #[test]
    fn nothing_nearby_is_unknown()
    {
        let tmp = TempDir::new().unwrap();
        tmp.child("src/cart.ts").write_str("").unwrap();
        assert_eq!(locator().target_for(&tmp.path().join("src/cart.ts")), TestTarget::Unknown);
    }
}
