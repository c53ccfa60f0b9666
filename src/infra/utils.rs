//! Filepath: src/infra/utils.rs
//! Utility helpers organized by small, focused structs.
//! All functions are associated fns to keep call sites
//! ergonomic, testable, and discoverable.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Quoted string literals (single, double, template)
static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|`(?:[^`\\]|\\.)*`"#)
        .expect("string literal regex is valid")
});

/// JS identifier tokens (ASCII subset)
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("identifier regex is valid"));

/// Anything that is not a word character
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("non-word regex is valid"));

/// Token-level text helpers
pub struct TextUtils;

impl TextUtils
{
    /// Identifier tokens in order of appearance, string literal
    /// contents excluded
    pub fn identifiers(text: &str) -> Vec<String>
    {
        // Blank out literals so their words are not read as names
        let code = STRING_LITERAL.replace_all(text, " ");

        IDENTIFIER
            .find_iter(&code)
            .filter(|m| {
                // Reject tails of numeric literals such as `1e5` or `0xff`
                m.start() == 0
                    || !code.as_bytes()[m.start() - 1].is_ascii_digit()
            })
            .map(|m| {
                m.as_str()
                    .to_string()
            })
            .collect()
    }

    /// Unquoted contents of every quoted string in `text`
    pub fn string_literals(text: &str) -> Vec<String>
    {
        STRING_LITERAL
            .find_iter(text)
            .map(|m| {
                let s = m.as_str();
                s[1..s.len() - 1].to_string()
            })
            .collect()
    }

    /// Drop every non-word character
    pub fn strip_non_word(text: &str) -> String
    {
        NON_WORD
            .replace_all(text, "")
            .into_owned()
    }

    /// First `n` characters of `text` (char-boundary safe)
    pub fn char_prefix(
        text: &str,
        n: usize,
    ) -> &str
    {
        match text
            .char_indices()
            .nth(n)
        {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }
}

/// Lexical path helpers (no filesystem access)
pub struct PathUtils;

impl PathUtils
{
    /// Resolve `.` and `..` components without touching the disk
    pub fn normalize(path: &Path) -> PathBuf
    {
        let mut out = PathBuf::new();

        for comp in path.components()
        {
            match comp
            {
                Component::CurDir =>
                {}
                Component::ParentDir =>
                {
                    // Only pop real segments; keep leading `..` on relative paths
                    let popped = matches!(
                        out.components()
                            .next_back(),
                        Some(Component::Normal(_))
                    ) && out.pop();

                    if !popped && !out.has_root()
                    {
                        out.push("..");
                    }
                }
                other => out.push(other.as_os_str()),
            }
        }

        out
    }

    /// True when any component of `path` equals one of `excluded`
    pub fn in_excluded_dir(
        path: &Path,
        excluded: &[String],
    ) -> bool
    {
        path.components()
            .any(|c| match c
            {
                Component::Normal(seg) => excluded
                    .iter()
                    .any(|ex| seg == ex.as_str()),
                _ => false,
            })
    }

    /// Components of `path` below the deepest directory it shares with
    /// `anchor`: `/w/build/app/dist/b.js` against `/w/build/app/src`
    /// gives `dist/b.js`.
    pub fn below_common_ancestor(
        path: &Path,
        anchor: &Path,
    ) -> PathBuf
    {
        let mut rest = path.components();
        let mut shared = anchor.components();

        loop
        {
            let before = rest.clone();
            match (rest.next(), shared.next())
            {
                (Some(a), Some(b)) if a == b => continue,
                _ => return before.as_path().to_path_buf(),
            }
        }
    }

    /// Collapse the first directly repeated run of components:
    /// `/p/src/app/src/app/x.ts` -> `/p/src/app/x.ts`.
    /// Returns None when the path has no such repetition.
    pub fn collapse_repeated_segments(path: &Path) -> Option<PathBuf>
    {
        let comps: Vec<Component<'_>> = path
            .components()
            .collect();
        let n = comps.len();

        // Longest run first so `a/b/a/b` collapses as a pair, not per segment
        for width in (1..=n / 2).rev()
        {
            for start in 0..=n - 2 * width
            {
                let first = &comps[start..start + width];
                let second = &comps[start + width..start + 2 * width];

                let all_normal = first
                    .iter()
                    .all(|c| matches!(c, Component::Normal(_)));

                if all_normal && first == second
                {
                    let mut out = PathBuf::new();
                    for c in comps[..start + width]
                        .iter()
                        .chain(&comps[start + 2 * width..])
                    {
                        out.push(c.as_os_str());
                    }
                    return Some(out);
                }
            }
        }

        None
    }

    /// Forward-slash display form, stable across platforms
    pub fn display(path: &Path) -> String
    {
        path.to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn identifiers_skip_literal_contents_and_numbers()
    {
        let ids = TextUtils::identifiers("import { foo, $bar } from \"./baz qux\"; let n = 1e5;");
        assert_eq!(ids, vec!["import", "foo", "$bar", "from", "let", "n"]);
    }

    #[test]
    fn string_literals_are_unquoted()
    {
        let lits = TextUtils::string_literals("import a from './a'; import { b } from \"@x/b\";");
        assert_eq!(lits, vec!["./a", "@x/b"]);
    }

    #[test]
    fn strip_non_word_keeps_word_chars()
    {
        assert_eq!(TextUtils::strip_non_word("a(b, c) => { d_1; }"), "abcd_1");
    }

    #[test]
    fn char_prefix_is_boundary_safe()
    {
        assert_eq!(TextUtils::char_prefix("héllo", 2), "hé");
        assert_eq!(TextUtils::char_prefix("ab", 10), "ab");
    }

    #[test]
    fn normalize_resolves_dots()
    {
        assert_eq!(PathUtils::normalize(Path::new("/p/src/./a/../b.ts")), PathBuf::from("/p/src/b.ts"));
        assert_eq!(PathUtils::normalize(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(PathUtils::normalize(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn excluded_dirs_match_whole_components()
    {
        let ex = vec!["node_modules".to_string(), "dist".to_string()];
        assert!(PathUtils::in_excluded_dir(Path::new("/p/node_modules/lodash/index.js"), &ex));
        assert!(!PathUtils::in_excluded_dir(Path::new("/p/src/distance.ts"), &ex));
    }

    #[test]
    fn common_ancestor_is_stripped()
    {
        let got = PathUtils::below_common_ancestor(Path::new("/w/build/app/dist/b.js"), Path::new("/w/build/app/src"));
        assert_eq!(got, PathBuf::from("dist/b.js"));

        let inside = PathUtils::below_common_ancestor(Path::new("/w/build/app/src/b.ts"), Path::new("/w/build/app/src"));
        assert_eq!(inside, PathBuf::from("b.ts"));
        assert!(!PathUtils::in_excluded_dir(&inside, &["build".to_string()]));
    }

    #[test]
    fn repeated_segments_collapse()
    {
        assert_eq!(
            PathUtils::collapse_repeated_segments(Path::new("/p/src/app/src/app/x.ts")),
            Some(PathBuf::from("/p/src/app/x.ts"))
        );
        assert_eq!(
            PathUtils::collapse_repeated_segments(Path::new("/p/src/src/x.ts")),
            Some(PathBuf::from("/p/src/x.ts"))
        );
        assert_eq!(PathUtils::collapse_repeated_segments(Path::new("/p/src/app/x.ts")), None);
    }
}
