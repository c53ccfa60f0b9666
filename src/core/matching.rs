//! Fuzzy relocation of seed snippets inside source text.
//!
//! Seeds come back from a text generator, so whitespace and formatting
//! may differ from the file. Strategies are tried in order, each a pure
//! `(candidate, seed) -> bool`. This is best-effort: heavily duplicated
//! code can match the wrong node.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::infra::utils::TextUtils;

/// A single text-matching rule
pub type MatchStrategy = fn(&str, &str) -> bool;

/// Ordered strategies, strictest first
pub const MATCH_STRATEGIES: [(&str, MatchStrategy); 3] = [
    ("exact", exact_substring),
    ("word-chars", word_char_substring),
    ("minified", minified_substring),
];

/// Name of the first strategy under which `candidate` contains `seed`
pub fn match_seed(
    candidate: &str,
    seed: &str,
) -> Option<&'static str>
{
    MATCH_STRATEGIES
        .iter()
        .find(|(_, strategy)| strategy(candidate, seed))
        .map(|(name, _)| *name)
}

/// Plain substring match
pub fn exact_substring(
    candidate: &str,
    seed: &str,
) -> bool
{
    !seed.is_empty() && candidate.contains(seed)
}

/// Substring match after dropping every non-word character on both sides
pub fn word_char_substring(
    candidate: &str,
    seed: &str,
) -> bool
{
    let seed = TextUtils::strip_non_word(seed);
    !seed.is_empty() && TextUtils::strip_non_word(candidate).contains(&seed)
}

/// Substring match after minifying both sides
pub fn minified_substring(
    candidate: &str,
    seed: &str,
) -> bool
{
    let seed = minimize_code(seed);
    !seed.is_empty() && minimize_code(candidate).contains(&seed)
}

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("comment regex is valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace regex is valid"));

static PUNCT_PADDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{};=()>,])\s*").expect("punctuation regex is valid"));

static SIMPLE_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+(\w+)\s*\(([^)]*)\)\s*\{([^}]*)\}").expect("function regex is valid")
});

static LEADING_RETURN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"return\s+").expect("return regex is valid"));

/// Strip comments and redundant whitespace, and rewrite simple
/// `function f(a){return b}` declarations as `f=a=>b`.
pub fn minimize_code(code: &str) -> String
{
    let code = COMMENTS.replace_all(code, "");
    let code = WHITESPACE_RUN.replace_all(&code, " ");
    let code = PUNCT_PADDING.replace_all(&code, "$1");
    let code = SIMPLE_FUNCTION.replace_all(&code, |caps: &Captures<'_>| {
        let body = LEADING_RETURN.replace(caps[3].trim(), "");
        format!("{}={}=>{}", &caps[1], caps[2].trim(), body)
    });

    code.trim()
        .to_string()
}
