//! Unified diff → changed line numbers in the post-change file.
//!
//! Line numbers are 1-based: a `+` line directly after the hunk header
//! `@@ -a,b +c,d @@` is line `c`. Context lines advance the counter,
//! removed lines and `\ No newline at end of file` markers do not.
//! Output keeps encounter order; no sorting or de-duplication happens
//! here (that is done per node by the locator).

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{trace, warn};

/// A 1-based line number in the post-change version of a file
pub type ChangedLine = usize;

/// `@@ -old[,n] +new[,n] @@` with optional counts
static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,\d+)? @@").expect("hunk header regex is valid")
});

/// One file's slice of a (possibly multi-file) diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDiff
{
    /// Post-change path as written in the diff (repo-relative)
    pub path: PathBuf,

    /// Raw diff text of this file section
    pub text: String,

    /// Added lines in the post-change file
    pub changed_lines: Vec<ChangedLine>,
}

/// Collect the post-change line numbers of every added line.
pub fn parse_diff(diff: &str) -> Vec<ChangedLine>
{
    let mut changed = Vec::new();

    // None until the first valid hunk header; file headers are not counted
    let mut next_line: Option<usize> = None;

    for line in diff.lines()
    {
        if line.starts_with("@@")
        {
            match parse_hunk_header(line)
            {
                Some(start) => next_line = Some(start),
                // Counter keeps running from the previous hunk
                None => warn!(header = line, "skipping malformed hunk header"),
            }
            continue;
        }

        let Some(current) = next_line.as_mut()
        else
        {
            continue;
        };

        match line
            .as_bytes()
            .first()
        {
            Some(b'+') if !line.starts_with("+++") =>
            {
                changed.push(*current);
                *current += 1;
            }
            Some(b'-') | Some(b'\\') =>
            {}
            _ => *current += 1,
        }
    }

    trace!(count = changed.len(), "parsed changed lines");
    changed
}

/// New-file start line from a hunk header
fn parse_hunk_header(line: &str) -> Option<usize>
{
    HUNK_HEADER
        .captures(line)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Split a combined diff into per-file sections and parse each.
/// Sections whose post-change side is `/dev/null` (deletions) are dropped.
pub fn split_by_file(diff: &str) -> Vec<FileDiff>
{
    let lines: Vec<&str> = diff
        .split_inclusive('\n')
        .collect();
    let has_git_headers = lines
        .iter()
        .any(|l| l.starts_with("diff --git "));

    let mut sections: Vec<Section> = Vec::new();

    for (i, raw) in lines
        .iter()
        .enumerate()
    {
        let line = raw.trim_end_matches(['\n', '\r']);

        // Plain unified diffs start a file at a `---`/`+++` pair
        let starts_file = if has_git_headers
        {
            line.starts_with("diff --git ")
        }
        else
        {
            line.starts_with("--- ")
                && lines
                    .get(i + 1)
                    .is_some_and(|next| next.starts_with("+++ "))
                && sections
                    .last()
                    .is_none_or(|s| s.seen_hunk)
        };

        if starts_file
        {
            let path = line
                .strip_prefix("diff --git ")
                .and_then(git_header_target);
            sections.push(Section { path, ..Section::default() });
        }

        let Some(section) = sections.last_mut()
        else
        {
            continue;
        };

        if !section.seen_hunk
            && let Some(target) = line.strip_prefix("+++ ")
        {
            section.path = Some(strip_side_prefix(target));
        }
        if line.starts_with("@@")
        {
            section.seen_hunk = true;
        }

        section
            .text
            .push_str(raw);
    }

    sections
        .into_iter()
        .filter_map(|s| {
            let path = s.path?;
            if path == "/dev/null"
            {
                return None;
            }
            Some(FileDiff {
                path: PathBuf::from(path),
                changed_lines: parse_diff(&s.text),
                text: s.text,
            })
        })
        .collect()
}

#[derive(Default)]
struct Section
{
    path: Option<String>,
    text: String,
    seen_hunk: bool,
}

/// `a/x b/y` → `y`
fn git_header_target(rest: &str) -> Option<String>
{
    rest.rfind(" b/")
        .map(|i| rest[i + 3..].to_string())
}

/// `b/src/x.ts\t<timestamp>` → `src/x.ts`
fn strip_side_prefix(target: &str) -> String
{
    let target = target
        .split('\t')
        .next()
        .unwrap_or(target)
        .trim();

    if target == "/dev/null"
    {
        return target.to_string();
    }

    target
        .strip_prefix("b/")
        .unwrap_or(target)
        .to_string()
}

#[cfg(test)]
mod tests
{
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_addition_between_context_lines()
    {
        let diff = "@@ -10,3 +10,4 @@\n line10\n+line11\n line12\n line13";
        assert_eq!(parse_diff(diff), vec![11]);
    }

    #[test]
    fn addition_right_after_header_is_header_line()
    {
        let diff = "@@ -1,2 +1,3 @@\n+first\n a\n b\n";
        assert_eq!(parse_diff(diff), vec![1]);
    }

    #[test]
    fn removed_lines_do_not_advance()
    {
        let diff = "@@ -5,4 +5,4 @@\n keep\n-old1\n-old2\n+new1\n+new2\n keep\n";
        assert_eq!(parse_diff(diff), vec![6, 7]);
    }

    #[test]
    fn multiple_hunks_reset_counter()
    {
        let diff = "--- a/x.ts\n+++ b/x.ts\n@@ -1,1 +1,2 @@\n a\n+b\n@@ -20,1 +21,2 @@\n c\n+d\n";
        assert_eq!(parse_diff(diff), vec![2, 22]);
    }

    #[test]
    fn no_hunks_no_lines()
    {
        assert!(parse_diff("diff --git a/x b/x\nindex 1..2\n+++ b/x\n").is_empty());
        assert!(parse_diff("").is_empty());
    }

    #[test]
    fn counts_may_be_omitted()
    {
        let diff = "@@ -3 +3 @@\n-x\n+y\n";
        assert_eq!(parse_diff(diff), vec![3]);
    }

    #[test]
    fn no_newline_marker_is_ignored()
    {
        let diff = "@@ -1,1 +1,2 @@\n-a\n\\ No newline at end of file\n+a\n+b\n";
        assert_eq!(parse_diff(diff), vec![1, 2]);
    }

    #[test]
    fn malformed_header_keeps_running_counter()
    {
        let diff = "@@ -1,1 +1,2 @@\n a\n@@ broken @@\n+b\n";
        // The malformed header itself counts for nothing
        assert_eq!(parse_diff(diff), vec![2]);
    }

    #[test]
    fn split_git_diff_by_file()
    {
        let diff = "diff --git a/src/a.ts b/src/a.ts\n\
                    index 111..222 100644\n\
                    --- a/src/a.ts\n\
                    +++ b/src/a.ts\n\
                    @@ -1,1 +1,2 @@\n \
                    x\n\
                    +y\n\
                    diff --git a/src/gone.ts b/src/gone.ts\n\
                    deleted file mode 100644\n\
                    --- a/src/gone.ts\n\
                    +++ /dev/null\n\
                    @@ -1,1 +0,0 @@\n\
                    -z\n\
                    diff --git a/src/b.ts b/src/b.ts\n\
                    --- a/src/b.ts\n\
                    +++ b/src/b.ts\n\
                    @@ -4,0 +5,1 @@\n\
                    +w\n";

        let files = split_by_file(diff);
        let paths: Vec<_> = files
            .iter()
            .map(|f| f.path.clone())
            .collect();

        assert_eq!(paths, vec![PathBuf::from("src/a.ts"), PathBuf::from("src/b.ts")]);
        assert_eq!(files[0].changed_lines, vec![2]);
        assert_eq!(files[1].changed_lines, vec![5]);
        assert!(files[0].text.starts_with("diff --git a/src/a.ts"));
    }

    #[test]
    fn split_plain_unified_diff()
    {
        let diff = "--- a/one.ts\t2024-01-01\n+++ b/one.ts\t2024-01-02\n@@ -1,1 +1,2 @@\n a\n+b\n\
                    --- a/two.ts\n+++ b/two.ts\n@@ -1,1 +1,1 @@\n--- not a header\n+c\n";

        let files = split_by_file(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, PathBuf::from("one.ts"));
        assert_eq!(files[1].path, PathBuf::from("two.ts"));
        assert_eq!(files[1].changed_lines, vec![1]);
    }

    /// Build a diff of pure-addition hunks and the line numbers they add
    fn additions_strategy() -> impl Strategy<Value = (String, Vec<usize>)>
    {
        prop::collection::vec((0usize..4, 1usize..4, 0usize..4), 1..5).prop_map(|hunks| {
            let mut diff = String::new();
            let mut expected = Vec::new();
            let mut start = 1usize;

            for (lead, adds, trail) in hunks
            {
                diff.push_str(&format!(
                    "@@ -{start},{} +{start},{} @@\n",
                    lead + trail,
                    lead + adds + trail
                ));
                for _ in 0..lead
                {
                    diff.push_str(" ctx\n");
                }
                for k in 0..adds
                {
                    diff.push_str("+added\n");
                    expected.push(start + lead + k);
                }
                for _ in 0..trail
                {
                    diff.push_str(" ctx\n");
                }
                // Leave a gap so hunks never overlap
                start += lead + adds + trail + 10;
            }

            (diff, expected)
        })
    }

    proptest! {
        #[test]
        fn pure_additions_yield_ascending_added_lines((diff, expected) in additions_strategy())
        {
            let got = parse_diff(&diff);
            prop_assert_eq!(&got, &expected);
            prop_assert!(got.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn pure_deletions_yield_nothing(
            start in 1usize..500,
            ctx in 0usize..5,
            dels in 1usize..8,
        )
        {
            let mut diff = format!("@@ -{start},{} +{start},{ctx} @@\n", ctx + dels);
            for _ in 0..ctx
            {
                diff.push_str(" same\n");
            }
            for _ in 0..dels
            {
                diff.push_str("-gone\n");
            }
            prop_assert!(parse_diff(&diff).is_empty());
        }
    }
}
