//! Smallest-enclosing-node search.
//!
//! Descent follows statement structure only: containers recurse into
//! their statements, functions into their block body, `if` into its
//! branches, named exports into the wrapped declaration and classes into
//! their members. Every other kind is a leaf for this search, so the
//! answer is the innermost *statement-level* unit around an offset.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::core::diff::ChangedLine;
use crate::core::source::SourceIndex;
use crate::parsers::syntax::{NodeId, NodeKind, SyntaxNode};

/// A changed line and the node that minimally contains it
#[derive(Debug, Clone, Copy)]
pub struct EnclosingMatch<'a>
{
    pub line: ChangedLine,
    pub node: &'a SyntaxNode,
}

/// Deepest node along the descent rules whose range contains `offset`.
/// Returns None when `node` itself does not contain the offset (or is
/// unlocated).
pub fn find_enclosing_node(
    node: &SyntaxNode,
    offset: usize,
) -> Option<&SyntaxNode>
{
    if !node.contains_offset(offset)
    {
        return None;
    }

    // First child that contains the offset wins
    let inner = descent_children(node)
        .into_iter()
        .find_map(|child| find_enclosing_node(child, offset));

    Some(inner.unwrap_or(node))
}

/// Children considered by the search, per node kind
fn descent_children(node: &SyntaxNode) -> Vec<&SyntaxNode>
{
    match &node.kind
    {
        NodeKind::Program { body } | NodeKind::Block { body } => body
            .iter()
            .collect(),
        NodeKind::Function { body, .. } => match &body.kind
        {
            NodeKind::Block { body: statements } => statements
                .iter()
                .collect(),
            // Expression-bodied arrows stop here
            _ => Vec::new(),
        },
        NodeKind::If { consequent, alternate, .. } => std::iter::once(consequent.as_ref())
            .chain(
                alternate
                    .as_deref()
                    .into_iter(),
            )
            .collect(),
        NodeKind::ExportNamed { declaration, .. } => declaration
            .as_deref()
            .into_iter()
            .collect(),
        NodeKind::Class { members, .. } => members
            .iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Enclosing node for each changed line, in line order, de-duplicated by
/// node identity. The program root and import declarations are never
/// returned.
#[instrument(level = "debug", skip_all, fields(lines = lines.len()))]
pub fn find_enclosing_nodes<'a>(
    root: &'a SyntaxNode,
    lines: &[ChangedLine],
    index: &SourceIndex,
) -> Vec<EnclosingMatch<'a>>
{
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut out = Vec::new();

    for &line in lines
    {
        // Start of the line, column 0
        let Some(offset) = index.offset_at(line, 0)
        else
        {
            debug!(line, "changed line is past end of file");
            continue;
        };

        let Some(node) = find_enclosing_node(root, offset)
        else
        {
            continue;
        };

        if node.is_program() || node.is_import() || !seen.insert(node.id)
        {
            continue;
        }

        out.push(EnclosingMatch { line, node });
    }

    out
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::diff::parse_diff;
    use crate::parsers::typescript::Dialect;
    use proptest::prelude::*;

    const FILE: &str = "\
import { helper } from \"./helper\";
import type { Opts } from \"./opts\";

const LIMIT = 10;

// running total
let total = 0;
export function accumulate(values: number[], opts: Opts) {
  let sum = 0;
  const scaled = values.map((v) => helper(v));
  sum = scaled.reduce((a, b) => a + b, 0);
  total += sum;
  report(opts);
  return sum > LIMIT ? LIMIT : sum;
}

class Counter {
  count = 0;
  bump() {
    this.count += 1;
  }
}

if (total > 0) {
  console.log(total);
} else {
  console.log(\"none\");
}
";

    fn index() -> SourceIndex
    {
        SourceIndex::parse(FILE, Dialect::TypeScript).expect("fixture parses")
    }

    #[test]
    fn diff_inside_function_maps_to_function()
    {
        let idx = index();
        let diff = "@@ -10,3 +10,4 @@\n   const scaled = values.map((v) => helper(v));\n+  sum = scaled.reduce((a, b) => a + b, 0);\n   total += sum;\n   report(opts);";
        let lines = parse_diff(diff);
        assert_eq!(lines, vec![11]);

        let found = find_enclosing_nodes(idx.root(), &lines, &idx);
        assert_eq!(found.len(), 1);

        let loc = found[0]
            .node
            .loc
            .expect("located");
        assert_eq!(loc.start.line, 8);
        assert_eq!(loc.end.line, 15);
        assert_eq!(found[0].node.name.as_deref(), Some("accumulate"));
    }

    #[test]
    fn lines_in_same_node_are_deduplicated()
    {
        let idx = index();
        let found = find_enclosing_nodes(idx.root(), &[9, 10, 11, 13], &idx);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 9);
    }

    #[test]
    fn import_and_blank_root_lines_are_excluded()
    {
        let idx = index();
        // 1-2 imports, 3 blank line between statements (root)
        let found = find_enclosing_nodes(idx.root(), &[1, 2, 3], &idx);
        assert!(found.is_empty());
    }

    #[test]
    fn top_level_statement_is_its_own_unit()
    {
        let idx = index();
        let found = find_enclosing_nodes(idx.root(), &[4], &idx);
        assert_eq!(found.len(), 1);
        assert_eq!(idx.node_text(found[0].node), "const LIMIT = 10;");
    }

    #[test]
    fn class_members_are_found()
    {
        let idx = index();
        // Inside the method body: methods are leaves for the search
        let member = find_enclosing_nodes(idx.root(), &[20], &idx);
        assert_eq!(member[0].node.name.as_deref(), Some("bump"));

        // Blank line between members lands on the class itself
        let text = "class K {\n  a = 1;\n\n  b = 2;\n}\n";
        let idx = SourceIndex::parse(text, Dialect::TypeScript).expect("parse");
        let found = find_enclosing_nodes(idx.root(), &[3], &idx);
        assert_eq!(found[0].node.name.as_deref(), Some("K"));
    }

    #[test]
    fn if_branches_are_descended()
    {
        let idx = index();
        let found = find_enclosing_nodes(idx.root(), &[26, 28], &idx);
        assert_eq!(found.len(), 2);
        assert!(
            found
                .iter()
                .all(|m| matches!(m.node.kind, NodeKind::Block { .. }))
        );
    }

    #[test]
    fn lines_past_end_are_ignored()
    {
        let idx = index();
        assert!(find_enclosing_nodes(idx.root(), &[10_000], &idx).is_empty());
    }

    #[test]
    fn offset_outside_root_is_none()
    {
        let idx = index();
        assert!(find_enclosing_node(idx.root(), FILE.len() + 5).is_none());
    }

    proptest! {
        #[test]
        fn located_node_contains_offset_and_is_stable(offset in 0usize..FILE.len())
        {
            let idx = index();
            let first = find_enclosing_node(idx.root(), offset);
            let second = find_enclosing_node(idx.root(), offset);

            let node = first.expect("root contains every in-file offset");
            prop_assert!(node.contains_offset(offset));
            prop_assert_eq!(Some(node), second);
        }

        #[test]
        fn batch_never_returns_root_or_import(lines in prop::collection::vec(0usize..40, 0..20))
        {
            let idx = index();
            let found = find_enclosing_nodes(idx.root(), &lines, &idx);

            let mut ids = HashSet::new();
            for m in &found
            {
                prop_assert!(!m.node.is_program());
                prop_assert!(!m.node.is_import());
                prop_assert!(ids.insert(m.node.id));
            }
        }
    }
}
