//! Located node -> literal source text.

use crate::core::locate::EnclosingMatch;
use crate::core::source::SourceIndex;
use crate::parsers::syntax::SyntaxNode;

/// Source text of a node, sliced through its line/column location.
/// Unlocated nodes yield an empty string.
pub fn extract_text(
    node: &SyntaxNode,
    index: &SourceIndex,
) -> String
{
    node.loc
        .map(|loc| {
            index
                .get_text(Some((loc.start, loc.end)))
                .to_string()
        })
        .unwrap_or_default()
}

/// Searchable form of a node: `"<label>[ <name>]\n<text>"`.
/// The root renders as `whole file ...`, imports as `import ...`.
pub fn render_node(
    node: &SyntaxNode,
    index: &SourceIndex,
) -> String
{
    let text = index.node_text(node);
    match &node.name
    {
        Some(name) => format!("{} {}\n{}", node.label(), name, text),
        None => format!("{}\n{}", node.label(), text),
    }
}

/// Texts of all matches, empty extractions dropped
pub fn extract_all(
    matches: &[EnclosingMatch<'_>],
    index: &SourceIndex,
) -> Vec<String>
{
    matches
        .iter()
        .map(|m| extract_text(m.node, index))
        .filter(|text| !text.is_empty())
        .collect()
}
