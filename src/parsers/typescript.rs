//! Filepath: src/parsers/typescript.rs
//! Lowers a tree-sitter TypeScript/JavaScript parse into the owned
//! `SyntaxNode` tree. Only named, non-extra nodes are kept (comments are
//! dropped), every node gets a pre-order id, a byte range and a
//! line/column location derived from the file's newline index.

use std::path::Path;

use tree_sitter::{Language, Node, Parser};

use crate::core::source::ParseError;
use crate::infra::line_index::NewlineIndex;
use crate::parsers::syntax::{
    FunctionFlavor, NodeId, NodeKind, SourceLocation, SyntaxNode, TextRange,
};

/// Grammar flavor selected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect
{
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect
{
    /// Map file extensions to a grammar
    pub fn from_path(path: &Path) -> Option<Self>
    {
        let ext = path
            .extension()?
            .to_str()?
            .to_lowercase();

        match ext.as_str()
        {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    fn language(self) -> Language
    {
        match self
        {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

/// Parse `text` and lower it into an owned tree.
/// Fails with `ParseError::Syntax` at the first error or missing node.
pub fn parse_tree(
    text: &str,
    dialect: Dialect,
    lines: &NewlineIndex,
) -> Result<SyntaxNode, ParseError>
{
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.language())
        .map_err(|e| ParseError::Grammar(e.to_string()))?;

    let tree = parser
        .parse(text, None)
        .ok_or(ParseError::Aborted)?;
    let root = tree.root_node();

    if root.has_error()
    {
        // Report the first offending node, or the root if none is isolated
        let at = first_error(root).unwrap_or(root);
        let p = lines.position_of(at.start_byte());
        return Err(ParseError::Syntax { line: p.line, column: p.column });
    }

    let mut lowering = Lowering { src: text.as_bytes(), lines, next_id: 0 };
    let mut program = lowering.lower(root);

    // The program always spans the whole text, including surrounding trivia
    let full = TextRange::new(0, text.len());
    program.range = Some(full);
    program.loc = Some(lowering.location(full));

    Ok(program)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>>
{
    let mut cursor = node.walk();
    for child in node.children(&mut cursor)
    {
        if child.is_error() || child.is_missing()
        {
            return Some(child);
        }
        if child.has_error()
        {
            return first_error(child).or(Some(child));
        }
    }
    None
}

struct Lowering<'a>
{
    src: &'a [u8],
    lines: &'a NewlineIndex,
    next_id: u32,
}

impl<'a> Lowering<'a>
{
    fn lower(
        &mut self,
        node: Node<'_>,
    ) -> SyntaxNode
    {
        // Ids are handed out before children are lowered (pre-order)
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let kind = match node.kind()
        {
            "program" => NodeKind::Program { body: self.lower_children(node) },
            "statement_block" => NodeKind::Block { body: self.lower_children(node) },
            "function_declaration" | "generator_function_declaration" =>
            {
                self.lower_function(node, FunctionFlavor::Declaration)
            }
            "function_expression" | "function" | "generator_function" =>
            {
                self.lower_function(node, FunctionFlavor::Expression)
            }
            "arrow_function" => self.lower_function(node, FunctionFlavor::Arrow),
            "if_statement" => self.lower_if(node),
            "export_statement" => self.lower_export(node),
            "class_declaration" | "abstract_class_declaration" | "class" => self.lower_class(node),
            "import_statement" => NodeKind::Import { children: self.lower_children(node) },
            "identifier"
            | "type_identifier"
            | "property_identifier"
            | "shorthand_property_identifier"
            | "shorthand_property_identifier_pattern" => NodeKind::Identifier,
            "string" | "template_string" => NodeKind::StringLiteral,
            other => self.other(node, other),
        };

        let range = TextRange::new(node.start_byte(), node.end_byte());

        SyntaxNode {
            id,
            kind,
            range: Some(range),
            loc: Some(self.location(range)),
            name: self.name_of(node),
        }
    }

    fn location(
        &self,
        range: TextRange,
    ) -> SourceLocation
    {
        SourceLocation {
            start: self
                .lines
                .position_of(range.start),
            end: self
                .lines
                .position_of(range.end),
        }
    }

    fn other(
        &mut self,
        node: Node<'_>,
        kind: &str,
    ) -> NodeKind
    {
        NodeKind::Other { kind: kind.to_string(), children: self.lower_children(node) }
    }

    /// Lower all named, non-extra children in order
    fn lower_children(
        &mut self,
        node: Node<'_>,
    ) -> Vec<SyntaxNode>
    {
        self.lower_children_except(node, None)
    }

    fn lower_children_except(
        &mut self,
        node: Node<'_>,
        skip: Option<usize>,
    ) -> Vec<SyntaxNode>
    {
        let mut cursor = node.walk();
        let kept: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|c| !c.is_extra() && Some(c.id()) != skip)
            .collect();

        kept.into_iter()
            .map(|c| self.lower(c))
            .collect()
    }

    fn lower_function(
        &mut self,
        node: Node<'_>,
        flavor: FunctionFlavor,
    ) -> NodeKind
    {
        // Bodiless shapes (overload signatures) are not function-like for descent
        let Some(body) = node.child_by_field_name("body")
        else
        {
            return self.other(node, node.kind());
        };

        let head = self.lower_children_except(node, Some(body.id()));
        let body = Box::new(self.lower(body));

        NodeKind::Function { flavor, head, body }
    }

    fn lower_if(
        &mut self,
        node: Node<'_>,
    ) -> NodeKind
    {
        let (Some(condition), Some(consequent)) = (
            node.child_by_field_name("condition"),
            node.child_by_field_name("consequence"),
        )
        else
        {
            return self.other(node, node.kind());
        };

        let condition = Box::new(self.lower(condition));
        let consequent = Box::new(self.lower(consequent));

        // `else_clause` wraps the alternate statement; descend through it
        let alternate = node
            .child_by_field_name("alternative")
            .and_then(|clause| {
                if clause.kind() == "else_clause"
                {
                    let mut cursor = clause.walk();
                    let inner = clause
                        .named_children(&mut cursor)
                        .find(|c| !c.is_extra());
                    inner
                }
                else
                {
                    Some(clause)
                }
            })
            .map(|alt| Box::new(self.lower(alt)));

        NodeKind::If { condition, consequent, alternate }
    }

    fn lower_export(
        &mut self,
        node: Node<'_>,
    ) -> NodeKind
    {
        // `export default ...` is not a named export
        let mut cursor = node.walk();
        let is_default = node
            .children(&mut cursor)
            .any(|c| c.kind() == "default");
        if is_default
        {
            return self.other(node, node.kind());
        }

        match node.child_by_field_name("declaration")
        {
            Some(decl) =>
            {
                let decl_id = decl.id();
                let declaration = Some(Box::new(self.lower(decl)));
                let rest = self.lower_children_except(node, Some(decl_id));
                NodeKind::ExportNamed { declaration, rest }
            }
            None => NodeKind::ExportNamed { declaration: None, rest: self.lower_children(node) },
        }
    }

    fn lower_class(
        &mut self,
        node: Node<'_>,
    ) -> NodeKind
    {
        let Some(body) = node.child_by_field_name("body")
        else
        {
            return self.other(node, node.kind());
        };

        let head = self.lower_children_except(node, Some(body.id()));
        let members = self.lower_children(body);

        NodeKind::Class { head, members }
    }

    /// Declared name of a node, if it declares one
    fn name_of(
        &self,
        node: Node<'_>,
    ) -> Option<String>
    {
        if let Some(n) = node.child_by_field_name("name")
        {
            return self.text_of(n);
        }

        match node.kind()
        {
            "identifier" | "type_identifier" | "property_identifier" => self.text_of(node),
            // `const a = ...` names the statement after its first declarator
            "lexical_declaration" | "variable_declaration" =>
            {
                let mut cursor = node.walk();
                let declarator = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "variable_declarator")?;
                self.name_of(declarator)
            }
            "export_statement" => node
                .child_by_field_name("declaration")
                .and_then(|d| self.name_of(d)),
            _ => None,
        }
    }

    fn text_of(
        &self,
        node: Node<'_>,
    ) -> Option<String>
    {
        node.utf8_text(self.src)
            .ok()
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn parse(text: &str) -> SyntaxNode
    {
        let lines = NewlineIndex::build(text.as_bytes());
        parse_tree(text, Dialect::TypeScript, &lines).expect("parse")
    }

    #[test]
    fn dialect_from_extension()
    {
        assert_eq!(Dialect::from_path(Path::new("a.ts")), Some(Dialect::TypeScript));
        assert_eq!(Dialect::from_path(Path::new("a.tsx")), Some(Dialect::Tsx));
        assert_eq!(Dialect::from_path(Path::new("a.mjs")), Some(Dialect::JavaScript));
        assert_eq!(Dialect::from_path(Path::new("a.rs")), None);
    }

    #[test]
    fn lowers_top_level_shapes()
    {
        let root = parse(
            "import { a } from \"./a\";\n\
             export function f(x: number) {\n  return a(x);\n}\n\
             class C {\n  m() {}\n}\n",
        );

        let NodeKind::Program { body } = &root.kind
        else
        {
            panic!("expected program");
        };
        assert_eq!(body.len(), 3);
        assert!(body[0].is_import());
        assert!(matches!(body[1].kind, NodeKind::ExportNamed { declaration: Some(_), .. }));
        assert_eq!(body[1].name.as_deref(), Some("f"));
        assert!(matches!(body[2].kind, NodeKind::Class { .. }));
        assert_eq!(body[2].name.as_deref(), Some("C"));
    }

    #[test]
    fn ids_are_preorder_and_unique()
    {
        let root = parse("function f() { if (a) { b(); } else { c(); } }\n");
        let ids: Vec<u32> = root
            .descendants()
            .map(|n| n.id.0)
            .collect();
        let expected: Vec<u32> = (0..ids.len() as u32).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn else_clause_is_unwrapped()
    {
        let root = parse("if (a) { b(); } else { c(); }\n");
        let stmt = root
            .descendants()
            .find(|n| matches!(n.kind, NodeKind::If { .. }))
            .expect("if");
        let NodeKind::If { alternate: Some(alt), .. } = &stmt.kind
        else
        {
            panic!("expected alternate");
        };
        assert!(matches!(alt.kind, NodeKind::Block { .. }));
    }

    #[test]
    fn variable_statements_take_declarator_name()
    {
        let root = parse("const handler = () => 1;\n");
        let NodeKind::Program { body } = &root.kind
        else
        {
            panic!("expected program");
        };
        assert_eq!(body[0].name.as_deref(), Some("handler"));
    }

    #[test]
    fn default_export_is_not_named_export()
    {
        let root = parse("export default function () {}\n");
        let NodeKind::Program { body } = &root.kind
        else
        {
            panic!("expected program");
        };
        assert!(matches!(&body[0].kind, NodeKind::Other { kind, .. } if kind == "export_statement"));
    }

    #[test]
    fn syntax_errors_are_reported_with_position()
    {
        let text = "function f( {\n";
        let lines = NewlineIndex::build(text.as_bytes());
        let err = parse_tree(text, Dialect::TypeScript, &lines).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
