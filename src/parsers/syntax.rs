//! Owned syntax tree for one version of one file.
//!
//! Trees are produced by lowering a tree-sitter parse (see `typescript.rs`)
//! into a closed set of node kinds. Each kind carries exactly the children
//! the structural passes need (statement lists, function bodies, branches,
//! class members), so the locator can pattern-match instead of probing
//! grammar field names at runtime.
//!
//! Notes
//! - Lines are 1-based, columns are 0-based byte offsets within the line.
//! - `TextRange` is inclusive of both ends for containment queries,
//!   exclusive at `end` for slicing.
//! - Node ids are assigned in pre-order and are unique within one tree.

use serde::Serialize;

/// Identity of a node within one parsed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Byte span of a node in the file text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextRange
{
    pub start: usize,
    pub end: usize,
}

impl TextRange
{
    pub fn new(
        start: usize,
        end: usize,
    ) -> Self
    {
        Self { start, end }
    }

    /// True when `offset` lies within `start..=end`
    pub fn contains(
        &self,
        offset: usize,
    ) -> bool
    {
        self.start <= offset && offset <= self.end
    }

    pub fn len(&self) -> usize
    {
        self.end
            .saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

/// A line/column pair (1-based line, 0-based byte column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position
{
    pub line: usize,
    pub column: usize,
}

impl Position
{
    pub fn new(
        line: usize,
        column: usize,
    ) -> Self
    {
        Self { line, column }
    }
}

/// Start/end positions of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation
{
    pub start: Position,
    pub end: Position,
}

/// The three function shapes that share descent rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionFlavor
{
    /// `function f() {}`
    Declaration,

    /// `const f = function () {}`
    Expression,

    /// `const f = () => {}`
    Arrow,
}

/// Closed set of node kinds with their structural children
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind
{
    /// Whole file
    Program
    {
        body: Vec<SyntaxNode>,
    },

    /// `{ ... }` statement block
    Block
    {
        body: Vec<SyntaxNode>,
    },

    /// Function-like node; `head` holds name, parameters and annotations
    Function
    {
        flavor: FunctionFlavor,
        head: Vec<SyntaxNode>,
        body: Box<SyntaxNode>,
    },

    /// `if (condition) consequent else alternate`
    If
    {
        condition: Box<SyntaxNode>,
        consequent: Box<SyntaxNode>,
        alternate: Option<Box<SyntaxNode>>,
    },

    /// `export <declaration>` or `export { a, b } from "m"`
    ExportNamed
    {
        declaration: Option<Box<SyntaxNode>>,
        rest: Vec<SyntaxNode>,
    },

    /// Class declaration; `head` holds name and heritage clauses
    Class
    {
        head: Vec<SyntaxNode>,
        members: Vec<SyntaxNode>,
    },

    /// `import ... from "m"`
    Import
    {
        children: Vec<SyntaxNode>,
    },

    Identifier,

    StringLiteral,

    /// Everything else, tagged with the grammar kind
    Other
    {
        kind: String,
        children: Vec<SyntaxNode>,
    },
}

/// A node in a parsed file's syntax tree
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode
{
    /// Pre-order identity within the tree
    pub id: NodeId,

    /// Kind plus structural children
    pub kind: NodeKind,

    /// Byte span; `None` marks an unlocated node
    pub range: Option<TextRange>,

    /// Line/column span derived from `range`
    pub loc: Option<SourceLocation>,

    /// Declared name, when the node declares one
    pub name: Option<String>,
}

impl SyntaxNode
{
    /// Build an unlocated, unnamed node
    pub fn new(
        id: NodeId,
        kind: NodeKind,
    ) -> Self
    {
        Self { id, kind, range: None, loc: None, name: None }
    }

    pub fn is_program(&self) -> bool
    {
        matches!(self.kind, NodeKind::Program { .. })
    }

    pub fn is_import(&self) -> bool
    {
        matches!(self.kind, NodeKind::Import { .. })
    }

    /// True when the node is located and its range covers `offset`
    pub fn contains_offset(
        &self,
        offset: usize,
    ) -> bool
    {
        self.range
            .is_some_and(|r| r.contains(offset))
    }

    /// Short human label used as the head of the serialized form
    pub fn label(&self) -> &str
    {
        match &self.kind
        {
            NodeKind::Program { .. } => "whole file",
            NodeKind::Block { .. } => "block",
            NodeKind::Function { flavor, .. } => match flavor
            {
                FunctionFlavor::Declaration => "function",
                FunctionFlavor::Expression => "function expression",
                FunctionFlavor::Arrow => "arrow function",
            },
            NodeKind::If { .. } => "if",
            NodeKind::ExportNamed { .. } => "export",
            NodeKind::Class { .. } => "class",
            NodeKind::Import { .. } => "import",
            NodeKind::Identifier => "identifier",
            NodeKind::StringLiteral => "string",
            NodeKind::Other { kind, .. } => kind.as_str(),
        }
    }

    /// Direct children in source order
    pub fn children(&self) -> Vec<&SyntaxNode>
    {
        match &self.kind
        {
            NodeKind::Program { body } | NodeKind::Block { body } => body
                .iter()
                .collect(),
            NodeKind::Function { head, body, .. } => head
                .iter()
                .chain(std::iter::once(body.as_ref()))
                .collect(),
            NodeKind::If { condition, consequent, alternate } =>
            {
                let mut out = vec![condition.as_ref(), consequent.as_ref()];
                if let Some(alt) = alternate
                {
                    out.push(alt.as_ref());
                }
                out
            }
            NodeKind::ExportNamed { declaration, rest } => declaration
                .iter()
                .map(|d| d.as_ref())
                .chain(rest.iter())
                .collect(),
            NodeKind::Class { head, members } => head
                .iter()
                .chain(members.iter())
                .collect(),
            NodeKind::Import { children } | NodeKind::Other { children, .. } => children
                .iter()
                .collect(),
            NodeKind::Identifier | NodeKind::StringLiteral => Vec::new(),
        }
    }

    /// Pre-order traversal starting at (and including) this node
    pub fn descendants(&self) -> Preorder<'_>
    {
        Preorder { stack: vec![self] }
    }
}

/// Pre-order iterator over a subtree
pub struct Preorder<'a>
{
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Preorder<'a>
{
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item>
    {
        let node = self
            .stack
            .pop()?;

        // Push in reverse so the first child is visited next
        self.stack
            .extend(
                node.children()
                    .into_iter()
                    .rev(),
            );

        Some(node)
    }
}
