//! Source index: one file's text, its newline index and its syntax tree.
//!
//! Provides the position <-> offset translation the locator and the
//! snippet extractor work with. Parsing errors are typed so the pipeline
//! can skip a single file without aborting the run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::infra::line_index::NewlineIndex;
use crate::parsers::syntax::{Position, SyntaxNode, TextRange};
use crate::parsers::typescript::{Dialect, parse_tree};

/// Why a file could not be turned into a syntax tree
#[derive(Debug, Error)]
pub enum ParseError
{
    #[error("source has syntax errors at {line}:{column}")]
    Syntax
    {
        line: usize,
        column: usize,
    },

    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("failed to load grammar: {0}")]
    Grammar(String),

    #[error("parser gave up before producing a tree")]
    Aborted,

    #[error("failed to read {}", path.display())]
    Read
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parsed view of one file version
#[derive(Debug)]
pub struct SourceIndex
{
    text: String,
    lines: NewlineIndex,
    root: SyntaxNode,
    dialect: Dialect,
}

impl SourceIndex
{
    /// Parse file text with the given grammar
    pub fn parse(
        text: impl Into<String>,
        dialect: Dialect,
    ) -> Result<Self, ParseError>
    {
        let text = text.into();
        let lines = NewlineIndex::build(text.as_bytes());
        let root = parse_tree(&text, dialect, &lines)?;

        Ok(Self { text, lines, root, dialect })
    }

    /// Read and parse a file, picking the grammar from its extension
    pub fn open(path: &Path) -> Result<Self, ParseError>
    {
        let dialect =
            Dialect::from_path(path).ok_or_else(|| ParseError::Unsupported(path.to_path_buf()))?;

        let text = std::fs::read_to_string(path)
            .map_err(|source| ParseError::Read { path: path.to_path_buf(), source })?;

        Self::parse(text, dialect)
    }

    pub fn text(&self) -> &str
    {
        &self.text
    }

    pub fn root(&self) -> &SyntaxNode
    {
        &self.root
    }

    pub fn dialect(&self) -> Dialect
    {
        self.dialect
    }

    pub fn lines(&self) -> &NewlineIndex
    {
        &self.lines
    }

    /// Byte offset of a 1-based line and 0-based column
    pub fn offset_at(
        &self,
        line: usize,
        column: usize,
    ) -> Option<usize>
    {
        self.lines
            .offset_at(line, column)
    }

    /// Whole text when `range` is None, else the slice between the two
    /// positions. Positions that do not map to a valid char-boundary slice
    /// yield an empty string.
    pub fn get_text(
        &self,
        range: Option<(Position, Position)>,
    ) -> &str
    {
        let Some((start, end)) = range
        else
        {
            return &self.text;
        };

        let (Some(lo), Some(hi)) =
            (self.offset_at(start.line, start.column), self.offset_at(end.line, end.column))
        else
        {
            return "";
        };

        if lo > hi
        {
            return "";
        }

        self.text
            .get(lo..hi)
            .unwrap_or("")
    }

    /// Source text covered by a byte range
    pub fn slice(
        &self,
        range: TextRange,
    ) -> &str
    {
        self.text
            .get(range.start..range.end)
            .unwrap_or("")
    }

    /// Source text of a node, empty for unlocated nodes
    pub fn node_text(
        &self,
        node: &SyntaxNode,
    ) -> &str
    {
        node.range
            .map(|r| self.slice(r))
            .unwrap_or("")
    }

    /// Top-level import declarations in source order
    pub fn imports(&self) -> Vec<&SyntaxNode>
    {
        self.root
            .children()
            .into_iter()
            .filter(|n| n.is_import())
            .collect()
    }
}
