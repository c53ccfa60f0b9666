//! Newline index for line/column <-> byte offset translation.
//!
//! Goals
//! - Single pass over bytes to record '\n' positions.
//! - 1-based external line numbers, 0-based byte columns.
//! - O(1) line→byte start via the index.
//! - Binary search for byte→line mapping.
//!
//! Notes
//! - An empty buffer has 1 (empty) line so that line 1 column 0 is
//!   always addressable.
//! - A buffer ending in '\n' has a final empty line after it.
//! - '\r' is treated as ordinary line content; offsets stay exact for CRLF
//!   files because only '\n' separates lines.

use crate::parsers::syntax::Position;

#[derive(Debug, Clone)]
pub struct NewlineIndex
{
    /// Byte positions of every '\n' in the buffer.
    nl_positions: Vec<usize>,
    /// Total byte length of the buffer.
    len: usize,
}

impl NewlineIndex
{
    /// Build an index recording positions of '\n'.
    pub fn build(bytes: &[u8]) -> Self
    {
        let mut nl_positions = Vec::with_capacity(bytes.len() / 48);
        let mut i = 0usize;

        // Single pass; record every '\n' offset.
        while let Some(pos) = memchr::memchr(b'\n', &bytes[i..])
        {
            let abs = i + pos;
            nl_positions.push(abs);
            i = abs + 1;
        }

        Self { nl_positions, len: bytes.len() }
    }

    /// Total number of logical lines (#'\n' + 1).
    pub fn line_count(&self) -> usize
    {
        self.nl_positions
            .len()
            + 1
    }

    /// Total byte length of the indexed buffer.
    pub fn len(&self) -> usize
    {
        self.len
    }

    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    /// Start byte (inclusive) of a 1-based line.
    /// Returns None if line is out of range.
    pub fn start_byte_of_line(
        &self,
        line1: usize,
    ) -> Option<usize>
    {
        if line1 == 0 || line1 > self.line_count()
        {
            return None;
        }
        if line1 == 1
        {
            return Some(0);
        }
        // For line L>1, start is one past the previous '\n'.
        self.nl_positions
            .get(line1 - 2)
            .map(|&prev_nl| prev_nl + 1)
    }

    /// Byte offset of a line/column pair: the lengths of all prior lines
    /// (each plus its separator) plus the column.
    /// Returns None if the line is out of range.
    pub fn offset_at(
        &self,
        line1: usize,
        column: usize,
    ) -> Option<usize>
    {
        self.start_byte_of_line(line1)
            .map(|start| start + column)
    }

    /// 1-based line number covering the given byte offset.
    /// Offsets at '\n' belong to the line the '\n' terminates.
    pub fn line_of_byte(
        &self,
        byte: usize,
    ) -> usize
    {
        // Count how many '\n' are strictly before `byte`.
        let idx = match self
            .nl_positions
            .binary_search(&byte)
        {
            Ok(pos) => pos,  // at NL → still the terminated line
            Err(pos) => pos, // number of NLs before `byte`
        };
        idx + 1
    }

    /// Line/column position of a byte offset.
    pub fn position_of(
        &self,
        byte: usize,
    ) -> Position
    {
        let byte = byte.min(self.len);
        let line = self.line_of_byte(byte);

        // Start is always present for a line computed from the index
        let start = self
            .start_byte_of_line(line)
            .unwrap_or(0);

        Position::new(line, byte - start)
    }
}
