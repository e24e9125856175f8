use std::ops::Deref;

use serde::Serialize;

/// A byte offset within a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ByteOffset(u32);

impl ByteOffset {
    #[must_use]
    pub fn new(offset: u32) -> Self {
        Self(offset)
    }

    #[must_use]
    pub fn from_usize(offset: usize) -> Self {
        Self(u32::try_from(offset).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.0
    }
}

impl Deref for ByteOffset {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A line and column position within a text document.
///
/// Lines are 1-based to match both javac diagnostics and JDWP line
/// tables; columns are 0-based byte offsets from the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LineCol {
    line: u32,
    column: u32,
}

impl LineCol {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }
}

/// Byte offsets of line starts, computed once per document version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    length: u32,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut pos = 0;

        for c in text.chars() {
            pos += u32::try_from(c.len_utf8()).unwrap_or(0);
            if c == '\n' {
                line_starts.push(pos);
            }
        }

        Self {
            line_starts,
            length: pos,
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of a 1-based line, if it exists.
    #[must_use]
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line.checked_sub(1)? as usize).copied()
    }

    /// 1-based line number containing the given offset.
    #[must_use]
    pub fn to_line(&self, offset: ByteOffset) -> u32 {
        let line = match self.line_starts.binary_search(&offset.offset()) {
            Ok(exact) => exact,
            Err(0) => 0,
            Err(next) => next - 1,
        };
        u32::try_from(line).unwrap_or(u32::MAX) + 1
    }

    #[must_use]
    pub fn to_line_col(&self, offset: ByteOffset) -> LineCol {
        let line = self.to_line(offset);
        let line_start = self.line_starts[(line - 1) as usize];
        LineCol::new(line, offset.offset() - line_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_one_line() {
        let index = LineIndex::new("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.to_line(ByteOffset::new(0)), 1);
    }

    #[test]
    fn offsets_map_to_one_based_lines() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.to_line(ByteOffset::new(0)), 1);
        assert_eq!(index.to_line(ByteOffset::new(2)), 1);
        assert_eq!(index.to_line(ByteOffset::new(3)), 2);
        assert_eq!(index.to_line(ByteOffset::new(6)), 3);
        assert_eq!(index.to_line_col(ByteOffset::new(4)), LineCol::new(2, 1));
    }

    #[test]
    fn line_start_round_trips() {
        let index = LineIndex::new("x\ny\nz\n");
        assert_eq!(index.line_start(1), Some(0));
        assert_eq!(index.line_start(2), Some(2));
        assert_eq!(index.line_start(3), Some(4));
        assert_eq!(index.line_start(9), None);
    }
}
