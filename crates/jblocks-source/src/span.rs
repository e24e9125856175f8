use serde::Serialize;

use crate::position::ByteOffset;
use crate::position::LineCol;
use crate::LineIndex;

/// A half-open byte range within a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    start: u32,
    length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn from_parts(start: usize, length: usize) -> Self {
        let start_u32 = u32::try_from(start).unwrap_or(u32::MAX);
        let length_u32 = u32::try_from(length).unwrap_or(u32::MAX.saturating_sub(start_u32));
        Span::new(start_u32, length_u32)
    }

    /// Construct a span from integer bounds expressed as byte offsets.
    #[must_use]
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self::from_parts(start, end.saturating_sub(start))
    }

    #[must_use]
    pub fn start(self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn start_usize(self) -> usize {
        self.start as usize
    }

    #[must_use]
    pub fn end(self) -> u32 {
        self.start + self.length
    }

    #[must_use]
    pub fn end_usize(self) -> usize {
        self.end() as usize
    }

    #[must_use]
    pub fn length(self) -> u32 {
        self.length
    }

    #[must_use]
    pub fn start_offset(&self) -> ByteOffset {
        ByteOffset::new(self.start)
    }

    #[must_use]
    pub fn end_offset(&self) -> ByteOffset {
        ByteOffset::new(self.start.saturating_add(self.length))
    }

    /// Whether `other` lies entirely inside this span.
    #[must_use]
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end() <= self.end()
    }

    #[must_use]
    pub fn contains_offset(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end()
    }

    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start_usize()..self.end_usize()]
    }

    /// Convert this span to start and end line/column positions using the given line index.
    #[must_use]
    pub fn to_line_col(&self, line_index: &LineIndex) -> (LineCol, LineCol) {
        let start = line_index.to_line_col(self.start_offset());
        let end = line_index.to_line_col(self.end_offset());
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_inclusive_of_bounds() {
        let outer = Span::new(10, 20);
        assert!(outer.contains(Span::new(10, 20)));
        assert!(outer.contains(Span::new(15, 5)));
        assert!(!outer.contains(Span::new(5, 10)));
        assert!(!outer.contains(Span::new(25, 10)));
    }

    #[test]
    fn text_slices_the_source() {
        let source = "int x = 10;";
        let span = Span::from_bounds(4, 5);
        assert_eq!(span.text(source), "x");
    }
}
