//! Offset-to-position translation.
//!
//! Diagnostics are reported against byte offsets internally and translated to
//! 1-based line/column pairs at presentation time. The `LineMap` records the
//! start offset of every line so the translation is a binary search.

use memchr::memchr_iter;
use serde::Serialize;

/// A 1-based line/column position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Start offsets of every line in one source file.
#[derive(Clone, Debug)]
pub struct LineMap {
    line_starts: Vec<u32>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = Vec::with_capacity(128);
        line_starts.push(0);
        for nl in memchr_iter(b'\n', text.as_bytes()) {
            line_starts.push(nl as u32 + 1);
        }
        LineMap { line_starts }
    }

    /// Translate a byte offset to a 1-based line/column.
    ///
    /// Columns count bytes, not grapheme clusters; offsets past the end of the
    /// file clamp to the final line.
    pub fn position(&self, offset: u32) -> Position {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position {
            line: line_idx as u32 + 1,
            column: offset - self.line_starts[line_idx] + 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions() {
        let map = LineMap::new("ab\ncd\n\nef");
        assert_eq!(map.position(0), Position { line: 1, column: 1 });
        assert_eq!(map.position(1), Position { line: 1, column: 2 });
        assert_eq!(map.position(3), Position { line: 2, column: 1 });
        assert_eq!(map.position(6), Position { line: 3, column: 1 });
        assert_eq!(map.position(8), Position { line: 4, column: 2 });
        assert_eq!(map.line_count(), 4);
    }

    #[test]
    fn offset_past_end_clamps() {
        let map = LineMap::new("x");
        assert_eq!(map.position(100), Position { line: 1, column: 100 + 1 });
    }
}
