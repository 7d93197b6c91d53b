//! Source location tracking for produced IR nodes.

use pest::iterators::Pair;
use serde::{Deserialize, Serialize};

use crate::parser::Rule;

/// A 1-based source span, `{startLine, startColumn, endLine, endColumn}`
/// (spec §3 `TextLocation`). Columns are code-point based, never byte
/// offsets, so multi-byte characters each count as one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextLocation {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl TextLocation {
    #[must_use]
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// True when `(startLine, startColumn) <= (endLine, endColumn)`
    /// lexicographically and `startColumn >= 1` (spec §8 P1).
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start_col >= 1
            && self.start_line <= self.end_line
            && (self.start_line, self.start_col) <= (self.end_line, self.end_col)
    }

    /// Build a span covering both `self` and `other`.
    #[must_use]
    pub fn merge(&self, other: &TextLocation) -> TextLocation {
        let (start_line, start_col) = if (self.start_line, self.start_col) <= (other.start_line, other.start_col) {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        TextLocation::new(start_line, start_col, end_line, end_col)
    }
}

/// Derive a [`TextLocation`] from a pest `Pair`'s start and stop tokens
/// (spec §4.7): start line/column come from the span's start, end
/// line/column from the span's end. For a terminal token, start == stop and
/// the end column is `start column + length - 1`.
#[must_use]
pub fn location_from_pair(pair: &Pair<'_, Rule>) -> TextLocation {
    let span = pair.as_span();
    let (start_line, start_col) = span.start_pos().line_col();
    let (end_line, mut end_col) = span.end_pos().line_col();
    // pest's end position is exclusive; step back one column so the span
    // covers the last character of the token rather than the position after it.
    if end_col > 1 {
        end_col -= 1;
    } else if end_line > start_line {
        end_col = 1;
    }
    TextLocation::new(start_line, start_col, end_line, end_col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_requires_start_before_end() {
        let loc = TextLocation::new(1, 1, 1, 5);
        assert!(loc.is_well_formed());
        let bad = TextLocation::new(2, 1, 1, 1);
        assert!(!bad.is_well_formed());
    }

    #[test]
    fn merge_takes_extremes() {
        let a = TextLocation::new(2, 3, 2, 10);
        let b = TextLocation::new(1, 1, 2, 5);
        let merged = a.merge(&b);
        assert_eq!(merged, TextLocation::new(1, 1, 2, 10));
    }
}
