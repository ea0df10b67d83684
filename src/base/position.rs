/// Position tracking for grammar symbols and diagnostics
///
/// Rows are 1-based and columns 0-based, matching the positions reported by
/// ANTLR tooling. Columns count characters, a tab is a single column.
use serde::{Deserialize, Serialize};

/// A position in grammar source (row 1-based, column 0-based)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub row: u32,
    pub column: u32,
}

impl Position {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

/// A lexical range between two positions.
///
/// Ranges produced for a single token are end-exclusive. Ranges produced for a
/// multi-token construct end at the start of the construct's final token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LexicalRange {
    pub start: Position,
    pub end: Position,
}

impl LexicalRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a range from row/column coordinates
    pub fn from_coords(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self {
            start: Position::new(start_row, start_col),
            end: Position::new(end_row, end_col),
        }
    }

    /// Check if a position falls within this range (both ends inclusive)
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering_is_row_major() {
        assert!(Position::new(1, 20) < Position::new(2, 0));
        assert!(Position::new(3, 1) < Position::new(3, 2));
    }

    #[test]
    fn test_range_contains() {
        let range = LexicalRange::from_coords(2, 4, 3, 1);
        assert!(range.contains(Position::new(2, 4)));
        assert!(range.contains(Position::new(2, 80)));
        assert!(range.contains(Position::new(3, 1)));
        assert!(!range.contains(Position::new(3, 2)));
        assert!(!range.contains(Position::new(2, 3)));
    }
}
