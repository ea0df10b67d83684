//! Conversion between byte offsets and row/column positions.

use super::position::{LexicalRange, Position};
use text_size::{TextRange, TextSize};

/// Line start table for a piece of source text.
///
/// Offsets are UTF-8 byte offsets into the text. Columns count characters.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of a line (1-based row) without its line terminator.
    pub fn line_text(&self, row: u32) -> Option<&'a str> {
        let index = (row as usize).checked_sub(1)?;
        let start = *self.line_starts.get(index)?;
        let end = self
            .line_starts
            .get(index + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let line = &self.text[start..end];
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Position of a byte offset. Offsets past the end clamp to the end of text,
    /// offsets inside a multi-byte character snap to that character.
    pub fn position(&self, offset: impl Into<usize>) -> Position {
        let offset = offset.into().min(self.text.len());
        let index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_starts[index];
        let column = self.text[line_start..]
            .char_indices()
            .take_while(|(i, _)| line_start + i < offset)
            .count();
        Position::new(index as u32 + 1, column as u32)
    }

    /// Byte offset of a position, or `None` if the position lies outside the text.
    /// A column equal to the line length addresses the end of the line.
    pub fn offset(&self, position: Position) -> Option<usize> {
        let line = self.line_text(position.row)?;
        let line_start = self.line_starts[position.row as usize - 1];
        let column = position.column as usize;
        let mut chars = line.char_indices();
        match chars.nth(column) {
            Some((i, _)) => Some(line_start + i),
            None if line.chars().count() == column => Some(line_start + line.len()),
            None => None,
        }
    }

    /// Display column of a position, expanding tabs to the next multiple of `tab_width`.
    pub fn visual_column(&self, position: Position, tab_width: usize) -> Option<usize> {
        let line = self.line_text(position.row)?;
        Some(expand_tabs(
            line.chars().take(position.column as usize),
            tab_width,
        ))
    }

    /// Character column at a display column on a line. Display columns inside a
    /// tab resolve to that tab.
    pub fn column_from_visual(&self, row: u32, visual: usize, tab_width: usize) -> Option<u32> {
        let line = self.line_text(row)?;
        let mut current = 0;
        for (column, c) in line.chars().enumerate() {
            let next = advance_column(current, c, tab_width);
            if visual < next {
                return Some(column as u32);
            }
            current = next;
        }
        Some(line.chars().count() as u32)
    }

    /// Range of a single token: end-exclusive.
    pub fn token_range(&self, range: TextRange) -> LexicalRange {
        LexicalRange::new(
            self.position(usize::from(range.start())),
            self.position(usize::from(range.end())),
        )
    }

    /// Range of a construct spanning `first` to `last` token: ends at the start of
    /// the last token.
    pub fn construct_range(&self, first: TextRange, last: TextRange) -> LexicalRange {
        LexicalRange::new(
            self.position(usize::from(first.start())),
            self.position(usize::from(last.start())),
        )
    }

    /// Byte offset of a position as a `TextSize`.
    pub fn text_size(&self, position: Position) -> Option<TextSize> {
        self.offset(position).map(|o| TextSize::new(o as u32))
    }
}

/// Advance a display column past one character.
pub fn advance_column(column: usize, c: char, tab_width: usize) -> usize {
    if c == '\t' && tab_width > 0 {
        column + tab_width - column % tab_width
    } else {
        column + 1
    }
}

/// Display width of a character sequence starting at column 0.
pub fn expand_tabs(chars: impl IntoIterator<Item = char>, tab_width: usize) -> usize {
    chars
        .into_iter()
        .fold(0, |column, c| advance_column(column, c, tab_width))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "grammar t;\n\na: b;\n\tB: 'é';\n";

    #[test]
    fn test_position_of_offsets() {
        let index = LineIndex::new(TEXT);
        assert_eq!(index.position(0usize), Position::new(1, 0));
        assert_eq!(index.position(8usize), Position::new(1, 8));
        assert_eq!(index.position(12usize), Position::new(3, 0));
        assert_eq!(index.position(15usize), Position::new(3, 3));
    }

    #[test]
    fn test_position_clamps_past_end() {
        let index = LineIndex::new(TEXT);
        assert_eq!(index.position(10_000usize), Position::new(5, 0));
    }

    #[test]
    fn test_offset_round_trips_with_multibyte_chars() {
        let index = LineIndex::new(TEXT);
        let row4 = index.line_text(4).unwrap();
        assert_eq!(row4, "\tB: 'é';");
        let offset = index.offset(Position::new(4, 6)).unwrap();
        assert_eq!(&TEXT[offset..offset + 1], "'");
        assert_eq!(index.position(offset), Position::new(4, 6));
    }

    #[test]
    fn test_offset_out_of_range() {
        let index = LineIndex::new(TEXT);
        assert_eq!(index.offset(Position::new(0, 0)), None);
        assert_eq!(index.offset(Position::new(1, 11)), None);
        assert_eq!(index.offset(Position::new(1, 10)), Some(10));
        assert_eq!(index.offset(Position::new(9, 0)), None);
    }

    #[test]
    fn test_visual_columns_expand_tabs() {
        let index = LineIndex::new(TEXT);
        assert_eq!(index.visual_column(Position::new(4, 1), 4), Some(4));
        assert_eq!(index.visual_column(Position::new(4, 2), 4), Some(5));
        assert_eq!(index.column_from_visual(4, 2, 4), Some(0));
        assert_eq!(index.column_from_visual(4, 4, 4), Some(1));
        assert_eq!(index.column_from_visual(4, 100, 4), Some(8));
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("a\tb".chars(), 4), 5);
        assert_eq!(expand_tabs("abcd\t".chars(), 4), 8);
        assert_eq!(expand_tabs("\t".chars(), 0), 1);
    }
}
