//! Output lines, column alignment and final text assembly

use std::ops::Range;

use super::options::FormattingOptions;

/// Column classes padded to a common start column within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AlignKind {
    Colon,
    FirstToken,
    Action,
    LexerCommand,
    Label,
    TrailingComment,
    /// Labels, actions, lexer commands and trailing comments in one column
    Trailer,
}

impl AlignKind {
    /// Passes run left to right in line order.
    const ORDER: [AlignKind; 7] = [
        AlignKind::Colon,
        AlignKind::FirstToken,
        AlignKind::Action,
        AlignKind::LexerCommand,
        AlignKind::Label,
        AlignKind::Trailer,
        AlignKind::TrailingComment,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Cell {
    pub text: String,
    pub align: Option<AlignKind>,
    /// Spaces before the cell when it is not the first on its line
    pub gap: usize,
    /// Alignment padding added on top of `gap`
    pub pad: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Line {
    pub indent: usize,
    pub cells: Vec<Cell>,
    /// Copied to the output untouched
    pub verbatim: bool,
}

impl Line {
    pub fn new(indent: usize) -> Self {
        Self {
            indent,
            ..Self::default()
        }
    }

    pub fn verbatim(text: &str) -> Self {
        let mut line = Self::new(0).with(text, 0, None);
        line.verbatim = true;
        line
    }

    pub fn with(mut self, text: impl Into<String>, gap: usize, align: Option<AlignKind>) -> Self {
        self.push(text, gap, align);
        self
    }

    /// Appends a cell. Empty text is dropped.
    pub fn push(&mut self, text: impl Into<String>, gap: usize, align: Option<AlignKind>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.cells.push(Cell {
            text,
            align,
            gap,
            pad: 0,
        });
    }

    /// Appends text to the last cell, or starts one.
    pub fn append(&mut self, text: &str) {
        match self.cells.last_mut() {
            Some(cell) => cell.text.push_str(text),
            None => self.push(text, 0, None),
        }
    }

    /// End column of the line without alignment padding.
    pub fn width(&self) -> usize {
        let mut column = self.indent;
        for (index, cell) in self.cells.iter().enumerate() {
            if index > 0 {
                column += cell.gap;
            }
            column = advance(column, &cell.text);
        }
        column
    }

    /// Start column of cell `target`, padding included.
    fn column_of(&self, target: usize) -> usize {
        let mut column = self.indent;
        for (index, cell) in self.cells.iter().enumerate() {
            if index > 0 {
                column += cell.gap + cell.pad;
            }
            if index == target {
                break;
            }
            column = advance(column, &cell.text);
        }
        column
    }

    pub fn render(&self, options: &FormattingOptions) -> String {
        if self.verbatim {
            return self.cells.iter().map(|cell| cell.text.as_str()).collect();
        }
        if self.cells.is_empty() {
            return String::new();
        }
        let mut text = options.indentation(self.indent);
        for (index, cell) in self.cells.iter().enumerate() {
            if index > 0 {
                text.extend(std::iter::repeat_n(' ', cell.gap + cell.pad));
            }
            text.push_str(&cell.text);
        }
        text.truncate(text.trim_end().len());
        text
    }
}

/// Column after writing `text` starting at `column`.
pub(super) fn advance(column: usize, text: &str) -> usize {
    match text.rfind('\n') {
        Some(newline) => text[newline + 1..].chars().count(),
        None => column + text.chars().count(),
    }
}

/// Pads aligned cells so that each kind starts at one column across `lines`.
pub(super) fn align<'l>(lines: impl IntoIterator<Item = &'l mut Line>) {
    let mut lines: Vec<&mut Line> = lines.into_iter().filter(|line| !line.verbatim).collect();
    for kind in AlignKind::ORDER {
        let targets: Vec<(usize, usize, usize)> = lines
            .iter()
            .enumerate()
            .filter_map(|(line_index, line)| {
                let cell = line
                    .cells
                    .iter()
                    .skip(1)
                    .position(|cell| cell.align == Some(kind))?
                    + 1;
                Some((line_index, cell, line.column_of(cell)))
            })
            .collect();
        if targets.len() < 2 {
            continue;
        }
        let column = targets.iter().map(|&(_, _, column)| column).max().unwrap_or(0);
        for (line_index, cell, start) in targets {
            lines[line_index].cells[cell].pad += column - start;
        }
    }
}

/// How an element is separated from the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Separator<'a> {
    /// First element of the output
    Start,
    /// Line break followed by this many empty lines
    Lines(usize),
    /// Original text between the elements
    Verbatim(&'a str),
}

/// The rendered lines of one element.
#[derive(Debug)]
pub(super) struct Block<'a> {
    pub lines: Vec<Line>,
    pub separator: Separator<'a>,
    pub options: &'a FormattingOptions,
}

/// Joins the blocks into the output text. Returns the text and the output
/// byte range of each block.
pub(super) fn write(blocks: &[Block]) -> (String, Vec<Range<usize>>) {
    let mut output = String::new();
    let mut ranges = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block.separator {
            Separator::Start => {}
            Separator::Lines(blank) => {
                output.extend(std::iter::repeat_n('\n', blank + 1));
            }
            Separator::Verbatim(text) => output.push_str(text),
        }
        let start = output.len();
        for (index, line) in block.lines.iter().enumerate() {
            if index > 0 {
                output.push('\n');
            }
            output.push_str(&line.render(block.options));
        }
        ranges.push(start..output.len());
    }
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    (output, ranges)
}
