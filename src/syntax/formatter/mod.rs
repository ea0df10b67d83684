//! Formatter for ANTLR4 grammar source
//!
//! The source is tokenized losslessly and split into top-level elements
//! (rules, option blocks, imports, modes, named actions, comments). Each element
//! is laid out into lines of cells, cells carrying alignment markers are padded
//! per alignment group, and the lines are joined into the output.
//!
//! Formatting is a fixed point: formatting formatted text changes nothing.
//! `$antlr-format` directive comments change the options for the elements that
//! follow them.

mod directives;
mod elements;
mod layout;
mod options;
mod writer;

#[cfg(test)]
mod tests;

use std::ops::Range;

use tokio_util::sync::CancellationToken;

use crate::parser::tokenize;
use elements::{Element, ElementKind, split_elements};
use layout::Layout;
pub use options::{AlignColons, AlignSemicolons, FormattingOptions};
use writer::{Block, Separator};

/// Replacement text for a region of the original source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatResult {
    pub text: String,
    /// Start of the replaced region in the original text
    pub start: usize,
    /// End of the replaced region in the original text
    pub stop: usize,
}

impl FormatResult {
    fn empty_at(offset: usize) -> Self {
        Self {
            text: String::new(),
            start: offset,
            stop: offset,
        }
    }
}

/// Format grammar source with cancellation support.
/// Returns `None` if the cancellation token is signalled.
pub fn format_async(
    source: &str,
    options: &FormattingOptions,
    cancel: &CancellationToken,
) -> Option<String> {
    Some(run(source, options, cancel)?.text)
}

/// Formats the top-level elements intersecting `[start, stop]`, widened to
/// whole alignment groups. A range covering the whole text formats everything.
pub fn format_range(
    source: &str,
    options: &FormattingOptions,
    start: i64,
    stop: i64,
    cancel: &CancellationToken,
) -> Option<FormatResult> {
    let length = source.len() as i64;
    let (start, stop) = if stop < start { (stop, start) } else { (start, stop) };
    if stop < 0 {
        return Some(FormatResult::empty_at(0));
    }
    if start > length {
        return Some(FormatResult::empty_at(source.len()));
    }

    let formatted = run(source, options, cancel)?;
    if start <= 0 && stop >= length {
        return Some(FormatResult {
            text: formatted.text,
            start: 0,
            stop: source.len(),
        });
    }

    let start = start.max(0) as usize;
    let stop = stop.min(length) as usize;
    let spans = &formatted.spans;
    let touched = |span: &&Span| span.source.start <= stop && span.source.end >= start;
    let (Some(first), Some(last)) = (
        spans.iter().find(touched),
        spans.iter().rev().find(touched),
    ) else {
        return Some(FormatResult::empty_at(start));
    };
    let first = spans.iter().find(|span| span.group == first.group).unwrap_or(first);
    let last = spans
        .iter()
        .rev()
        .find(|span| span.group == last.group)
        .unwrap_or(last);

    Some(FormatResult {
        text: formatted.text[first.output.start..last.output.end].to_string(),
        start: first.source.start,
        stop: last.source.end,
    })
}

/// Where an element came from and where it went.
#[derive(Debug)]
struct Span {
    source: Range<usize>,
    output: Range<usize>,
    group: usize,
}

#[derive(Debug)]
struct Formatted {
    text: String,
    spans: Vec<Span>,
}

fn run(source: &str, options: &FormattingOptions, cancel: &CancellationToken) -> Option<Formatted> {
    let tokens = tokenize(source);
    let elements = split_elements(&tokens, cancel)?;
    let settings = directives::resolve(&elements, &tokens, options);

    let mut blocks: Vec<Block> = Vec::with_capacity(elements.len());
    let mut groups = Vec::with_capacity(elements.len());
    let mut group = 0;
    for (position, (element, setting)) in elements.iter().zip(&settings).enumerate() {
        if cancel.is_cancelled() {
            return None;
        }
        let layout = Layout::new(source, &tokens, &setting.options);
        let previous = position.checked_sub(1).map(|previous| &elements[previous]);
        let (lines, separator) = if setting.enabled {
            (
                layout.element(element),
                separator(previous, element, &setting.options),
            )
        } else {
            (
                layout.verbatim(element),
                previous.map_or(Separator::Start, |previous| {
                    Separator::Verbatim(&source[previous.end..element.start])
                }),
            )
        };
        let breaks_group = match separator {
            Separator::Start => false,
            Separator::Lines(blank) => blank > 0 && setting.options.grouped_alignments,
            Separator::Verbatim(_) => true,
        };
        if breaks_group {
            group += 1;
        }
        groups.push(group);
        blocks.push(Block {
            lines,
            separator,
            options: &setting.options,
        });
    }

    let mut start = 0;
    while start < blocks.len() {
        let end = (start..blocks.len())
            .find(|&index| groups[index] != groups[start])
            .unwrap_or(blocks.len());
        writer::align(
            blocks[start..end]
                .iter_mut()
                .flat_map(|block| block.lines.iter_mut()),
        );
        start = end;
    }

    let (text, ranges) = writer::write(&blocks);
    let spans = elements
        .iter()
        .zip(ranges)
        .zip(groups)
        .map(|((element, output), group)| Span {
            source: element.start..element.end,
            output,
            group,
        })
        .collect();
    Some(Formatted { text, spans })
}

/// Empty lines before `element`, kept within the configured bounds. A comment
/// directly above an element stays attached to it.
fn separator<'a>(
    previous: Option<&Element>,
    element: &Element,
    options: &FormattingOptions,
) -> Separator<'a> {
    let Some(previous) = previous else {
        return Separator::Start;
    };
    let blank = if previous.kind == ElementKind::Comment && element.blank_lines_before == 0 {
        0
    } else {
        element
            .blank_lines_before
            .min(options.max_empty_lines_to_keep)
            .max(options.min_empty_lines)
    };
    Separator::Lines(blank)
}
