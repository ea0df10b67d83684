//! Text-level tooling for grammar sources
pub mod formatter;

pub use formatter::{
    AlignColons, AlignSemicolons, FormatResult, FormattingOptions, format_async, format_range,
};
