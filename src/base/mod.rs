//! Foundation types for the grammar toolchain.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`Position`], [`LexicalRange`] - Row/column positions (ANTLR convention)
//! - [`LineIndex`] - Offset to row/column conversion with tab handling
//! - [`TextRange`], [`TextSize`] - Byte offsets into source text
//! - Completion word prefixes and lexical path helpers
//!
//! This module has NO dependencies on other g4 modules.

mod line_index;
mod paths;
mod position;
pub mod text_utils;

pub use line_index::{LineIndex, advance_column, expand_tabs};
pub use paths::{grammar_name_of, normalize_path};
pub use position::{LexicalRange, Position};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
