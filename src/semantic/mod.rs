//! # Semantic Analysis
//!
//! Turns a parsed grammar into a queryable model: a per-file [`SymbolTable`],
//! diagnostics for references that do not resolve, and per-rule reference records.
//!
//! ```text
//! GrammarFile (AST)
//!      ↓
//! collector  → SymbolTable (symbols + occurrences)
//!      ↓
//! checker    → Diagnostics (against own, dependency and built-in tables)
//!      ↓
//! references → ReferenceNode per rule
//! ```
//!
//! Cross-file resolution never owns other files' symbols: callers pass the
//! dependency tables in for each check.

mod checker;
mod collector;
pub mod diagnostics;
pub mod left_recursion;
pub mod references;
pub mod symbol_table;

pub(crate) use checker::check_grammar;
pub(crate) use collector::collect_symbols;
pub use diagnostics::{Diagnostic, Severity, codes, sort_diagnostics};
pub use left_recursion::mutually_left_recursive;
pub use references::{ReferenceNode, build_reference_nodes};
pub use symbol_table::{
    BUILTIN_SOURCE, Definition, Occurrence, Symbol, SymbolId, SymbolInfo, SymbolKind, SymbolTable,
};
