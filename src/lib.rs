//! # g4-base
//!
//! Core library for ANTLR4 grammar tooling: parsing, semantic analysis,
//! formatting, ATN construction and the language-service queries built on them.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! workspace   → Loaded grammars, dependency graph, query forwarding
//!   ↓
//! ide         → Completion, railroad diagrams, symbol lists, debugger
//! generation  → .interp files, ANTLR tool runs, sentence generation
//!   ↓
//! context     → One grammar: parse, symbols, interpreter data
//!   ↓
//! atn         → ATN model, construction, .interp format, graph extraction
//! semantic    → Symbol tables, checks, reference nodes
//! syntax      → Formatter
//!   ↓
//! parser      → Logos lexer, Rowan CST, typed AST
//!   ↓
//! base        → Positions, line index, paths
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → semantic/atn → context → ide → workspace)
// ============================================================================

/// Foundation types: Position, LexicalRange, LineIndex
pub mod base;

/// Errors returned by generation and configuration loading
pub mod error;

/// Parser: Logos lexer, recursive-descent parser, typed AST
pub mod parser;

/// Text-level tooling: the grammar formatter
pub mod syntax;

/// Symbol tables, semantic checks and diagnostics
pub mod semantic;

/// Augmented transition networks and interpreter data
pub mod atn;

/// Per-file grammar state and single-file queries
pub mod context;

/// Interpreter data generation and sentence generation
pub mod generation;

/// IDE features: completion, railroad diagrams, symbols, debugger
pub mod ide;

/// Loaded grammars and the dependency graph between them
pub mod workspace;

// Re-export commonly needed items
pub use context::GrammarContext;
pub use error::{GrammarError, Result};
pub use generation::{GenerationOptions, SentenceGenerationOptions, ToolConfig};
pub use parser::GrammarType;
pub use semantic::{Diagnostic, Severity, SymbolInfo, SymbolKind};
pub use syntax::{FormatResult, FormattingOptions};
pub use workspace::{ContextId, Workspace, WorkspaceConfig};

// Re-export foundation types
pub use base::{LexicalRange, LineIndex, Position, TextRange, TextSize};
