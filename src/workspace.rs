//! # Workspace
//!
//! Owns every loaded [`GrammarContext`] and the dependency graph between them.
//!
//! Grammars are identified by their normalized path. Each entry is reference
//! counted: loading an already-loaded grammar only bumps its count, releasing it
//! drops the count and, at zero, removes the entry and releases what it depended
//! on. Queries take a path, load the grammar on demand and forward to the context
//! together with its dependency closure where the answer spans files.
//!
//! ```text
//! load_grammar ──parse──▶ dependency names ──resolve──▶ load_grammar (deps)
//!      │                                                   │
//!      └────────────── add_as_reference_to ◀───────────────┘
//! ```

mod config;
mod core;
mod dependencies;
mod entry;
mod generate;
mod queries;

pub use config::WorkspaceConfig;
pub use self::core::Workspace;
pub use entry::ContextId;

#[cfg(test)]
mod tests;
