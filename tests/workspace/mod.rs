//! Workspace tests
//!
//! Tests for:
//! - Reference counting of loaded grammars
//! - Dependency swaps on edits
//! - Queries across grammar files

pub mod tests_dependencies;
pub mod tests_queries;
