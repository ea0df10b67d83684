//! Shared helpers for integration tests

pub mod grammar_fixtures;
pub mod workspace_helpers;
