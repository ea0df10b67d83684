//! Workspace entry representation

use std::path::PathBuf;

use crate::context::GrammarContext;

/// Identity of a loaded grammar. Stable while the grammar stays loaded; a grammar
/// released completely and loaded again gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl ContextId {
    pub(super) fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A loaded grammar with its loader count and resolved dependencies
#[derive(Debug)]
pub(super) struct ContextEntry {
    pub(super) id: ContextId,
    pub(super) context: GrammarContext,
    pub(super) ref_count: usize,
    /// Dependency paths found by the last parse, each holding one load
    pub(super) resolved: Vec<PathBuf>,
}

impl ContextEntry {
    pub(super) fn new(id: ContextId, context: GrammarContext) -> Self {
        Self {
            id,
            context,
            ref_count: 1,
            resolved: Vec::new(),
        }
    }
}
