use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::normalize_path;
use crate::context::GrammarContext;
use crate::workspace::WorkspaceConfig;
use crate::workspace::entry::{ContextEntry, ContextId};

/// A set of loaded grammars and the dependency edges between them
#[derive(Debug, Default)]
pub struct Workspace {
    pub(super) config: WorkspaceConfig,
    pub(super) contexts: FxHashMap<PathBuf, ContextEntry>,
    pub(super) next_id: u32,
}

impl Workspace {
    /// Creates a new empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WorkspaceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut WorkspaceConfig {
        &mut self.config
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The loaded context for `path`, without loading it.
    pub fn context(&self, path: impl AsRef<Path>) -> Option<&GrammarContext> {
        self.contexts
            .get(&normalize_path(path.as_ref()))
            .map(|entry| &entry.context)
    }

    pub fn context_id(&self, path: impl AsRef<Path>) -> Option<ContextId> {
        self.contexts
            .get(&normalize_path(path.as_ref()))
            .map(|entry| entry.id)
    }

    pub fn is_loaded(&self, path: impl AsRef<Path>) -> bool {
        self.contexts.contains_key(&normalize_path(path.as_ref()))
    }

    /// Number of outstanding loads of `path`; 0 when not loaded.
    pub fn ref_count(&self, path: impl AsRef<Path>) -> usize {
        self.contexts
            .get(&normalize_path(path.as_ref()))
            .map_or(0, |entry| entry.ref_count)
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Paths of all loaded grammars, sorted.
    pub fn loaded_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.contexts.keys().map(PathBuf::as_path).collect();
        paths.sort();
        paths
    }

    pub fn contexts(&self) -> impl Iterator<Item = &GrammarContext> {
        self.contexts.values().map(|entry| &entry.context)
    }

    // ========================================================================
    // Closure
    // ========================================================================

    /// Loads `path` if it is not loaded yet. Returns its key.
    pub(super) fn ensure_loaded(&mut self, path: &Path) -> PathBuf {
        let key = normalize_path(path);
        if !self.contexts.contains_key(&key) {
            self.load_grammar(&key, None);
        }
        key
    }

    /// Resolved dependencies of `key`, transitively, depth-first and without
    /// duplicates. `key` itself is never part of its closure.
    pub(super) fn dependency_closure(&self, key: &Path) -> Vec<&GrammarContext> {
        let mut visited = FxHashSet::default();
        visited.insert(key.to_path_buf());
        let mut closure = Vec::new();
        self.collect_dependencies(key, &mut visited, &mut closure);
        closure
    }

    fn collect_dependencies<'a>(
        &'a self,
        key: &Path,
        visited: &mut FxHashSet<PathBuf>,
        closure: &mut Vec<&'a GrammarContext>,
    ) {
        let Some(entry) = self.contexts.get(key) else {
            return;
        };
        for dependency in &entry.resolved {
            if !visited.insert(dependency.clone()) {
                continue;
            }
            if let Some(found) = self.contexts.get(dependency) {
                closure.push(&found.context);
                self.collect_dependencies(dependency, visited, closure);
            }
        }
    }

    /// Contexts depending on `key`, transitively, each visited once.
    pub(super) fn dependent_closure(&self, key: &Path) -> Vec<&GrammarContext> {
        let mut visited = FxHashSet::default();
        visited.insert(key.to_path_buf());
        let mut pending = vec![key.to_path_buf()];
        let mut closure = Vec::new();
        while let Some(current) = pending.pop() {
            let Some(entry) = self.contexts.get(&current) else {
                continue;
            };
            for dependent in entry.context.dependents() {
                if !visited.insert(dependent.to_path_buf()) {
                    continue;
                }
                if let Some(found) = self.contexts.get(dependent) {
                    closure.push(&found.context);
                    pending.push(dependent.to_path_buf());
                }
            }
        }
        closure
    }

    /// `key` after its dependencies, dependencies before their dependents.
    pub(super) fn generation_order(&self, key: &Path) -> Vec<PathBuf> {
        fn visit(
            workspace: &Workspace,
            key: &Path,
            visited: &mut FxHashSet<PathBuf>,
            order: &mut Vec<PathBuf>,
        ) {
            if !visited.insert(key.to_path_buf()) {
                return;
            }
            let Some(entry) = workspace.contexts.get(key) else {
                return;
            };
            for dependency in &entry.resolved {
                visit(workspace, dependency, visited, order);
            }
            order.push(key.to_path_buf());
        }

        let mut order = Vec::new();
        visit(self, key, &mut FxHashSet::default(), &mut order);
        order
    }
}
