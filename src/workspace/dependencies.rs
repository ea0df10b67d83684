//! Loading, releasing and dependency resolution

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::base::normalize_path;
use crate::context::GrammarContext;
use crate::workspace::Workspace;
use crate::workspace::entry::{ContextEntry, ContextId};

/// File extensions tried for a dependency name, in order.
static GRAMMAR_EXTENSIONS: [&str; 2] = ["g4", "g"];

impl Workspace {
    /// Loads the grammar at `path`, from `source` when given, else from disk (an
    /// unreadable file loads as empty text). A grammar that is already loaded
    /// keeps its context and only gains a reference.
    pub fn load_grammar(&mut self, path: impl AsRef<Path>, source: Option<&str>) -> ContextId {
        let key = normalize_path(path.as_ref());
        if let Some(entry) = self.contexts.get_mut(&key) {
            entry.ref_count += 1;
            trace!(path = %key.display(), ref_count = entry.ref_count, "grammar already loaded");
            return entry.id;
        }

        let source = match source {
            Some(source) => source.to_string(),
            None => std::fs::read_to_string(&key).unwrap_or_else(|error| {
                debug!(path = %key.display(), %error, "grammar not readable, loading empty");
                String::new()
            }),
        };

        let id = ContextId::new(self.next_id);
        self.next_id += 1;
        let context = GrammarContext::new(key.clone(), source);
        self.contexts
            .insert(key.clone(), ContextEntry::new(id, context));
        debug!(path = %key.display(), id = id.raw(), "loaded grammar");

        self.resolve_dependencies(&key, Vec::new());
        id
    }

    /// Drops one reference to `path`. At zero the grammar is removed and each of
    /// its dependencies is released once in turn.
    pub fn release_grammar(&mut self, path: impl AsRef<Path>) {
        let mut pending = vec![normalize_path(path.as_ref())];
        while let Some(key) = pending.pop() {
            // Entries removed earlier in this sweep are skipped
            let Some(entry) = self.contexts.get_mut(&key) else {
                continue;
            };
            entry.ref_count = entry.ref_count.saturating_sub(1);
            if entry.ref_count > 0 {
                trace!(path = %key.display(), ref_count = entry.ref_count, "grammar still referenced");
                continue;
            }

            let Some(mut removed) = self.contexts.remove(&key) else {
                continue;
            };
            for dependency in &removed.resolved {
                if let Some(found) = self.contexts.get_mut(dependency) {
                    removed.context.remove_dependency(&mut found.context);
                }
            }
            let dependents: Vec<PathBuf> = removed.context.dependents().map(Path::to_path_buf).collect();
            for dependent in dependents {
                if let Some(found) = self.contexts.get_mut(&dependent) {
                    found.context.remove_dependency(&mut removed.context);
                }
            }
            debug!(path = %key.display(), dependencies = removed.resolved.len(), "released grammar");
            pending.extend(removed.resolved.into_iter().rev());
        }
    }

    /// Replaces the text of a loaded grammar and reparses it. Does nothing for
    /// grammars that are not loaded.
    pub fn set_text(&mut self, path: impl AsRef<Path>, source: &str) {
        let key = normalize_path(path.as_ref());
        let Some(entry) = self.contexts.get_mut(&key) else {
            return;
        };
        entry.context.set_text(source);
        let previous = std::mem::take(&mut entry.resolved);
        self.resolve_dependencies(&key, previous);
    }

    /// Parses a loaded grammar again. Does nothing for grammars that are not loaded.
    pub fn reparse(&mut self, path: impl AsRef<Path>) {
        let key = normalize_path(path.as_ref());
        let Some(entry) = self.contexts.get_mut(&key) else {
            return;
        };
        entry.context.reparse();
        let previous = std::mem::take(&mut entry.resolved);
        self.resolve_dependencies(&key, previous);
    }

    /// Loads and links the dependencies named by the current parse of `key`, then
    /// releases the ones resolved by the previous parse. Dependencies that stay
    /// end up with an unchanged count.
    fn resolve_dependencies(&mut self, key: &Path, previous: Vec<PathBuf>) {
        let names = match self.contexts.get(key) {
            Some(entry) => entry.context.dependency_names().to_vec(),
            None => return,
        };

        let mut resolved: Vec<PathBuf> = Vec::new();
        for name in &names {
            let Some(dependency) = self.find_dependency(key, name) else {
                debug!(grammar = %key.display(), dependency = %name, "dependency not found");
                continue;
            };
            if resolved.contains(&dependency) {
                continue;
            }
            self.load_grammar(&dependency, None);
            self.link(key, &dependency);
            trace!(grammar = %key.display(), dependency = %dependency.display(), "resolved dependency");
            resolved.push(dependency);
        }

        for stale in previous.iter().filter(|path| !resolved.contains(path)) {
            self.unlink(key, stale);
        }
        if let Some(entry) = self.contexts.get_mut(key) {
            entry.resolved = resolved;
        }
        for dependency in previous {
            self.release_grammar(&dependency);
        }
    }

    /// First existing candidate for a dependency `name` of the grammar at `key`:
    /// the import directory before the grammar's own directory, `.g4` before `.g`.
    /// Grammars already loaded count as existing.
    pub(super) fn find_dependency(&self, key: &Path, name: &str) -> Option<PathBuf> {
        let own_dir = key.parent().unwrap_or_else(|| Path::new(""));
        let dirs = self
            .config
            .import_dir
            .as_deref()
            .into_iter()
            .chain(std::iter::once(own_dir));

        dirs.flat_map(|dir| {
            GRAMMAR_EXTENSIONS
                .iter()
                .map(move |extension| normalize_path(&dir.join(format!("{name}.{extension}"))))
        })
        .filter(|candidate| candidate != key)
        .find(|candidate| self.contexts.contains_key(candidate) || candidate.is_file())
    }

    fn link(&mut self, key: &Path, dependency: &Path) {
        let Some(mut target) = self.contexts.remove(dependency) else {
            return;
        };
        if let Some(entry) = self.contexts.get_mut(key) {
            entry.context.add_as_reference_to(&mut target.context);
        }
        self.contexts.insert(dependency.to_path_buf(), target);
    }

    fn unlink(&mut self, key: &Path, dependency: &Path) {
        let Some(mut target) = self.contexts.remove(dependency) else {
            return;
        };
        if let Some(entry) = self.contexts.get_mut(key) {
            entry.context.remove_dependency(&mut target.context);
        }
        self.contexts.insert(dependency.to_path_buf(), target);
    }
}
