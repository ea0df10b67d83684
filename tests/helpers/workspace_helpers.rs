//! On-disk grammar sets for workspace tests.

use std::path::{Path, PathBuf};

use g4::Workspace;
use tempfile::TempDir;

/// A temporary directory holding grammar files.
pub struct GrammarSet {
    dir: TempDir,
}

impl GrammarSet {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    /// Create a set from `(file name, source)` pairs.
    pub fn with(files: &[(&str, &str)]) -> Self {
        let set = Self::new();
        for (name, source) in files {
            set.write(name, source);
        }
        set
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, source: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, source).expect("write grammar");
        path
    }
}

/// Load `name` from `set` into a fresh workspace.
pub fn workspace_with(set: &GrammarSet, name: &str) -> Workspace {
    let mut workspace = Workspace::new();
    workspace.load_grammar(set.path(name), None);
    workspace
}
