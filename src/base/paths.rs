//! Lexical path helpers. Grammar identity is the normalized path, never the
//! canonicalized one, so unsaved or missing files keep a stable key.

use std::path::{Component, Path, PathBuf};

/// Remove `.` components and fold `..` into its parent without touching the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_with_normal =
                    matches!(result.components().next_back(), Some(Component::Normal(_)));
                if ends_with_normal {
                    result.pop();
                } else if !matches!(
                    result.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_))
                ) {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Logical grammar name of a file: its stem (`dir/ExprLexer.g4` -> `ExprLexer`).
pub fn grammar_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("a/./b/../c/T.g4")),
            PathBuf::from("a/c/T.g4")
        );
        assert_eq!(normalize_path(Path::new("../x/T.g4")), PathBuf::from("../x/T.g4"));
        assert_eq!(normalize_path(Path::new("/a/../../T.g4")), PathBuf::from("/T.g4"));
    }

    #[test]
    fn test_grammar_name_of() {
        assert_eq!(grammar_name_of(Path::new("dir/ExprLexer.g4")), "ExprLexer");
        assert_eq!(grammar_name_of(Path::new("T.g")), "T");
    }
}
