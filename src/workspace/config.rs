//! Workspace configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::generation::ToolConfig;
use crate::syntax::FormattingOptions;

/// Settings shared by all grammars of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Searched before the grammar's own directory when resolving imports
    pub import_dir: Option<PathBuf>,
    /// Options for `format_grammar` when the caller passes none
    pub default_format_options: FormattingOptions,
    pub tool: ToolConfig,
}

impl WorkspaceConfig {
    /// Reads a JSON configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: WorkspaceConfig = serde_json::from_str(
            r#"{ "importDir": "lib", "tool": { "jar": "antlr-4.13.2-complete.jar" } }"#,
        )
        .unwrap();
        assert_eq!(config.import_dir, Some(PathBuf::from("lib")));
        assert_eq!(config.tool.java, PathBuf::from("java"));
        assert_eq!(
            config.tool.jar,
            Some(PathBuf::from("antlr-4.13.2-complete.jar"))
        );
        assert_eq!(config.default_format_options, FormattingOptions::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g4.json");
        std::fs::write(&path, r#"{ "defaultFormatOptions": { "columnLimit": 80 } }"#).unwrap();

        let config = WorkspaceConfig::from_file(&path).unwrap();
        assert_eq!(config.default_format_options.column_limit, 80);
        assert!(WorkspaceConfig::from_file(&dir.path().join("missing.json")).is_err());
    }
}
