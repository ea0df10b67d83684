//! Error types for operations that can fail outside of diagnostics.
//!
//! Parsing and semantic problems never surface here: they are reported as
//! diagnostics on the grammar. Only generation, interpreter-data loading and
//! configuration loading return [`GrammarError`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while generating or loading grammar artifacts.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The external generation tool failed; carries its raw output.
    #[error("{message}")]
    Tool { message: String },

    /// A `.interp` file could not be read.
    #[error("Invalid interpreter data in {}: {message}", path.display())]
    InterpreterData { path: PathBuf, message: String },

    /// The grammar is not part of the workspace and could not be loaded.
    #[error("Unknown grammar: {}", .0.display())]
    UnknownGrammar(PathBuf),

    /// JSON configuration error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GrammarError {
    /// Create a tool error.
    pub fn tool(message: impl Into<String>) -> Self {
        Self::Tool {
            message: message.into(),
        }
    }

    /// Create an interpreter data error.
    pub fn interpreter_data(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InterpreterData {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias for fallible grammar operations.
pub type Result<T> = std::result::Result<T, GrammarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_displays_raw_text() {
        let error = GrammarError::tool("error(50): T.g4:3:4: syntax error");
        assert_eq!(error.to_string(), "error(50): T.g4:3:4: syntax error");
    }

    #[test]
    fn test_interpreter_data_error_names_file() {
        let error = GrammarError::interpreter_data("out/T.interp", "missing atn section");
        assert_eq!(
            error.to_string(),
            "Invalid interpreter data in out/T.interp: missing atn section"
        );
    }
}
