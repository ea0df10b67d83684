//! Diagnostics: syntax and semantic error reporting.
//!
//! Diagnostics accumulate per grammar file and are never fatal.

use std::sync::Arc;

use rowan::TextRange;
use serde::{Deserialize, Serialize};

use crate::base::{LexicalRange, LineIndex};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Error/warning code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
    pub range: LexicalRange,
    /// Byte range in the grammar source, used for ordering.
    #[serde(skip)]
    pub offset: Option<TextRange>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(range: LexicalRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            range,
            offset: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(range: LexicalRange, message: impl Into<Arc<str>>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(range, message)
        }
    }

    /// Error covering a token of the source text.
    pub fn error_at(index: &LineIndex<'_>, range: TextRange, message: impl Into<Arc<str>>) -> Self {
        Self::error(index.token_range(range), message).with_offset(range)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(Arc::from(code));
        self
    }

    pub fn with_offset(mut self, offset: TextRange) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Order diagnostics by their position in the source.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| (d.range.start, d.offset.map(|o| o.start())));
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Diagnostic codes for grammar errors.
///
/// - **E0001-E0099**: syntax and semantic errors
/// - **E0100-**: errors found while generating
#[allow(dead_code)]
pub mod codes {
    /// Syntax error reported by the parser.
    pub const SYNTAX_ERROR: &str = "E0001";
    /// Reference to an undefined token.
    pub const UNKNOWN_TOKEN: &str = "E0002";
    /// Reference to an undefined parser rule.
    pub const UNKNOWN_RULE: &str = "E0003";
    /// Reference to an undefined channel.
    pub const UNKNOWN_CHANNEL: &str = "E0004";
    /// Reference to an undefined lexer mode.
    pub const UNKNOWN_MODE: &str = "E0005";
    /// Duplicate definition.
    pub const DUPLICATE_SYMBOL: &str = "E0006";
    /// Rule kind not allowed in this grammar type.
    pub const RULE_NOT_ALLOWED: &str = "E0007";
    /// `channels {}` outside a lexer grammar.
    pub const CHANNELS_NOT_ALLOWED: &str = "E0008";
    /// Mutually left-recursive rules.
    pub const LEFT_RECURSION: &str = "E0100";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Position;

    #[test]
    fn test_error_at_uses_token_range() {
        let text = "grammar t;\n\na: ZZ b;";
        let index = LineIndex::new(text);
        let range = TextRange::new(15.into(), 17.into());
        let diagnostic = Diagnostic::error_at(&index, range, "Unknown token reference 'ZZ'");
        assert_eq!(diagnostic.range.start, Position::new(3, 3));
        assert_eq!(diagnostic.range.end, Position::new(3, 5));
        assert!(diagnostic.is_error());
    }

    #[test]
    fn test_sort_diagnostics() {
        let mut diagnostics = vec![
            Diagnostic::warning(LexicalRange::from_coords(5, 0, 5, 1), "b"),
            Diagnostic::error(LexicalRange::from_coords(2, 3, 2, 4), "a"),
        ];
        sort_diagnostics(&mut diagnostics);
        assert_eq!(&*diagnostics[0].message, "a");
        assert_eq!(diagnostics[1].severity, Severity::Warning);
    }
}
