//! Formatting options
//!
//! Options deserialize from JSON with camelCase keys, the format used by
//! `.antlr-format` files. Missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Placement of the semicolon ending a multi-line rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlignSemicolons {
    /// Directly after the last alternative
    None,
    /// On its own line, under the colon
    OwnLine,
    /// On its own line, indented
    Hanging,
}

/// Placement of the colon after a rule name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlignColons {
    /// Directly after the rule name
    None,
    /// After the rule name, aligned with the colons of neighbouring rules
    Trailing,
    /// On the line below the rule name, indented
    Hanging,
}

/// Formatting options for grammar source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormattingOptions {
    pub align_trailing_comments: bool,
    pub allow_short_blocks_on_a_single_line: bool,
    pub allow_short_rules_on_a_single_line: bool,
    pub align_semicolons: AlignSemicolons,
    pub break_before_braces: bool,
    pub column_limit: usize,
    pub continuation_indent_width: usize,
    pub indent_width: usize,
    pub keep_empty_lines_at_the_start_of_blocks: bool,
    pub max_empty_lines_to_keep: usize,
    pub reflow_comments: bool,
    pub space_before_assignment_operators: bool,
    pub tab_width: usize,
    pub use_tab: bool,
    pub align_colons: AlignColons,
    pub single_line_overrules_hanging_colon: bool,
    pub align_lexer_commands: bool,
    pub align_labels: bool,
    pub align_actions: bool,
    /// Align labels, lexer commands, actions and trailing comments in one column
    pub align_trailers: bool,
    pub break_before_parens: bool,
    pub rule_internals_on_single_line: bool,
    pub min_empty_lines: usize,
    pub grouped_alignments: bool,
    pub align_first_tokens: bool,
    pub space_before_colon: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            align_trailing_comments: false,
            allow_short_blocks_on_a_single_line: true,
            allow_short_rules_on_a_single_line: true,
            align_semicolons: AlignSemicolons::OwnLine,
            break_before_braces: false,
            column_limit: 100,
            continuation_indent_width: 4,
            indent_width: 4,
            keep_empty_lines_at_the_start_of_blocks: false,
            max_empty_lines_to_keep: 1,
            reflow_comments: false,
            space_before_assignment_operators: true,
            tab_width: 4,
            use_tab: false,
            align_colons: AlignColons::None,
            single_line_overrules_hanging_colon: true,
            align_lexer_commands: false,
            align_labels: true,
            align_actions: false,
            align_trailers: false,
            break_before_parens: false,
            rule_internals_on_single_line: false,
            min_empty_lines: 0,
            grouped_alignments: true,
            align_first_tokens: false,
            space_before_colon: false,
        }
    }
}

impl FormattingOptions {
    /// Reads options from a JSON file such as `.antlr-format`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Sets one option from its camelCase name and textual value. Returns
    /// `false` for unknown keys and values that do not parse.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        fn flag(value: &str) -> Option<bool> {
            match value {
                "true" | "on" => Some(true),
                "false" | "off" => Some(false),
                _ => None,
            }
        }
        fn number(value: &str) -> Option<usize> {
            value.parse().ok()
        }

        macro_rules! assign {
            ($field:ident, $parse:expr) => {
                match $parse(value) {
                    Some(parsed) => {
                        self.$field = parsed;
                        true
                    }
                    None => false,
                }
            };
        }

        match key {
            "alignTrailingComments" => assign!(align_trailing_comments, flag),
            "allowShortBlocksOnASingleLine" => assign!(allow_short_blocks_on_a_single_line, flag),
            "allowShortRulesOnASingleLine" => assign!(allow_short_rules_on_a_single_line, flag),
            "alignSemicolons" => assign!(align_semicolons, |v: &str| match v {
                "none" => Some(AlignSemicolons::None),
                "ownLine" => Some(AlignSemicolons::OwnLine),
                "hanging" => Some(AlignSemicolons::Hanging),
                _ => None,
            }),
            "breakBeforeBraces" => assign!(break_before_braces, flag),
            "columnLimit" => assign!(column_limit, number),
            "continuationIndentWidth" => assign!(continuation_indent_width, number),
            "indentWidth" => assign!(indent_width, number),
            "keepEmptyLinesAtTheStartOfBlocks" => {
                assign!(keep_empty_lines_at_the_start_of_blocks, flag)
            }
            "maxEmptyLinesToKeep" => assign!(max_empty_lines_to_keep, number),
            "reflowComments" => assign!(reflow_comments, flag),
            "spaceBeforeAssignmentOperators" => assign!(space_before_assignment_operators, flag),
            "tabWidth" => assign!(tab_width, number),
            "useTab" => assign!(use_tab, flag),
            "alignColons" => assign!(align_colons, |v: &str| match v {
                "none" => Some(AlignColons::None),
                "trailing" => Some(AlignColons::Trailing),
                "hanging" => Some(AlignColons::Hanging),
                _ => None,
            }),
            "singleLineOverrulesHangingColon" => {
                assign!(single_line_overrules_hanging_colon, flag)
            }
            "alignLexerCommands" => assign!(align_lexer_commands, flag),
            "alignLabels" => assign!(align_labels, flag),
            "alignActions" => assign!(align_actions, flag),
            "alignTrailers" => assign!(align_trailers, flag),
            "breakBeforeParens" => assign!(break_before_parens, flag),
            "ruleInternalsOnSingleLine" => assign!(rule_internals_on_single_line, flag),
            "minEmptyLines" => assign!(min_empty_lines, number),
            "groupedAlignments" => assign!(grouped_alignments, flag),
            "alignFirstTokens" => assign!(align_first_tokens, flag),
            "spaceBeforeColon" => assign!(space_before_colon, flag),
            _ => false,
        }
    }

    /// Whitespace for an indentation of `columns` display columns.
    pub fn indentation(&self, columns: usize) -> String {
        if self.use_tab && self.tab_width > 0 {
            let mut text = "\t".repeat(columns / self.tab_width);
            text.push_str(&" ".repeat(columns % self.tab_width));
            text
        } else {
            " ".repeat(columns)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options: FormattingOptions =
            serde_json::from_str(r#"{ "columnLimit": 80, "alignColons": "hanging" }"#).unwrap();
        assert_eq!(options.column_limit, 80);
        assert_eq!(options.align_colons, AlignColons::Hanging);
        assert_eq!(options.indent_width, 4);
        assert_eq!(options.align_semicolons, AlignSemicolons::OwnLine);
    }

    #[test]
    fn test_set_by_name() {
        let mut options = FormattingOptions::default();
        assert!(options.set("useTab", "on"));
        assert!(options.set("alignSemicolons", "hanging"));
        assert!(options.set("minEmptyLines", "2"));
        assert!(!options.set("columnLimit", "wide"));
        assert!(!options.set("noSuchOption", "true"));
        assert!(options.use_tab);
        assert_eq!(options.align_semicolons, AlignSemicolons::Hanging);
        assert_eq!(options.min_empty_lines, 2);
        assert_eq!(options.column_limit, 100);
    }

    #[test]
    fn test_indentation_with_tabs() {
        let mut options = FormattingOptions::default();
        assert_eq!(options.indentation(6), "      ");
        options.use_tab = true;
        assert_eq!(options.indentation(6), "\t  ");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".antlr-format");
        std::fs::write(&path, r#"{ "alignTrailingComments": true }"#).unwrap();
        let options = FormattingOptions::from_file(&path).unwrap();
        assert!(options.align_trailing_comments);
        assert!(FormattingOptions::from_file(&dir.path().join("missing")).is_err());
    }
}
