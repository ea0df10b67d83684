//! Semantic checks over a collected symbol table.
//!
//! Reports references that resolve nowhere in the grammar, its dependency
//! closure or the runtime built-ins, duplicate definitions and constructs that
//! the grammar type does not allow.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::base::LineIndex;
use crate::parser::{AstNode, GrammarFile, GrammarType, Rule, SyntaxKind};

use super::diagnostics::{Diagnostic, codes, sort_diagnostics};
use super::symbol_table::{Occurrence, SymbolKind, SymbolTable};

pub(crate) struct SemanticChecker<'a> {
    table: &'a SymbolTable,
    dependencies: &'a [&'a SymbolTable],
    builtins: SymbolTable,
    index: &'a LineIndex<'a>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> SemanticChecker<'a> {
    pub fn new(
        table: &'a SymbolTable,
        dependencies: &'a [&'a SymbolTable],
        index: &'a LineIndex<'a>,
    ) -> Self {
        Self {
            table,
            dependencies,
            builtins: SymbolTable::builtins(),
            index,
            diagnostics: Vec::new(),
        }
    }

    pub fn check(mut self, file: &GrammarFile) -> Vec<Diagnostic> {
        self.check_references();
        self.check_duplicates();
        self.check_rule_kinds(file);
        self.check_channels(file);
        sort_diagnostics(&mut self.diagnostics);
        self.diagnostics
    }

    /// Whether a name is visible with one of the given kinds
    fn resolves(&self, name: &str, kinds: &[SymbolKind]) -> bool {
        std::iter::once(self.table)
            .chain(self.dependencies.iter().copied())
            .chain(std::iter::once(&self.builtins))
            .any(|table| table.lookup_kind(name, kinds).is_some())
    }

    fn check_references(&mut self) {
        let table = self.table;
        let unresolved: Vec<(&Occurrence, &str, &str)> = table
            .occurrences()
            .iter()
            .filter(|o| !o.is_definition)
            .filter_map(|o| {
                let (kinds, message, code): (&[SymbolKind], _, _) = match o.kind {
                    SymbolKind::TokenReference => {
                        (SymbolKind::TOKENS, "Unknown token reference", codes::UNKNOWN_TOKEN)
                    }
                    SymbolKind::RuleReference => {
                        (&[SymbolKind::ParserRule], "Unknown parser rule", codes::UNKNOWN_RULE)
                    }
                    SymbolKind::TokenChannel => {
                        (SymbolKind::CHANNELS, "Unknown channel", codes::UNKNOWN_CHANNEL)
                    }
                    SymbolKind::LexerMode => {
                        (SymbolKind::MODES, "Unknown mode", codes::UNKNOWN_MODE)
                    }
                    _ => return None,
                };
                (!self.resolves(&o.name, kinds)).then_some((o, message, code))
            })
            .collect();

        for (occurrence, message, code) in unresolved {
            let diagnostic = Diagnostic::error_at(
                self.index,
                occurrence.range,
                format!("{message} '{}'", occurrence.name),
            )
            .with_code(code);
            self.diagnostics.push(diagnostic);
        }
    }

    fn check_duplicates(&mut self) {
        let mut seen: FxHashSet<(Namespace, SmolStr)> = FxHashSet::default();
        let mut duplicates = Vec::new();
        for symbol in self.table.iter_symbols() {
            let Some(namespace) = Namespace::of(symbol.kind) else {
                continue;
            };
            if !seen.insert((namespace, symbol.name.clone()))
                && let Some(range) = symbol.name_range
            {
                duplicates.push((symbol.name.clone(), range));
            }
        }
        for (name, range) in duplicates {
            self.diagnostics.push(
                Diagnostic::error_at(self.index, range, format!("Duplicate symbol '{name}'"))
                    .with_code(codes::DUPLICATE_SYMBOL),
            );
        }
    }

    fn check_rule_kinds(&mut self, file: &GrammarFile) {
        let grammar_type = file.grammar_type();
        for rule in file.rules() {
            let Some(name) = rule.name() else {
                continue;
            };
            let message = match (&rule, grammar_type) {
                (Rule::Lexer(_), GrammarType::Parser) => {
                    format!("Lexer rule '{}' is not allowed in a parser grammar", name.text())
                }
                (Rule::Parser(_), GrammarType::Lexer) => {
                    format!("Parser rule '{}' is not allowed in a lexer grammar", name.text())
                }
                _ => continue,
            };
            self.diagnostics.push(
                Diagnostic::error_at(self.index, name.text_range(), message)
                    .with_code(codes::RULE_NOT_ALLOWED),
            );
        }
    }

    fn check_channels(&mut self, file: &GrammarFile) {
        if file.grammar_type() == GrammarType::Lexer {
            return;
        }
        for spec in file.channels_specs() {
            let keyword = spec
                .syntax()
                .children_with_tokens()
                .filter_map(|e| e.into_token())
                .find(|t| t.kind() == SyntaxKind::CHANNELS_KW);
            if let Some(keyword) = keyword {
                self.diagnostics.push(
                    Diagnostic::error_at(
                        self.index,
                        keyword.text_range(),
                        "Custom channels are only allowed in lexer grammars",
                    )
                    .with_code(codes::CHANNELS_NOT_ALLOWED),
                );
            }
        }
    }
}

/// Groups of kinds that share one name space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Namespace {
    Rules,
    Channels,
    Modes,
}

impl Namespace {
    fn of(kind: SymbolKind) -> Option<Self> {
        match kind {
            SymbolKind::ParserRule
            | SymbolKind::LexerRule
            | SymbolKind::FragmentLexerToken
            | SymbolKind::VirtualLexerToken => Some(Self::Rules),
            SymbolKind::TokenChannel => Some(Self::Channels),
            SymbolKind::LexerMode => Some(Self::Modes),
            _ => None,
        }
    }
}

/// Run the semantic checks for a grammar against its dependency tables.
pub(crate) fn check_grammar(
    file: &GrammarFile,
    table: &SymbolTable,
    dependencies: &[&SymbolTable],
    index: &LineIndex<'_>,
) -> Vec<Diagnostic> {
    SemanticChecker::new(table, dependencies, index).check(file)
}
