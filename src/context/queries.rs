//! Single-file queries over a [`GrammarContext`].

use rowan::TextSize;
use serde::Serialize;

use crate::atn::{AtnGraphData, InterpreterData, Vocabulary, extract_graph};
use crate::base::{LexicalRange, Position};
use crate::semantic::{Occurrence, SymbolInfo, SymbolKind, SymbolTable};

use super::GrammarContext;

/// Number of actions and predicates per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCounts {
    pub global_named: usize,
    pub local_named: usize,
    pub parser_actions: usize,
    pub lexer_actions: usize,
    pub parser_predicates: usize,
    pub lexer_predicates: usize,
}

/// The rule enclosing a position. `index` is the rule's index in the loaded
/// interpreter data, if any is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleAtPosition {
    pub name: String,
    pub index: Option<usize>,
}

/// A use or the definition of a name, with the file it appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolOccurrence {
    pub name: String,
    pub kind: SymbolKind,
    pub source: String,
    pub range: LexicalRange,
    pub is_definition: bool,
}

/// Kinds a reference occurrence can resolve to.
fn target_kinds(occurrence: &Occurrence) -> &'static [SymbolKind] {
    match occurrence.kind {
        SymbolKind::TokenReference => SymbolKind::TOKENS,
        SymbolKind::RuleReference => &[SymbolKind::ParserRule],
        SymbolKind::TokenChannel => SymbolKind::CHANNELS,
        SymbolKind::LexerMode => SymbolKind::MODES,
        SymbolKind::ParserRule => &[SymbolKind::ParserRule],
        _ => SymbolKind::TOKENS,
    }
}

impl GrammarContext {
    fn offset_of(&self, position: Position) -> Option<TextSize> {
        self.line_index().text_size(position)
    }

    /// Finds a name in this grammar, then in the runtime built-ins.
    fn resolve(&self, name: &str, kinds: &[SymbolKind]) -> Option<SymbolInfo> {
        let builtins = SymbolTable::builtins();
        [&self.symbol_table, &builtins]
            .into_iter()
            .find_map(|table| table.lookup_kind(name, kinds).map(SymbolInfo::from))
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    /// The symbol under a position: the definition of the name under the cursor,
    /// or the innermost symbol whose definition contains the position.
    pub fn symbol_info_at_position(&self, position: Position) -> Option<SymbolInfo> {
        let offset = self.offset_of(position)?;
        let occurrence = self
            .symbol_table
            .occurrences()
            .iter()
            .find(|o| o.range.start() <= offset && offset < o.range.end());
        if let Some(occurrence) = occurrence {
            let kinds: &[SymbolKind] = if occurrence.is_definition {
                std::slice::from_ref(&occurrence.kind)
            } else {
                target_kinds(occurrence)
            };
            return self.resolve(&occurrence.name, kinds);
        }
        self.symbol_table
            .symbol_containing(offset)
            .map(SymbolInfo::from)
    }

    /// The name of the definition or reference under a position.
    pub fn name_at_position(&self, position: Position) -> Option<&str> {
        let offset = self.offset_of(position)?;
        self.symbol_table
            .occurrences()
            .iter()
            .find(|o| o.range.start() <= offset && offset < o.range.end())
            .map(|o| o.name.as_str())
    }

    /// Information about a named symbol of this grammar or the runtime.
    pub fn info_for_symbol(&self, name: &str) -> Option<SymbolInfo> {
        self.symbol_table
            .lookup(name)
            .map(SymbolInfo::from)
            .or_else(|| SymbolTable::builtins().lookup(name).map(SymbolInfo::from))
    }

    pub fn list_top_level_symbols(&self) -> Vec<SymbolInfo> {
        self.symbol_table
            .top_level_symbols()
            .map(SymbolInfo::from)
            .collect()
    }

    /// All rule names in definition order.
    pub fn rule_list(&self) -> Vec<String> {
        self.symbol_table
            .iter_symbols()
            .filter(|s| s.kind.is_rule())
            .map(|s| s.name.to_string())
            .collect()
    }

    /// Built-in channels followed by the channels the grammar declares.
    pub fn channels(&self) -> Vec<String> {
        self.names_of_kinds(SymbolKind::CHANNELS)
    }

    /// `DEFAULT_MODE` followed by the modes the grammar declares.
    pub fn modes(&self) -> Vec<String> {
        self.names_of_kinds(SymbolKind::MODES)
    }

    fn names_of_kinds(&self, kinds: &[SymbolKind]) -> Vec<String> {
        let builtins = SymbolTable::builtins();
        let mut names: Vec<String> = Vec::new();
        for symbol in builtins
            .symbols_of_kind(kinds)
            .chain(self.symbol_table.symbols_of_kind(kinds))
        {
            if !names.iter().any(|n| n == symbol.name.as_str()) {
                names.push(symbol.name.to_string());
            }
        }
        names
    }

    /// Actions and predicates, grouped by kind.
    pub fn list_actions(&self) -> Vec<SymbolInfo> {
        SymbolKind::ACTIONS
            .iter()
            .flat_map(|kind| self.symbol_table.symbols_of_kind(std::slice::from_ref(kind)))
            .map(SymbolInfo::from)
            .collect()
    }

    pub fn action_counts(&self) -> ActionCounts {
        let count = |kind: SymbolKind| {
            self.symbol_table
                .symbols_of_kind(std::slice::from_ref(&kind))
                .count()
        };
        ActionCounts {
            global_named: count(SymbolKind::GlobalNamedAction),
            local_named: count(SymbolKind::LocalNamedAction),
            parser_actions: count(SymbolKind::ParserAction),
            lexer_actions: count(SymbolKind::LexerAction),
            parser_predicates: count(SymbolKind::ParserPredicate),
            lexer_predicates: count(SymbolKind::LexerPredicate),
        }
    }

    // ========================================================================
    // Positions
    // ========================================================================

    pub fn rule_from_position(&self, position: Position) -> Option<RuleAtPosition> {
        let offset = self.offset_of(position)?;
        let rule = self.symbol_table.rule_containing(offset)?;
        let index = self
            .interpreter_data_for_rule(&rule.name)
            .and_then(|data| data.rule_index(&rule.name));
        Some(RuleAtPosition {
            name: rule.name.to_string(),
            index,
        })
    }

    /// The innermost symbol (or rule, with `rule_only`) containing a position.
    pub fn enclosing_symbol_at_position(
        &self,
        position: Position,
        rule_only: bool,
    ) -> Option<SymbolInfo> {
        let offset = self.offset_of(position)?;
        let symbol = if rule_only {
            self.symbol_table.rule_containing(offset)
        } else {
            self.symbol_table.symbol_containing(offset)
        };
        symbol.map(SymbolInfo::from)
    }

    // ========================================================================
    // References
    // ========================================================================

    /// References to `name` inside this grammar only.
    pub fn own_reference_count(&self, name: &str) -> usize {
        self.symbol_table.references_to(name).count()
    }

    /// Definitions and uses of `name` in this grammar.
    pub fn symbol_occurrences(&self, name: &str) -> Vec<SymbolOccurrence> {
        let source = self.path.to_string_lossy();
        self.symbol_table
            .occurrences()
            .iter()
            .filter(|o| o.name == name)
            .map(|o| SymbolOccurrence {
                name: o.name.to_string(),
                kind: o.kind,
                source: source.to_string(),
                range: o.lexical,
                is_definition: o.is_definition,
            })
            .collect()
    }

    // ========================================================================
    // Interpreter data
    // ========================================================================

    /// Vocabulary of the lexer part of this grammar, once interpreter data is loaded.
    pub fn lexer_vocabulary(&self) -> Option<&Vocabulary> {
        self.lexer_data.as_ref().map(|data| &data.vocabulary)
    }

    /// The loaded interpreter data that defines `rule`.
    pub fn interpreter_data_for_rule(&self, rule: &str) -> Option<&InterpreterData> {
        [self.parser_data.as_ref(), self.lexer_data.as_ref()]
            .into_iter()
            .flatten()
            .find(|data| data.rule_index(rule).is_some())
    }

    /// Renderable automaton of one rule, `None` without interpreter data for it.
    pub fn atn_graph(&self, rule: &str) -> Option<AtnGraphData> {
        extract_graph(self.interpreter_data_for_rule(rule)?, rule)
    }
}
