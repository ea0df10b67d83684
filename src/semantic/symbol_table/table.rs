use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::symbol::{Occurrence, Symbol, SymbolId, SymbolKind};

/// Source name used for symbols provided by the ANTLR runtime
pub const BUILTIN_SOURCE: &str = "ANTLR runtime";

/// Symbols and name occurrences of one grammar file.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Arena storage for all symbols, in definition order
    pub(super) arena: Vec<Symbol>,
    /// Name index over named definitions; duplicates keep every id
    pub(super) by_name: FxHashMap<SmolStr, Vec<SymbolId>>,
    pub(super) occurrences: Vec<Occurrence>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols every grammar can see without defining them.
    pub fn builtins() -> Self {
        let mut table = Self::new();
        for (name, kind) in [
            ("EOF", SymbolKind::BuiltInLexerToken),
            ("DEFAULT_MODE", SymbolKind::BuiltInMode),
            ("DEFAULT_TOKEN_CHANNEL", SymbolKind::BuiltInChannel),
            ("HIDDEN", SymbolKind::BuiltInChannel),
        ] {
            table.insert(Symbol::new(name, kind, BUILTIN_SOURCE));
        }
        table
    }

    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::new(self.arena.len());
        if symbol.kind.is_named_definition() {
            self.by_name.entry(symbol.name.clone()).or_default().push(id);
        }
        self.arena.push(symbol);
        id
    }

    pub fn add_occurrence(&mut self, occurrence: Occurrence) {
        self.occurrences.push(occurrence);
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.arena.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}
