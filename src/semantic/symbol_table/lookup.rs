use rowan::TextSize;

use super::symbol::{Occurrence, Symbol, SymbolId, SymbolKind};
use super::table::SymbolTable;

impl SymbolTable {
    // ============================================================
    // Name Lookups
    // ============================================================

    /// First named definition with this name
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.lookup_all(name).next()
    }

    /// First named definition with this name and one of the given kinds
    pub fn lookup_kind(&self, name: &str, kinds: &[SymbolKind]) -> Option<&Symbol> {
        self.lookup_all(name).find(|s| kinds.contains(&s.kind))
    }

    /// Every named definition with this name, in definition order
    pub fn lookup_all(&self, name: &str) -> impl Iterator<Item = &Symbol> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.arena.get(id.index()))
    }

    // ============================================================
    // Enumeration
    // ============================================================

    /// Returns an iterator over all symbols in definition order
    pub fn iter_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.arena.iter()
    }

    /// Returns an iterator over all symbols with their IDs
    pub fn iter_symbols_with_ids(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.arena
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId::new(i), s))
    }

    pub fn symbols_of_kind<'a>(
        &'a self,
        kinds: &'a [SymbolKind],
    ) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.arena.iter().filter(move |s| kinds.contains(&s.kind))
    }

    /// Top level symbols: everything without an enclosing symbol
    pub fn top_level_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.arena.iter().filter(|s| s.parent.is_none())
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// References (not definitions) to a name
    pub fn references_to<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Occurrence> + 'a {
        self.occurrences
            .iter()
            .filter(move |o| !o.is_definition && o.name == name)
    }

    // ============================================================
    // Position Lookups
    // ============================================================

    /// Innermost symbol whose definition contains the offset
    pub fn symbol_containing(&self, offset: TextSize) -> Option<&Symbol> {
        self.arena
            .iter()
            .filter(|s| {
                s.text_range
                    .is_some_and(|r| r.start() <= offset && offset <= r.end())
            })
            .min_by_key(|s| s.text_range.map(|r| r.len()))
    }

    /// Innermost rule whose definition contains the offset
    pub fn rule_containing(&self, offset: TextSize) -> Option<&Symbol> {
        self.arena
            .iter()
            .filter(|s| s.kind.is_rule())
            .find(|s| {
                s.text_range
                    .is_some_and(|r| r.start() <= offset && offset <= r.end())
            })
    }
}
