//! Symbol listing for workspace and document views.

use crate::context::GrammarContext;
use crate::semantic::{Symbol, SymbolInfo};

/// Get all named definitions of the given grammars, optionally filtered by a
/// query (case-insensitive substring match).
///
/// # Returns
/// List of matching symbols, sorted by name.
pub fn workspace_symbols<'a>(
    contexts: impl IntoIterator<Item = &'a GrammarContext>,
    query: Option<&str>,
) -> Vec<SymbolInfo> {
    let query_lower = query.map(str::to_lowercase);

    let mut results: Vec<SymbolInfo> = contexts
        .into_iter()
        .flat_map(|context| context.symbol_table().iter_symbols())
        .filter(|symbol| symbol.kind.is_named_definition())
        .filter(|symbol| match &query_lower {
            Some(q) => symbol.name.to_lowercase().contains(q.as_str()),
            None => true,
        })
        .map(SymbolInfo::from)
        .collect();

    results.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.source.cmp(&b.source)));
    results
}

/// Get the named definitions of one grammar for a document outline, in source
/// order.
pub fn document_symbols(context: &GrammarContext) -> Vec<SymbolInfo> {
    let mut symbols: Vec<&Symbol> = context
        .symbol_table()
        .iter_symbols()
        .filter(|symbol| symbol.kind.is_named_definition() && symbol.text_range.is_some())
        .collect();
    symbols.sort_by_key(|symbol| symbol.text_range.map(|range| range.start()));
    symbols.into_iter().map(SymbolInfo::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::SymbolKind;

    #[test]
    fn test_workspace_symbols_with_filter() {
        let lexer = GrammarContext::new("L.g4", "lexer grammar L;\nTRUCK: 'truck';\nCAR: 'car';\n");
        let parser = GrammarContext::new("P.g4", "parser grammar P;\ntruckLoad: TRUCK+;\n");

        let results = workspace_symbols([&lexer, &parser], Some("truck"));
        let names: Vec<&str> = results.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["TRUCK", "truckLoad"]);

        assert_eq!(workspace_symbols([&lexer], None).len(), 2);
    }

    #[test]
    fn test_document_symbols_in_source_order() {
        let context = GrammarContext::new(
            "T.g4",
            "grammar T;\nchannels { C }\nb: A;\na: b;\nA: 'a';\n",
        );
        let outline = document_symbols(&context);
        let entries: Vec<(&str, SymbolKind)> =
            outline.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            entries,
            vec![
                ("C", SymbolKind::TokenChannel),
                ("b", SymbolKind::ParserRule),
                ("a", SymbolKind::ParserRule),
                ("A", SymbolKind::LexerRule),
            ]
        );
    }
}
