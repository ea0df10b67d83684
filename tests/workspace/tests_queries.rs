//! Queries answered through the workspace.

use g4::ide::CompletionKind;
use g4::{LexicalRange, Position, SymbolKind, Workspace};

use crate::helpers::grammar_fixtures::*;
use crate::helpers::workspace_helpers::*;

// =============================================================================
// SYMBOLS
// =============================================================================

#[test]
fn test_lexer_rule_found_inside_its_definition() {
    let set = GrammarSet::with(&[("t.g4", UNRESOLVED)]);
    let mut workspace = Workspace::new();

    let info = workspace
        .symbol_info_at_position(set.path("t.g4"), Position::new(7, 2))
        .expect("symbol at 7:2");
    assert_eq!(info.name, "B");
    assert_eq!(info.kind, SymbolKind::LexerRule);
    let definition = info.definition.expect("definition");
    assert_eq!(definition.text, "B: 'B';");
    assert_eq!(definition.range, LexicalRange::from_coords(7, 0, 7, 6));
    // The query loaded the grammar on demand
    assert_eq!(workspace.ref_count(set.path("t.g4")), 1);
}

#[test]
fn test_derived_lists() {
    let set = GrammarSet::with(&[(
        "L.g4",
        "lexer grammar L;\nchannels { COMMENTS }\nA: 'a' {act();};\nmode M;\nB: 'b' {p()}?;\n",
    )]);
    let mut workspace = workspace_with(&set, "L.g4");
    let path = set.path("L.g4");

    assert_eq!(workspace.get_rule_list(&path), vec!["A", "B"]);
    assert_eq!(
        workspace.get_channels(&path),
        vec!["DEFAULT_TOKEN_CHANNEL", "HIDDEN", "COMMENTS"]
    );
    assert_eq!(workspace.get_modes(&path), vec!["DEFAULT_MODE", "M"]);
    assert_eq!(workspace.get_action_counts(&path).lexer_predicates, 1);
    assert_eq!(workspace.list_actions(&path).len(), 2);
    assert!(workspace.get_lexer_vocabulary(&path).is_none());
}

#[test]
fn test_workspace_symbols_span_loaded_grammars() {
    let set = GrammarSet::with(&[
        ("StatementsLexer.g4", STATEMENTS_LEXER),
        ("StatementsParser.g4", STATEMENTS_PARSER),
    ]);
    let workspace = workspace_with(&set, "StatementsParser.g4");

    let names: Vec<String> = workspace
        .workspace_symbols(Some("semi"))
        .into_iter()
        .map(|symbol| symbol.name)
        .collect();
    assert_eq!(names, vec!["Semicolon"]);
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

#[test]
fn test_unknown_token_and_channel_diagnostics() {
    let set = GrammarSet::with(&[("t.g4", UNRESOLVED)]);
    let mut workspace = workspace_with(&set, "t.g4");

    let diagnostics = workspace.get_diagnostics(set.path("t.g4"));
    assert_eq!(diagnostics.len(), 2, "{diagnostics:?}");
    assert_eq!(&*diagnostics[0].message, "Unknown token reference 'ZZ'");
    assert_eq!(diagnostics[0].range, LexicalRange::from_coords(3, 3, 3, 5));
    assert_eq!(&*diagnostics[1].message, "Unknown channel 'BLAH'");
    assert_eq!(diagnostics[1].range, LexicalRange::from_coords(8, 18, 8, 22));
    assert!(workspace.has_errors(set.path("t.g4")));
}

#[test]
fn test_token_vocabulary_satisfies_references() {
    let set = GrammarSet::with(&[
        ("StatementsLexer.g4", STATEMENTS_LEXER),
        ("StatementsParser.g4", STATEMENTS_PARSER),
    ]);
    let mut workspace = Workspace::new();
    assert!(!workspace.has_errors(set.path("StatementsParser.g4")));
}

// =============================================================================
// REFERENCES
// =============================================================================

#[test]
fn test_reference_count_of_semicolon() {
    let set = GrammarSet::with(&[
        ("StatementsLexer.g4", STATEMENTS_LEXER),
        ("StatementsParser.g4", STATEMENTS_PARSER),
    ]);
    let mut workspace = workspace_with(&set, "StatementsParser.g4");

    assert_eq!(
        workspace.count_references(set.path("StatementsParser.g4"), "Semicolon"),
        4
    );
    // Counted from the defining lexer, through its dependent
    assert_eq!(
        workspace.count_references(set.path("StatementsLexer.g4"), "Semicolon"),
        4
    );
}

#[test]
fn test_reference_graph_includes_imported_rules() {
    let set = GrammarSet::with(&[
        ("Common.g4", COMMON_LEXER),
        ("Main.g4", "grammar Main;\nimport Common;\nr: ID s;\ns: ID;\n"),
    ]);
    let mut workspace = workspace_with(&set, "Main.g4");

    let graph = workspace.get_reference_graph(set.path("Main.g4"));
    let keys: Vec<&str> = graph.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["r", "s", "ID", "WS"]);
    assert!(graph["r"].rules.contains("s"));
    assert!(graph["r"].tokens.contains("ID"));
}

// =============================================================================
// VIEWS
// =============================================================================

#[test]
fn test_completion_offers_imported_tokens() {
    let set = GrammarSet::with(&[("Common.g4", COMMON_LEXER)]);
    let mut workspace = Workspace::new();
    let main = set.path("Main.g4");
    workspace.load_grammar(&main, Some("grammar Main;\nimport Common;\nr: I"));

    let items = workspace.get_code_completion_candidates(&main, Position::new(3, 4));
    let labels: Vec<&str> = items.iter().map(|item| &*item.label).collect();
    assert_eq!(labels, vec!["ID"]);
    assert_eq!(items[0].kind, CompletionKind::LexerToken);
}

#[test]
fn test_rrd_script_for_imported_rule() {
    let set = GrammarSet::with(&[
        ("Common.g4", COMMON_LEXER),
        ("Main.g4", "grammar Main;\nimport Common;\nr: ID+;\n"),
    ]);
    let mut workspace = workspace_with(&set, "Main.g4");

    assert_eq!(
        workspace.get_rrd_script(set.path("Main.g4"), "r").as_deref(),
        Some("ComplexDiagram(OneOrMore(Terminal('ID'))).addTo()")
    );
    assert_eq!(
        workspace.get_rrd_script(set.path("Main.g4"), "ID").as_deref(),
        Some("Diagram(OneOrMore(Terminal('[a-z]'))).addTo()")
    );
    assert!(workspace.get_rrd_script(set.path("Main.g4"), "missing").is_none());
}

#[test]
fn test_atn_graph_needs_interpreter_data() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let mut workspace = workspace_with(&set, "Calc.g4");
    assert!(workspace.get_atn_graph(set.path("Calc.g4"), "expr").is_none());
}
