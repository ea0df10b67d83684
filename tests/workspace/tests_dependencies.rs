//! Reference counting and dependency resolution through the public API.

use g4::Workspace;
use rstest::rstest;

use crate::helpers::grammar_fixtures::*;
use crate::helpers::workspace_helpers::*;

// =============================================================================
// REFERENCE COUNTING
// =============================================================================

#[test]
fn test_second_load_returns_same_context() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let mut workspace = Workspace::new();

    let first = workspace.load_grammar(set.path("Calc.g4"), None);
    let second = workspace.load_grammar(set.path("Calc.g4"), None);
    assert_eq!(first, second);

    workspace.release_grammar(set.path("Calc.g4"));
    assert!(
        workspace.is_loaded(set.path("Calc.g4")),
        "one release after two loads must keep the grammar"
    );
    assert_eq!(workspace.context_id(set.path("Calc.g4")), Some(first));
}

#[test]
fn test_release_frees_unshared_dependencies_only() {
    let set = GrammarSet::with(&[
        ("StatementsLexer.g4", STATEMENTS_LEXER),
        ("StatementsParser.g4", STATEMENTS_PARSER),
        ("Common.g4", COMMON_LEXER),
        (
            "Main.g4",
            "grammar Main;\noptions { tokenVocab = StatementsLexer; }\nimport Common;\nr: ID Semicolon;\n",
        ),
    ]);
    let mut workspace = Workspace::new();
    workspace.load_grammar(set.path("StatementsParser.g4"), None);
    workspace.load_grammar(set.path("Main.g4"), None);
    assert_eq!(workspace.ref_count(set.path("StatementsLexer.g4")), 2);
    assert_eq!(workspace.context_count(), 4);

    workspace.release_grammar(set.path("Main.g4"));
    assert!(!workspace.is_loaded(set.path("Main.g4")));
    assert!(!workspace.is_loaded(set.path("Common.g4")));
    assert_eq!(workspace.ref_count(set.path("StatementsLexer.g4")), 1);

    workspace.release_grammar(set.path("StatementsParser.g4"));
    assert_eq!(workspace.context_count(), 0);
}

#[test]
fn test_releasing_unknown_grammar_is_harmless() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let mut workspace = workspace_with(&set, "Calc.g4");
    workspace.release_grammar(set.path("Other.g4"));
    assert_eq!(workspace.ref_count(set.path("Calc.g4")), 1);
}

// =============================================================================
// EDITS
// =============================================================================

#[test]
fn test_import_swap_releases_old_target_once() {
    let set = GrammarSet::with(&[
        ("Common.g4", COMMON_LEXER),
        ("Other.g4", OTHER_LEXER),
        ("Main.g4", "grammar Main;\nimport Common;\nr: ID;\n"),
    ]);
    let mut workspace = workspace_with(&set, "Main.g4");
    // Common is also held by a direct load
    workspace.load_grammar(set.path("Common.g4"), None);
    assert_eq!(workspace.ref_count(set.path("Common.g4")), 2);

    workspace.set_text(set.path("Main.g4"), "grammar Main;\nimport Other;\nr: NAME;\n");
    assert_eq!(workspace.ref_count(set.path("Common.g4")), 1);
    assert_eq!(workspace.ref_count(set.path("Other.g4")), 1);
    assert_eq!(
        workspace.get_dependencies(set.path("Main.g4")),
        vec![set.path("Other.g4")]
    );
    assert!(workspace.get_diagnostics(set.path("Main.g4")).is_empty());
}

#[test]
fn test_renamed_import_leaves_no_stale_entries() {
    let set = GrammarSet::with(&[
        ("Common.g4", COMMON_LEXER),
        ("Main.g4", "grammar Main;\nimport Common;\nr: ID;\n"),
    ]);
    let mut workspace = workspace_with(&set, "Main.g4");

    set.write("Renamed.g4", "lexer grammar Renamed;\nID: [a-z]+;\n");
    workspace.set_text(set.path("Main.g4"), "grammar Main;\nimport Renamed;\nr: ID;\n");
    assert!(!workspace.is_loaded(set.path("Common.g4")));

    workspace.release_grammar(set.path("Main.g4"));
    assert_eq!(workspace.context_count(), 0, "{:?}", workspace.loaded_paths());
}

#[rstest]
#[case::same_text("grammar Main;\nimport Common;\nr: ID;\n", 1)]
#[case::import_removed("grammar Main;\nr: 'x';\n", 0)]
#[case::import_repeated("grammar Main;\nimport Common, Common;\nr: ID;\n", 1)]
fn test_reparse_keeps_counts_balanced(#[case] text: &str, #[case] expected: usize) {
    let set = GrammarSet::with(&[
        ("Common.g4", COMMON_LEXER),
        ("Main.g4", "grammar Main;\nimport Common;\nr: ID;\n"),
    ]);
    let mut workspace = workspace_with(&set, "Main.g4");
    workspace.set_text(set.path("Main.g4"), text);
    assert_eq!(workspace.ref_count(set.path("Common.g4")), expected);
}
