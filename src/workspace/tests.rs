use std::path::{Path, PathBuf};

use super::*;

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

const LEXER: &str = "lexer grammar L;\nID: [a-z]+;\nWS: ' ' -> skip;\n";

#[test]
fn test_repeated_load_keeps_identity() {
    let mut workspace = Workspace::new();
    let first = workspace.load_grammar("T.g4", Some("grammar T;\nr: 'x';\n"));
    let second = workspace.load_grammar("./T.g4", None);

    assert_eq!(first, second);
    assert_eq!(workspace.ref_count("T.g4"), 2);
    // The second load must not replace the text
    assert_eq!(workspace.context("T.g4").unwrap().source(), "grammar T;\nr: 'x';\n");

    workspace.release_grammar("T.g4");
    assert!(workspace.is_loaded("T.g4"));
    workspace.release_grammar("T.g4");
    assert!(!workspace.is_loaded("T.g4"));

    let third = workspace.load_grammar("T.g4", Some("grammar T;\n"));
    assert_ne!(third, first);
}

#[test]
fn test_unreadable_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = Workspace::new();
    workspace.load_grammar(dir.path().join("Missing.g4"), None);

    let context = workspace.context(dir.path().join("Missing.g4")).unwrap();
    assert_eq!(context.source(), "");
    assert_eq!(context.grammar_name(), "Missing");
}

#[test]
fn test_dependencies_load_and_release_with_grammar() {
    let dir = tempfile::tempdir().unwrap();
    let lexer = write(dir.path(), "L.g4", LEXER);
    let parser = write(
        dir.path(),
        "P.g4",
        "parser grammar P;\noptions { tokenVocab = L; }\nr: ID+;\n",
    );

    let mut workspace = Workspace::new();
    workspace.load_grammar(&parser, None);
    assert_eq!(workspace.ref_count(&lexer), 1);
    assert_eq!(workspace.get_dependencies(&parser), vec![lexer.clone()]);
    assert_eq!(
        workspace.context(&lexer).unwrap().dependents().collect::<Vec<_>>(),
        vec![parser.as_path()]
    );

    workspace.release_grammar(&parser);
    assert_eq!(workspace.context_count(), 0);
}

#[test]
fn test_shared_dependency_survives_one_release() {
    let dir = tempfile::tempdir().unwrap();
    let lexer = write(dir.path(), "L.g4", LEXER);
    let first = write(dir.path(), "A.g4", "parser grammar A;\noptions { tokenVocab = L; }\na: ID;\n");
    let second = write(dir.path(), "B.g4", "parser grammar B;\noptions { tokenVocab = L; }\nb: ID;\n");

    let mut workspace = Workspace::new();
    workspace.load_grammar(&first, None);
    workspace.load_grammar(&second, None);
    assert_eq!(workspace.ref_count(&lexer), 2);

    workspace.release_grammar(&first);
    assert!(!workspace.is_loaded(&first));
    assert_eq!(workspace.ref_count(&lexer), 1);
    assert_eq!(
        workspace.context(&lexer).unwrap().dependents().collect::<Vec<_>>(),
        vec![second.as_path()]
    );

    workspace.release_grammar(&second);
    assert_eq!(workspace.context_count(), 0);
}

#[test]
fn test_explicitly_loaded_dependency_outlives_dependent() {
    let dir = tempfile::tempdir().unwrap();
    let lexer = write(dir.path(), "L.g4", LEXER);
    let parser = write(dir.path(), "P.g4", "parser grammar P;\noptions { tokenVocab = L; }\nr: ID;\n");

    let mut workspace = Workspace::new();
    workspace.load_grammar(&lexer, None);
    workspace.load_grammar(&parser, None);
    workspace.release_grammar(&parser);

    assert!(workspace.is_loaded(&lexer));
    assert_eq!(workspace.ref_count(&lexer), 1);
    assert_eq!(workspace.context(&lexer).unwrap().dependents().count(), 0);
}

#[test]
fn test_import_dir_wins_over_own_dir() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib");
    std::fs::create_dir(&lib).unwrap();
    write(dir.path(), "Common.g4", "lexer grammar Common;\nA: 'a';\n");
    let preferred = write(&lib, "Common.g4", "lexer grammar Common;\nB: 'b';\n");
    let main = write(dir.path(), "Main.g4", "grammar Main;\nimport Common;\nr: B;\n");

    let mut workspace = Workspace::with_config(WorkspaceConfig {
        import_dir: Some(lib),
        ..Default::default()
    });
    workspace.load_grammar(&main, None);
    assert_eq!(workspace.get_dependencies(&main), vec![preferred]);
    assert!(workspace.get_diagnostics(&main).is_empty());
}

#[test]
fn test_g_extension_is_tried_after_g4() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "Old.g", "lexer grammar Old;\nA: 'a';\n");
    let main = write(dir.path(), "Main.g4", "grammar Main;\nimport Old;\nr: A;\n");

    let mut workspace = Workspace::new();
    workspace.load_grammar(&main, None);
    assert_eq!(workspace.get_dependencies(&main), vec![old]);
}

#[test]
fn test_grammar_never_depends_on_itself() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "T.g4", "grammar T;\nimport T;\nr: 'x';\n");

    let mut workspace = Workspace::new();
    workspace.load_grammar(&main, None);
    assert!(workspace.get_dependencies(&main).is_empty());
    assert_eq!(workspace.ref_count(&main), 1);
}

#[test]
fn test_missing_dependency_is_reported_as_unknown_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let parser = write(dir.path(), "P.g4", "parser grammar P;\noptions { tokenVocab = L; }\nr: ID;\n");

    let mut workspace = Workspace::new();
    workspace.load_grammar(&parser, None);
    assert!(workspace.get_dependencies(&parser).is_empty());
    let messages: Vec<String> = workspace
        .get_diagnostics(&parser)
        .iter()
        .map(|d| d.message.to_string())
        .collect();
    assert_eq!(messages, vec!["Unknown token reference 'ID'".to_string()]);

    write(dir.path(), "L.g4", LEXER);
    workspace.reparse(&parser);
    assert!(workspace.get_diagnostics(&parser).is_empty());
}

#[test]
fn test_set_text_swaps_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let old = write(dir.path(), "Old.g4", "lexer grammar Old;\nA: 'a';\n");
    let new = write(dir.path(), "New.g4", "lexer grammar New;\nB: 'b';\n");
    let main = write(dir.path(), "Main.g4", "grammar Main;\nimport Old;\nr: A;\n");

    let mut workspace = Workspace::new();
    workspace.load_grammar(&main, None);
    assert!(workspace.is_loaded(&old));

    workspace.set_text(&main, "grammar Main;\nimport New;\nr: B;\n");
    assert!(!workspace.is_loaded(&old));
    assert_eq!(workspace.ref_count(&new), 1);
    assert_eq!(workspace.get_dependencies(&main), vec![new.clone()]);

    // Unchanged imports keep their count across reparses
    workspace.reparse(&main);
    assert_eq!(workspace.ref_count(&new), 1);
}

#[test]
fn test_set_text_on_unknown_grammar_is_noop() {
    let mut workspace = Workspace::new();
    workspace.set_text("Nope.g4", "grammar Nope;\n");
    workspace.reparse("Nope.g4");
    assert_eq!(workspace.context_count(), 0);
}

#[test]
fn test_query_loads_on_demand_once() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "T.g4", "grammar T;\na: b;\nb: 'x';\n");

    let mut workspace = Workspace::new();
    assert_eq!(workspace.get_rule_list(&main), vec!["a", "b"]);
    assert_eq!(workspace.get_rule_list(&main), vec!["a", "b"]);
    assert_eq!(workspace.ref_count(&main), 1);
}

#[test]
fn test_symbol_info_resolves_into_dependency() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "L.g4", LEXER);
    let parser = write(dir.path(), "P.g4", "parser grammar P;\noptions { tokenVocab = L; }\nr: ID;\n");

    let mut workspace = Workspace::new();
    let info = workspace
        .symbol_info_at_position(&parser, crate::base::Position::new(3, 4))
        .unwrap();
    assert_eq!(info.name, "ID");
    assert!(info.source.ends_with("L.g4"));
    assert_eq!(workspace.info_for_symbol(&parser, "WS").unwrap().name, "WS");
}

#[test]
fn test_reference_counts_include_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let lexer = write(dir.path(), "L.g4", LEXER);
    let parser = write(
        dir.path(),
        "P.g4",
        "parser grammar P;\noptions { tokenVocab = L; }\nr: ID ID;\ns: ID;\n",
    );

    let mut workspace = Workspace::new();
    workspace.load_grammar(&parser, None);
    assert_eq!(workspace.count_references(&lexer, "ID"), 3);
    assert_eq!(workspace.count_references(&parser, "ID"), 3);

    let occurrences = workspace.get_symbol_occurrences(&lexer, "ID");
    assert_eq!(occurrences.len(), 4);
    assert_eq!(occurrences.iter().filter(|o| o.is_definition).count(), 1);
}
