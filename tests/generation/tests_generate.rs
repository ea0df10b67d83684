//! Generation through the workspace.

use g4::{GenerationOptions, GrammarError, SentenceGenerationOptions, Workspace};

use crate::helpers::grammar_fixtures::*;
use crate::helpers::workspace_helpers::*;

fn options_for(set: &GrammarSet) -> GenerationOptions {
    GenerationOptions {
        output_dir: Some(set.dir().join("out")),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_generate_writes_and_loads_interpreter_data() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let mut workspace = workspace_with(&set, "Calc.g4");

    let processed = workspace
        .generate(set.path("Calc.g4"), &options_for(&set))
        .await
        .unwrap();
    assert_eq!(processed, vec![set.path("Calc.g4")]);
    assert!(set.dir().join("out/Calc.interp").is_file());
    assert!(set.dir().join("out/CalcLexer.interp").is_file());

    let first = workspace.get_atn_graph(set.path("Calc.g4"), "expr").unwrap();
    let second = workspace.get_atn_graph(set.path("Calc.g4"), "expr").unwrap();
    assert_eq!(first, second);
    assert!(workspace.get_atn_graph(set.path("Calc.g4"), "INT").is_some());
    assert!(workspace.get_lexer_vocabulary(set.path("Calc.g4")).is_some());
}

#[tokio::test]
async fn test_load_only_reproduces_graph() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let options = options_for(&set);

    let mut generated = workspace_with(&set, "Calc.g4");
    generated.generate(set.path("Calc.g4"), &options).await.unwrap();
    let expected = generated.get_atn_graph(set.path("Calc.g4"), "expr").unwrap();

    let mut reloaded = workspace_with(&set, "Calc.g4");
    let load_only = GenerationOptions {
        load_only: true,
        ..options
    };
    reloaded.generate(set.path("Calc.g4"), &load_only).await.unwrap();
    assert_eq!(
        reloaded.get_atn_graph(set.path("Calc.g4"), "expr"),
        Some(expected)
    );
}

#[tokio::test]
async fn test_dependencies_are_generated_first() {
    let set = GrammarSet::with(&[
        ("StatementsLexer.g4", STATEMENTS_LEXER),
        ("StatementsParser.g4", STATEMENTS_PARSER),
    ]);
    let mut workspace = workspace_with(&set, "StatementsParser.g4");

    let processed = workspace
        .generate(set.path("StatementsParser.g4"), &options_for(&set))
        .await
        .unwrap();
    assert_eq!(
        processed,
        vec![set.path("StatementsLexer.g4"), set.path("StatementsParser.g4")]
    );
    assert!(!workspace.has_errors(set.path("StatementsParser.g4")));
    assert!(
        workspace
            .get_atn_graph(set.path("StatementsParser.g4"), "statement")
            .is_some()
    );
    // Lexer vocabulary comes from the token vocabulary grammar
    let vocabulary = workspace
        .get_lexer_vocabulary(set.path("StatementsParser.g4"))
        .unwrap();
    assert_eq!(vocabulary.symbolic_name(1), Some("Semicolon"));
}

#[tokio::test]
async fn test_mutual_left_recursion_is_reported_after_generation() {
    let set = GrammarSet::with(&[("T.g4", "grammar T;\na: b 'x' | 'y';\nb: a 'z';\n")]);
    let mut workspace = workspace_with(&set, "T.g4");
    assert!(!workspace.has_errors(set.path("T.g4")));

    workspace
        .generate(set.path("T.g4"), &options_for(&set))
        .await
        .unwrap();
    let messages: Vec<String> = workspace
        .get_diagnostics(set.path("T.g4"))
        .iter()
        .map(|d| d.message.to_string())
        .collect();
    assert_eq!(
        messages,
        vec!["The following sets of rules are mutually left-recursive [a, b]"]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_tool_failure_carries_tool_output() {
    use std::os::unix::fs::PermissionsExt;

    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let java = set.write(
        "fake-java",
        "#!/bin/sh\necho 'error(50): Calc.g4:3:0: syntax error' >&2\nexit 1\n",
    );
    std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut workspace = workspace_with(&set, "Calc.g4");
    workspace.config_mut().tool.java = java;
    workspace.config_mut().tool.jar = Some(set.path("antlr.jar"));

    let error = workspace
        .generate(set.path("Calc.g4"), &options_for(&set))
        .await
        .unwrap_err();
    assert!(matches!(error, GrammarError::Tool { .. }), "{error:?}");
    assert_eq!(error.to_string(), "error(50): Calc.g4:3:0: syntax error");
}

#[tokio::test]
async fn test_sentence_generation_uses_rule_mapping() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let mut workspace = workspace_with(&set, "Calc.g4");
    workspace
        .generate(set.path("Calc.g4"), &options_for(&set))
        .await
        .unwrap();

    let mut options = SentenceGenerationOptions {
        count: 3,
        seed: Some(7),
        ..Default::default()
    };
    options.rule_mappings.insert("expr".into(), "1 + 2".into());

    let mut sentences = Vec::new();
    let produced = workspace.generate_sentence(set.path("Calc.g4"), "expr", &options, |sentence, index| {
        sentences.push((index, sentence.to_string()));
    });
    assert_eq!(produced, 3);
    assert_eq!(
        sentences,
        vec![
            (0, "1 + 2".to_string()),
            (1, "1 + 2".to_string()),
            (2, "1 + 2".to_string()),
        ]
    );
}

#[test]
fn test_sentence_generation_without_data_produces_nothing() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let mut workspace = Workspace::new();
    let produced = workspace.generate_sentence(
        set.path("Calc.g4"),
        "expr",
        &SentenceGenerationOptions::default(),
        |_, _| panic!("no sentence expected"),
    );
    assert_eq!(produced, 0);
}

#[tokio::test]
async fn test_debugger_loads_data_from_directory() {
    let set = GrammarSet::with(&[("Calc.g4", CALC)]);
    let options = options_for(&set);
    workspace_with(&set, "Calc.g4")
        .generate(set.path("Calc.g4"), &options)
        .await
        .unwrap();

    let mut workspace = workspace_with(&set, "Calc.g4");
    assert!(workspace.create_debugger(set.path("Calc.g4"), None).is_none());

    let mut debugger = workspace
        .create_debugger(set.path("Calc.g4"), Some(&set.dir().join("out")))
        .unwrap();
    assert!(!debugger.is_lexer_only());
    assert_eq!(debugger.start_rule_index("calc"), Some(0));

    let breakpoints = debugger.set_breakpoints(&set.path("Calc.g4"), &[4]);
    assert_eq!(breakpoints[0].rule.as_deref(), Some("expr"));
    assert!(debugger.has_breakpoint_in("expr"));
}
