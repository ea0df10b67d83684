//! `format_grammar` against whole files, sub-ranges and directives.

use g4::{FormattingOptions, Workspace, WorkspaceConfig};
use rstest::rstest;

use crate::helpers::grammar_fixtures::*;

fn formatted(workspace: &mut Workspace, name: &str, text: &str) -> String {
    workspace.load_grammar(name, Some(text));
    workspace
        .format_grammar(name, None, 0, i64::MAX)
        .expect("not cancelled")
        .text
}

#[rstest]
#[case::calc(CALC)]
#[case::statements(STATEMENTS_PARSER)]
#[case::unresolved(UNRESOLVED)]
fn test_full_format_is_a_fixed_point(#[case] source: &str) {
    let mut workspace = Workspace::new();
    let once = formatted(&mut workspace, "Once.g4", source);
    let twice = formatted(&mut workspace, "Twice.g4", &once);
    assert_eq!(once, twice);
}

#[test]
fn test_sub_range_splices_into_full_format() {
    let source = "grammar T;\n\nr  :  a ;\ns :b;\n\nt :   c;\n";
    let mut workspace = Workspace::new();
    let full = formatted(&mut workspace, "T.g4", source);

    let s = source.find("s :b;").unwrap() as i64;
    let result = workspace
        .format_grammar("T.g4", None, s + 1, s + 2)
        .unwrap();
    assert!(full.contains(&result.text));

    let spliced = format!(
        "{}{}{}",
        &source[..result.start],
        result.text,
        &source[result.stop..]
    );
    assert_eq!(formatted(&mut workspace, "Spliced.g4", &spliced), full);
}

#[test]
fn test_range_before_text_is_empty() {
    let mut workspace = Workspace::new();
    workspace.load_grammar("T.g4", Some("grammar T;\nr: a;\n"));
    let result = workspace.format_grammar("T.g4", None, -10, -1).unwrap();
    assert!(result.text.is_empty());
    assert_eq!((result.start, result.stop), (0, 0));
}

#[test]
fn test_directive_changes_only_later_rules() {
    let mut workspace = Workspace::new();
    let source =
        "grammar T;\nr: aaaa bbbb cccc dddd;\n// $antlr-format columnLimit 20\ns: aaaa bbbb cccc dddd;\n";
    assert_eq!(
        formatted(&mut workspace, "T.g4", source),
        "grammar T;\nr: aaaa bbbb cccc dddd;\n// $antlr-format columnLimit 20\ns: aaaa bbbb cccc\n        dddd\n;\n"
    );
}

#[test]
fn test_directive_inside_rule_persists_to_end_of_file() {
    let mut workspace = Workspace::new();
    let source = "grammar T;\nr\n    // $antlr-format columnLimit 20\n    : aaaa bbbb;\n\ns: aaaa bbbb cccc dddd;\n";
    let output = formatted(&mut workspace, "T.g4", source);
    assert!(
        output.ends_with("s: aaaa bbbb cccc\n        dddd\n;\n"),
        "{output}"
    );
}

#[test]
fn test_default_options_come_from_config() {
    let mut workspace = Workspace::with_config(WorkspaceConfig {
        default_format_options: FormattingOptions {
            column_limit: 20,
            ..Default::default()
        },
        ..Default::default()
    });
    let source = "grammar T;\ns: aaaa bbbb cccc dddd;\n";
    assert_eq!(
        formatted(&mut workspace, "T.g4", source),
        "grammar T;\ns: aaaa bbbb cccc\n        dddd\n;\n"
    );

    // Explicit options win over the configured ones
    let explicit = workspace
        .format_grammar("T.g4", Some(&FormattingOptions::default()), 0, i64::MAX)
        .unwrap();
    assert_eq!(explicit.text, source);
}
