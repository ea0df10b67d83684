//! Per-rule reference records.
//!
//! A [`ReferenceNode`] lists every rule, token and string literal used inside one
//! rule's body, each set in first-use order. The workspace combines the nodes of a
//! grammar and its dependencies into the reference graph shown to the editor.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::parser::{AstNode, GrammarFile, Rule, SyntaxKind};

use super::symbol_table::SymbolKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceNode {
    pub kind: SymbolKind,
    pub rules: IndexSet<String>,
    pub tokens: IndexSet<String>,
    pub literals: IndexSet<String>,
}

impl ReferenceNode {
    pub fn new(kind: SymbolKind) -> Self {
        Self {
            kind,
            rules: IndexSet::new(),
            tokens: IndexSet::new(),
            literals: IndexSet::new(),
        }
    }
}

/// Reference nodes for every rule of a grammar, keyed by rule name in source order.
/// Later definitions of a duplicated rule are merged into the first one.
pub fn build_reference_nodes(file: &GrammarFile) -> IndexMap<String, ReferenceNode> {
    let mut nodes: IndexMap<String, ReferenceNode> = IndexMap::new();
    for rule in file.rules() {
        let Some(name) = rule.name() else {
            continue;
        };
        let kind = match &rule {
            Rule::Parser(_) => SymbolKind::ParserRule,
            Rule::Lexer(lexer) if lexer.is_fragment() => SymbolKind::FragmentLexerToken,
            Rule::Lexer(_) => SymbolKind::LexerRule,
        };
        let node = nodes
            .entry(name.text().to_string())
            .or_insert_with(|| ReferenceNode::new(kind));
        let Some(body) = rule.alt_list() else {
            continue;
        };
        for element in body.syntax().descendants() {
            let Some(token) = element
                .children_with_tokens()
                .filter_map(|e| e.into_token())
                .find(|t| !t.kind().is_trivia())
            else {
                continue;
            };
            match (element.kind(), token.kind()) {
                (SyntaxKind::RULE_REF_ELEMENT, _) => {
                    node.rules.insert(token.text().to_string());
                }
                (SyntaxKind::TERMINAL, SyntaxKind::TOKEN_REF) => {
                    node.tokens.insert(token.text().to_string());
                }
                (SyntaxKind::TERMINAL, SyntaxKind::STRING_LITERAL) => {
                    node.literals.insert(token.text().to_string());
                }
                _ => {}
            }
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_reference_sets_are_disjoint_and_ordered() {
        let parse = parse("grammar G;\nr: b A 'x' b (B | 'y')* A;\nb: 'x';\nA: 'a';\nB: 'b' A;\n");
        let nodes = build_reference_nodes(&parse.tree());
        let keys: Vec<_> = nodes.keys().cloned().collect();
        assert_eq!(keys, vec!["r", "b", "A", "B"]);

        let r = &nodes["r"];
        assert_eq!(r.kind, SymbolKind::ParserRule);
        assert_eq!(r.rules.iter().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(r.tokens.iter().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(r.literals.iter().collect::<Vec<_>>(), vec!["'x'", "'y'"]);

        assert_eq!(nodes["B"].kind, SymbolKind::LexerRule);
        assert_eq!(nodes["B"].tokens.len(), 1);
    }
}
