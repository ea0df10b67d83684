//! Railroad diagram scripts.
//!
//! Renders one rule as a script for the railroad-diagrams JavaScript library:
//! `ComplexDiagram(...)` for parser rules, `Diagram(...)` for lexer rules.
//! Actions, predicates and lexer commands do not appear in diagrams.

use crate::parser::{AltList, Alternative, EbnfOp, Element, GrammarFile, SyntaxKind};

/// The diagram script for `rule`, `None` if the grammar has no such rule.
pub fn rrd_script(file: &GrammarFile, rule: &str) -> Option<String> {
    let rule = file
        .rules()
        .find(|r| r.name().is_some_and(|name| name.text() == rule))?;
    let lexer = rule.is_lexer();
    let body = rule
        .alt_list()
        .map(|alternatives| alt_list(&alternatives, lexer))
        .unwrap_or_else(empty);
    let diagram = if lexer { "Diagram" } else { "ComplexDiagram" };
    Some(format!("{diagram}({body}).addTo()"))
}

fn alt_list(alternatives: &AltList, lexer: bool) -> String {
    let alternatives: Vec<String> = alternatives
        .alternatives()
        .map(|alternative| self::alternative(&alternative, lexer))
        .collect();
    match alternatives.as_slice() {
        [] => empty(),
        [single] => single.clone(),
        many => format!("Choice(0, {})", many.join(", ")),
    }
}

fn alternative(alternative: &Alternative, lexer: bool) -> String {
    let parts: Vec<String> = alternative
        .elements()
        .filter_map(|e| element(&e, lexer))
        .collect();
    match parts.as_slice() {
        [] => empty(),
        [single] => single.clone(),
        many => format!("Sequence({})", many.join(", ")),
    }
}

fn element(element: &Element, lexer: bool) -> Option<String> {
    let text = || element.main_token().map(|t| t.text().to_string()).unwrap_or_default();
    let rendered = match element {
        Element::Labeled(_) => return element.inner().and_then(|inner| self::element(&inner, lexer)),
        Element::Terminal(_) => {
            let text = text();
            let token = element.main_token().map(|t| t.kind());
            if token == Some(SyntaxKind::STRING_LITERAL) {
                terminal(unquote(&text))
            } else if lexer {
                non_terminal(&text)
            } else {
                terminal(&text)
            }
        }
        Element::RuleRef(_) => non_terminal(&text()),
        Element::CharRange(_) => match element.range_bounds() {
            Some((first, last)) => {
                terminal(&format!("{}..{}", unquote(first.text()), unquote(last.text())))
            }
            None => terminal(&text()),
        },
        Element::CharSet(_) => terminal(&text()),
        Element::Wildcard(_) => non_terminal(if lexer { "any character" } else { "any token" }),
        Element::NotSet(_) => {
            let inner = element.inner().and_then(|inner| self::element(&inner, lexer))?;
            format!("Sequence(Comment('not'), {inner})")
        }
        Element::Block(_) => alt_list(&element.alt_list()?, lexer),
        Element::Ebnf(_) => {
            let inner = element.inner().and_then(|inner| self::element(&inner, lexer))?;
            match element.ebnf_op() {
                Some((EbnfOp::Optional, _)) => format!("Optional({inner})"),
                Some((EbnfOp::ZeroOrMore, _)) => format!("ZeroOrMore({inner})"),
                Some((EbnfOp::OneOrMore, _)) => format!("OneOrMore({inner})"),
                None => inner,
            }
        }
        Element::Action(_) | Element::Predicate(_) => return None,
    };
    Some(rendered)
}

fn empty() -> String {
    "Comment('<empty>')".to_string()
}

fn terminal(text: &str) -> String {
    format!("Terminal('{}')", escape(text))
}

fn non_terminal(text: &str) -> String {
    format!("NonTerminal('{}')", escape(text))
}

fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(literal)
}

/// Escapes for a single-quoted JavaScript string.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
