//! Detection of mutually left-recursive parser rules.
//!
//! Direct left recursion (`e: e '+' e | INT;`) is rewritten by the ANTLR tool and
//! is fine. Indirect recursion through other rules in the leftmost position is
//! not, and is reported once per strongly connected set of rules.

use indexmap::{IndexMap, IndexSet};

use crate::parser::{AltList, EbnfOp, Element, GrammarFile, Rule, SyntaxToken};

/// Sets of rules that are mutually left-recursive, each in source order.
pub fn mutually_left_recursive(file: &GrammarFile) -> Vec<Vec<SyntaxToken>> {
    let mut names: IndexMap<String, SyntaxToken> = IndexMap::new();
    let mut edges: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for rule in file.rules() {
        let (Rule::Parser(parser_rule), Some(name)) = (&rule, rule.name()) else {
            continue;
        };
        let mut left = IndexSet::new();
        if let Some(body) = parser_rule.alt_list() {
            left_rules_of_block(&body, &mut left);
        }
        left.shift_remove(name.text());
        names.entry(name.text().to_string()).or_insert(name.clone());
        edges.entry(name.text().to_string()).or_default().extend(left);
    }

    let mut tarjan = Tarjan::new(&edges);
    for node in edges.keys() {
        if !tarjan.index.contains_key(node.as_str()) {
            tarjan.visit(node);
        }
    }

    let mut groups: Vec<Vec<SyntaxToken>> = tarjan
        .components
        .into_iter()
        .filter(|c| c.len() > 1)
        .map(|component| {
            let mut members: Vec<SyntaxToken> = component
                .iter()
                .filter_map(|n| names.get(n.as_str()).cloned())
                .collect();
            members.sort_by_key(|t| t.text_range().start());
            members
        })
        .collect();
    groups.sort_by_key(|g| g.first().map(|t| t.text_range().start()));
    groups
}

/// Adds the rules reachable in leftmost position of every alternative. Returns
/// whether the block can match nothing.
fn left_rules_of_block(block: &AltList, out: &mut IndexSet<String>) -> bool {
    let mut nullable = false;
    for alternative in block.alternatives() {
        let mut alt_nullable = true;
        for element in alternative.elements() {
            if !left_rules_of_element(&element, out) {
                alt_nullable = false;
                break;
            }
        }
        nullable |= alt_nullable;
    }
    nullable
}

/// Returns whether the element can match nothing, in which case the next element
/// is also in leftmost position. Rule references count as non-empty.
fn left_rules_of_element(element: &Element, out: &mut IndexSet<String>) -> bool {
    match element {
        Element::RuleRef(_) => {
            if let Some(token) = element.main_token() {
                out.insert(token.text().to_string());
            }
            false
        }
        Element::Labeled(_) => element
            .inner()
            .is_none_or(|inner| left_rules_of_element(&inner, out)),
        Element::Block(_) => element
            .alt_list()
            .is_none_or(|alts| left_rules_of_block(&alts, out)),
        Element::Ebnf(_) => {
            let inner_nullable = element
                .inner()
                .is_none_or(|inner| left_rules_of_element(&inner, out));
            inner_nullable
                || matches!(
                    element.ebnf_op(),
                    Some((EbnfOp::Optional | EbnfOp::ZeroOrMore, _))
                )
        }
        Element::Action(_) | Element::Predicate(_) => true,
        _ => false,
    }
}

/// Tarjan's strongly connected components over rule names
struct Tarjan<'a> {
    edges: &'a IndexMap<String, IndexSet<String>>,
    counter: usize,
    index: IndexMap<&'a str, usize>,
    lowlink: IndexMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: IndexSet<&'a str>,
    components: Vec<Vec<String>>,
}

impl<'a> Tarjan<'a> {
    fn new(edges: &'a IndexMap<String, IndexSet<String>>) -> Self {
        Self {
            edges,
            counter: 0,
            index: IndexMap::new(),
            lowlink: IndexMap::new(),
            stack: Vec::new(),
            on_stack: IndexSet::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, node: &'a str) {
        self.index.insert(node, self.counter);
        self.lowlink.insert(node, self.counter);
        self.counter += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let edges = self.edges;
        if let Some(targets) = edges.get(node) {
            for target in targets {
                // Only parser rules of this grammar take part.
                let Some((key, _)) = edges.get_key_value(target.as_str()) else {
                    continue;
                };
                let key = key.as_str();
                if !self.index.contains_key(key) {
                    self.visit(key);
                    let low = self.lowlink[key].min(self.lowlink[node]);
                    self.lowlink.insert(node, low);
                } else if self.on_stack.contains(key) {
                    let low = self.index[key].min(self.lowlink[node]);
                    self.lowlink.insert(node, low);
                }
            }
        }

        if self.lowlink[node] == self.index[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.shift_remove(member);
                component.push(member.to_string());
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
