//! Renderable node/link graphs of single rules.
//!
//! The automaton of a rule is walked breadth first from its start state. Calls
//! into other rules are not followed: each call becomes a placeholder node with
//! a negative id named after the callee, linked on to the follow state.

use std::collections::VecDeque;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::model::{
    AtnStateType, InterpreterData, MAX_CHAR, MIN_CHAR, TOKEN_EOF, Transition,
    TransitionType,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtnNode {
    /// State number, negative for rule call placeholders
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub state_type: AtnStateType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtnLink {
    /// Index into the node list
    pub source: usize,
    pub target: usize,
    #[serde(rename = "type")]
    pub transition_type: TransitionType,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AtnGraphData {
    pub nodes: Vec<AtnNode>,
    pub links: Vec<AtnLink>,
}

/// Graph of `rule` in `data`, `None` if the rule is unknown.
pub fn extract_graph(data: &InterpreterData, rule: &str) -> Option<AtnGraphData> {
    let rule_index = data.rule_index(rule)?;
    let start = *data.atn.rule_to_start_state.get(rule_index)?;
    let stop = data.atn.rule_to_stop_state.get(rule_index).copied();
    GraphWalker::new(data).walk(start, stop)
}

struct GraphWalker<'a> {
    data: &'a InterpreterData,
    nodes: Vec<AtnNode>,
    node_of_state: FxHashMap<usize, usize>,
    links: IndexMap<(usize, usize), AtnLink>,
    queue: VecDeque<usize>,
    placeholders: i64,
}

impl<'a> GraphWalker<'a> {
    fn new(data: &'a InterpreterData) -> Self {
        Self {
            data,
            nodes: Vec::new(),
            node_of_state: FxHashMap::default(),
            links: IndexMap::new(),
            queue: VecDeque::new(),
            placeholders: 0,
        }
    }

    fn walk(mut self, start: usize, stop: Option<usize>) -> Option<AtnGraphData> {
        let data = self.data;
        self.discover(start)?;
        while let Some(number) = self.queue.pop_front() {
            if Some(number) == stop {
                continue;
            }
            let Some(state) = data.atn.state(number) else {
                continue;
            };
            let source = self.node_of_state[&number];
            for transition in &state.transitions {
                if let Transition::Rule {
                    target,
                    rule_index,
                    follow,
                    ..
                } = transition
                {
                    let callee = data
                        .rule_names
                        .get(*rule_index)
                        .cloned()
                        .unwrap_or_else(|| target.to_string());
                    self.placeholders -= 1;
                    let placeholder = self.nodes.len();
                    self.nodes.push(AtnNode {
                        id: self.placeholders,
                        name: callee.clone(),
                        state_type: AtnStateType::RuleStart,
                    });
                    self.link(source, placeholder, TransitionType::Rule, callee);
                    if let Some(follow) = self.discover(*follow) {
                        self.link(placeholder, follow, TransitionType::Epsilon, "ε".into());
                    }
                    continue;
                }
                if let Some(target) = self.discover(transition.target()) {
                    for label in self.labels(transition) {
                        self.link(source, target, transition.transition_type(), label);
                    }
                }
            }
        }
        Some(AtnGraphData {
            nodes: self.nodes,
            links: self.links.into_values().collect(),
        })
    }

    /// Node index of a state, queueing states seen for the first time.
    fn discover(&mut self, number: usize) -> Option<usize> {
        if let Some(index) = self.node_of_state.get(&number) {
            return Some(*index);
        }
        let data = self.data;
        let state = data.atn.state(number)?;
        let name = match state.state_type {
            AtnStateType::RuleStart | AtnStateType::RuleStop => usize::try_from(state.rule_index)
                .ok()
                .and_then(|r| data.rule_names.get(r))
                .cloned()
                .unwrap_or_else(|| number.to_string()),
            _ => number.to_string(),
        };
        let index = self.nodes.len();
        self.nodes.push(AtnNode {
            id: number as i64,
            name,
            state_type: state.state_type,
        });
        self.node_of_state.insert(number, index);
        self.queue.push_back(number);
        Some(index)
    }

    /// Adds a link, merging parallel ones. Labels keep first-seen order.
    fn link(&mut self, source: usize, target: usize, transition_type: TransitionType, label: String) {
        let link = self.links.entry((source, target)).or_insert_with(|| AtnLink {
            source,
            target,
            transition_type,
            labels: Vec::new(),
        });
        if !link.labels.contains(&label) {
            link.labels.push(label);
        }
    }

    fn labels(&self, transition: &Transition) -> Vec<String> {
        let lexer = self.data.is_lexer();
        match transition {
            Transition::Epsilon { .. } => vec!["ε".into()],
            Transition::Atom { label, .. } => vec![self.symbol(*label)],
            Transition::Range { start, stop, .. } => {
                vec![format!("{}..{}", self.symbol(*start), self.symbol(*stop))]
            }
            Transition::Set { set, .. } => {
                if lexer {
                    set.intervals()
                        .iter()
                        .map(|i| self.interval(i.start, i.stop))
                        .collect()
                } else {
                    set.iter().map(|t| self.symbol(t)).collect()
                }
            }
            Transition::NotSet { set, .. } => {
                let parts: Vec<String> = if lexer {
                    set.intervals()
                        .iter()
                        .map(|i| self.interval(i.start, i.stop))
                        .collect()
                } else {
                    set.iter().map(|t| self.symbol(t)).collect()
                };
                vec![format!("~[{}]", parts.join(", "))]
            }
            Transition::Wildcard { .. } => vec!["∀".into()],
            Transition::Action { action_index, .. } => {
                let action = usize::try_from(*action_index)
                    .ok()
                    .and_then(|i| self.data.atn.lexer_actions.get(i));
                match action {
                    Some(action) if lexer => vec![action.to_string()],
                    _ => vec!["{action}".into()],
                }
            }
            Transition::Predicate { .. } => vec!["{pred}?".into()],
            Transition::Precedence { precedence, .. } => vec![format!("precpred({precedence})")],
            Transition::Rule { rule_index, .. } => {
                vec![self.data.rule_names.get(*rule_index).cloned().unwrap_or_default()]
            }
        }
    }

    fn interval(&self, start: i32, stop: i32) -> String {
        if start == stop {
            self.symbol(start)
        } else {
            format!("{}..{}", self.symbol(start), self.symbol(stop))
        }
    }

    /// A character (lexer) or token name (parser)
    fn symbol(&self, value: i32) -> String {
        if value == TOKEN_EOF {
            return "EOF".into();
        }
        if !self.data.is_lexer() {
            return self.data.vocabulary.display_name(value);
        }
        if !(MIN_CHAR..=MAX_CHAR).contains(&value) {
            return value.to_string();
        }
        let escaped = match char::from_u32(value as u32) {
            Some('\n') => "\\n".to_string(),
            Some('\r') => "\\r".to_string(),
            Some('\t') => "\\t".to_string(),
            Some('\'') => "\\'".to_string(),
            Some('\\') => "\\\\".to_string(),
            Some(c) if !c.is_control() => c.to_string(),
            _ => format!("\\u{{{value:04X}}}"),
        };
        format!("'{escaped}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::builder::build_interpreter_data;
    use crate::atn::interval_set::IntervalSet;
    use crate::atn::model::{Atn, AtnType, Vocabulary};
    use crate::parser::parse;

    fn built(source: &str) -> crate::atn::BuiltGrammar {
        build_interpreter_data(&parse(source).tree(), &[], None)
    }

    #[test]
    fn test_block_graph_in_discovery_order() {
        let parser = built("parser grammar P;\ntokens { A, B }\nr: A | B;\n").parser.unwrap();
        let graph = extract_graph(&parser, "r").unwrap();
        let ids: Vec<i64> = graph.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 6, 2, 4, 3, 5, 7, 1]);
        assert_eq!(graph.nodes[0].name, "r");
        assert_eq!(graph.nodes[1].name, "6");
        assert_eq!(graph.nodes[7].name, "r");
        assert_eq!(graph.nodes[7].state_type, AtnStateType::RuleStop);

        let edges: Vec<(usize, usize, Vec<String>)> = graph
            .links
            .iter()
            .map(|l| (l.source, l.target, l.labels.clone()))
            .collect();
        assert_eq!(edges[3], (2, 4, vec!["A".to_string()]));
        assert_eq!(edges[4], (3, 5, vec!["B".to_string()]));
        assert_eq!(edges.len(), 8);
    }

    #[test]
    fn test_rule_calls_become_placeholders() {
        let parser = built("grammar G;\nr: a B a;\na: B;\nB: 'b';\n").parser.unwrap();
        let graph = extract_graph(&parser, "r").unwrap();
        let placeholders: Vec<(i64, &str)> = graph
            .nodes
            .iter()
            .filter(|n| n.id < 0)
            .map(|n| (n.id, n.name.as_str()))
            .collect();
        assert_eq!(placeholders, vec![(-1, "a"), (-2, "a")]);

        let call = graph
            .links
            .iter()
            .find(|l| graph.nodes[l.target].id == -1)
            .unwrap();
        assert_eq!(call.transition_type, TransitionType::Rule);
        assert_eq!(call.labels, vec!["a"]);
        let back = graph
            .links
            .iter()
            .find(|l| graph.nodes[l.source].id == -1)
            .unwrap();
        assert_eq!(back.labels, vec!["ε"]);
        // the callee's own states are never entered
        assert!(!graph.nodes.iter().any(|n| n.id >= 0 && n.name == "a"));
    }

    #[test]
    fn test_extraction_is_stable() {
        let lexer = built("lexer grammar L;\nID: [a-z_]+ ('.' [a-z]+)*;\nWS: [ \\t]+ -> skip;\n")
            .lexer
            .unwrap();
        let first = extract_graph(&lexer, "ID").unwrap();
        let second = extract_graph(&lexer, "ID").unwrap();
        assert_eq!(first, second);
        assert!(extract_graph(&lexer, "NOPE").is_none());

        let ws = extract_graph(&lexer, "WS").unwrap();
        let labels: Vec<&str> = ws
            .links
            .iter()
            .flat_map(|l| l.labels.iter().map(String::as_str))
            .collect();
        assert!(labels.contains(&"'\\t'"));
        assert!(labels.contains(&"' '"));
        assert!(labels.contains(&"skip"));
    }

    #[test]
    fn test_parallel_transitions_merge_labels() {
        let mut atn = Atn::new(AtnType::Lexer, 1);
        let start = atn.add_state(AtnStateType::RuleStart, 0);
        let stop = atn.add_state(AtnStateType::RuleStop, 0);
        atn.rule_to_start_state.push(start);
        atn.rule_to_stop_state.push(stop);
        atn.add_transition(start, Transition::Atom { target: stop, label: 'a' as i32 });
        atn.add_transition(start, Transition::Range { target: stop, start: 'x' as i32, stop: 'z' as i32 });
        atn.add_transition(start, Transition::Atom { target: stop, label: 'a' as i32 });
        atn.add_transition(
            start,
            Transition::NotSet { target: stop, set: IntervalSet::of('\n' as i32) },
        );
        let data = InterpreterData {
            atn,
            vocabulary: Vocabulary::default(),
            rule_names: vec!["X".into()],
            channels: Vec::new(),
            modes: Vec::new(),
        };
        let graph = extract_graph(&data, "X").unwrap();
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].transition_type, TransitionType::Atom);
        assert_eq!(graph.links[0].labels, vec!["'a'", "'x'..'z'", "~['\\n']"]);
    }
}
