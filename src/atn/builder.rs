//! Construction of interpreter data from a parsed grammar.
//!
//! Every grammar element compiles to a [`Fragment`] with one entry and one exit
//! state; blocks and loops connect fragments with epsilon transitions. State
//! layout and decision numbering follow the ANTLR tool, so the result can be
//! written as a `.interp` file and read back unchanged.
//!
//! Left-recursive parser rules are rewritten into a primary block followed by a
//! loop of operator alternatives guarded by precedence predicates.

mod literals;
mod tokens;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::parser::{
    Alternative, AltList, AstNode, EbnfOp, Element, GrammarFile, GrammarType, Member, Rule,
    SyntaxKind,
};

use super::interval_set::IntervalSet;
use super::model::{
    Atn, AtnStateType, AtnType, InterpreterData, LexerAction, TOKEN_EOF, Transition, Vocabulary,
};
use literals::{char_set, literal_code_points};
use tokens::TokenTypes;

pub const DEFAULT_MODE: &str = "DEFAULT_MODE";
pub const DEFAULT_CHANNELS: [&str; 2] = ["DEFAULT_TOKEN_CHANNEL", "HIDDEN"];

/// Interpreter data built from one grammar. Combined grammars produce both parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltGrammar {
    pub parser: Option<InterpreterData>,
    pub lexer: Option<InterpreterData>,
}

/// Builds interpreter data for `file`. Rules of `imports` are merged in when
/// their names are not defined yet; `token_vocab` seeds the token types of
/// parser grammars.
pub fn build_interpreter_data(
    file: &GrammarFile,
    imports: &[GrammarFile],
    token_vocab: Option<&Vocabulary>,
) -> BuiltGrammar {
    let grammar_type = file.grammar_type();
    let mut layout = GrammarLayout::collect(file, imports);
    let types = layout.token_types(file, imports, token_vocab);
    let vocabulary = types.vocabulary();

    let parser = (grammar_type != GrammarType::Lexer).then(|| {
        let atn = AtnFactory::new(AtnType::Parser, &types, &layout).build_parser();
        InterpreterData {
            atn,
            vocabulary: vocabulary.clone(),
            rule_names: layout.parser_rules.iter().map(|(n, _)| n.clone()).collect(),
            channels: Vec::new(),
            modes: Vec::new(),
        }
    });
    let lexer = (grammar_type != GrammarType::Parser).then(|| {
        let atn = AtnFactory::new(AtnType::Lexer, &types, &layout).build_lexer();
        InterpreterData {
            atn,
            vocabulary: vocabulary.clone(),
            rule_names: layout.lexer_rules.iter().map(|r| r.name.clone()).collect(),
            channels: layout.channels.clone(),
            modes: layout.modes.clone(),
        }
    });

    debug!(
        grammar = %file.name().unwrap_or_default(),
        parser_rules = layout.parser_rules.len(),
        lexer_rules = layout.lexer_rules.len(),
        "built interpreter data"
    );
    BuiltGrammar { parser, lexer }
}

// ============================================================================
// GRAMMAR LAYOUT
// ============================================================================

enum LexerBody {
    Rule(Rule),
    /// Implicit token for a literal used in a parser rule (`T__0`)
    Literal(String),
}

struct LexerRuleDef {
    name: String,
    mode: usize,
    fragment: bool,
    body: LexerBody,
}

/// Rules, modes and channels of a grammar with its imports merged in.
struct GrammarLayout {
    parser_rules: Vec<(String, Rule)>,
    lexer_rules: Vec<LexerRuleDef>,
    modes: Vec<String>,
    channels: Vec<String>,
}

impl GrammarLayout {
    fn collect(file: &GrammarFile, imports: &[GrammarFile]) -> Self {
        let mut modes = vec![DEFAULT_MODE.to_string()];
        let mut channels: Vec<String> = DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect();
        let mut names = IndexSet::new();
        let mut parser_rules = Vec::new();
        let mut lexer_rules = Vec::new();

        for grammar in std::iter::once(file).chain(imports) {
            for member in grammar.members() {
                match member {
                    Member::Mode(spec) => {
                        if let Some(name) = spec.name().map(|t| t.text().to_string())
                            && !modes.contains(&name)
                        {
                            modes.push(name);
                        }
                    }
                    Member::Channels(spec) => {
                        for name in spec.names().map(|t| t.text().to_string()) {
                            if !channels.contains(&name) {
                                channels.push(name);
                            }
                        }
                    }
                    _ => {}
                }
            }
            for (rule, mode) in grammar.rules_with_modes() {
                let Some(name) = rule.name().map(|t| t.text().to_string()) else {
                    continue;
                };
                if !names.insert(name.clone()) {
                    continue;
                }
                let fragment = match &rule {
                    Rule::Parser(_) => None,
                    Rule::Lexer(lexer) => Some(lexer.is_fragment()),
                };
                match fragment {
                    None => parser_rules.push((name, rule)),
                    Some(fragment) => {
                        let mode = mode
                            .and_then(|m| modes.iter().position(|n| n == m.text()))
                            .unwrap_or(0);
                        lexer_rules.push(LexerRuleDef {
                            name,
                            mode,
                            fragment,
                            body: LexerBody::Rule(rule),
                        });
                    }
                }
            }
        }

        Self {
            parser_rules,
            lexer_rules,
            modes,
            channels,
        }
    }

    /// Assigns token types and, for combined grammars, prepends the implicit
    /// literal rules to the lexer rules.
    fn token_types(
        &mut self,
        file: &GrammarFile,
        imports: &[GrammarFile],
        token_vocab: Option<&Vocabulary>,
    ) -> TokenTypes {
        let grammar_type = file.grammar_type();
        let mut types = token_vocab.map_or_else(TokenTypes::new, TokenTypes::from_vocabulary);

        for grammar in std::iter::once(file).chain(imports) {
            for spec in grammar.tokens_specs() {
                for name in spec.names() {
                    types.define_name(name.text());
                }
            }
        }

        if grammar_type == GrammarType::Combined {
            let aliased: IndexSet<String> = self
                .lexer_rules
                .iter()
                .filter(|r| !r.fragment)
                .filter_map(|r| match &r.body {
                    LexerBody::Rule(rule) => single_literal(rule),
                    LexerBody::Literal(_) => None,
                })
                .collect();
            let mut implicit = Vec::new();
            for literal in self.parser_terminals(SyntaxKind::STRING_LITERAL) {
                if aliased.contains(&literal) || types.literal_type(&literal).is_some() {
                    continue;
                }
                let name = format!("T__{}", implicit.len());
                types.define_implicit(&name, &literal);
                implicit.push(LexerRuleDef {
                    name,
                    mode: 0,
                    fragment: false,
                    body: LexerBody::Literal(literal),
                });
            }
            implicit.append(&mut self.lexer_rules);
            self.lexer_rules = implicit;
        }

        if grammar_type != GrammarType::Parser {
            for rule in &self.lexer_rules {
                let LexerBody::Rule(body) = &rule.body else {
                    continue;
                };
                if rule.fragment {
                    continue;
                }
                let token_type = types.define_name(&rule.name);
                if let Some(literal) = single_literal(body) {
                    types.alias_literal(&literal, token_type);
                }
            }
        }

        if grammar_type != GrammarType::Lexer {
            for name in self.parser_terminals(SyntaxKind::TOKEN_REF) {
                if types.name_type(&name).is_none() {
                    types.define_name(&name);
                }
            }
        }
        types
    }

    /// Distinct terminal texts of a kind used in parser rules, in source order
    fn parser_terminals(&self, kind: SyntaxKind) -> IndexSet<String> {
        self.parser_rules
            .iter()
            .flat_map(|(_, rule)| rule.syntax().descendants())
            .filter(|n| n.kind() == SyntaxKind::TERMINAL)
            .filter_map(|n| {
                n.children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .find(|t| t.kind() == kind)
            })
            .map(|t| t.text().to_string())
            .collect()
    }
}

/// The literal of a lexer rule that consists of exactly one string literal
/// (lexer commands allowed).
fn single_literal(rule: &Rule) -> Option<String> {
    let alt_list = rule.alt_list()?;
    let mut alternatives = alt_list.alternatives();
    let alternative = alternatives.next()?;
    if alternatives.next().is_some() {
        return None;
    }
    let mut elements = alternative.elements();
    let element = elements.next()?;
    if elements.next().is_some() || !matches!(element, Element::Terminal(_)) {
        return None;
    }
    element
        .main_token()
        .filter(|t| t.kind() == SyntaxKind::STRING_LITERAL)
        .map(|t| t.text().to_string())
}

fn is_self_reference(element: &Element, rule: &str) -> bool {
    match element {
        Element::RuleRef(_) => element.main_token().is_some_and(|t| t.text() == rule),
        Element::Labeled(_) => element
            .inner()
            .is_some_and(|inner| is_self_reference(&inner, rule)),
        _ => false,
    }
}

fn is_left_recursive(name: &str, alt_list: &AltList) -> bool {
    alt_list.alternatives().any(|alt| {
        alt.elements()
            .next()
            .is_some_and(|first| is_self_reference(&first, name))
    })
}

// ============================================================================
// FACTORY
// ============================================================================

/// A piece of automaton with a single entry and a single exit state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fragment {
    entry: usize,
    exit: usize,
}

impl Fragment {
    fn new(entry: usize, exit: usize) -> Self {
        Self { entry, exit }
    }
}

struct AtnFactory<'a> {
    atn: Atn,
    types: &'a TokenTypes,
    layout: &'a GrammarLayout,
    rule_indices: FxHashMap<String, usize>,
    current_rule: usize,
    predicate_count: i32,
    custom_action_count: i32,
    lexer_actions: IndexSet<LexerAction>,
}

impl<'a> AtnFactory<'a> {
    fn new(grammar_type: AtnType, types: &'a TokenTypes, layout: &'a GrammarLayout) -> Self {
        let names: Vec<&String> = match grammar_type {
            AtnType::Parser => layout.parser_rules.iter().map(|(n, _)| n).collect(),
            AtnType::Lexer => layout.lexer_rules.iter().map(|r| &r.name).collect(),
        };
        let rule_indices = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            atn: Atn::new(grammar_type, types.max_token_type()),
            types,
            layout,
            rule_indices,
            current_rule: 0,
            predicate_count: 0,
            custom_action_count: 0,
            lexer_actions: IndexSet::new(),
        }
    }

    fn is_lexer(&self) -> bool {
        self.atn.grammar_type == AtnType::Lexer
    }

    fn build_parser(mut self) -> Atn {
        let layout = self.layout;
        self.create_rule_states(layout.parser_rules.len());
        for (index, (name, rule)) in layout.parser_rules.iter().enumerate() {
            self.current_rule = index;
            let body = match rule.alt_list() {
                Some(alt_list) if is_left_recursive(name, &alt_list) => {
                    self.left_recursive_body(name, &alt_list)
                }
                Some(alt_list) => {
                    let alternatives = self.alternatives(&alt_list);
                    self.block(alternatives)
                }
                None => self.epsilon_fragment(),
            };
            self.rule(index, body);
        }
        self.atn.add_rule_follow_links();
        self.atn
    }

    fn build_lexer(mut self) -> Atn {
        let layout = self.layout;
        for _ in &layout.modes {
            let start = self.atn.add_state(AtnStateType::TokenStart, -1);
            self.atn.mode_to_start_state.push(start);
            self.atn.define_decision(start);
        }
        self.create_rule_states(layout.lexer_rules.len());
        for rule in &layout.lexer_rules {
            let token_type = if rule.fragment {
                0
            } else {
                self.types.name_type(&rule.name).unwrap_or(0)
            };
            self.atn.rule_to_token_type.push(token_type);
        }

        for (index, rule) in layout.lexer_rules.iter().enumerate() {
            self.current_rule = index;
            let body = match &rule.body {
                LexerBody::Literal(literal) => self.string_literal(literal),
                LexerBody::Rule(rule) => match rule.alt_list() {
                    Some(alt_list) => {
                        let alternatives = self.alternatives(&alt_list);
                        self.block(alternatives)
                    }
                    None => self.epsilon_fragment(),
                },
            };
            self.rule(index, body);
        }

        for (mode, start) in self.atn.mode_to_start_state.clone().into_iter().enumerate() {
            for (index, rule) in layout.lexer_rules.iter().enumerate() {
                if rule.mode == mode && !rule.fragment {
                    let rule_start = self.atn.rule_to_start_state[index];
                    self.epsilon(start, rule_start);
                }
            }
        }
        self.atn.lexer_actions = std::mem::take(&mut self.lexer_actions).into_iter().collect();
        self.atn.add_rule_follow_links();
        self.atn
    }

    // ------------------------------------------------------------------------
    // States and edges
    // ------------------------------------------------------------------------

    fn new_state(&mut self, state_type: AtnStateType) -> usize {
        self.atn.add_state(state_type, self.current_rule as i32)
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.atn.add_transition(from, Transition::epsilon(to));
    }

    fn epsilon_first(&mut self, from: usize, to: usize) {
        if let Some(state) = self.atn.state_mut(from) {
            state.transitions.insert(0, Transition::epsilon(to));
        }
    }

    fn create_rule_states(&mut self, count: usize) {
        for index in 0..count {
            let start = self.atn.add_state(AtnStateType::RuleStart, index as i32);
            let stop = self.atn.add_state(AtnStateType::RuleStop, index as i32);
            self.atn.rule_to_start_state.push(start);
            self.atn.rule_to_stop_state.push(stop);
        }
    }

    fn rule(&mut self, index: usize, body: Fragment) {
        let start = self.atn.rule_to_start_state[index];
        let stop = self.atn.rule_to_stop_state[index];
        self.epsilon(start, body.entry);
        self.epsilon(body.exit, stop);
    }

    /// Two basic states joined by the transition `make(exit)` builds.
    fn transition_fragment(&mut self, make: impl FnOnce(usize) -> Transition) -> Fragment {
        let entry = self.new_state(AtnStateType::Basic);
        let exit = self.new_state(AtnStateType::Basic);
        self.atn.add_transition(entry, make(exit));
        Fragment::new(entry, exit)
    }

    fn epsilon_fragment(&mut self) -> Fragment {
        self.transition_fragment(Transition::epsilon)
    }

    // ------------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------------

    /// Chains fragments. An element that is a single transition between two
    /// basic states is linked straight to the next element and its exit state
    /// removed.
    fn elem_list(&mut self, fragments: Vec<Fragment>) -> Fragment {
        let (Some(first), Some(last)) = (fragments.first().copied(), fragments.last().copied())
        else {
            return self.epsilon_fragment();
        };
        for pair in fragments.windows(2) {
            let (element, next) = (pair[0], pair[1]);
            if self.is_single_step(element) {
                if let Some(transition) = self
                    .atn
                    .state_mut(element.entry)
                    .and_then(|s| s.transitions.first_mut())
                {
                    match transition {
                        Transition::Rule { follow, .. } => *follow = next.entry,
                        other => other.set_target(next.entry),
                    }
                }
                self.atn.remove_state(element.exit);
            } else {
                self.epsilon(element.exit, next.entry);
            }
        }
        Fragment::new(first.entry, last.exit)
    }

    fn is_single_step(&self, fragment: Fragment) -> bool {
        let (Some(entry), Some(exit)) = (
            self.atn.state(fragment.entry),
            self.atn.state(fragment.exit),
        ) else {
            return false;
        };
        if entry.state_type != AtnStateType::Basic
            || exit.state_type != AtnStateType::Basic
            || entry.transitions.len() != 1
        {
            return false;
        }
        match &entry.transitions[0] {
            Transition::Rule { follow, .. } => *follow == fragment.exit,
            other => other.target() == fragment.exit,
        }
    }

    fn block(&mut self, alternatives: Vec<Fragment>) -> Fragment {
        match alternatives.len() {
            0 => self.epsilon_fragment(),
            1 => alternatives[0],
            _ => {
                let start = self.new_state(AtnStateType::BlockStart);
                self.atn.define_decision(start);
                self.make_block(start, &alternatives)
            }
        }
    }

    fn make_block(&mut self, start: usize, alternatives: &[Fragment]) -> Fragment {
        let end = self.new_state(AtnStateType::BlockEnd);
        if let Some(state) = self.atn.state_mut(start) {
            state.end_state = Some(end);
        }
        for alternative in alternatives {
            self.epsilon(start, alternative.entry);
            self.epsilon(alternative.exit, end);
        }
        Fragment::new(start, end)
    }

    fn optional(&mut self, alternatives: &[Fragment], greedy: bool) -> Fragment {
        let start = self.new_state(AtnStateType::BlockStart);
        self.atn.define_decision(start);
        let block = self.make_block(start, alternatives);
        if let Some(state) = self.atn.state_mut(start) {
            state.non_greedy = !greedy;
        }
        if greedy {
            self.epsilon(block.entry, block.exit);
        } else {
            self.epsilon_first(block.entry, block.exit);
        }
        block
    }

    fn star(&mut self, alternatives: &[Fragment], greedy: bool) -> Fragment {
        let block_start = self.new_state(AtnStateType::StarBlockStart);
        if alternatives.len() > 1 {
            self.atn.define_decision(block_start);
        }
        let block = self.make_block(block_start, alternatives);

        let entry = self.new_state(AtnStateType::StarLoopEntry);
        if let Some(state) = self.atn.state_mut(entry) {
            state.non_greedy = !greedy;
        }
        self.atn.define_decision(entry);
        let end = self.new_state(AtnStateType::LoopEnd);
        let loop_back = self.new_state(AtnStateType::StarLoopBack);
        if let Some(state) = self.atn.state_mut(end) {
            state.loop_back = Some(loop_back);
        }

        if greedy {
            self.epsilon(entry, block.entry);
            self.epsilon(entry, end);
        } else {
            self.epsilon(entry, end);
            self.epsilon(entry, block.entry);
        }
        self.epsilon(block.exit, loop_back);
        self.epsilon(loop_back, entry);
        Fragment::new(entry, end)
    }

    fn plus(&mut self, alternatives: &[Fragment], greedy: bool) -> Fragment {
        let block_start = self.new_state(AtnStateType::PlusBlockStart);
        if alternatives.len() > 1 {
            self.atn.define_decision(block_start);
        }
        let block = self.make_block(block_start, alternatives);

        let loop_back = self.new_state(AtnStateType::PlusLoopBack);
        if let Some(state) = self.atn.state_mut(loop_back) {
            state.non_greedy = !greedy;
        }
        self.atn.define_decision(loop_back);
        let end = self.new_state(AtnStateType::LoopEnd);
        if let Some(state) = self.atn.state_mut(end) {
            state.loop_back = Some(loop_back);
        }

        self.epsilon(block.exit, loop_back);
        if greedy {
            self.epsilon(loop_back, block.entry);
            self.epsilon(loop_back, end);
        } else {
            self.epsilon(loop_back, end);
            self.epsilon(loop_back, block.entry);
        }
        Fragment::new(block.entry, end)
    }

    // ------------------------------------------------------------------------
    // Alternatives
    // ------------------------------------------------------------------------

    fn alternatives(&mut self, alt_list: &AltList) -> Vec<Fragment> {
        alt_list
            .alternatives()
            .map(|alt| self.alternative(&alt))
            .collect()
    }

    fn alternative(&mut self, alternative: &Alternative) -> Fragment {
        let elements: Vec<Element> = alternative.elements().collect();
        let body = if elements.is_empty() {
            self.epsilon_fragment()
        } else {
            let fragments = self.element_fragments(&elements, None);
            self.elem_list(fragments)
        };
        if !self.is_lexer() {
            return body;
        }

        let actions: Vec<LexerAction> = alternative
            .lexer_commands()
            .filter_map(|command| {
                let name = command.name()?.text().to_string();
                let argument = command.argument().map(|t| t.text().to_string());
                self.lexer_command(&name, argument.as_deref())
            })
            .collect();
        if actions.is_empty() {
            return body;
        }
        let commands: Vec<Fragment> = actions
            .into_iter()
            .map(|action| self.lexer_action(action))
            .collect();
        let commands = self.elem_list(commands);
        self.epsilon(body.exit, commands.entry);
        Fragment::new(body.entry, commands.exit)
    }

    /// Fragments of a sequence of elements. `last_call_precedence` replaces the
    /// precedence of a trailing rule call (left-recursion rewrite).
    fn element_fragments(
        &mut self,
        elements: &[Element],
        last_call_precedence: Option<i32>,
    ) -> Vec<Fragment> {
        let last = elements.len().saturating_sub(1);
        elements
            .iter()
            .enumerate()
            .map(|(i, element)| match last_call_precedence {
                Some(precedence) if i == last => self.rule_call_element(element, precedence),
                _ => self.element(element),
            })
            .collect()
    }

    fn rule_call_element(&mut self, element: &Element, precedence: i32) -> Fragment {
        match element {
            Element::Labeled(_) => match element.inner() {
                Some(inner) => self.rule_call_element(&inner, precedence),
                None => self.epsilon_fragment(),
            },
            Element::RuleRef(_) => {
                let name = element.main_token().map(|t| t.text().to_string());
                self.rule_call(name.as_deref().unwrap_or_default(), precedence)
            }
            _ => self.element(element),
        }
    }

    /// `e : e op e | op e | e suffix | primary` becomes
    /// `e : (op e | primary) ({precpred}? op e | {precpred}? suffix)*`.
    fn left_recursive_body(&mut self, name: &str, alt_list: &AltList) -> Fragment {
        let alternatives: Vec<Alternative> = alt_list.alternatives().collect();
        let count = alternatives.len();
        let mut primary = Vec::new();
        let mut operators = Vec::new();
        for (i, alternative) in alternatives.iter().enumerate() {
            let precedence = (count - i) as i32;
            let elements: Vec<Element> = alternative.elements().collect();
            let ends_with_self = elements.len() > 1
                && elements.last().is_some_and(|e| is_self_reference(e, name));
            if elements.first().is_some_and(|e| is_self_reference(e, name)) {
                let right = alternative.option("assoc").as_deref() == Some("right");
                let next = if right { precedence } else { precedence + 1 };
                operators.push((precedence, elements, ends_with_self.then_some(next)));
            } else {
                primary.push((elements, ends_with_self.then_some(precedence)));
            }
        }

        let mut primary_fragments = Vec::new();
        for (elements, call_precedence) in primary {
            let fragment = if elements.is_empty() {
                self.epsilon_fragment()
            } else {
                let fragments = self.element_fragments(&elements, call_precedence);
                self.elem_list(fragments)
            };
            primary_fragments.push(fragment);
        }
        let primary = self.block(primary_fragments);

        let mut operator_fragments = Vec::new();
        for (precedence, elements, call_precedence) in operators {
            let mut fragments =
                vec![self.transition_fragment(|target| Transition::Precedence { target, precedence })];
            fragments.extend(self.element_fragments(&elements[1..], call_precedence));
            operator_fragments.push(self.elem_list(fragments));
        }
        let operators = self.star(&operator_fragments, true);

        let start = self.atn.rule_to_start_state[self.current_rule];
        if let Some(state) = self.atn.state_mut(start) {
            state.precedence_rule = true;
        }
        self.elem_list(vec![primary, operators])
    }

    // ------------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------------

    fn element(&mut self, element: &Element) -> Fragment {
        match element {
            Element::Labeled(_) => match element.inner() {
                Some(inner) => self.element(&inner),
                None => self.epsilon_fragment(),
            },
            Element::Ebnf(_) => self.ebnf(element),
            Element::Block(_) => match element.alt_list() {
                Some(alt_list) => {
                    let alternatives = self.alternatives(&alt_list);
                    self.block(alternatives)
                }
                None => self.epsilon_fragment(),
            },
            Element::Terminal(_) => self.terminal(element),
            Element::RuleRef(_) => {
                let name = element.main_token().map(|t| t.text().to_string());
                if self.is_lexer() {
                    self.epsilon_fragment()
                } else {
                    self.rule_call(name.as_deref().unwrap_or_default(), 0)
                }
            }
            Element::CharRange(_) => self.char_range(element),
            Element::NotSet(_) => {
                let set = match element.inner() {
                    Some(inner) => self.set_of(&inner),
                    None => IntervalSet::new(),
                };
                self.transition_fragment(|target| Transition::NotSet { target, set })
            }
            Element::Wildcard(_) => self.transition_fragment(|target| Transition::Wildcard { target }),
            Element::CharSet(_) => {
                if !self.is_lexer() {
                    return self.epsilon_fragment();
                }
                let set = element
                    .main_token()
                    .map(|t| char_set(t.text()))
                    .unwrap_or_default();
                self.transition_fragment(|target| Transition::Set { target, set })
            }
            Element::Action(_) => {
                if self.is_lexer() {
                    let action = LexerAction::Custom {
                        rule_index: self.current_rule as i32,
                        action_index: self.custom_action_count,
                    };
                    self.custom_action_count += 1;
                    self.lexer_action(action)
                } else {
                    let rule_index = self.current_rule as i32;
                    self.transition_fragment(|target| Transition::Action {
                        target,
                        rule_index,
                        action_index: -1,
                        ctx_dependent: false,
                    })
                }
            }
            Element::Predicate(_) => {
                let rule_index = self.current_rule as i32;
                let pred_index = self.predicate_count;
                self.predicate_count += 1;
                let ctx_dependent = !self.is_lexer()
                    && element.main_token().is_some_and(|t| t.text().contains('$'));
                self.transition_fragment(|target| Transition::Predicate {
                    target,
                    rule_index,
                    pred_index,
                    ctx_dependent,
                })
            }
        }
    }

    fn ebnf(&mut self, element: &Element) -> Fragment {
        let (Some(inner), Some((op, greedy))) = (element.inner(), element.ebnf_op()) else {
            return self.epsilon_fragment();
        };
        let alternatives = match (&inner, inner.alt_list()) {
            (Element::Block(_), Some(alt_list)) => self.alternatives(&alt_list),
            _ => vec![self.element(&inner)],
        };
        match op {
            EbnfOp::Optional => self.optional(&alternatives, greedy),
            EbnfOp::ZeroOrMore => self.star(&alternatives, greedy),
            EbnfOp::OneOrMore => self.plus(&alternatives, greedy),
        }
    }

    fn terminal(&mut self, element: &Element) -> Fragment {
        let Some(token) = element.main_token() else {
            return self.epsilon_fragment();
        };
        let text = token.text().to_string();
        match (self.is_lexer(), token.kind()) {
            (true, SyntaxKind::STRING_LITERAL) => self.string_literal(&text),
            (true, _) if text == "EOF" => self.atom(TOKEN_EOF),
            (true, _) => self.rule_call(&text, 0),
            (false, _) => {
                let token_type = self.types.type_of(&text);
                self.atom(token_type)
            }
        }
    }

    fn atom(&mut self, label: i32) -> Fragment {
        self.transition_fragment(|target| Transition::Atom { target, label })
    }

    fn rule_call(&mut self, name: &str, precedence: i32) -> Fragment {
        let Some(rule_index) = self.rule_indices.get(name).copied() else {
            return self.epsilon_fragment();
        };
        let start = self.atn.rule_to_start_state[rule_index];
        self.transition_fragment(|follow| Transition::Rule {
            target: start,
            rule_index,
            precedence,
            follow,
        })
    }

    /// A chain of character atoms
    fn string_literal(&mut self, text: &str) -> Fragment {
        let codes = literal_code_points(text);
        if codes.is_empty() {
            return self.epsilon_fragment();
        }
        let entry = self.new_state(AtnStateType::Basic);
        let mut previous = entry;
        for code in codes {
            let next = self.new_state(AtnStateType::Basic);
            self.atn.add_transition(
                previous,
                Transition::Atom {
                    target: next,
                    label: code,
                },
            );
            previous = next;
        }
        Fragment::new(entry, previous)
    }

    fn char_range(&mut self, element: &Element) -> Fragment {
        let bounds = element.range_bounds().and_then(|(a, b)| {
            let start = literal_code_points(a.text()).first().copied()?;
            let stop = literal_code_points(b.text()).first().copied()?;
            Some((start, stop))
        });
        match bounds {
            Some((start, stop)) if self.is_lexer() && start == stop => self.atom(start),
            Some((start, stop)) if self.is_lexer() => {
                self.transition_fragment(|target| Transition::Range { target, start, stop })
            }
            _ => self.epsilon_fragment(),
        }
    }

    /// The symbols an operand of `~` stands for
    fn set_of(&self, element: &Element) -> IntervalSet {
        let mut set = IntervalSet::new();
        match element {
            Element::Terminal(_) => {
                if let Some(token) = element.main_token() {
                    if !self.is_lexer() {
                        set.add(self.types.type_of(token.text()));
                    } else if token.kind() == SyntaxKind::STRING_LITERAL
                        && let Some(code) = literal_code_points(token.text()).first()
                    {
                        set.add(*code);
                    }
                }
            }
            Element::CharSet(_) => {
                if let Some(token) = element.main_token() {
                    set.add_set(&char_set(token.text()));
                }
            }
            Element::CharRange(_) => {
                if let Some((a, b)) = element.range_bounds()
                    && let (Some(start), Some(stop)) = (
                        literal_code_points(a.text()).first().copied(),
                        literal_code_points(b.text()).first().copied(),
                    )
                {
                    set.add_range(start, stop);
                }
            }
            Element::Block(_) => {
                if let Some(alt_list) = element.alt_list() {
                    for alternative in alt_list.alternatives() {
                        for element in alternative.elements() {
                            set.add_set(&self.set_of(&element));
                        }
                    }
                }
            }
            Element::Labeled(_) => {
                if let Some(inner) = element.inner() {
                    set.add_set(&self.set_of(&inner));
                }
            }
            _ => {}
        }
        set
    }

    // ------------------------------------------------------------------------
    // Lexer actions
    // ------------------------------------------------------------------------

    fn lexer_command(&self, name: &str, argument: Option<&str>) -> Option<LexerAction> {
        let index_or_number = |names: &[String], arg: &str| {
            names
                .iter()
                .position(|n| n == arg)
                .map(|i| i as i32)
                .or_else(|| arg.parse().ok())
        };
        let action = match name {
            "skip" => LexerAction::Skip,
            "more" => LexerAction::More,
            "popMode" => LexerAction::PopMode,
            "mode" => LexerAction::Mode(index_or_number(&self.layout.modes, argument?)?),
            "pushMode" => LexerAction::PushMode(index_or_number(&self.layout.modes, argument?)?),
            "channel" => LexerAction::Channel(index_or_number(&self.layout.channels, argument?)?),
            "type" => {
                let argument = argument?;
                let token_type = argument
                    .parse()
                    .ok()
                    .or_else(|| self.types.name_type(argument))?;
                LexerAction::Type(token_type)
            }
            _ => return None,
        };
        Some(action)
    }

    fn lexer_action(&mut self, action: LexerAction) -> Fragment {
        let (index, _) = self.lexer_actions.insert_full(action);
        let rule_index = self.current_rule as i32;
        self.transition_fragment(|target| Transition::Action {
            target,
            rule_index,
            action_index: index as i32,
            ctx_dependent: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn build(source: &str) -> BuiltGrammar {
        let parse = parse(source);
        assert!(parse.ok(), "{:?}", parse.errors);
        build_interpreter_data(&parse.tree(), &[], None)
    }

    fn round_trips(data: &InterpreterData) {
        let loaded = Atn::deserialize(&data.atn.serialize()).unwrap();
        assert_eq!(loaded, data.atn);
    }

    #[test]
    fn test_combined_grammar_splits_into_parser_and_lexer() {
        let built = build("grammar T;\nr: 'a' ID;\nID: [a-z]+;\nWS: ' ' -> skip;\n");
        let parser = built.parser.unwrap();
        let lexer = built.lexer.unwrap();

        assert_eq!(parser.rule_names, vec!["r"]);
        assert_eq!(lexer.rule_names, vec!["T__0", "ID", "WS"]);
        assert_eq!(lexer.vocabulary.literal_name(1), Some("'a'"));
        assert_eq!(lexer.vocabulary.symbolic_name(1), None);
        assert_eq!(lexer.vocabulary.symbolic_name(2), Some("ID"));
        assert_eq!(lexer.vocabulary.symbolic_name(3), Some("WS"));
        assert_eq!(lexer.atn.rule_to_token_type, vec![1, 2, 3]);
        assert_eq!(lexer.atn.lexer_actions, vec![LexerAction::Skip]);
        assert_eq!(lexer.modes, vec![DEFAULT_MODE]);
        assert_eq!(lexer.channels, vec!["DEFAULT_TOKEN_CHANNEL", "HIDDEN"]);
        round_trips(&parser);
        round_trips(&lexer);
    }

    #[test]
    fn test_adjacent_elements_share_states() {
        let built = build("parser grammar P;\ntokens { A, B }\nr: A B;\n");
        let atn = built.parser.unwrap().atn;
        // rule start/stop are 0/1, A is 2->3 and B is 4->5; 3 gets folded away
        assert_eq!(atn.states[3].state_type, AtnStateType::Invalid);
        assert_eq!(
            atn.states[2].transitions,
            vec![Transition::Atom { target: 4, label: 1 }]
        );
        assert_eq!(atn.states[0].transitions, vec![Transition::epsilon(2)]);
        assert_eq!(atn.states[5].transitions, vec![Transition::epsilon(1)]);
    }

    #[test]
    fn test_loops_define_decisions() {
        let built = build("parser grammar P;\ntokens { A, B }\nr: (A | B)* A+? B?;\n");
        let atn = built.parser.unwrap().atn;
        let decision_types: Vec<_> = atn
            .decision_to_state
            .iter()
            .map(|s| atn.states[*s].state_type)
            .collect();
        assert_eq!(
            decision_types,
            vec![
                AtnStateType::StarBlockStart,
                AtnStateType::StarLoopEntry,
                AtnStateType::PlusLoopBack,
                AtnStateType::BlockStart,
            ]
        );
        let plus_loop = atn.decision_to_state[2];
        assert!(atn.states[plus_loop].non_greedy);
        let loop_ends = atn
            .states
            .iter()
            .filter(|s| s.state_type == AtnStateType::LoopEnd)
            .count();
        assert_eq!(loop_ends, 2);
        let built = build("parser grammar P;\ntokens { A, B }\nr: (A | B)* A+? B?;\n");
        round_trips(&built.parser.unwrap());
    }

    #[test]
    fn test_left_recursive_rule_uses_precedence() {
        let built = build(
            "parser grammar E;\ntokens { INT, STAR, PLUS, POW }\ne: e STAR e | e PLUS e | <assoc=right> e POW e | INT;\n",
        );
        let atn = built.parser.unwrap().atn;
        assert!(atn.states[atn.rule_to_start_state[0]].precedence_rule);

        let transitions: Vec<&Transition> =
            atn.states.iter().flat_map(|s| &s.transitions).collect();
        let predicates: Vec<i32> = transitions
            .iter()
            .filter_map(|t| match t {
                Transition::Precedence { precedence, .. } => Some(*precedence),
                _ => None,
            })
            .collect();
        assert_eq!(predicates, vec![4, 3, 2]);
        let calls: Vec<i32> = transitions
            .iter()
            .filter_map(|t| match t {
                Transition::Rule { precedence, .. } => Some(*precedence),
                _ => None,
            })
            .collect();
        assert_eq!(calls, vec![5, 4, 2]);
        assert!(!transitions.iter().any(|t| matches!(t, Transition::Rule { precedence: 0, .. })));
    }

    #[test]
    fn test_lexer_modes_channels_and_commands() {
        let built = build(
            "lexer grammar L;\nchannels { COMMENTS }\nC: '#' ~[\\n]* -> channel(COMMENTS);\nOPEN: '<' -> pushMode(INSIDE);\nfragment DIGIT: [0-9];\nmode INSIDE;\nCLOSE: '>' -> popMode;\nNUM: DIGIT+ {count++;};\n",
        );
        assert!(built.parser.is_none());
        let lexer = built.lexer.unwrap();
        assert_eq!(lexer.modes, vec!["DEFAULT_MODE", "INSIDE"]);
        assert_eq!(lexer.channels[2], "COMMENTS");
        assert_eq!(lexer.rule_names, vec!["C", "OPEN", "DIGIT", "CLOSE", "NUM"]);
        assert_eq!(lexer.atn.rule_to_token_type, vec![1, 2, 0, 3, 4]);
        assert_eq!(
            lexer.atn.lexer_actions,
            vec![
                LexerAction::Channel(2),
                LexerAction::PushMode(1),
                LexerAction::PopMode,
                LexerAction::Custom {
                    rule_index: 4,
                    action_index: 0
                },
            ]
        );
        assert_eq!(lexer.atn.mode_to_start_state, vec![0, 1]);
        let inside_start = &lexer.atn.states[1];
        assert_eq!(inside_start.transitions.len(), 2);
        assert_eq!(lexer.vocabulary.literal_name(1), None);
        assert_eq!(lexer.vocabulary.literal_name(2), Some("'<'"));
        assert_eq!(lexer.vocabulary.literal_name(3), Some("'>'"));
        round_trips(&lexer);
    }

    #[test]
    fn test_single_literal_rules_alias_literals() {
        let built = build("grammar G;\nr: '+' ID;\nPLUS: '+';\nID: [a-z]+;\n");
        let lexer = built.lexer.unwrap();
        assert_eq!(lexer.rule_names, vec!["PLUS", "ID"]);
        assert_eq!(lexer.vocabulary.literal_name(1), Some("'+'"));
        let parser = built.parser.unwrap();
        let atoms: Vec<i32> = parser
            .atn
            .states
            .iter()
            .flat_map(|s| &s.transitions)
            .filter_map(|t| match t {
                Transition::Atom { label, .. } => Some(*label),
                _ => None,
            })
            .collect();
        assert_eq!(atoms, vec![1, 2]);
    }

    #[test]
    fn test_parser_grammar_uses_token_vocabulary() {
        let vocabulary = Vocabulary::new(
            vec![None, Some("';'".into())],
            vec![None, Some("SEMI".into()), Some("ID".into())],
        );
        let parse = parse("parser grammar P;\nr: ID ';' EOF;\n");
        let built = build_interpreter_data(&parse.tree(), &[], Some(&vocabulary));
        assert!(built.lexer.is_none());
        let parser = built.parser.unwrap();
        let atoms: Vec<i32> = parser
            .atn
            .states
            .iter()
            .flat_map(|s| &s.transitions)
            .filter_map(|t| match t {
                Transition::Atom { label, .. } => Some(*label),
                _ => None,
            })
            .collect();
        assert_eq!(atoms, vec![2, 1, TOKEN_EOF]);
        round_trips(&parser);
    }

    #[test]
    fn test_imported_rules_are_merged_without_overriding() {
        let main = parse("grammar M;\nimport Base;\nr: x;\nx: ID;\nID: [a-z]+;\n");
        let base = parse("parser grammar Base;\nx: ID ID;\ny: ID;\n");
        let built = build_interpreter_data(&main.tree(), &[base.tree()], None);
        assert_eq!(built.parser.unwrap().rule_names, vec!["r", "x", "y"]);
    }
}
