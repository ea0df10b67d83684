//! Augmented transition network model.
//!
//! States live in a flat vector and refer to each other by state number. The
//! layout follows the ANTLR runtime so automata round-trip through the serialized
//! form in `.interp` files.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::interval_set::IntervalSet;

/// Token type of end of input
pub const TOKEN_EOF: i32 = -1;
/// Token type 0 is never assigned
pub const TOKEN_INVALID: i32 = 0;
pub const MIN_USER_TOKEN_TYPE: i32 = 1;
pub const MIN_CHAR: i32 = 0;
pub const MAX_CHAR: i32 = 0x10FFFF;

// ============================================================================
// STATES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtnStateType {
    Invalid,
    Basic,
    RuleStart,
    BlockStart,
    PlusBlockStart,
    StarBlockStart,
    TokenStart,
    RuleStop,
    BlockEnd,
    StarLoopBack,
    StarLoopEntry,
    PlusLoopBack,
    LoopEnd,
}

impl AtnStateType {
    const ALL: [AtnStateType; 13] = [
        Self::Invalid,
        Self::Basic,
        Self::RuleStart,
        Self::BlockStart,
        Self::PlusBlockStart,
        Self::StarBlockStart,
        Self::TokenStart,
        Self::RuleStop,
        Self::BlockEnd,
        Self::StarLoopBack,
        Self::StarLoopEntry,
        Self::PlusLoopBack,
        Self::LoopEnd,
    ];

    /// Serialized state type number
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Block start states carry an end state in the serialized form
    pub fn is_block_start(self) -> bool {
        matches!(
            self,
            Self::BlockStart | Self::PlusBlockStart | Self::StarBlockStart
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtnState {
    pub number: usize,
    pub state_type: AtnStateType,
    /// Index of the owning rule, -1 for mode start states
    pub rule_index: i32,
    pub transitions: Vec<Transition>,
    /// Block end of a block start state
    pub end_state: Option<usize>,
    /// Loop back state of a loop end state
    pub loop_back: Option<usize>,
    pub decision: Option<usize>,
    pub non_greedy: bool,
    /// Rule start of a rewritten left-recursive rule
    pub precedence_rule: bool,
}

impl AtnState {
    pub fn new(number: usize, state_type: AtnStateType, rule_index: i32) -> Self {
        Self {
            number,
            state_type,
            rule_index,
            transitions: Vec::new(),
            end_state: None,
            loop_back: None,
            decision: None,
            non_greedy: false,
            precedence_rule: false,
        }
    }

    pub fn only_epsilon(&self) -> bool {
        !self.transitions.is_empty() && self.transitions.iter().all(Transition::is_epsilon)
    }
}

// ============================================================================
// TRANSITIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionType {
    Epsilon,
    Range,
    Rule,
    Predicate,
    Atom,
    Action,
    Set,
    NotSet,
    Wildcard,
    Precedence,
}

impl TransitionType {
    const ALL: [TransitionType; 10] = [
        Self::Epsilon,
        Self::Range,
        Self::Rule,
        Self::Predicate,
        Self::Atom,
        Self::Action,
        Self::Set,
        Self::NotSet,
        Self::Wildcard,
        Self::Precedence,
    ];

    /// Serialized transition type number (starting at 1)
    pub fn code(self) -> i32 {
        self as i32 + 1
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code - 1)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Epsilon {
        target: usize,
        /// Rule index for returns out of a precedence rule, -1 otherwise
        outermost_precedence_return: i32,
    },
    Range {
        target: usize,
        start: i32,
        stop: i32,
    },
    /// Invocation of another rule; `target` is the callee's start state
    Rule {
        target: usize,
        rule_index: usize,
        precedence: i32,
        follow: usize,
    },
    Predicate {
        target: usize,
        rule_index: i32,
        pred_index: i32,
        ctx_dependent: bool,
    },
    Atom {
        target: usize,
        label: i32,
    },
    Action {
        target: usize,
        rule_index: i32,
        action_index: i32,
        ctx_dependent: bool,
    },
    Set {
        target: usize,
        set: IntervalSet,
    },
    NotSet {
        target: usize,
        set: IntervalSet,
    },
    Wildcard {
        target: usize,
    },
    Precedence {
        target: usize,
        precedence: i32,
    },
}

impl Transition {
    pub fn epsilon(target: usize) -> Self {
        Self::Epsilon {
            target,
            outermost_precedence_return: -1,
        }
    }

    pub fn target(&self) -> usize {
        match self {
            Self::Epsilon { target, .. }
            | Self::Range { target, .. }
            | Self::Rule { target, .. }
            | Self::Predicate { target, .. }
            | Self::Atom { target, .. }
            | Self::Action { target, .. }
            | Self::Set { target, .. }
            | Self::NotSet { target, .. }
            | Self::Wildcard { target }
            | Self::Precedence { target, .. } => *target,
        }
    }

    pub fn set_target(&mut self, new_target: usize) {
        match self {
            Self::Epsilon { target, .. }
            | Self::Range { target, .. }
            | Self::Rule { target, .. }
            | Self::Predicate { target, .. }
            | Self::Atom { target, .. }
            | Self::Action { target, .. }
            | Self::Set { target, .. }
            | Self::NotSet { target, .. }
            | Self::Wildcard { target }
            | Self::Precedence { target, .. } => *target = new_target,
        }
    }

    pub fn transition_type(&self) -> TransitionType {
        match self {
            Self::Epsilon { .. } => TransitionType::Epsilon,
            Self::Range { .. } => TransitionType::Range,
            Self::Rule { .. } => TransitionType::Rule,
            Self::Predicate { .. } => TransitionType::Predicate,
            Self::Atom { .. } => TransitionType::Atom,
            Self::Action { .. } => TransitionType::Action,
            Self::Set { .. } => TransitionType::Set,
            Self::NotSet { .. } => TransitionType::NotSet,
            Self::Wildcard { .. } => TransitionType::Wildcard,
            Self::Precedence { .. } => TransitionType::Precedence,
        }
    }

    /// Transitions that consume no input
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Self::Epsilon { .. }
                | Self::Rule { .. }
                | Self::Predicate { .. }
                | Self::Action { .. }
                | Self::Precedence { .. }
        )
    }

    /// Symbols matched by a consuming transition, relative to `min..=max` for
    /// negated sets and wildcards
    pub fn label(&self, min: i32, max: i32) -> Option<IntervalSet> {
        match self {
            Self::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Self::Range { start, stop, .. } => Some(IntervalSet::of_range(*start, *stop)),
            Self::Set { set, .. } => Some(set.clone()),
            Self::NotSet { set, .. } => Some(set.complement(min, max)),
            Self::Wildcard { .. } => Some(IntervalSet::of_range(min, max)),
            _ => None,
        }
    }
}

// ============================================================================
// LEXER ACTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexerAction {
    Channel(i32),
    Custom { rule_index: i32, action_index: i32 },
    Mode(i32),
    More,
    PopMode,
    PushMode(i32),
    Skip,
    Type(i32),
}

impl LexerAction {
    pub fn code(&self) -> i32 {
        match self {
            Self::Channel(_) => 0,
            Self::Custom { .. } => 1,
            Self::Mode(_) => 2,
            Self::More => 3,
            Self::PopMode => 4,
            Self::PushMode(_) => 5,
            Self::Skip => 6,
            Self::Type(_) => 7,
        }
    }

    /// The two serialized data words
    pub fn data(&self) -> (i32, i32) {
        match self {
            Self::Channel(v) | Self::Mode(v) | Self::PushMode(v) | Self::Type(v) => (*v, 0),
            Self::Custom {
                rule_index,
                action_index,
            } => (*rule_index, *action_index),
            Self::More | Self::PopMode | Self::Skip => (0, 0),
        }
    }

    pub fn from_code(code: i32, data1: i32, data2: i32) -> Option<Self> {
        let action = match code {
            0 => Self::Channel(data1),
            1 => Self::Custom {
                rule_index: data1,
                action_index: data2,
            },
            2 => Self::Mode(data1),
            3 => Self::More,
            4 => Self::PopMode,
            5 => Self::PushMode(data1),
            6 => Self::Skip,
            7 => Self::Type(data1),
            _ => return None,
        };
        Some(action)
    }
}

impl fmt::Display for LexerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(c) => write!(f, "channel({c})"),
            Self::Custom {
                rule_index,
                action_index,
            } => write!(f, "action({rule_index}, {action_index})"),
            Self::Mode(m) => write!(f, "mode({m})"),
            Self::More => write!(f, "more"),
            Self::PopMode => write!(f, "popMode"),
            Self::PushMode(m) => write!(f, "pushMode({m})"),
            Self::Skip => write!(f, "skip"),
            Self::Type(t) => write!(f, "type({t})"),
        }
    }
}

// ============================================================================
// ATN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtnType {
    Lexer,
    Parser,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atn {
    pub grammar_type: AtnType,
    pub max_token_type: i32,
    pub states: Vec<AtnState>,
    pub rule_to_start_state: Vec<usize>,
    pub rule_to_stop_state: Vec<usize>,
    /// Token type per lexer rule (0 for fragments)
    pub rule_to_token_type: Vec<i32>,
    pub mode_to_start_state: Vec<usize>,
    pub decision_to_state: Vec<usize>,
    pub lexer_actions: Vec<LexerAction>,
}

impl Atn {
    pub fn new(grammar_type: AtnType, max_token_type: i32) -> Self {
        Self {
            grammar_type,
            max_token_type,
            states: Vec::new(),
            rule_to_start_state: Vec::new(),
            rule_to_stop_state: Vec::new(),
            rule_to_token_type: Vec::new(),
            mode_to_start_state: Vec::new(),
            decision_to_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    pub fn add_state(&mut self, state_type: AtnStateType, rule_index: i32) -> usize {
        let number = self.states.len();
        self.states.push(AtnState::new(number, state_type, rule_index));
        number
    }

    pub fn state(&self, number: usize) -> Option<&AtnState> {
        self.states.get(number)
    }

    pub fn state_mut(&mut self, number: usize) -> Option<&mut AtnState> {
        self.states.get_mut(number)
    }

    pub fn add_transition(&mut self, from: usize, transition: Transition) {
        if let Some(state) = self.states.get_mut(from) {
            state.transitions.push(transition);
        }
    }

    /// Marks a state as a decision point and returns the decision number.
    pub fn define_decision(&mut self, number: usize) -> usize {
        let decision = self.decision_to_state.len();
        self.decision_to_state.push(number);
        if let Some(state) = self.states.get_mut(number) {
            state.decision = Some(decision);
        }
        decision
    }

    /// Removes a state from the automaton, keeping the numbering of the others.
    pub fn remove_state(&mut self, number: usize) {
        if let Some(state) = self.states.get_mut(number) {
            *state = AtnState::new(number, AtnStateType::Invalid, -1);
        }
    }

    pub fn number_of_rules(&self) -> usize {
        self.rule_to_start_state.len()
    }

    /// Adds the return edges from each rule stop state to the follow states of
    /// every invocation of that rule.
    pub fn add_rule_follow_links(&mut self) {
        let mut links = Vec::new();
        for state in &self.states {
            for transition in &state.transitions {
                if let Transition::Rule {
                    rule_index,
                    precedence,
                    follow,
                    ..
                } = transition
                {
                    let precedence_rule = self
                        .rule_to_start_state
                        .get(*rule_index)
                        .and_then(|s| self.states.get(*s))
                        .is_some_and(|s| s.precedence_rule);
                    let outermost = if precedence_rule && *precedence == 0 {
                        *rule_index as i32
                    } else {
                        -1
                    };
                    if let Some(stop) = self.rule_to_stop_state.get(*rule_index) {
                        links.push((*stop, *follow, outermost));
                    }
                }
            }
        }
        for (stop, follow, outermost) in links {
            self.add_transition(
                stop,
                Transition::Epsilon {
                    target: follow,
                    outermost_precedence_return: outermost,
                },
            );
        }
    }
}

// ============================================================================
// VOCABULARY AND INTERPRETER DATA
// ============================================================================

/// Literal and symbolic token names indexed by token type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub literal_names: Vec<Option<String>>,
    pub symbolic_names: Vec<Option<String>>,
}

impl Vocabulary {
    pub fn new(literal_names: Vec<Option<String>>, symbolic_names: Vec<Option<String>>) -> Self {
        Self {
            literal_names,
            symbolic_names,
        }
    }

    pub fn max_token_type(&self) -> i32 {
        self.literal_names.len().max(self.symbolic_names.len()) as i32 - 1
    }

    fn name_at(names: &[Option<String>], token_type: i32) -> Option<&str> {
        usize::try_from(token_type)
            .ok()
            .and_then(|i| names.get(i))
            .and_then(|n| n.as_deref())
    }

    pub fn literal_name(&self, token_type: i32) -> Option<&str> {
        Self::name_at(&self.literal_names, token_type)
    }

    pub fn symbolic_name(&self, token_type: i32) -> Option<&str> {
        if token_type == TOKEN_EOF {
            return Some("EOF");
        }
        Self::name_at(&self.symbolic_names, token_type)
    }

    /// Literal name if there is one, then symbolic name, then the number
    pub fn display_name(&self, token_type: i32) -> String {
        self.literal_name(token_type)
            .or_else(|| self.symbolic_name(token_type))
            .map(str::to_string)
            .unwrap_or_else(|| token_type.to_string())
    }

    /// Token type for a symbolic name (`ID`) or a literal (`'+'`)
    pub fn token_type(&self, name: &str) -> Option<i32> {
        if name == "EOF" {
            return Some(TOKEN_EOF);
        }
        let find = |names: &[Option<String>]| {
            names
                .iter()
                .position(|n| n.as_deref() == Some(name))
                .map(|i| i as i32)
        };
        find(&self.symbolic_names).or_else(|| find(&self.literal_names))
    }
}

/// The content of an ANTLR `.interp` file
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterData {
    pub atn: Atn,
    pub vocabulary: Vocabulary,
    pub rule_names: Vec<String>,
    /// Lexer only
    pub channels: Vec<String>,
    /// Lexer only
    pub modes: Vec<String>,
}

impl InterpreterData {
    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rule_names.iter().position(|r| r == name)
    }

    pub fn is_lexer(&self) -> bool {
        self.atn.grammar_type == AtnType::Lexer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes_round_trip() {
        for code in 0..13 {
            assert_eq!(AtnStateType::from_code(code).map(|t| t.code()), Some(code));
        }
        for code in 1..=10 {
            assert_eq!(TransitionType::from_code(code).map(|t| t.code()), Some(code));
        }
        assert_eq!(TransitionType::from_code(0), None);
        assert_eq!(AtnStateType::LoopEnd.code(), 12);
        assert_eq!(TransitionType::Precedence.code(), 10);
    }

    #[test]
    fn test_vocabulary_names() {
        let vocabulary = Vocabulary::new(
            vec![None, Some("'+'".into()), None],
            vec![None, Some("PLUS".into()), Some("ID".into())],
        );
        assert_eq!(vocabulary.max_token_type(), 2);
        assert_eq!(vocabulary.display_name(1), "'+'");
        assert_eq!(vocabulary.display_name(2), "ID");
        assert_eq!(vocabulary.display_name(TOKEN_EOF), "EOF");
        assert_eq!(vocabulary.token_type("'+'"), Some(1));
        assert_eq!(vocabulary.token_type("ID"), Some(2));
    }

    #[test]
    fn test_follow_links_mark_precedence_returns() {
        let mut atn = Atn::new(AtnType::Parser, 1);
        let start = atn.add_state(AtnStateType::RuleStart, 0);
        let stop = atn.add_state(AtnStateType::RuleStop, 0);
        atn.rule_to_start_state.push(start);
        atn.rule_to_stop_state.push(stop);
        atn.states[start].precedence_rule = true;
        let left = atn.add_state(AtnStateType::Basic, 0);
        let right = atn.add_state(AtnStateType::Basic, 0);
        atn.add_transition(
            left,
            Transition::Rule {
                target: start,
                rule_index: 0,
                precedence: 0,
                follow: right,
            },
        );
        atn.add_rule_follow_links();
        assert_eq!(
            atn.states[stop].transitions,
            vec![Transition::Epsilon {
                target: right,
                outermost_precedence_return: 0
            }]
        );
    }
}
