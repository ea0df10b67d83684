//! Serialized ATN form (version 4) and the `.interp` interpreter data format.

use std::path::Path;

use indexmap::IndexSet;
use tracing::debug;

use crate::error::{GrammarError, Result};

use super::interval_set::IntervalSet;
use super::model::{
    Atn, AtnState, AtnStateType, AtnType, InterpreterData, LexerAction, TOKEN_EOF, Transition,
    TransitionType, Vocabulary,
};

pub const SERIALIZED_VERSION: i32 = 4;

/// Marker some tool versions write for "no value"
const NO_VALUE: i32 = 0xFFFF;

// ============================================================================
// SERIALIZATION
// ============================================================================

impl Atn {
    pub fn serialize(&self) -> Vec<i32> {
        let mut data = vec![
            SERIALIZED_VERSION,
            match self.grammar_type {
                AtnType::Lexer => 0,
                AtnType::Parser => 1,
            },
            self.max_token_type,
        ];

        let mut edge_count = 0;
        let mut non_greedy = Vec::new();
        let mut precedence = Vec::new();
        data.push(self.states.len() as i32);
        for state in &self.states {
            if state.state_type == AtnStateType::Invalid {
                data.push(AtnStateType::Invalid.code());
                continue;
            }
            if state.non_greedy && state.decision.is_some() {
                non_greedy.push(state.number as i32);
            }
            if state.precedence_rule {
                precedence.push(state.number as i32);
            }
            data.push(state.state_type.code());
            data.push(state.rule_index);
            if state.state_type == AtnStateType::LoopEnd {
                data.push(state.loop_back.map_or(-1, |s| s as i32));
            } else if state.state_type.is_block_start() {
                data.push(state.end_state.map_or(-1, |s| s as i32));
            }
            if state.state_type != AtnStateType::RuleStop {
                edge_count += state.transitions.len();
            }
        }

        data.push(non_greedy.len() as i32);
        data.extend(non_greedy);
        data.push(precedence.len() as i32);
        data.extend(precedence);

        data.push(self.rule_to_start_state.len() as i32);
        for (rule, start) in self.rule_to_start_state.iter().enumerate() {
            data.push(*start as i32);
            if self.grammar_type == AtnType::Lexer {
                data.push(self.rule_to_token_type.get(rule).copied().unwrap_or(0));
            }
        }

        data.push(self.mode_to_start_state.len() as i32);
        data.extend(self.mode_to_start_state.iter().map(|s| *s as i32));

        let mut sets: IndexSet<IntervalSet> = IndexSet::new();
        for state in &self.states {
            for transition in &state.transitions {
                if let Transition::Set { set, .. } | Transition::NotSet { set, .. } = transition {
                    sets.insert(set.clone());
                }
            }
        }
        data.push(sets.len() as i32);
        for set in &sets {
            let contains_eof = set.contains(TOKEN_EOF);
            let intervals = set.intervals();
            let mut count = intervals.len() as i32;
            if contains_eof && intervals.first().is_some_and(|i| i.stop == TOKEN_EOF) {
                count -= 1;
            }
            data.push(count);
            data.push(i32::from(contains_eof));
            for interval in intervals {
                if interval.start == TOKEN_EOF {
                    if interval.stop == TOKEN_EOF {
                        continue;
                    }
                    data.push(0);
                } else {
                    data.push(interval.start);
                }
                data.push(interval.stop);
            }
        }

        data.push(edge_count as i32);
        for state in &self.states {
            if matches!(
                state.state_type,
                AtnStateType::Invalid | AtnStateType::RuleStop
            ) {
                continue;
            }
            for transition in &state.transitions {
                let mut target = transition.target() as i32;
                let (mut a1, mut a2, mut a3) = (0, 0, 0);
                match transition {
                    Transition::Rule {
                        target: start,
                        rule_index,
                        precedence,
                        follow,
                    } => {
                        target = *follow as i32;
                        a1 = *start as i32;
                        a2 = *rule_index as i32;
                        a3 = *precedence;
                    }
                    Transition::Precedence { precedence, .. } => a1 = *precedence,
                    Transition::Predicate {
                        rule_index,
                        pred_index,
                        ctx_dependent,
                        ..
                    } => {
                        a1 = *rule_index;
                        a2 = *pred_index;
                        a3 = i32::from(*ctx_dependent);
                    }
                    Transition::Range { start, stop, .. } => {
                        a1 = *start;
                        a2 = *stop;
                        if *start == TOKEN_EOF {
                            a1 = 0;
                            a3 = 1;
                        }
                    }
                    Transition::Atom { label, .. } => {
                        a1 = *label;
                        if *label == TOKEN_EOF {
                            a1 = 0;
                            a3 = 1;
                        }
                    }
                    Transition::Action {
                        rule_index,
                        action_index,
                        ctx_dependent,
                        ..
                    } => {
                        a1 = *rule_index;
                        a2 = if *action_index < 0 { NO_VALUE } else { *action_index };
                        a3 = i32::from(*ctx_dependent);
                    }
                    Transition::Set { set, .. } | Transition::NotSet { set, .. } => {
                        a1 = sets.get_index_of(set).unwrap_or(0) as i32;
                    }
                    Transition::Epsilon { .. } | Transition::Wildcard { .. } => {}
                }
                data.extend([
                    state.number as i32,
                    target,
                    transition.transition_type().code(),
                    a1,
                    a2,
                    a3,
                ]);
            }
        }

        data.push(self.decision_to_state.len() as i32);
        data.extend(self.decision_to_state.iter().map(|s| *s as i32));

        if self.grammar_type == AtnType::Lexer {
            data.push(self.lexer_actions.len() as i32);
            for action in &self.lexer_actions {
                let (d1, d2) = action.data();
                data.extend([action.code(), d1, d2]);
            }
        }
        data
    }

    pub fn deserialize(data: &[i32]) -> std::result::Result<Atn, String> {
        AtnReader { data, pos: 0 }.read()
    }
}

// ============================================================================
// DESERIALIZATION
// ============================================================================

struct AtnReader<'a> {
    data: &'a [i32],
    pos: usize,
}

impl AtnReader<'_> {
    fn next(&mut self) -> std::result::Result<i32, String> {
        let value = self
            .data
            .get(self.pos)
            .copied()
            .ok_or_else(|| format!("unexpected end of data at {}", self.pos))?;
        self.pos += 1;
        Ok(value)
    }

    fn count(&mut self) -> std::result::Result<usize, String> {
        let value = self.next()?;
        usize::try_from(value).map_err(|_| format!("invalid count {value} at {}", self.pos - 1))
    }

    fn state_ref(&mut self, atn: &Atn) -> std::result::Result<usize, String> {
        let value = self.count()?;
        if value >= atn.states.len() {
            return Err(format!("state {value} out of range"));
        }
        Ok(value)
    }

    fn read(mut self) -> std::result::Result<Atn, String> {
        let version = self.next()?;
        if version != SERIALIZED_VERSION {
            return Err(format!(
                "could not deserialize ATN with version {version} (expected {SERIALIZED_VERSION})"
            ));
        }
        let grammar_type = match self.next()? {
            0 => AtnType::Lexer,
            1 => AtnType::Parser,
            other => return Err(format!("unknown grammar type {other}")),
        };
        let max_token_type = self.next()?;
        let mut atn = Atn::new(grammar_type, max_token_type);

        let state_count = self.count()?;
        let mut pending_ends = Vec::new();
        for number in 0..state_count {
            let code = self.next()?;
            let state_type = AtnStateType::from_code(code)
                .ok_or_else(|| format!("unknown state type {code}"))?;
            if state_type == AtnStateType::Invalid {
                atn.states.push(AtnState::new(number, state_type, -1));
                continue;
            }
            let mut rule_index = self.next()?;
            if rule_index == NO_VALUE {
                rule_index = -1;
            }
            atn.states.push(AtnState::new(number, state_type, rule_index));
            if state_type == AtnStateType::LoopEnd || state_type.is_block_start() {
                pending_ends.push((number, self.count()?));
            }
        }
        for (number, other) in pending_ends {
            let state = &mut atn.states[number];
            if state.state_type == AtnStateType::LoopEnd {
                state.loop_back = Some(other);
            } else {
                state.end_state = Some(other);
            }
        }

        for _ in 0..self.count()? {
            let number = self.state_ref(&atn)?;
            atn.states[number].non_greedy = true;
        }
        for _ in 0..self.count()? {
            let number = self.state_ref(&atn)?;
            atn.states[number].precedence_rule = true;
        }

        let rule_count = self.count()?;
        for _ in 0..rule_count {
            let start = self.state_ref(&atn)?;
            atn.rule_to_start_state.push(start);
            if grammar_type == AtnType::Lexer {
                let mut token_type = self.next()?;
                if token_type == NO_VALUE {
                    token_type = TOKEN_EOF;
                }
                atn.rule_to_token_type.push(token_type);
            }
        }
        atn.rule_to_stop_state = vec![0; rule_count];
        for state in &atn.states {
            if state.state_type == AtnStateType::RuleStop
                && let Some(slot) = usize::try_from(state.rule_index)
                    .ok()
                    .and_then(|r| atn.rule_to_stop_state.get_mut(r))
            {
                *slot = state.number;
            }
        }

        for _ in 0..self.count()? {
            let start = self.state_ref(&atn)?;
            atn.mode_to_start_state.push(start);
        }

        let mut sets = Vec::new();
        for _ in 0..self.count()? {
            let interval_count = self.count()?;
            let mut set = IntervalSet::new();
            if self.next()? != 0 {
                set.add(TOKEN_EOF);
            }
            for _ in 0..interval_count {
                let start = self.next()?;
                let stop = self.next()?;
                set.add_range(start, stop);
            }
            sets.push(set);
        }

        for _ in 0..self.count()? {
            let source = self.state_ref(&atn)?;
            let target = self.state_ref(&atn)?;
            let code = self.next()?;
            let (a1, a2, a3) = (self.next()?, self.next()?, self.next()?);
            let transition_type = TransitionType::from_code(code)
                .ok_or_else(|| format!("unknown transition type {code}"))?;
            let transition = match transition_type {
                TransitionType::Epsilon => Transition::epsilon(target),
                TransitionType::Range => Transition::Range {
                    target,
                    start: if a3 != 0 { TOKEN_EOF } else { a1 },
                    stop: a2,
                },
                TransitionType::Rule => Transition::Rule {
                    target: usize::try_from(a1).map_err(|_| format!("invalid rule start {a1}"))?,
                    rule_index: usize::try_from(a2)
                        .map_err(|_| format!("invalid rule index {a2}"))?,
                    precedence: a3,
                    follow: target,
                },
                TransitionType::Predicate => Transition::Predicate {
                    target,
                    rule_index: a1,
                    pred_index: a2,
                    ctx_dependent: a3 != 0,
                },
                TransitionType::Atom => Transition::Atom {
                    target,
                    label: if a3 != 0 { TOKEN_EOF } else { a1 },
                },
                TransitionType::Action => Transition::Action {
                    target,
                    rule_index: a1,
                    action_index: if a2 == NO_VALUE { -1 } else { a2 },
                    ctx_dependent: a3 != 0,
                },
                TransitionType::Set | TransitionType::NotSet => {
                    let set = usize::try_from(a1)
                        .ok()
                        .and_then(|i| sets.get(i))
                        .cloned()
                        .ok_or_else(|| format!("set {a1} out of range"))?;
                    if transition_type == TransitionType::Set {
                        Transition::Set { target, set }
                    } else {
                        Transition::NotSet { target, set }
                    }
                }
                TransitionType::Wildcard => Transition::Wildcard { target },
                TransitionType::Precedence => Transition::Precedence {
                    target,
                    precedence: a1,
                },
            };
            atn.add_transition(source, transition);
        }
        atn.add_rule_follow_links();

        for _ in 0..self.count()? {
            let number = self.state_ref(&atn)?;
            atn.define_decision(number);
        }

        if grammar_type == AtnType::Lexer {
            for _ in 0..self.count()? {
                let code = self.next()?;
                let (d1, d2) = (self.next()?, self.next()?);
                let action = LexerAction::from_code(code, d1, d2)
                    .ok_or_else(|| format!("unknown lexer action type {code}"))?;
                atn.lexer_actions.push(action);
            }
        }
        Ok(atn)
    }
}

// ============================================================================
// INTERPRETER DATA FILES
// ============================================================================

impl InterpreterData {
    /// Render in the `.interp` file format written by the ANTLR tool.
    pub fn to_interp_string(&self) -> String {
        let mut out = String::new();
        let mut section = |title: &str, names: &mut dyn Iterator<Item = String>| {
            out.push_str(title);
            out.push('\n');
            for name in names {
                out.push_str(&name);
                out.push('\n');
            }
            out.push('\n');
        };
        let nullable = |n: &Option<String>| n.clone().unwrap_or_else(|| "null".to_string());

        let max = self.vocabulary.max_token_type().max(0) as usize;
        let literals: Vec<String> = (0..=max)
            .map(|i| self.vocabulary.literal_names.get(i).map_or("null".to_string(), nullable))
            .collect();
        let symbols: Vec<String> = (0..=max)
            .map(|i| self.vocabulary.symbolic_names.get(i).map_or("null".to_string(), nullable))
            .collect();
        section("token literal names:", &mut literals.into_iter());
        section("token symbolic names:", &mut symbols.into_iter());
        section("rule names:", &mut self.rule_names.iter().cloned());
        if self.is_lexer() {
            section("channel names:", &mut self.channels.iter().cloned());
            section("mode names:", &mut self.modes.iter().cloned());
        }

        let numbers: Vec<String> = self.atn.serialize().iter().map(i32::to_string).collect();
        out.push_str("atn:\n[");
        out.push_str(&numbers.join(", "));
        out.push_str("]");
        out
    }

    /// Parse the content of a `.interp` file. `origin` names the file in errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let mut literal_names = Vec::new();
        let mut symbolic_names = Vec::new();
        let mut rule_names = Vec::new();
        let mut channels = Vec::new();
        let mut modes = Vec::new();
        let mut atn = None;

        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            let target: &mut Vec<Option<String>>;
            let mut plain = Vec::new();
            let header = line.trim();
            match header {
                "" => continue,
                "token literal names:" => target = &mut literal_names,
                "token symbolic names:" => target = &mut symbolic_names,
                "rule names:" | "channel names:" | "mode names:" => target = &mut plain,
                "atn:" => {
                    let serialized = lines.by_ref().map(str::trim).collect::<Vec<_>>().join("");
                    atn = Some(parse_serialized(&serialized, origin)?);
                    break;
                }
                other => {
                    return Err(GrammarError::interpreter_data(
                        origin,
                        format!("unexpected line '{other}'"),
                    ));
                }
            }
            for entry in lines.by_ref() {
                let entry = entry.trim();
                if entry.is_empty() {
                    break;
                }
                target.push((entry != "null").then(|| entry.to_string()));
            }
            let names = plain.into_iter().flatten();
            match header {
                "rule names:" => rule_names.extend(names),
                "channel names:" => channels.extend(names),
                "mode names:" => modes.extend(names),
                _ => {}
            }
        }

        let atn = atn.ok_or_else(|| GrammarError::interpreter_data(origin, "missing atn section"))?;
        debug!(path = %origin.display(), states = atn.states.len(), "loaded interpreter data");
        Ok(Self {
            atn,
            vocabulary: Vocabulary::new(literal_names, symbolic_names),
            rule_names,
            channels,
            modes,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }
}

fn parse_serialized(text: &str, origin: &Path) -> Result<Atn> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    let data = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|e| GrammarError::interpreter_data(origin, format!("'{s}': {e}")))
        })
        .collect::<Result<Vec<i32>>>()?;
    Atn::deserialize(&data).map_err(|message| GrammarError::interpreter_data(origin, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tiny_lexer() -> InterpreterData {
        let mut atn = Atn::new(AtnType::Lexer, 1);
        let mode = atn.add_state(AtnStateType::TokenStart, -1);
        atn.mode_to_start_state.push(mode);
        atn.define_decision(mode);
        let start = atn.add_state(AtnStateType::RuleStart, 0);
        let stop = atn.add_state(AtnStateType::RuleStop, 0);
        atn.rule_to_start_state.push(start);
        atn.rule_to_stop_state.push(stop);
        atn.rule_to_token_type.push(1);
        let left = atn.add_state(AtnStateType::Basic, 0);
        let right = atn.add_state(AtnStateType::Basic, 0);
        atn.add_transition(mode, Transition::epsilon(start));
        atn.add_transition(start, Transition::epsilon(left));
        let mut set = IntervalSet::of_range('a' as i32, 'z' as i32);
        set.add('_' as i32);
        atn.add_transition(left, Transition::Set { target: right, set });
        atn.add_transition(right, Transition::epsilon(stop));
        atn.lexer_actions.push(LexerAction::Skip);
        InterpreterData {
            atn,
            vocabulary: Vocabulary::new(vec![None, None], vec![None, Some("ID".into())]),
            rule_names: vec!["ID".into()],
            channels: vec!["DEFAULT_TOKEN_CHANNEL".into(), "HIDDEN".into()],
            modes: vec!["DEFAULT_MODE".into()],
        }
    }

    #[test]
    fn test_interp_text_round_trips() {
        let data = tiny_lexer();
        let text = data.to_interp_string();
        assert!(text.starts_with("token literal names:\nnull\nnull\n\ntoken symbolic names:\nnull\nID\n"));
        assert!(text.contains("\nmode names:\nDEFAULT_MODE\n\natn:\n[4, 0, 1, 5, "));
        let loaded = InterpreterData::parse(&text, &PathBuf::from("L.interp")).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_eof_atoms_are_encoded_with_flag() {
        let mut atn = Atn::new(AtnType::Parser, 1);
        let start = atn.add_state(AtnStateType::RuleStart, 0);
        let stop = atn.add_state(AtnStateType::RuleStop, 0);
        atn.rule_to_start_state.push(start);
        atn.rule_to_stop_state.push(stop);
        atn.add_transition(
            start,
            Transition::Atom {
                target: stop,
                label: TOKEN_EOF,
            },
        );
        let data = atn.serialize();
        assert_eq!(&data[data.len() - 7..data.len() - 1], &[0, 1, 5, 0, 0, 1]);
        assert_eq!(Atn::deserialize(&data).unwrap(), atn);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let error = Atn::deserialize(&[3, 0, 0]).unwrap_err();
        assert!(error.contains("version 3"));
    }

    #[test]
    fn test_parse_reports_bad_numbers() {
        let error = InterpreterData::parse("rule names:\nr\n\natn:\n[4, x]", &PathBuf::from("P.interp"))
            .unwrap_err();
        assert!(error.to_string().contains("P.interp"));
    }
}
