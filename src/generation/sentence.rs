//! Random sentence generation
//!
//! Walks the ATN of a rule choosing transitions at random. Parser rules produce
//! tokens separated by spaces; each token is expanded by walking its lexer rule.
//! Loop iterations are bounded per loop, rule invocations per walk, and repeated
//! choices at one decision become less likely by the convergence factor.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atn::{
    AtnState, AtnStateType, InterpreterData, MIN_USER_TOKEN_TYPE, TOKEN_EOF, Transition,
};

/// Printable ASCII, used for negated sets and wildcards in lexer rules
const PRINTABLE: (i32, i32) = (0x20, 0x7E);

/// Upper bound of states visited per rule invocation
const MAX_STEPS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SentenceGenerationOptions {
    /// Number of sentences to generate
    pub count: usize,
    /// Whether consumers should drop previous output before showing these
    pub clear: bool,
    pub min_lexer_iterations: usize,
    pub max_lexer_iterations: usize,
    pub min_parser_iterations: usize,
    pub max_parser_iterations: usize,
    /// Nesting depth of rule invocations beyond which rules produce nothing
    pub max_recursion_depth: usize,
    /// Weight multiplier applied each time a decision takes the same branch
    pub convergence_factor: f64,
    /// Fixed text emitted for a rule instead of walking it
    pub rule_mappings: IndexMap<String, String>,
    /// Seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for SentenceGenerationOptions {
    fn default() -> Self {
        Self {
            count: 1,
            clear: true,
            min_lexer_iterations: 0,
            max_lexer_iterations: 10,
            min_parser_iterations: 0,
            max_parser_iterations: 3,
            max_recursion_depth: 3,
            convergence_factor: 0.25,
            rule_mappings: IndexMap::new(),
            seed: None,
        }
    }
}

/// Generates sentences for rules of one grammar closure.
pub struct SentenceGenerator<'a> {
    parser: Option<&'a InterpreterData>,
    lexer: Option<&'a InterpreterData>,
    options: &'a SentenceGenerationOptions,
    rng: StdRng,
    depth: usize,
    /// Times each (state, transition) was taken in the current sentence
    taken: FxHashMap<(usize, usize), i32>,
}

impl<'a> SentenceGenerator<'a> {
    pub fn new(
        parser: Option<&'a InterpreterData>,
        lexer: Option<&'a InterpreterData>,
        options: &'a SentenceGenerationOptions,
    ) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            parser,
            lexer,
            options,
            rng,
            depth: 0,
            taken: FxHashMap::default(),
        }
    }

    /// One sentence for `rule`, `None` if neither ATN defines it.
    pub fn generate(&mut self, rule: &str) -> Option<String> {
        self.taken.clear();
        self.depth = 0;
        let (data, index) = [self.parser, self.lexer]
            .into_iter()
            .flatten()
            .find_map(|data| Some((data, data.rule_index(rule)?)))?;
        let mut out = String::new();
        self.walk_rule(data, index, &mut out);
        // Whitespace is significant in token text
        if data.is_lexer() {
            return Some(out);
        }
        Some(out.trim().to_string())
    }

    /// Calls `callback(sentence, index)` for each of `count` sentences. Returns
    /// the number of sentences produced.
    pub fn generate_all(&mut self, rule: &str, mut callback: impl FnMut(&str, usize)) -> usize {
        for index in 0..self.options.count {
            let Some(sentence) = self.generate(rule) else {
                debug!(%rule, "no ATN defines rule, no sentences generated");
                return index;
            };
            callback(&sentence, index);
        }
        self.options.count
    }

    fn walk_rule(&mut self, data: &'a InterpreterData, rule: usize, out: &mut String) {
        let lexer = data.is_lexer();
        let name = data.rule_names.get(rule).map(String::as_str).unwrap_or("");
        if let Some(text) = self.options.rule_mappings.get(name) {
            append(out, text, lexer);
            return;
        }
        if self.depth > self.options.max_recursion_depth {
            return;
        }
        let (Some(&start), Some(&stop)) = (
            data.atn.rule_to_start_state.get(rule),
            data.atn.rule_to_stop_state.get(rule),
        ) else {
            return;
        };

        self.depth += 1;
        let mut loops: FxHashMap<usize, usize> = FxHashMap::default();
        let mut state = start;
        for _ in 0..MAX_STEPS {
            if state == stop {
                break;
            }
            let Some(current) = data.atn.state(state) else {
                break;
            };
            if current.transitions.is_empty() {
                break;
            }
            let choice = self.choose(data, current, &mut loops);
            let transition = &current.transitions[choice];
            match transition {
                Transition::Rule {
                    rule_index, follow, ..
                } => {
                    self.walk_rule(data, *rule_index, out);
                    state = *follow;
                    continue;
                }
                transition if transition.is_epsilon() => {}
                transition if lexer => {
                    if let Some(c) = self.pick(transition, PRINTABLE.0, PRINTABLE.1) {
                        out.extend(u32::try_from(c).ok().and_then(char::from_u32));
                    }
                }
                transition => {
                    let max = data.atn.max_token_type;
                    if let Some(token) = self.pick(transition, MIN_USER_TOKEN_TYPE, max) {
                        let text = self.token_text(data, token);
                        append(out, &text, false);
                    }
                }
            }
            state = transition.target();
        }
        self.depth -= 1;
    }

    /// Index of the transition to follow out of `state`.
    fn choose(
        &mut self,
        data: &InterpreterData,
        state: &AtnState,
        loops: &mut FxHashMap<usize, usize>,
    ) -> usize {
        let count = state.transitions.len();
        if count == 1 {
            return 0;
        }

        if matches!(
            state.state_type,
            AtnStateType::StarLoopEntry | AtnStateType::PlusLoopBack
        ) {
            let exits_loop = |index: usize| {
                data.atn
                    .state(state.transitions[index].target())
                    .is_some_and(|s| s.state_type == AtnStateType::LoopEnd)
            };
            if let (Some(repeat), Some(exit)) = (
                (0..count).find(|&i| !exits_loop(i)),
                (0..count).find(|&i| exits_loop(i)),
            ) {
                let (min, max) = if data.is_lexer() {
                    (self.options.min_lexer_iterations, self.options.max_lexer_iterations)
                } else {
                    (self.options.min_parser_iterations, self.options.max_parser_iterations)
                };
                let done = loops.get(&state.number).copied().unwrap_or(0);
                let again = if done < min {
                    true
                } else if done >= max || self.depth > self.options.max_recursion_depth {
                    false
                } else {
                    self.weighted(state.number, &[repeat, exit]) == repeat
                };
                return if again {
                    *loops.entry(state.number).or_default() += 1;
                    repeat
                } else {
                    loops.remove(&state.number);
                    exit
                };
            }
        }

        let candidates: Vec<usize> = (0..count).collect();
        self.weighted(state.number, &candidates)
    }

    /// Picks one of `candidates`, each weighted by the convergence factor to the
    /// power of the number of times it was taken.
    fn weighted(&mut self, state: usize, candidates: &[usize]) -> usize {
        let factor = self.options.convergence_factor;
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&c| factor.powi(self.taken.get(&(state, c)).copied().unwrap_or(0)))
            .collect();
        let total: f64 = weights.iter().sum();

        let mut chosen = candidates[candidates.len() - 1];
        if total.is_finite() && total > 0.0 {
            let mut roll = self.rng.random::<f64>() * total;
            for (&candidate, weight) in candidates.iter().zip(&weights) {
                if roll < *weight {
                    chosen = candidate;
                    break;
                }
                roll -= weight;
            }
        } else {
            chosen = candidates[self.rng.random_range(0..candidates.len())];
        }
        *self.taken.entry((state, chosen)).or_default() += 1;
        chosen
    }

    /// A random symbol matched by a consuming transition.
    fn pick(&mut self, transition: &Transition, min: i32, max: i32) -> Option<i32> {
        let set = transition.label(min, max)?;
        match set.size() {
            0 => None,
            size => set.nth(self.rng.random_range(0..size)),
        }
    }

    /// Text for a token type: a walk of its lexer rule if the lexer defines it,
    /// otherwise its literal or name.
    fn token_text(&mut self, parser: &InterpreterData, token: i32) -> String {
        if token == TOKEN_EOF {
            return String::new();
        }
        let name = parser.vocabulary.symbolic_name(token);
        if let Some(text) = name.and_then(|n| self.options.rule_mappings.get(n)) {
            return text.clone();
        }
        if let Some(lexer) = self.lexer {
            let rule = lexer
                .atn
                .rule_to_token_type
                .iter()
                .position(|&t| t == token)
                .or_else(|| name.and_then(|n| lexer.rule_index(n)));
            if let Some(rule) = rule {
                let depth = std::mem::replace(&mut self.depth, 0);
                let mut text = String::new();
                self.walk_rule(lexer, rule, &mut text);
                self.depth = depth;
                return text;
            }
        }
        match parser.vocabulary.literal_name(token) {
            Some(literal) => literal.trim_matches('\'').to_string(),
            None => name.unwrap_or_default().to_string(),
        }
    }
}

/// Appends `text`; parser output separates tokens by a space.
fn append(out: &mut String, text: &str, lexer: bool) {
    if text.is_empty() {
        return;
    }
    if !lexer && !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
    out.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::build_interpreter_data;
    use crate::parser::parse;

    fn built(source: &str) -> crate::atn::BuiltGrammar {
        build_interpreter_data(&parse(source).tree(), &[], None)
    }

    fn seeded() -> SentenceGenerationOptions {
        SentenceGenerationOptions {
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_rule_mapping_replaces_token() {
        let data = built("grammar T;\ns: 'a' ID;\nID: [a-z]+;\n");
        let mut options = seeded();
        options.rule_mappings.insert("ID".into(), "name".into());
        let mut generator =
            SentenceGenerator::new(data.parser.as_ref(), data.lexer.as_ref(), &options);
        assert_eq!(generator.generate("s").as_deref(), Some("a name"));
    }

    #[test]
    fn test_lexer_loop_respects_iteration_bounds() {
        let data = built("lexer grammar L;\nID: [a-c]+;\n");
        let options = SentenceGenerationOptions {
            min_lexer_iterations: 2,
            max_lexer_iterations: 3,
            count: 20,
            ..seeded()
        };
        let mut generator = SentenceGenerator::new(None, data.lexer.as_ref(), &options);
        let mut sentences = Vec::new();
        let produced = generator.generate_all("ID", |sentence, _| sentences.push(sentence.to_string()));
        assert_eq!(produced, 20);
        for sentence in sentences {
            assert!((3..=4).contains(&sentence.len()), "{sentence}");
            assert!(sentence.chars().all(|c| ('a'..='c').contains(&c)));
        }
    }

    #[test]
    fn test_lexer_sentences_keep_whitespace() {
        let data = built("lexer grammar L;\nWS: [ ]+;\nPAD: ' ' 'x' ' ';\n");
        let options = SentenceGenerationOptions {
            min_lexer_iterations: 2,
            max_lexer_iterations: 3,
            ..seeded()
        };
        let mut generator = SentenceGenerator::new(None, data.lexer.as_ref(), &options);

        let spaces = generator.generate("WS").unwrap();
        assert!((3..=4).contains(&spaces.len()), "{spaces:?}");
        assert!(spaces.chars().all(|c| c == ' '));
        assert_eq!(generator.generate("PAD").as_deref(), Some(" x "));
    }

    #[test]
    fn test_same_seed_same_sentences() {
        let data = built("grammar T;\ns: (A | B)* C;\nA: 'a';\nB: 'b';\nC: 'c';\n");
        let options = SentenceGenerationOptions {
            count: 5,
            ..seeded()
        };
        let run = || {
            let mut out = Vec::new();
            SentenceGenerator::new(data.parser.as_ref(), data.lexer.as_ref(), &options)
                .generate_all("s", |sentence, index| out.push((index, sentence.to_string())));
            out
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.iter().all(|(_, s)| s.ends_with('c')));
    }

    #[test]
    fn test_unknown_rule_produces_nothing() {
        let data = built("grammar T;\ns: 'a';\n");
        let options = seeded();
        let mut generator =
            SentenceGenerator::new(data.parser.as_ref(), data.lexer.as_ref(), &options);
        let mut calls = 0;
        assert_eq!(generator.generate_all("missing", |_, _| calls += 1), 0);
        assert_eq!(calls, 0);
    }
}
