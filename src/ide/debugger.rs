//! Debugger session setup.
//!
//! A [`GrammarDebugger`] owns the interpreter data of a grammar closure and the
//! breakpoints set on rule definitions. Stepping is driven by the host; this type
//! only answers what the host needs to drive it: which rule a source line belongs
//! to, whether a rule has a breakpoint and which ATN a rule lives in.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::atn::InterpreterData;
use crate::context::GrammarContext;
use crate::parser::GrammarType;

/// A breakpoint requested on a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub id: usize,
    pub source: PathBuf,
    pub row: u32,
    /// True when the line lies inside a rule definition
    pub verified: bool,
    /// The rule the breakpoint stops in
    pub rule: Option<String>,
}

/// The rows a rule definition spans in its grammar file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleSpan {
    name: String,
    source: PathBuf,
    rows: (u32, u32),
}

#[derive(Debug)]
pub struct GrammarDebugger {
    lexer: InterpreterData,
    parser: Option<InterpreterData>,
    rules: Vec<RuleSpan>,
    breakpoints: IndexMap<PathBuf, Vec<Breakpoint>>,
    next_id: usize,
}

impl GrammarDebugger {
    /// Creates a session for `contexts`, the grammar first and its dependencies
    /// after it. `None` without lexer data, or without parser data when the
    /// grammar has parser rules.
    pub fn new(
        contexts: &[&GrammarContext],
        lexer: Option<&InterpreterData>,
        parser: Option<&InterpreterData>,
    ) -> Option<Self> {
        let main = contexts.first()?;
        let lexer = lexer?.clone();
        if parser.is_none() && main.grammar_type() != GrammarType::Lexer {
            debug!(path = %main.path().display(), "no parser data, debugger not available");
            return None;
        }

        let rules = contexts
            .iter()
            .flat_map(|context| {
                context
                    .symbol_table()
                    .iter_symbols()
                    .filter(|symbol| symbol.kind.is_rule())
                    .filter_map(|symbol| {
                        let range = symbol.definition.as_ref()?.range;
                        Some(RuleSpan {
                            name: symbol.name.to_string(),
                            source: context.path().to_path_buf(),
                            rows: (range.start.row, range.end.row),
                        })
                    })
            })
            .collect();

        Some(Self {
            lexer,
            parser: parser.cloned(),
            rules,
            breakpoints: IndexMap::new(),
            next_id: 1,
        })
    }

    pub fn lexer_data(&self) -> &InterpreterData {
        &self.lexer
    }

    pub fn parser_data(&self) -> Option<&InterpreterData> {
        self.parser.as_ref()
    }

    /// Whether the session runs the lexer only.
    pub fn is_lexer_only(&self) -> bool {
        self.parser.is_none()
    }

    /// Index of a start rule in the parser data, or in the lexer data for
    /// lexer-only sessions.
    pub fn start_rule_index(&self, rule: &str) -> Option<usize> {
        self.parser.as_ref().unwrap_or(&self.lexer).rule_index(rule)
    }

    /// The rule whose definition covers `row` of `source`.
    pub fn rule_at(&self, source: &Path, row: u32) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.source == source && rule.rows.0 <= row && row <= rule.rows.1)
            .map(|rule| rule.name.as_str())
    }

    /// Replaces the breakpoints of `source`.
    pub fn set_breakpoints(&mut self, source: &Path, rows: &[u32]) -> Vec<Breakpoint> {
        let mut breakpoints = Vec::with_capacity(rows.len());
        for &row in rows {
            let rule = self.rule_at(source, row).map(str::to_string);
            breakpoints.push(Breakpoint {
                id: self.next_id,
                source: source.to_path_buf(),
                row,
                verified: rule.is_some(),
                rule,
            });
            self.next_id += 1;
        }
        self.breakpoints
            .insert(source.to_path_buf(), breakpoints.clone());
        breakpoints
    }

    pub fn clear_breakpoints(&mut self, source: &Path) {
        self.breakpoints.shift_remove(source);
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values().flatten()
    }

    /// Whether entering `rule` hits a verified breakpoint.
    pub fn has_breakpoint_in(&self, rule: &str) -> bool {
        self.breakpoints()
            .any(|breakpoint| breakpoint.verified && breakpoint.rule.as_deref() == Some(rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::build_interpreter_data;

    const SOURCE: &str = "grammar T;\n\nexpr\n    : expr '+' term\n    | term\n    ;\nterm: ID;\nID: [a-z]+;\n";

    fn session(context: &GrammarContext) -> Option<GrammarDebugger> {
        let built = build_interpreter_data(&context.tree(), &[], None);
        GrammarDebugger::new(&[context], built.lexer.as_ref(), built.parser.as_ref())
    }

    #[test]
    fn test_breakpoints_bind_to_rules() {
        let context = GrammarContext::new("T.g4", SOURCE);
        let mut debugger = session(&context).unwrap();
        let set = debugger.set_breakpoints(Path::new("T.g4"), &[2, 5, 7]);

        assert_eq!(
            set.iter()
                .map(|b| (b.row, b.verified, b.rule.as_deref()))
                .collect::<Vec<_>>(),
            vec![(2, false, None), (5, true, Some("expr")), (7, true, Some("term"))]
        );
        assert!(debugger.has_breakpoint_in("expr"));
        assert!(!debugger.has_breakpoint_in("ID"));

        debugger.clear_breakpoints(Path::new("T.g4"));
        assert_eq!(debugger.breakpoints().count(), 0);
    }

    #[test]
    fn test_start_rule_index() {
        let context = GrammarContext::new("T.g4", SOURCE);
        let debugger = session(&context).unwrap();
        assert!(!debugger.is_lexer_only());
        assert_eq!(debugger.start_rule_index("term"), Some(1));
        assert_eq!(debugger.start_rule_index("missing"), None);
    }

    #[test]
    fn test_requires_interpreter_data() {
        let context = GrammarContext::new("T.g4", SOURCE);
        assert!(GrammarDebugger::new(&[&context], None, None).is_none());

        let built = build_interpreter_data(&context.tree(), &[], None);
        assert!(GrammarDebugger::new(&[&context], built.lexer.as_ref(), None).is_none());
    }

    #[test]
    fn test_lexer_grammar_runs_lexer_only() {
        let context = GrammarContext::new("L.g4", "lexer grammar L;\nID: [a-z]+;\n");
        let debugger = session(&context).unwrap();
        assert!(debugger.is_lexer_only());
        assert_eq!(debugger.start_rule_index("ID"), Some(0));
    }
}
