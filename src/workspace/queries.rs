//! Queries forwarded to the grammar contexts
//!
//! Every query loads its grammar on demand. Queries whose answer depends on other
//! files receive the dependency closure of the grammar; the rest only look at the
//! grammar itself.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::atn::{AtnGraphData, Vocabulary};
use crate::base::Position;
use crate::context::{ActionCounts, GrammarContext, RuleAtPosition, SymbolOccurrence};
use crate::ide::{CompletionItem, completions, document_symbols, rrd_script, workspace_symbols};
use crate::semantic::{
    Diagnostic, ReferenceNode, SymbolInfo, SymbolTable, check_grammar, sort_diagnostics,
};
use crate::syntax::{FormatResult, FormattingOptions, format_range};
use crate::workspace::Workspace;

impl Workspace {
    fn with_context<T>(&mut self, path: &Path, query: impl FnOnce(&GrammarContext) -> T) -> Option<T> {
        let key = self.ensure_loaded(path);
        self.contexts.get(&key).map(|entry| query(&entry.context))
    }

    fn with_closure<T>(
        &mut self,
        path: &Path,
        query: impl FnOnce(&GrammarContext, &[&GrammarContext]) -> T,
    ) -> Option<T> {
        let key = self.ensure_loaded(path);
        let entry = self.contexts.get(&key)?;
        let closure = self.dependency_closure(&key);
        Some(query(&entry.context, &closure))
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    /// The symbol under a position. Own definitions are looked up first; a name
    /// the grammar only references falls back to its dependency closure, so a
    /// token from a `tokenVocab` lexer resolves to the lexer's definition.
    pub fn symbol_info_at_position(
        &mut self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Option<SymbolInfo> {
        self.with_closure(path.as_ref(), |context, closure| {
            context.symbol_info_at_position(position).or_else(|| {
                let name = context.name_at_position(position)?;
                closure.iter().find_map(|dependency| dependency.info_for_symbol(name))
            })
        })
        .flatten()
    }

    pub fn info_for_symbol(&mut self, path: impl AsRef<Path>, name: &str) -> Option<SymbolInfo> {
        self.with_closure(path.as_ref(), |context, closure| {
            context.info_for_symbol(name).or_else(|| {
                closure
                    .iter()
                    .find_map(|dependency| dependency.info_for_symbol(name))
            })
        })
        .flatten()
    }

    pub fn list_top_level_symbols(&mut self, path: impl AsRef<Path>) -> Vec<SymbolInfo> {
        self.with_context(path.as_ref(), GrammarContext::list_top_level_symbols)
            .unwrap_or_default()
    }

    /// Named definitions of one grammar in source order.
    pub fn document_symbols(&mut self, path: impl AsRef<Path>) -> Vec<SymbolInfo> {
        self.with_context(path.as_ref(), document_symbols)
            .unwrap_or_default()
    }

    /// Named definitions across all loaded grammars matching `query`.
    pub fn workspace_symbols(&self, query: Option<&str>) -> Vec<SymbolInfo> {
        workspace_symbols(self.contexts(), query)
    }

    /// Vocabulary of the grammar's lexer, or of the first lexer in its closure.
    pub fn get_lexer_vocabulary(&mut self, path: impl AsRef<Path>) -> Option<&Vocabulary> {
        let key = self.ensure_loaded(path.as_ref());
        let context = &self.contexts.get(&key)?.context;
        context.lexer_vocabulary().or_else(|| {
            self.dependency_closure(&key)
                .into_iter()
                .find_map(GrammarContext::lexer_vocabulary)
        })
    }

    pub fn get_rule_list(&mut self, path: impl AsRef<Path>) -> Vec<String> {
        self.with_context(path.as_ref(), GrammarContext::rule_list)
            .unwrap_or_default()
    }

    pub fn get_channels(&mut self, path: impl AsRef<Path>) -> Vec<String> {
        self.with_context(path.as_ref(), GrammarContext::channels)
            .unwrap_or_default()
    }

    pub fn get_modes(&mut self, path: impl AsRef<Path>) -> Vec<String> {
        self.with_context(path.as_ref(), GrammarContext::modes)
            .unwrap_or_default()
    }

    pub fn list_actions(&mut self, path: impl AsRef<Path>) -> Vec<SymbolInfo> {
        self.with_context(path.as_ref(), GrammarContext::list_actions)
            .unwrap_or_default()
    }

    pub fn get_action_counts(&mut self, path: impl AsRef<Path>) -> ActionCounts {
        self.with_context(path.as_ref(), GrammarContext::action_counts)
            .unwrap_or_default()
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Syntax errors, semantic checks against the dependency closure and the
    /// diagnostics of the last generation run, in source order.
    pub fn get_diagnostics(&mut self, path: impl AsRef<Path>) -> Vec<Diagnostic> {
        self.with_closure(path.as_ref(), |context, closure| {
            let tables: Vec<&SymbolTable> = closure
                .iter()
                .map(|dependency| dependency.symbol_table())
                .collect();
            let mut diagnostics = context.syntax_diagnostics().to_vec();
            diagnostics.extend(check_grammar(
                &context.tree(),
                context.symbol_table(),
                &tables,
                &context.line_index(),
            ));
            diagnostics.extend(context.generation_diagnostics().iter().cloned());
            sort_diagnostics(&mut diagnostics);
            diagnostics
        })
        .unwrap_or_default()
    }

    pub fn has_errors(&mut self, path: impl AsRef<Path>) -> bool {
        self.get_diagnostics(path)
            .iter()
            .any(Diagnostic::is_error)
    }

    // ========================================================================
    // Positions
    // ========================================================================

    pub fn rule_from_position(
        &mut self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Option<RuleAtPosition> {
        self.with_context(path.as_ref(), |context| context.rule_from_position(position))
            .flatten()
    }

    pub fn enclosing_symbol_at_position(
        &mut self,
        path: impl AsRef<Path>,
        position: Position,
        rule_only: bool,
    ) -> Option<SymbolInfo> {
        self.with_context(path.as_ref(), |context| {
            context.enclosing_symbol_at_position(position, rule_only)
        })
        .flatten()
    }

    // ========================================================================
    // References
    // ========================================================================

    /// References to `symbol` in the grammar and in every grammar depending on
    /// it, directly or not.
    pub fn count_references(&mut self, path: impl AsRef<Path>, symbol: &str) -> usize {
        let key = self.ensure_loaded(path.as_ref());
        let Some(entry) = self.contexts.get(&key) else {
            return 0;
        };
        entry.context.own_reference_count(symbol)
            + self
                .dependent_closure(&key)
                .iter()
                .map(|dependent| dependent.own_reference_count(symbol))
                .sum::<usize>()
    }

    /// Definitions and uses of `symbol` in the grammar, its dependencies and its
    /// dependents, ordered by file and position.
    pub fn get_symbol_occurrences(
        &mut self,
        path: impl AsRef<Path>,
        symbol: &str,
    ) -> Vec<SymbolOccurrence> {
        let key = self.ensure_loaded(path.as_ref());
        let Some(entry) = self.contexts.get(&key) else {
            return Vec::new();
        };
        let mut occurrences: Vec<SymbolOccurrence> = std::iter::once(&entry.context)
            .chain(self.dependency_closure(&key))
            .chain(self.dependent_closure(&key))
            .flat_map(|context| context.symbol_occurrences(symbol))
            .collect();
        occurrences.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.range.start.cmp(&b.range.start))
        });
        occurrences
    }

    /// Reference nodes of the grammar's rules, followed by those of its closure
    /// for rules it does not define itself.
    pub fn get_reference_graph(&mut self, path: impl AsRef<Path>) -> IndexMap<String, ReferenceNode> {
        self.with_closure(path.as_ref(), |context, closure| {
            let mut graph = context.reference_nodes().clone();
            for dependency in closure {
                for (name, node) in dependency.reference_nodes() {
                    graph.entry(name.clone()).or_insert_with(|| node.clone());
                }
            }
            graph
        })
        .unwrap_or_default()
    }

    /// Paths of the grammar's direct dependencies, in resolution order.
    pub fn get_dependencies(&mut self, path: impl AsRef<Path>) -> Vec<PathBuf> {
        let key = self.ensure_loaded(path.as_ref());
        self.contexts
            .get(&key)
            .map(|entry| entry.resolved.clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// The automaton of `rule`. `None` while the grammar has errors or no
    /// interpreter data covers the rule.
    pub fn get_atn_graph(&mut self, path: impl AsRef<Path>, rule: &str) -> Option<AtnGraphData> {
        if self.has_errors(path.as_ref()) {
            return None;
        }
        self.with_closure(path.as_ref(), |context, closure| {
            std::iter::once(context)
                .chain(closure.iter().copied())
                .find_map(|candidate| candidate.atn_graph(rule))
        })
        .flatten()
    }

    /// Railroad diagram script for `rule`, looked up in the grammar first.
    pub fn get_rrd_script(&mut self, path: impl AsRef<Path>, rule: &str) -> Option<String> {
        self.with_closure(path.as_ref(), |context, closure| {
            std::iter::once(context)
                .chain(closure.iter().copied())
                .find_map(|candidate| rrd_script(&candidate.tree(), rule))
        })
        .flatten()
    }

    pub fn get_code_completion_candidates(
        &mut self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Vec<CompletionItem> {
        self.with_closure(path.as_ref(), |context, closure| {
            completions(context, closure, position)
        })
        .unwrap_or_default()
    }

    /// Formats `[start, stop]` of the grammar text with `options`, or the
    /// workspace's default options. A sub-range is widened from the top-level
    /// elements it touches to their whole alignment groups, so padded columns
    /// stay consistent with the lines around the replaced region.
    pub fn format_grammar(
        &mut self,
        path: impl AsRef<Path>,
        options: Option<&FormattingOptions>,
        start: i64,
        stop: i64,
    ) -> Option<FormatResult> {
        let key = self.ensure_loaded(path.as_ref());
        let options = options.unwrap_or(&self.config.default_format_options);
        let entry = self.contexts.get(&key)?;
        format_range(
            entry.context.source(),
            options,
            start,
            stop,
            &CancellationToken::new(),
        )
    }
}
