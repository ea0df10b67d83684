//! # Grammar Context
//!
//! One parsed grammar file and everything derived from it: the CST, the symbol
//! table, syntax diagnostics, interpreter data once generated or loaded, and the
//! edges to the contexts it depends on.
//!
//! A context never owns another context. Dependency edges are file paths; the
//! workspace resolves them and hands dependency contexts back in for queries that
//! need the closure (diagnostics, reference counts, generation).
//!
//! ```text
//! source ──parse──▶ Parse ──collect──▶ SymbolTable
//!                     │                    │
//!                     └──check (closure)───┴──▶ diagnostics
//! ```

mod queries;

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::atn::InterpreterData;
use crate::base::{LineIndex, grammar_name_of};
use crate::parser::{GrammarFile, GrammarType, Parse, parse};
use crate::semantic::{
    Diagnostic, ReferenceNode, SymbolTable, build_reference_nodes, codes, collect_symbols,
};

pub use queries::{ActionCounts, RuleAtPosition, SymbolOccurrence};

/// The parsed state of one grammar file.
#[derive(Debug)]
pub struct GrammarContext {
    path: PathBuf,
    source: String,
    parse: Parse,
    grammar_type: GrammarType,
    grammar_name: String,
    dependency_names: Vec<String>,
    symbol_table: SymbolTable,
    syntax_diagnostics: Vec<Diagnostic>,
    /// Diagnostics produced by the last generation run
    generation_diagnostics: Vec<Diagnostic>,
    parser_data: Option<InterpreterData>,
    lexer_data: Option<InterpreterData>,
    references: OnceCell<IndexMap<String, ReferenceNode>>,
    /// Contexts whose symbols satisfy references in this one
    dependencies: IndexSet<PathBuf>,
    /// Contexts that depend on this one
    dependents: IndexSet<PathBuf>,
}

impl GrammarContext {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let path = path.into();
        let source = source.into();
        let parse = parse(&source);
        let mut context = Self {
            grammar_name: grammar_name_of(&path),
            path,
            source,
            parse,
            grammar_type: GrammarType::Combined,
            dependency_names: Vec::new(),
            symbol_table: SymbolTable::new(),
            syntax_diagnostics: Vec::new(),
            generation_diagnostics: Vec::new(),
            parser_data: None,
            lexer_data: None,
            references: OnceCell::new(),
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        };
        context.analyze();
        context
    }

    /// Replaces the source text and reparses. Returns the dependency names of the
    /// previous parse so the caller can apply the dependency delta.
    pub fn set_text(&mut self, source: impl Into<String>) -> Vec<String> {
        self.source = source.into();
        self.reparse()
    }

    /// Parses the current source again. Returns the previous dependency names.
    pub fn reparse(&mut self) -> Vec<String> {
        self.parse = parse(&self.source);
        self.references = OnceCell::new();
        let previous = std::mem::take(&mut self.dependency_names);
        self.analyze();
        previous
    }

    fn analyze(&mut self) {
        let tree = self.parse.tree();
        let index = LineIndex::new(&self.source);
        let source_name = self.path.to_string_lossy().into_owned();

        self.grammar_type = tree.grammar_type();
        if let Some(name) = tree.name() {
            self.grammar_name = name;
        }
        self.dependency_names = tree.dependency_names();
        self.symbol_table = collect_symbols(&tree, &source_name, &index);
        self.syntax_diagnostics = self
            .parse
            .errors
            .iter()
            .map(|error| {
                Diagnostic::error_at(&index, error.range, error.message.clone())
                    .with_code(codes::SYNTAX_ERROR)
            })
            .collect();
        debug!(
            path = %self.path.display(),
            symbols = self.symbol_table.len(),
            syntax_errors = self.syntax_diagnostics.len(),
            dependencies = ?self.dependency_names,
            "parsed grammar"
        );
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parse(&self) -> &Parse {
        &self.parse
    }

    pub fn tree(&self) -> GrammarFile {
        self.parse.tree()
    }

    pub fn line_index(&self) -> LineIndex<'_> {
        LineIndex::new(&self.source)
    }

    pub fn grammar_type(&self) -> GrammarType {
        self.grammar_type
    }

    /// Name from the grammar declaration, or the file stem without one.
    pub fn grammar_name(&self) -> &str {
        &self.grammar_name
    }

    /// Names of grammars referenced by `import` and `tokenVocab`.
    pub fn dependency_names(&self) -> &[String] {
        &self.dependency_names
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    pub fn syntax_diagnostics(&self) -> &[Diagnostic] {
        &self.syntax_diagnostics
    }

    /// Reference nodes of the rules in this grammar, built on first use.
    pub fn reference_nodes(&self) -> &IndexMap<String, ReferenceNode> {
        self.references
            .get_or_init(|| build_reference_nodes(&self.parse.tree()))
    }

    // ========================================================================
    // Interpreter data
    // ========================================================================

    pub fn parser_data(&self) -> Option<&InterpreterData> {
        self.parser_data.as_ref()
    }

    pub fn lexer_data(&self) -> Option<&InterpreterData> {
        self.lexer_data.as_ref()
    }

    pub fn has_interpreter_data(&self) -> bool {
        self.parser_data.is_some() || self.lexer_data.is_some()
    }

    pub fn set_interpreter_data(
        &mut self,
        parser: Option<InterpreterData>,
        lexer: Option<InterpreterData>,
    ) {
        self.parser_data = parser;
        self.lexer_data = lexer;
    }

    pub fn generation_diagnostics(&self) -> &[Diagnostic] {
        &self.generation_diagnostics
    }

    pub fn set_generation_diagnostics(&mut self, diagnostics: Vec<Diagnostic>) {
        self.generation_diagnostics = diagnostics;
    }

    // ========================================================================
    // Dependency edges
    // ========================================================================

    /// Records that `dependency` satisfies references of this context. Both
    /// sides are updated. Returns `false` if the edge already existed or would
    /// point at this context itself.
    pub fn add_as_reference_to(&mut self, dependency: &mut GrammarContext) -> bool {
        if dependency.path == self.path || self.dependencies.contains(&dependency.path) {
            return false;
        }
        self.dependencies.insert(dependency.path.clone());
        dependency.dependents.insert(self.path.clone());
        true
    }

    /// Removes the edge to `dependency` and its back-reference.
    pub fn remove_dependency(&mut self, dependency: &mut GrammarContext) {
        self.dependencies.shift_remove(&dependency.path);
        dependency.dependents.shift_remove(&self.path);
    }

    /// Paths of the contexts this one depends on, in resolution order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Path> {
        self.dependencies.iter().map(PathBuf::as_path)
    }

    /// Paths of the contexts depending on this one.
    pub fn dependents(&self) -> impl Iterator<Item = &Path> {
        self.dependents.iter().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_collects_dependencies() {
        let context = GrammarContext::new(
            "dir/P.g4",
            "parser grammar P;\noptions { tokenVocab = L; }\nimport A, B = C;\nr: ID;\n",
        );
        assert_eq!(context.grammar_type(), GrammarType::Parser);
        assert_eq!(context.grammar_name(), "P");
        assert_eq!(context.dependency_names(), &["L", "A", "C"]);
        assert!(context.syntax_diagnostics().is_empty());
    }

    #[test]
    fn test_set_text_returns_previous_dependencies() {
        let mut context = GrammarContext::new("T.g4", "grammar T;\nimport A;\nr: 'x';\n");
        let previous = context.set_text("grammar T;\nimport B;\nr: 'x';\n");
        assert_eq!(previous, vec!["A"]);
        assert_eq!(context.dependency_names(), &["B"]);
    }

    #[test]
    fn test_syntax_errors_become_diagnostics() {
        let context = GrammarContext::new("T.g4", "grammar T;\nr: 'x'\n");
        assert!(!context.syntax_diagnostics().is_empty());
        assert_eq!(
            context.syntax_diagnostics()[0].code.as_deref(),
            Some(codes::SYNTAX_ERROR)
        );
    }

    #[test]
    fn test_missing_declaration_falls_back_to_file_stem() {
        let context = GrammarContext::new("grammars/Empty.g4", "");
        assert_eq!(context.grammar_name(), "Empty");
    }

    #[test]
    fn test_edges_stay_consistent() {
        let mut main = GrammarContext::new("Main.g4", "grammar Main;\nimport Dep;\nr: A;\n");
        let mut dep = GrammarContext::new("Dep.g4", "lexer grammar Dep;\nA: 'a';\n");
        assert!(main.add_as_reference_to(&mut dep));
        assert!(!main.add_as_reference_to(&mut dep));
        assert_eq!(main.dependencies().collect::<Vec<_>>(), vec![Path::new("Dep.g4")]);
        assert_eq!(dep.dependents().collect::<Vec<_>>(), vec![Path::new("Main.g4")]);

        main.remove_dependency(&mut dep);
        assert_eq!(main.dependencies().count(), 0);
        assert_eq!(dep.dependents().count(), 0);
    }

    #[test]
    fn test_reference_nodes_rebuild_after_reparse() {
        let mut context = GrammarContext::new("T.g4", "grammar T;\nr: a;\na: 'x';\n");
        assert!(context.reference_nodes()["r"].rules.contains("a"));
        context.set_text("grammar T;\nr: b;\nb: 'x';\n");
        assert!(context.reference_nodes()["r"].rules.contains("b"));
        assert!(!context.reference_nodes().contains_key("a"));
    }
}
