//! Generation, sentence generation and debugging over a grammar closure

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::atn::{InterpreterData, Vocabulary, build_interpreter_data};
use crate::context::GrammarContext;
use crate::error::{GrammarError, Result};
use crate::generation::{
    GenerationOptions, InterpPaths, SentenceGenerationOptions, SentenceGenerator,
    left_recursion_diagnostics, load_interpreter_data, run_tool, write_interpreter_data,
};
use crate::ide::GrammarDebugger;
use crate::parser::GrammarFile;
use crate::workspace::Workspace;

/// Names the grammar imports, as opposed to its token vocabulary.
fn import_names(tree: &GrammarFile) -> Vec<String> {
    tree.imports()
        .flat_map(|spec| spec.delegates().collect::<Vec<_>>())
        .filter_map(|delegate| delegate.grammar().map(|name| name.text().to_string()))
        .collect()
}

/// Vocabulary a dependency contributes as `tokenVocab`.
fn vocabulary_of(context: &GrammarContext) -> Option<&Vocabulary> {
    context
        .lexer_vocabulary()
        .or_else(|| context.parser_data().map(|data| &data.vocabulary))
}

impl Workspace {
    /// Generates interpreter data for the grammar at `path` and its dependency
    /// closure, dependencies first, and loads it into the contexts. Resolves to
    /// the processed grammar files.
    ///
    /// With a tool jar configured the ANTLR tool writes the `.interp` files,
    /// otherwise the built-in ATN construction does. `load_only` skips both and
    /// loads whatever data already exists.
    pub async fn generate(
        &mut self,
        path: impl AsRef<Path>,
        options: &GenerationOptions,
    ) -> Result<Vec<PathBuf>> {
        let key = self.ensure_loaded(path.as_ref());
        let order = self.generation_order(&key);
        let mut processed = Vec::with_capacity(order.len());
        for grammar in order {
            self.generate_one(&grammar, options).await?;
            processed.push(grammar);
        }
        Ok(processed)
    }

    async fn generate_one(&mut self, grammar: &Path, options: &GenerationOptions) -> Result<()> {
        let output_dir = options.output_dir_for(grammar);
        let entry = self
            .contexts
            .get(grammar)
            .ok_or_else(|| GrammarError::UnknownGrammar(grammar.to_path_buf()))?;
        let context = &entry.context;
        let paths = InterpPaths::of(context, &output_dir);

        if options.load_only {
            debug!(grammar = %grammar.display(), "loading existing interpreter data");
        } else if let Some(jar) = self.config.tool.jar_for(options) {
            run_tool(
                &self.config.tool,
                jar,
                options,
                &output_dir,
                &[grammar.to_path_buf()],
            )
            .await?;
        } else {
            let tree = context.tree();
            let imported = import_names(&tree);
            let closure = self.dependency_closure(grammar);
            let imports: Vec<GrammarFile> = closure
                .iter()
                .filter(|dependency| imported.iter().any(|name| name == dependency.grammar_name()))
                .map(|dependency| dependency.tree())
                .collect();
            let token_vocab = closure
                .iter()
                .filter(|dependency| !imported.iter().any(|name| name == dependency.grammar_name()))
                .find_map(|dependency| vocabulary_of(dependency));
            let built = build_interpreter_data(&tree, &imports, token_vocab);
            write_interpreter_data(&built, &paths).await?;
        }

        let (parser, lexer) = load_interpreter_data(&paths).await?;
        if parser.is_none() && lexer.is_none() {
            warn!(grammar = %grammar.display(), output_dir = %output_dir.display(), "no interpreter data found");
        }
        let diagnostics = left_recursion_diagnostics(context);
        if let Some(entry) = self.contexts.get_mut(grammar) {
            entry.context.set_interpreter_data(parser, lexer);
            entry.context.set_generation_diagnostics(diagnostics);
        }
        debug!(grammar = %grammar.display(), "generation finished");
        Ok(())
    }

    /// Generates `options.count` sentences for `rule`, calling `callback` with
    /// each sentence and its index. Returns how many were generated; 0 without
    /// interpreter data for the rule.
    pub fn generate_sentence(
        &mut self,
        path: impl AsRef<Path>,
        rule: &str,
        options: &SentenceGenerationOptions,
        callback: impl FnMut(&str, usize),
    ) -> usize {
        self.with_data(path.as_ref(), |_, parser, lexer| {
            SentenceGenerator::new(parser, lexer, options).generate_all(rule, callback)
        })
        .unwrap_or(0)
    }

    /// Starts a debugging session for the grammar. Interpreter data not loaded
    /// yet is read from `data_dir`. `None` when the grammar or its closure has
    /// none.
    pub fn create_debugger(
        &mut self,
        path: impl AsRef<Path>,
        data_dir: Option<&Path>,
    ) -> Option<GrammarDebugger> {
        let key = self.ensure_loaded(path.as_ref());
        if let Some(dir) = data_dir {
            for grammar in self.generation_order(&key) {
                self.load_missing_data(&grammar, dir);
            }
        }
        self.with_data(&key, |contexts, parser, lexer| {
            GrammarDebugger::new(contexts, lexer, parser)
        })
        .flatten()
    }

    /// Runs `query` with the grammar followed by its closure, the grammar's
    /// parser data and the first lexer data of the grammar or its closure.
    fn with_data<T>(
        &mut self,
        path: &Path,
        query: impl FnOnce(&[&GrammarContext], Option<&InterpreterData>, Option<&InterpreterData>) -> T,
    ) -> Option<T> {
        let key = self.ensure_loaded(path);
        let entry = self.contexts.get(&key)?;
        let mut contexts = vec![&entry.context];
        contexts.extend(self.dependency_closure(&key));

        let parser = entry.context.parser_data();
        let lexer = contexts.iter().find_map(|context| context.lexer_data());
        Some(query(&contexts, parser, lexer))
    }

    fn load_missing_data(&mut self, grammar: &Path, dir: &Path) {
        let Some(entry) = self.contexts.get_mut(grammar) else {
            return;
        };
        if entry.context.has_interpreter_data() {
            return;
        }
        let paths = InterpPaths::of(&entry.context, dir);
        let read = |path: Option<&Path>| -> Option<InterpreterData> {
            let path = path?;
            match InterpreterData::from_file(path) {
                Ok(data) => Some(data),
                Err(error) => {
                    debug!(path = %path.display(), %error, "interpreter data not loaded");
                    None
                }
            }
        };
        let parser = read(paths.parser.as_deref());
        let lexer = read(paths.lexer.as_deref());
        entry.context.set_interpreter_data(parser, lexer);
    }
}
