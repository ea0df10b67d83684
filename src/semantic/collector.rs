//! Symbol collection: walks the typed AST of one grammar and fills a [`SymbolTable`].
//!
//! Every definition becomes a [`Symbol`], every name use inside a rule body becomes
//! an [`Occurrence`]. Actions, predicates and argument blocks are recorded as nested
//! symbols of the rule that contains them.

use rowan::TextRange;
use smol_str::SmolStr;
use tracing::trace;

use crate::base::LineIndex;
use crate::parser::{
    AstNode, GrammarFile, GrammarType, Member, Rule, SyntaxKind, SyntaxNode, SyntaxToken,
    token_bounds,
};

use super::symbol_table::{Occurrence, Symbol, SymbolId, SymbolKind, SymbolTable};

pub(crate) struct SymbolCollector<'a> {
    table: SymbolTable,
    index: &'a LineIndex<'a>,
    source: &'a str,
    grammar_type: GrammarType,
    /// Rule currently being walked
    current_rule: Option<(SmolStr, SymbolId, bool)>,
}

impl<'a> SymbolCollector<'a> {
    pub fn new(index: &'a LineIndex<'a>, source: &'a str, grammar_type: GrammarType) -> Self {
        Self {
            table: SymbolTable::new(),
            index,
            source,
            grammar_type,
            current_rule: None,
        }
    }

    pub fn collect(mut self, file: &GrammarFile) -> SymbolTable {
        let mut mode: Option<SmolStr> = None;
        for member in file.members() {
            match member {
                Member::Decl(_) => {}
                Member::Options(spec) => {
                    for option in spec.options() {
                        self.collect_option(&option);
                    }
                }
                Member::Import(spec) => {
                    for delegate in spec.delegates() {
                        if let Some(name) = delegate.grammar() {
                            let symbol = self.named(&name, SymbolKind::Import, delegate.syntax());
                            self.table.insert(symbol);
                        }
                    }
                }
                Member::Tokens(spec) => {
                    for name in spec.names() {
                        self.define_token(&name, SymbolKind::VirtualLexerToken);
                    }
                }
                Member::Channels(spec) => {
                    for name in spec.names() {
                        self.define_token(&name, SymbolKind::TokenChannel);
                    }
                }
                Member::Action(action) => {
                    let name = action_header(action.syntax());
                    let symbol = self
                        .node_symbol(name, SymbolKind::GlobalNamedAction, action.syntax());
                    self.table.insert(symbol);
                }
                Member::Mode(spec) => {
                    if let Some(name) = spec.name() {
                        mode = Some(SmolStr::new(name.text()));
                        let symbol = self.named(&name, SymbolKind::LexerMode, spec.syntax());
                        self.table.insert(symbol);
                        self.add_definition(&name, SymbolKind::LexerMode);
                    }
                }
                Member::Rule(rule) => self.collect_rule(&rule, mode.clone()),
            }
        }
        trace!(symbols = self.table.len(), "collected grammar symbols");
        self.table
    }

    // ========================================================================
    // Prequel
    // ========================================================================

    fn collect_option(&mut self, option: &crate::parser::OptionEntry) {
        let Some(name) = option.name() else {
            return;
        };
        let symbol = if name.text() == "tokenVocab" {
            let Some(value) = option.value_text() else {
                return;
            };
            self.node_symbol(value, SymbolKind::TokenVocab, option.syntax())
        } else {
            self.node_symbol(name.text().to_string(), SymbolKind::Option, option.syntax())
        };
        self.table.insert(symbol);
    }

    fn define_token(&mut self, name: &SyntaxToken, kind: SymbolKind) {
        let range = name.text_range();
        let symbol = Symbol::new(name.text(), kind, self.source)
            .with_definition(name.text(), self.index.token_range(range))
            .with_ranges(range, Some(range));
        self.table.insert(symbol);
        self.add_definition(name, kind);
    }

    // ========================================================================
    // Rules
    // ========================================================================

    fn collect_rule(&mut self, rule: &Rule, mode: Option<SmolStr>) {
        let Some(name) = rule.name() else {
            return;
        };
        let kind = match rule {
            Rule::Parser(_) => SymbolKind::ParserRule,
            Rule::Lexer(lexer) if lexer.is_fragment() => SymbolKind::FragmentLexerToken,
            Rule::Lexer(_) => SymbolKind::LexerRule,
        };
        let symbol = self
            .named(&name, kind, rule.syntax())
            .with_description(rule.doc_comment().map(|d| clean_doc_comment(&d)))
            .with_mode(if rule.is_lexer() { mode } else { None });
        let id = self.table.insert(symbol);
        self.add_definition(&name, kind);

        let rule_name = SmolStr::new(name.text());
        self.current_rule = Some((rule_name, id, rule.is_lexer()));

        if let Rule::Parser(parser_rule) = rule {
            for node in parser_rule.argument_nodes() {
                let symbol = self
                    .node_symbol(node.to_string(), SymbolKind::Arguments, &node)
                    .with_parent(Some(id));
                self.table.insert(symbol);
            }
            for action in parser_rule.rule_actions() {
                let name = action_header(action.syntax());
                let symbol = self
                    .node_symbol(name, SymbolKind::LocalNamedAction, action.syntax())
                    .with_parent(Some(id));
                self.table.insert(symbol);
            }
        }
        if let Some(body) = rule.alt_list() {
            self.walk_body(body.syntax());
        }
        if let Rule::Parser(parser_rule) = rule {
            for action in parser_rule.exception_actions() {
                self.insert_token_symbol(&action, SymbolKind::ParserAction);
            }
        }
        self.current_rule = None;
    }

    /// Records references, actions and predicates below a rule body.
    fn walk_body(&mut self, body: &SyntaxNode) {
        let lexer = self.in_lexer_rule();
        for node in body.descendants() {
            match node.kind() {
                SyntaxKind::TERMINAL => {
                    if let Some(token) = first_token(&node)
                        && token.kind() == SyntaxKind::TOKEN_REF
                    {
                        self.add_reference(&token, SymbolKind::TokenReference);
                    }
                }
                SyntaxKind::RULE_REF_ELEMENT => {
                    if let Some(token) = first_token(&node) {
                        self.add_reference(&token, SymbolKind::RuleReference);
                    }
                }
                SyntaxKind::ACTION_ELEMENT => {
                    if let Some(token) = first_token(&node) {
                        let kind = if lexer {
                            SymbolKind::LexerAction
                        } else {
                            SymbolKind::ParserAction
                        };
                        self.insert_token_symbol(&token, kind);
                    }
                }
                SyntaxKind::PREDICATE => {
                    if let Some(token) = first_token(&node) {
                        let kind = if lexer {
                            SymbolKind::LexerPredicate
                        } else {
                            SymbolKind::ParserPredicate
                        };
                        self.insert_token_symbol(&token, kind);
                    }
                }
                SyntaxKind::LEXER_COMMAND => self.collect_lexer_command(&node),
                _ => {}
            }
        }
    }

    fn collect_lexer_command(&mut self, node: &SyntaxNode) {
        let Some(command) = crate::parser::LexerCommand::cast(node.clone()) else {
            return;
        };
        let (Some(name), Some(argument)) = (command.name(), command.argument()) else {
            return;
        };
        if argument.kind() == SyntaxKind::INT {
            return;
        }
        let kind = match name.text() {
            "channel" => SymbolKind::TokenChannel,
            "mode" | "pushMode" => SymbolKind::LexerMode,
            "type" => SymbolKind::TokenReference,
            _ => return,
        };
        self.add_reference(&argument, kind);
    }

    fn in_lexer_rule(&self) -> bool {
        match &self.current_rule {
            Some((_, _, lexer)) => *lexer,
            None => self.grammar_type == GrammarType::Lexer,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Symbol named by `name` whose definition is the whole `node`
    fn named(&self, name: &SyntaxToken, kind: SymbolKind, node: &SyntaxNode) -> Symbol {
        self.node_symbol(name.text().to_string(), kind, node)
            .with_ranges(node.text_range(), Some(name.text_range()))
    }

    fn node_symbol(&self, name: String, kind: SymbolKind, node: &SyntaxNode) -> Symbol {
        let symbol = Symbol::new(name, kind, self.source);
        match token_bounds(node) {
            Some((first, last)) => symbol
                .with_definition(
                    node.to_string(),
                    self.index
                        .construct_range(first.text_range(), last.text_range()),
                )
                .with_ranges(node.text_range(), None),
            None => symbol,
        }
    }

    /// Action or predicate symbol nested in the current rule
    fn insert_token_symbol(&mut self, token: &SyntaxToken, kind: SymbolKind) {
        let range = token.text_range();
        let parent = self.current_rule.as_ref().map(|(_, id, _)| *id);
        let symbol = Symbol::new(token.text(), kind, self.source)
            .with_definition(token.text(), self.index.token_range(range))
            .with_ranges(range, None)
            .with_parent(parent);
        self.table.insert(symbol);
    }

    fn add_definition(&mut self, name: &SyntaxToken, kind: SymbolKind) {
        self.add_occurrence(name.text_range(), name.text(), kind, true);
    }

    fn add_reference(&mut self, token: &SyntaxToken, kind: SymbolKind) {
        self.add_occurrence(token.text_range(), token.text(), kind, false);
    }

    fn add_occurrence(&mut self, range: TextRange, name: &str, kind: SymbolKind, definition: bool) {
        let rule = self.current_rule.as_ref().map(|(name, _, _)| name.clone());
        self.table.add_occurrence(Occurrence {
            name: SmolStr::new(name),
            kind,
            range,
            lexical: self.index.token_range(range),
            is_definition: definition,
            rule,
        });
    }
}

fn first_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| !t.kind().is_trivia())
}

/// `@lexer::members` for `@lexer::members { ... }`
fn action_header(node: &SyntaxNode) -> String {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia())
        .take_while(|t| t.kind() != SyntaxKind::ACTION_BLOCK)
        .map(|t| t.text().to_string())
        .collect()
}

/// Strips comment delimiters and leading asterisks from a doc comment.
fn clean_doc_comment(text: &str) -> String {
    let body = text
        .trim_start_matches("/**")
        .trim_end_matches("*/");
    body.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').map(str::trim_start).unwrap_or(line)
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collect the symbols and occurrences of a parsed grammar.
pub(crate) fn collect_symbols(file: &GrammarFile, source: &str, index: &LineIndex<'_>) -> SymbolTable {
    SymbolCollector::new(index, source, file.grammar_type()).collect(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LexicalRange;
    use crate::parser::parse;

    fn collect(text: &str) -> SymbolTable {
        let parse = parse(text);
        let index = LineIndex::new(text);
        collect_symbols(&parse.tree(), "t.g4", &index)
    }

    #[test]
    fn test_rule_definitions_use_construct_ranges() {
        let table = collect("grammar t;\n\na: ZZ b;\nb: c+;\nc: A | B;\nA: 'A';\nB: 'B';\n");
        let b = table.lookup_kind("B", &[SymbolKind::LexerRule]).unwrap();
        let definition = b.definition.as_ref().unwrap();
        assert_eq!(definition.text, "B: 'B';");
        assert_eq!(definition.range, LexicalRange::from_coords(7, 0, 7, 6));
        assert_eq!(table.symbols_of_kind(&[SymbolKind::ParserRule]).count(), 3);
    }

    #[test]
    fn test_references_record_their_rule() {
        let table = collect("grammar t;\na: ZZ b;\nb: 'x';\n");
        let zz: Vec<_> = table.references_to("ZZ").collect();
        assert_eq!(zz.len(), 1);
        assert_eq!(zz[0].kind, SymbolKind::TokenReference);
        assert_eq!(zz[0].rule.as_deref(), Some("a"));
        assert_eq!(table.references_to("b").next().unwrap().kind, SymbolKind::RuleReference);
    }

    #[test]
    fn test_prequel_symbols() {
        let table = collect(
            "lexer grammar L;\noptions { tokenVocab = V; superClass = B; }\ntokens { T1 }\nchannels { C1 }\n@members { int x; }\nA: 'a' -> channel(C1);\nmode M;\nfragment F: 'f';\n",
        );
        assert!(table.lookup_kind("V", &[SymbolKind::TokenVocab]).is_some());
        assert!(table.lookup_kind("T1", &[SymbolKind::VirtualLexerToken]).is_some());
        assert!(table.lookup_kind("C1", &[SymbolKind::TokenChannel]).is_some());
        assert!(table.lookup_kind("M", &[SymbolKind::LexerMode]).is_some());
        let fragment = table.lookup("F").unwrap();
        assert_eq!(fragment.kind, SymbolKind::FragmentLexerToken);
        assert_eq!(fragment.mode.as_deref(), Some("M"));
        let actions: Vec<_> = table.symbols_of_kind(&[SymbolKind::GlobalNamedAction]).collect();
        assert_eq!(actions[0].name, "@members");
        let channel_use = table.references_to("C1").next().unwrap();
        assert_eq!(channel_use.kind, SymbolKind::TokenChannel);
    }

    #[test]
    fn test_actions_nest_under_rules() {
        let table = collect("grammar t;\nr[int a] @init {x} : A {y} {z}? ;\nA: 'a' {w};\n");
        let rule_id = table
            .iter_symbols_with_ids()
            .find(|(_, s)| s.name == "r")
            .map(|(id, _)| id);
        let nested: Vec<_> = table
            .iter_symbols()
            .filter(|s| s.parent == rule_id)
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            nested,
            vec![
                SymbolKind::Arguments,
                SymbolKind::LocalNamedAction,
                SymbolKind::ParserAction,
                SymbolKind::ParserPredicate
            ]
        );
        assert_eq!(table.symbols_of_kind(&[SymbolKind::LexerAction]).count(), 1);
    }

    #[test]
    fn test_doc_comments_become_descriptions() {
        let table = collect("grammar t;\n/**\n * Entry point.\n */\nstart: A;\n");
        assert_eq!(
            table.lookup("start").unwrap().description.as_deref(),
            Some("Entry point.")
        );
    }
}
