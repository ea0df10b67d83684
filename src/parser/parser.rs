//! Recursive descent parser for ANTLR4 grammars
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST.

use super::lexer::{Token, tokenize};
use super::syntax_kind::SyntaxKind;
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Get the typed root
    pub fn tree(&self) -> super::ast::GrammarFile {
        super::ast::GrammarFile::from_root(self.syntax())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse grammar source code into a CST
pub fn parse(input: &str) -> Parse {
    let tokens = tokenize(input);
    let mut parser = Parser::new(&tokens, TextSize::of(input));
    parser.parse_grammar_file();
    parser.finish()
}

use SyntaxKind::*;

const TOP_LEVEL_RECOVERY: &[SyntaxKind] = &[
    TOKEN_REF,
    RULE_REF,
    FRAGMENT_KW,
    MODE_KW,
    AT,
    OPTIONS_KW,
    TOKENS_KW,
    CHANNELS_KW,
    IMPORT_KW,
];

const ALT_END: &[SyntaxKind] = &[PIPE, SEMI, R_PAREN, ARROW, POUND];

const ELEMENT_START: &[SyntaxKind] = &[
    TOKEN_REF,
    RULE_REF,
    STRING_LITERAL,
    BRACKET_BLOCK,
    L_PAREN,
    TILDE,
    DOT,
    ACTION_BLOCK,
];

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    end: TextSize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], end: TextSize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection (trivia is invisible to lookahead)
    // =========================================================================

    fn non_trivia_index(&self, n: usize) -> Option<usize> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .nth(n)
            .map(|(i, _)| self.pos + i)
    }

    fn current(&self) -> Option<&Token<'a>> {
        self.non_trivia_index(0).map(|i| &self.tokens[i])
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    fn current_text(&self) -> &str {
        self.current().map(|t| t.text).unwrap_or("<EOF>")
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_eof() && self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_eof() && kinds.contains(&self.current_kind())
    }

    fn at_ident(&self) -> bool {
        self.current_kind().is_ident() && !self.at_eof()
    }

    fn at_eof(&self) -> bool {
        self.current().is_none()
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.non_trivia_index(n)
            .map(|i| self.tokens[i].kind)
            .unwrap_or(SyntaxKind::ERROR)
    }

    /// An identifier followed by `:` starts a new rule.
    fn at_rule_start(&self) -> bool {
        (self.at_ident() && self.nth(1) == COLON) || self.at_any(&[FRAGMENT_KW, MODE_KW])
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn flush_trivia(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            if !token.kind.is_trivia() {
                break;
            }
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn bump(&mut self) {
        self.flush_trivia();
        if let Some(token) = self.tokens.get(self.pos) {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!(
                "missing {} at '{}'",
                describe(kind),
                self.current_text()
            ));
            false
        }
    }

    fn expect_ident(&mut self) -> bool {
        if self.at_ident() {
            self.bump();
            true
        } else {
            self.error(format!(
                "missing identifier at '{}'",
                self.current_text()
            ));
            false
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = self
            .current()
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .unwrap_or_else(|| TextRange::empty(self.end));
        self.errors.push(SyntaxError::new(message, range));
    }

    fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.start_node(SyntaxKind::ERROR);
        // Always consume at least one token to make progress
        let mut consumed = false;
        while !self.at_eof() && !self.at_any(recovery) {
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_eof() {
            self.bump();
        }
        self.finish_node();
    }

    /// Skip the remainder of a broken rule: up to and including `;`, or up to the next rule start.
    fn recover_rule(&mut self) {
        self.start_node(SyntaxKind::ERROR);
        while !self.at_eof() && !self.at_rule_start() {
            if self.at(SEMI) {
                self.bump();
                break;
            }
            self.bump();
        }
        self.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.flush_trivia();
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.flush_trivia();
        self.builder.checkpoint()
    }

    // =========================================================================
    // Grammar file and prequel
    // =========================================================================

    fn parse_grammar_file(&mut self) {
        self.builder.start_node(GRAMMAR_FILE.into());

        if self.at_any(&[LEXER_KW, PARSER_KW, GRAMMAR_KW]) {
            self.parse_grammar_decl();
        } else {
            self.error(format!(
                "missing grammar declaration at '{}'",
                self.current_text()
            ));
        }

        while !self.at_eof() {
            self.parse_top_level();
        }

        self.flush_trivia();
        self.builder.finish_node();
    }

    fn parse_grammar_decl(&mut self) {
        self.start_node(GRAMMAR_DECL);
        if self.at_any(&[LEXER_KW, PARSER_KW]) {
            self.bump();
        }
        self.expect(GRAMMAR_KW);
        self.expect_ident();
        self.expect(SEMI);
        self.finish_node();
    }

    fn parse_top_level(&mut self) {
        match self.current_kind() {
            OPTIONS_KW => self.parse_options_spec(),
            TOKENS_KW => self.parse_id_list_spec(TOKENS_SPEC),
            CHANNELS_KW => self.parse_id_list_spec(CHANNELS_SPEC),
            IMPORT_KW => self.parse_import_spec(),
            AT => self.parse_named_action(NAMED_ACTION),
            MODE_KW => self.parse_mode_spec(),
            FRAGMENT_KW | TOKEN_REF => self.parse_lexer_rule(),
            RULE_REF => self.parse_parser_rule(),
            _ => {
                let message = format!("extraneous input '{}'", self.current_text());
                self.error_recover(message, TOP_LEVEL_RECOVERY);
            }
        }
    }

    fn parse_options_spec(&mut self) {
        self.start_node(OPTIONS_SPEC);
        self.bump();
        while !self.at_eof() && !self.at(R_BRACE) {
            if self.at_ident() && self.nth(1) == COLON {
                break;
            }
            if self.at_ident() {
                self.start_node(OPTION);
                self.bump();
                self.expect(ASSIGN);
                self.parse_option_value();
                self.finish_node();
                self.expect(SEMI);
            } else {
                let message = format!("extraneous input '{}'", self.current_text());
                self.error_recover(message, &[SEMI, R_BRACE, TOKEN_REF, RULE_REF]);
                self.eat(SEMI);
            }
        }
        self.expect(R_BRACE);
        self.finish_node();
    }

    fn parse_option_value(&mut self) {
        self.start_node(OPTION_VALUE);
        if self.at_ident() {
            self.bump();
            while self.at(DOT) && self.nth(1).is_ident() {
                self.bump();
                self.bump();
            }
        } else if self.at_any(&[STRING_LITERAL, INT, ACTION_BLOCK]) {
            self.bump();
        } else {
            self.error(format!(
                "missing option value at '{}'",
                self.current_text()
            ));
        }
        self.finish_node();
    }

    fn parse_id_list_spec(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        self.bump();
        while self.at_ident() {
            self.bump();
            if !self.eat(COMMA) {
                break;
            }
        }
        if !self.at(R_BRACE) && !self.at_eof() {
            let message = format!("extraneous input '{}'", self.current_text());
            self.error_recover(message, &[R_BRACE]);
        }
        self.expect(R_BRACE);
        self.finish_node();
    }

    fn parse_import_spec(&mut self) {
        self.start_node(IMPORT_SPEC);
        self.bump();
        loop {
            self.start_node(DELEGATE_GRAMMAR);
            self.expect_ident();
            if self.eat(ASSIGN) {
                self.expect_ident();
            }
            self.finish_node();
            if !self.eat(COMMA) {
                break;
            }
        }
        self.expect(SEMI);
        self.finish_node();
    }

    /// `@name {...}` or `@scope::name {...}`
    fn parse_named_action(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        self.bump();
        let scoped = self.at_ident() || self.at_any(&[LEXER_KW, PARSER_KW]);
        if scoped && self.nth(1) == COLON_COLON {
            self.bump();
            self.bump();
        }
        self.expect_ident();
        self.expect(ACTION_BLOCK);
        self.finish_node();
    }

    fn parse_mode_spec(&mut self) {
        self.start_node(MODE_SPEC);
        self.bump();
        self.expect_ident();
        self.expect(SEMI);
        self.finish_node();
    }

    // =========================================================================
    // Rules
    // =========================================================================

    fn parse_parser_rule(&mut self) {
        self.start_node(PARSER_RULE);
        self.bump();

        if self.at(BRACKET_BLOCK) {
            self.start_node(ARG_ACTION);
            self.bump();
            self.finish_node();
        }
        if self.at(RETURNS_KW) {
            self.start_node(RULE_RETURNS);
            self.bump();
            self.expect(BRACKET_BLOCK);
            self.finish_node();
        }
        if self.at(THROWS_KW) {
            self.start_node(THROWS_SPEC);
            self.bump();
            self.expect_ident();
            while self.eat(COMMA) {
                self.expect_ident();
            }
            self.finish_node();
        }
        if self.at(LOCALS_KW) {
            self.start_node(LOCALS);
            self.bump();
            self.expect(BRACKET_BLOCK);
            self.finish_node();
        }
        loop {
            if self.at(OPTIONS_KW) {
                self.parse_options_spec();
            } else if self.at(AT) {
                self.parse_named_action(RULE_ACTION);
            } else {
                break;
            }
        }

        if !self.expect(COLON) {
            self.recover_rule();
            self.finish_node();
            return;
        }
        self.parse_alt_list();
        self.expect(SEMI);

        if self.at_any(&[CATCH_KW, FINALLY_KW]) {
            self.parse_exception_group();
        }
        self.finish_node();
    }

    fn parse_exception_group(&mut self) {
        self.start_node(EXCEPTION_GROUP);
        while self.at(CATCH_KW) {
            self.bump();
            self.expect(BRACKET_BLOCK);
            self.expect(ACTION_BLOCK);
        }
        if self.eat(FINALLY_KW) {
            self.expect(ACTION_BLOCK);
        }
        self.finish_node();
    }

    fn parse_lexer_rule(&mut self) {
        self.start_node(LEXER_RULE);
        self.eat(FRAGMENT_KW);
        if self.at_ident() {
            self.bump();
        } else {
            self.expect(TOKEN_REF);
        }
        if self.at(OPTIONS_KW) {
            self.parse_options_spec();
        }

        if !self.expect(COLON) {
            self.recover_rule();
            self.finish_node();
            return;
        }
        self.parse_alt_list();
        self.expect(SEMI);
        self.finish_node();
    }

    // =========================================================================
    // Alternatives and elements
    // =========================================================================

    fn parse_alt_list(&mut self) {
        self.start_node(ALT_LIST);
        self.parse_alternative();
        while self.eat(PIPE) {
            self.parse_alternative();
        }
        self.finish_node();
    }

    fn parse_alternative(&mut self) {
        self.start_node(ALTERNATIVE);
        if self.at(LT) {
            self.parse_element_options();
        }
        loop {
            if self.at_any(ELEMENT_START) {
                if self.at_rule_start() {
                    break;
                }
                self.parse_element();
                continue;
            }
            if self.at_eof() || self.at_any(ALT_END) || self.at_rule_start() {
                break;
            }
            let message = format!("extraneous input '{}'", self.current_text());
            let recovery: Vec<SyntaxKind> = ALT_END.iter().chain(ELEMENT_START).copied().collect();
            self.error_recover(message, &recovery);
        }
        if self.at(ARROW) {
            self.parse_lexer_commands();
        }
        if self.at(POUND) {
            self.start_node(ALT_LABEL);
            self.bump();
            self.expect_ident();
            self.finish_node();
        }
        self.finish_node();
    }

    fn parse_element(&mut self) {
        let checkpoint = self.checkpoint();
        match self.current_kind() {
            TOKEN_REF | RULE_REF if matches!(self.nth(1), ASSIGN | PLUS_ASSIGN) => {
                self.start_node(LABELED_ELEMENT);
                self.bump();
                self.bump();
                if self.at(L_PAREN) {
                    self.parse_block();
                } else {
                    self.parse_atom();
                }
                self.finish_node();
            }
            L_PAREN => self.parse_block(),
            ACTION_BLOCK => {
                if self.nth(1) == QUESTION {
                    self.start_node(PREDICATE);
                    self.bump();
                    self.bump();
                    if self.at(LT) {
                        self.parse_element_options();
                    }
                } else {
                    self.start_node(ACTION_ELEMENT);
                    self.bump();
                }
                self.finish_node();
                return;
            }
            _ => self.parse_atom(),
        }

        if self.at_any(&[QUESTION, STAR, PLUS]) {
            self.builder.start_node_at(checkpoint, EBNF.into());
            self.bump();
            self.eat(QUESTION);
            self.finish_node();
        }
    }

    fn parse_atom(&mut self) {
        match self.current_kind() {
            STRING_LITERAL if self.nth(1) == RANGE => {
                self.start_node(CHAR_RANGE);
                self.bump();
                self.bump();
                self.expect(STRING_LITERAL);
                self.finish_node();
            }
            TOKEN_REF | STRING_LITERAL => {
                self.start_node(TERMINAL);
                self.bump();
                if self.at(LT) {
                    self.parse_element_options();
                }
                self.finish_node();
            }
            RULE_REF => {
                self.start_node(RULE_REF_ELEMENT);
                self.bump();
                if self.at(BRACKET_BLOCK) {
                    self.start_node(ARG_ACTION);
                    self.bump();
                    self.finish_node();
                }
                if self.at(LT) {
                    self.parse_element_options();
                }
                self.finish_node();
            }
            BRACKET_BLOCK => {
                self.start_node(LEXER_CHAR_SET);
                self.bump();
                self.finish_node();
            }
            DOT => {
                self.start_node(WILDCARD);
                self.bump();
                if self.at(LT) {
                    self.parse_element_options();
                }
                self.finish_node();
            }
            TILDE => {
                self.start_node(NOT_SET);
                self.bump();
                if self.at(L_PAREN) {
                    self.parse_block();
                } else {
                    self.parse_atom();
                }
                self.finish_node();
            }
            _ => {
                self.error(format!(
                    "missing element at '{}'",
                    self.current_text()
                ));
            }
        }
    }

    fn parse_block(&mut self) {
        self.start_node(BLOCK);
        self.bump();
        if self.at_any(&[OPTIONS_KW, AT]) {
            if self.at(OPTIONS_KW) {
                self.parse_options_spec();
            }
            while self.at(AT) {
                self.parse_named_action(RULE_ACTION);
            }
            self.expect(COLON);
        }
        self.parse_alt_list();
        self.expect(R_PAREN);
        self.finish_node();
    }

    fn parse_element_options(&mut self) {
        self.start_node(ELEMENT_OPTIONS);
        self.bump();
        loop {
            self.expect_ident();
            if self.eat(ASSIGN) {
                if self.at_ident() || self.at_any(&[STRING_LITERAL, INT]) {
                    self.bump();
                } else {
                    self.error(format!(
                        "missing option value at '{}'",
                        self.current_text()
                    ));
                }
            }
            if !self.eat(COMMA) {
                break;
            }
        }
        self.expect(GT);
        self.finish_node();
    }

    fn parse_lexer_commands(&mut self) {
        self.start_node(LEXER_COMMANDS);
        self.bump();
        loop {
            self.start_node(LEXER_COMMAND);
            if self.at_ident() || self.at(MODE_KW) {
                self.bump();
            } else {
                self.error(format!(
                    "missing lexer command at '{}'",
                    self.current_text()
                ));
            }
            if self.eat(L_PAREN) {
                if self.at_ident() || self.at(INT) {
                    self.bump();
                } else {
                    self.error(format!(
                        "missing lexer command argument at '{}'",
                        self.current_text()
                    ));
                }
                self.expect(R_PAREN);
            }
            self.finish_node();
            if !self.eat(COMMA) {
                break;
            }
        }
        self.finish_node();
    }
}

/// Human readable form of an expected token.
fn describe(kind: SyntaxKind) -> &'static str {
    match kind {
        SEMI => "';'",
        COLON => "':'",
        R_BRACE => "'}'",
        R_PAREN => "')'",
        GT => "'>'",
        ASSIGN => "'='",
        GRAMMAR_KW => "'grammar'",
        TOKEN_REF => "token name",
        STRING_LITERAL => "string literal",
        BRACKET_BLOCK => "argument block",
        ACTION_BLOCK => "action block",
        _ => "token",
    }
}
