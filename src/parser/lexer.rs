//! Logos-based lexer for ANTLR4 grammars
//!
//! Fast tokenization using the logos crate. Action blocks, bracket blocks and
//! block comments are scanned by callbacks since they nest or contain arbitrary text.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

impl Token<'_> {
    pub fn end(&self) -> TextSize {
        self.offset + TextSize::of(self.text)
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(LogosToken::BlockComment) if is_doc_comment(text) => SyntaxKind::DOC_COMMENT,
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

fn is_doc_comment(text: &str) -> bool {
    text.starts_with("/**") && text != "/**/"
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\r\n]*")]
    LineComment,

    #[token("/*", lex_block_comment)]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[A-Z][A-Za-z0-9_]*")]
    TokenRef,

    #[regex(r"[a-z][A-Za-z0-9_]*")]
    RuleRef,

    #[regex(r"'([^'\\\r\n]|\\.)*'")]
    StringLiteral,

    #[regex(r"[0-9]+")]
    Int,

    #[token("[", lex_bracket_block)]
    BracketBlock,

    #[token("{", lex_action_block)]
    ActionBlock,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("|")]
    Pipe,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+=")]
    PlusAssign,
    #[token("=")]
    Assign,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("~")]
    Tilde,
    #[token("..")]
    Range,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("#")]
    Pound,
    #[token("@")]
    At,
    #[token("$")]
    Dollar,
    #[token("}")]
    RBrace,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("grammar")]
    GrammarKw,
    #[token("lexer")]
    LexerKw,
    #[token("parser")]
    ParserKw,
    #[token("fragment")]
    FragmentKw,
    #[token("import")]
    ImportKw,
    #[regex(r"options[ \t\r\n\f]*\{")]
    OptionsKw,
    #[regex(r"tokens[ \t\r\n\f]*\{")]
    TokensKw,
    #[regex(r"channels[ \t\r\n\f]*\{")]
    ChannelsKw,
    #[token("mode")]
    ModeKw,
    #[token("returns")]
    ReturnsKw,
    #[token("locals")]
    LocalsKw,
    #[token("throws")]
    ThrowsKw,
    #[token("catch")]
    CatchKw,
    #[token("finally")]
    FinallyKw,
}

/// Scan to the closing `*/`. Unterminated comments swallow the rest of the input.
fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

/// Scan to the first unescaped `]` on the same nesting level.
fn lex_bracket_block(lex: &mut logos::Lexer<LogosToken>) -> bool {
    let mut chars = lex.remainder().char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            ']' => {
                lex.bump(i + 1);
                return true;
            }
            _ => {}
        }
    }
    lex.bump(lex.remainder().len());
    false
}

/// Scan a `{...}` action: braces nest, quoted strings and comments inside the
/// action are skipped so their braces don't count.
fn lex_action_block(lex: &mut logos::Lexer<LogosToken>) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    lex.bump(i + 1);
                    return true;
                }
            }
            b'\\' => i += 1,
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => match rest[i + 2..].find("*/") {
                Some(end) => i += end + 3,
                None => i = bytes.len(),
            },
            _ => {}
        }
        i += 1;
    }
    lex.bump(rest.len());
    false
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken::*;
        match token {
            Whitespace => SyntaxKind::WHITESPACE,
            LineComment => SyntaxKind::LINE_COMMENT,
            BlockComment => SyntaxKind::BLOCK_COMMENT,
            TokenRef => SyntaxKind::TOKEN_REF,
            RuleRef => SyntaxKind::RULE_REF,
            StringLiteral => SyntaxKind::STRING_LITERAL,
            Int => SyntaxKind::INT,
            BracketBlock => SyntaxKind::BRACKET_BLOCK,
            ActionBlock => SyntaxKind::ACTION_BLOCK,
            ColonColon => SyntaxKind::COLON_COLON,
            Colon => SyntaxKind::COLON,
            Semi => SyntaxKind::SEMI,
            Comma => SyntaxKind::COMMA,
            Pipe => SyntaxKind::PIPE,
            LParen => SyntaxKind::L_PAREN,
            RParen => SyntaxKind::R_PAREN,
            Lt => SyntaxKind::LT,
            Gt => SyntaxKind::GT,
            PlusAssign => SyntaxKind::PLUS_ASSIGN,
            Assign => SyntaxKind::ASSIGN,
            Question => SyntaxKind::QUESTION,
            Star => SyntaxKind::STAR,
            Plus => SyntaxKind::PLUS,
            Tilde => SyntaxKind::TILDE,
            Range => SyntaxKind::RANGE,
            Dot => SyntaxKind::DOT,
            Arrow => SyntaxKind::ARROW,
            Pound => SyntaxKind::POUND,
            At => SyntaxKind::AT,
            Dollar => SyntaxKind::DOLLAR,
            RBrace => SyntaxKind::R_BRACE,
            GrammarKw => SyntaxKind::GRAMMAR_KW,
            LexerKw => SyntaxKind::LEXER_KW,
            ParserKw => SyntaxKind::PARSER_KW,
            FragmentKw => SyntaxKind::FRAGMENT_KW,
            ImportKw => SyntaxKind::IMPORT_KW,
            OptionsKw => SyntaxKind::OPTIONS_KW,
            TokensKw => SyntaxKind::TOKENS_KW,
            ChannelsKw => SyntaxKind::CHANNELS_KW,
            ModeKw => SyntaxKind::MODE_KW,
            ReturnsKw => SyntaxKind::RETURNS_KW,
            LocalsKw => SyntaxKind::LOCALS_KW,
            ThrowsKw => SyntaxKind::THROWS_KW,
            CatchKw => SyntaxKind::CATCH_KW,
            FinallyKw => SyntaxKind::FINALLY_KW,
        }
    }
}
