//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree of an
//! ANTLR4 grammar file.

/// All syntax kinds (tokens and nodes) of ANTLR4 grammars
///
/// Tokens are leaf nodes (identifiers, keywords, punctuation, action blocks).
/// Nodes are composite (rules, alternatives, elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace and comments - preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,
    DOC_COMMENT, // /** ... */

    // =========================================================================
    // LITERALS
    // =========================================================================
    TOKEN_REF,      // identifier starting with an uppercase letter
    RULE_REF,       // identifier starting with anything else
    STRING_LITERAL, // 'abc'
    INT,            // 42
    BRACKET_BLOCK,  // [a-z] or [int x] (char set or argument block)
    ACTION_BLOCK,   // { ... } with nested braces

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    COLON,       // :
    COLON_COLON, // ::
    SEMI,        // ;
    COMMA,       // ,
    PIPE,        // |
    L_PAREN,     // (
    R_PAREN,     // )
    LT,          // <
    GT,          // >
    ASSIGN,      // =
    PLUS_ASSIGN, // +=
    QUESTION,    // ?
    STAR,        // *
    PLUS,        // +
    TILDE,       // ~
    RANGE,       // ..
    DOT,         // .
    ARROW,       // ->
    POUND,       // #
    AT,          // @
    DOLLAR,      // $
    R_BRACE,     // }

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    GRAMMAR_KW,
    LEXER_KW,
    PARSER_KW,
    FRAGMENT_KW,
    IMPORT_KW,
    OPTIONS_KW,  // `options {` including the brace
    TOKENS_KW,   // `tokens {` including the brace
    CHANNELS_KW, // `channels {` including the brace
    MODE_KW,
    RETURNS_KW,
    LOCALS_KW,
    THROWS_KW,
    CATCH_KW,
    FINALLY_KW,

    // =========================================================================
    // NODES
    // =========================================================================
    GRAMMAR_FILE,
    GRAMMAR_DECL,
    OPTIONS_SPEC,
    OPTION,
    OPTION_VALUE,
    TOKENS_SPEC,
    CHANNELS_SPEC,
    IMPORT_SPEC,
    DELEGATE_GRAMMAR,
    NAMED_ACTION,
    MODE_SPEC,
    PARSER_RULE,
    LEXER_RULE,
    ARG_ACTION,
    RULE_RETURNS,
    LOCALS,
    THROWS_SPEC,
    RULE_ACTION,
    EXCEPTION_GROUP,
    ALT_LIST,
    ALTERNATIVE,
    ALT_LABEL,
    LEXER_COMMANDS,
    LEXER_COMMAND,
    LABELED_ELEMENT,
    TERMINAL,
    RULE_REF_ELEMENT,
    CHAR_RANGE,
    NOT_SET,
    WILDCARD,
    LEXER_CHAR_SET,
    BLOCK,
    ACTION_ELEMENT,
    PREDICATE,
    ELEMENT_OPTIONS,
    EBNF,

    ERROR,

    // Must be last
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::LINE_COMMENT | Self::BLOCK_COMMENT | Self::DOC_COMMENT
        )
    }

    pub fn is_comment(self) -> bool {
        self.is_trivia() && self != Self::WHITESPACE
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::GRAMMAR_KW as u16) && (self as u16) <= (Self::FINALLY_KW as u16)
    }

    /// Check if this is a punctuation token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::COLON as u16) && (self as u16) <= (Self::R_BRACE as u16)
    }

    /// Check if this is an identifier token
    pub fn is_ident(self) -> bool {
        matches!(self, Self::TOKEN_REF | Self::RULE_REF)
    }

    /// Check if this kind is a token rather than a node
    pub fn is_token(self) -> bool {
        (self as u16) < (Self::GRAMMAR_FILE as u16)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AntlrLanguage {}

impl rowan::Language for AntlrLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<AntlrLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<AntlrLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<AntlrLanguage>;
