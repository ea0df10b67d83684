use crate::base::LexicalRange;
use rowan::TextRange;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Unique identifier for a symbol in the arena.
/// Uses u32 for compact storage (supports ~4 billion symbols).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// Create a new SymbolId from an index
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Get the index into the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a named entity in a grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKind {
    Terminal,
    Keyword,
    TokenVocab,
    Import,
    BuiltInLexerToken,
    VirtualLexerToken,
    FragmentLexerToken,
    LexerRule,
    BuiltInMode,
    LexerMode,
    BuiltInChannel,
    TokenChannel,
    ParserRule,
    Operator,
    Option,
    TokenReference,
    RuleReference,
    LexerCommand,
    GlobalNamedAction,
    LocalNamedAction,
    ParserAction,
    LexerAction,
    ParserPredicate,
    LexerPredicate,
    Arguments,
}

impl SymbolKind {
    /// Kinds that can satisfy a token reference
    pub const TOKENS: &'static [SymbolKind] = &[
        SymbolKind::BuiltInLexerToken,
        SymbolKind::VirtualLexerToken,
        SymbolKind::FragmentLexerToken,
        SymbolKind::LexerRule,
    ];

    pub const CHANNELS: &'static [SymbolKind] =
        &[SymbolKind::BuiltInChannel, SymbolKind::TokenChannel];

    pub const MODES: &'static [SymbolKind] = &[SymbolKind::BuiltInMode, SymbolKind::LexerMode];

    /// Action and predicate kinds, in reporting order
    pub const ACTIONS: &'static [SymbolKind] = &[
        SymbolKind::GlobalNamedAction,
        SymbolKind::LocalNamedAction,
        SymbolKind::ParserAction,
        SymbolKind::LexerAction,
        SymbolKind::ParserPredicate,
        SymbolKind::LexerPredicate,
    ];

    /// Symbols that can be found by name (definitions, not actions or options)
    pub fn is_named_definition(self) -> bool {
        matches!(
            self,
            SymbolKind::TokenVocab
                | SymbolKind::Import
                | SymbolKind::BuiltInLexerToken
                | SymbolKind::VirtualLexerToken
                | SymbolKind::FragmentLexerToken
                | SymbolKind::LexerRule
                | SymbolKind::BuiltInMode
                | SymbolKind::LexerMode
                | SymbolKind::BuiltInChannel
                | SymbolKind::TokenChannel
                | SymbolKind::ParserRule
        )
    }

    pub fn is_rule(self) -> bool {
        matches!(
            self,
            SymbolKind::ParserRule | SymbolKind::LexerRule | SymbolKind::FragmentLexerToken
        )
    }

    pub fn is_builtin(self) -> bool {
        matches!(
            self,
            SymbolKind::BuiltInLexerToken | SymbolKind::BuiltInMode | SymbolKind::BuiltInChannel
        )
    }

    /// Human readable description, as shown in hovers
    pub fn description(self) -> &'static str {
        match self {
            SymbolKind::Terminal => "Terminal",
            SymbolKind::Keyword => "Keyword",
            SymbolKind::TokenVocab => "Token Vocabulary",
            SymbolKind::Import => "Import",
            SymbolKind::BuiltInLexerToken => "Built-in Lexer Token",
            SymbolKind::VirtualLexerToken => "Virtual Lexer Token",
            SymbolKind::FragmentLexerToken => "Fragment Lexer Token",
            SymbolKind::LexerRule => "Lexer Rule",
            SymbolKind::BuiltInMode => "Built-in Lexer Mode",
            SymbolKind::LexerMode => "Lexer Mode",
            SymbolKind::BuiltInChannel => "Built-in Token Channel",
            SymbolKind::TokenChannel => "Token Channel",
            SymbolKind::ParserRule => "Parser Rule",
            SymbolKind::Operator => "Operator",
            SymbolKind::Option => "Grammar Option",
            SymbolKind::TokenReference => "Token Reference",
            SymbolKind::RuleReference => "Rule Reference",
            SymbolKind::LexerCommand => "Lexer Command",
            SymbolKind::GlobalNamedAction => "Global Named Action",
            SymbolKind::LocalNamedAction => "Local Named Action",
            SymbolKind::ParserAction => "Parser Action",
            SymbolKind::LexerAction => "Lexer Action",
            SymbolKind::ParserPredicate => "Parser Predicate",
            SymbolKind::LexerPredicate => "Lexer Predicate",
            SymbolKind::Arguments => "Native Arguments",
        }
    }
}

/// Source text and lexical range of a symbol's definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub text: String,
    pub range: LexicalRange,
}

/// A named entity defined in one grammar file
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Path of the defining grammar (`ANTLR runtime` for built-ins)
    pub source: String,
    pub definition: Option<Definition>,
    /// Doc comment preceding the definition
    pub description: Option<String>,
    /// Byte range of the whole definition
    pub text_range: Option<TextRange>,
    /// Byte range of the defining identifier
    pub name_range: Option<TextRange>,
    /// Lexer mode a lexer rule belongs to
    pub mode: Option<SmolStr>,
    /// Enclosing symbol for nested symbols (actions, arguments)
    pub parent: Option<SymbolId>,
}

impl Symbol {
    pub fn new(name: impl Into<SmolStr>, kind: SymbolKind, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: source.into(),
            definition: None,
            description: None,
            text_range: None,
            name_range: None,
            mode: None,
            parent: None,
        }
    }

    pub fn with_definition(mut self, text: impl Into<String>, range: LexicalRange) -> Self {
        self.definition = Some(Definition {
            text: text.into(),
            range,
        });
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_ranges(mut self, text_range: TextRange, name_range: Option<TextRange>) -> Self {
        self.text_range = Some(text_range);
        self.name_range = name_range;
        self
    }

    pub fn with_mode(mut self, mode: Option<SmolStr>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_parent(mut self, parent: Option<SymbolId>) -> Self {
        self.parent = parent;
        self
    }
}

/// A use of a name inside a grammar: a reference or the defining identifier itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub name: SmolStr,
    /// `TokenReference`, `RuleReference`, `TokenChannel`, `LexerMode` or the definition kind
    pub kind: SymbolKind,
    pub range: TextRange,
    pub lexical: LexicalRange,
    pub is_definition: bool,
    /// Rule containing the occurrence
    pub rule: Option<SmolStr>,
}

/// Query result describing a symbol to the editor host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    pub name: String,
    pub source: String,
    pub definition: Option<Definition>,
    pub description: Option<String>,
}

impl From<&Symbol> for SymbolInfo {
    fn from(symbol: &Symbol) -> Self {
        Self {
            kind: symbol.kind,
            name: symbol.name.to_string(),
            source: symbol.source.clone(),
            definition: symbol.definition.clone(),
            description: symbol.description.clone(),
        }
    }
}
