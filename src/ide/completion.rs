//! Completion suggestions implementation.

use std::sync::Arc;

use crate::base::{Position, text_utils::word_prefix_before};
use crate::context::GrammarContext;
use crate::parser::{SyntaxKind, Token, tokenize};
use crate::semantic::{Symbol, SymbolKind, SymbolTable};

/// Kind of completion item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    Keyword,
    ParserRule,
    LexerToken,
    Channel,
    Mode,
    LexerCommand,
}

impl CompletionKind {
    /// Convert to LSP completion item kind number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            CompletionKind::Keyword => 14,      // Keyword
            CompletionKind::ParserRule => 3,    // Function
            CompletionKind::LexerToken => 21,   // Constant
            CompletionKind::Channel => 20,      // EnumMember
            CompletionKind::Mode => 9,          // Module
            CompletionKind::LexerCommand => 2,  // Method
        }
    }

    fn of(kind: SymbolKind) -> Option<Self> {
        match kind {
            SymbolKind::ParserRule => Some(Self::ParserRule),
            SymbolKind::LexerRule
            | SymbolKind::FragmentLexerToken
            | SymbolKind::VirtualLexerToken
            | SymbolKind::BuiltInLexerToken => Some(Self::LexerToken),
            SymbolKind::TokenChannel | SymbolKind::BuiltInChannel => Some(Self::Channel),
            SymbolKind::LexerMode | SymbolKind::BuiltInMode => Some(Self::Mode),
            _ => None,
        }
    }
}

/// A completion suggestion.
#[derive(Clone, Debug)]
pub struct CompletionItem {
    /// The text to insert.
    pub label: Arc<str>,
    /// The kind of completion.
    pub kind: CompletionKind,
    /// Detail text (shown after label).
    pub detail: Option<Arc<str>>,
    /// Documentation (shown in popup).
    pub documentation: Option<Arc<str>>,
    /// Sort priority (lower = higher priority).
    pub sort_priority: u32,
}

impl CompletionItem {
    /// Create a new completion item.
    pub fn new(label: impl Into<Arc<str>>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
            sort_priority: 100,
        }
    }

    /// Set the detail text.
    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the sort priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.sort_priority = priority;
        self
    }

    /// Create from a grammar symbol, `None` for kinds that are never completed.
    pub fn from_symbol(symbol: &Symbol) -> Option<Self> {
        let mut item = Self::new(symbol.name.as_str(), CompletionKind::of(symbol.kind)?)
            .with_detail(symbol.kind.description());
        item.documentation = symbol.description.as_deref().map(Arc::from);
        Some(item)
    }
}

const TOP_LEVEL_KEYWORDS: [&str; 9] = [
    "grammar", "lexer", "parser", "fragment", "import", "options", "tokens", "channels", "mode",
];

const LEXER_COMMANDS: [&str; 7] = ["skip", "more", "popMode", "mode", "pushMode", "type", "channel"];

/// Get completion suggestions at a position.
///
/// Candidates come from the grammar itself, then its dependencies, then the
/// runtime built-ins; only names starting with the word left of the cursor
/// (case-insensitive) are returned.
pub fn completions(
    context: &GrammarContext,
    dependencies: &[&GrammarContext],
    position: Position,
) -> Vec<CompletionItem> {
    let index = context.line_index();
    let (Some(offset), Some(line)) = (index.offset(position), index.line_text(position.row)) else {
        return Vec::new();
    };
    let prefix = word_prefix_before(line, position.column as usize);
    let tokens = tokenize(context.source());
    let place = place_at(&tokens, offset.saturating_sub(prefix.len()));

    let mut items = Vec::new();
    match place {
        Place::TopLevel => items.extend(keywords(&TOP_LEVEL_KEYWORDS, CompletionKind::Keyword)),
        Place::LexerCommand => items.extend(keywords(&LEXER_COMMANDS, CompletionKind::LexerCommand)),
        Place::Prequel => {}
        _ => {
            let builtins = SymbolTable::builtins();
            let tables = std::iter::once((context.symbol_table(), 10))
                .chain(dependencies.iter().map(|d| (d.symbol_table(), 20)))
                .chain(std::iter::once((&builtins, 30)));
            for (table, priority) in tables {
                items.extend(
                    table
                        .iter_symbols()
                        .filter(|symbol| place.accepts(symbol.kind))
                        .filter_map(CompletionItem::from_symbol)
                        .map(|item| item.with_priority(priority)),
                );
            }
        }
    }

    let prefix = prefix.to_lowercase();
    items.retain(|item| item.label.to_lowercase().starts_with(&prefix));
    items.sort_by(|a, b| {
        a.sort_priority
            .cmp(&b.sort_priority)
            .then_with(|| a.label.cmp(&b.label))
    });

    // Deduplicate by label, keeping the closest definition
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.label.clone()));
    items
}

fn keywords(words: &[&str], kind: CompletionKind) -> Vec<CompletionItem> {
    words
        .iter()
        .enumerate()
        .map(|(i, word)| CompletionItem::new(*word, kind).with_priority(40 + i as u32))
        .collect()
}

/// Where in the grammar structure the cursor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    TopLevel,
    /// Inside an `options`, `tokens` or `channels` block
    Prequel,
    ParserBody,
    LexerBody,
    LexerCommand,
    Channel,
    Mode,
}

impl Place {
    fn accepts(self, kind: SymbolKind) -> bool {
        match self {
            Place::ParserBody => matches!(
                kind,
                SymbolKind::ParserRule
                    | SymbolKind::LexerRule
                    | SymbolKind::VirtualLexerToken
                    | SymbolKind::BuiltInLexerToken
            ),
            Place::LexerBody => matches!(
                kind,
                SymbolKind::LexerRule | SymbolKind::FragmentLexerToken
            ),
            Place::Channel => SymbolKind::CHANNELS.contains(&kind),
            Place::Mode => SymbolKind::MODES.contains(&kind),
            Place::TopLevel | Place::Prequel | Place::LexerCommand => false,
        }
    }
}

/// Classifies `offset` by replaying the significant tokens before it.
fn place_at(tokens: &[Token], offset: usize) -> Place {
    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|t| !t.kind.is_trivia() && u32::from(t.end()) as usize <= offset)
        .collect();

    let mut blocks = 0usize;
    let mut header: Option<bool> = None;
    let mut body: Option<bool> = None;
    let mut commands = false;
    for token in &significant {
        match token.kind {
            SyntaxKind::OPTIONS_KW | SyntaxKind::TOKENS_KW | SyntaxKind::CHANNELS_KW => blocks += 1,
            SyntaxKind::R_BRACE => blocks = blocks.saturating_sub(1),
            _ if blocks > 0 => {}
            SyntaxKind::SEMI => {
                header = None;
                body = None;
                commands = false;
            }
            SyntaxKind::TOKEN_REF | SyntaxKind::RULE_REF | SyntaxKind::FRAGMENT_KW
                if body.is_none() && header.is_none() =>
            {
                header = Some(token.kind != SyntaxKind::RULE_REF);
            }
            SyntaxKind::COLON if body.is_none() => body = Some(header.take().unwrap_or(false)),
            SyntaxKind::ARROW if body == Some(true) => commands = true,
            SyntaxKind::PIPE => commands = false,
            _ => {}
        }
    }

    if blocks > 0 {
        return Place::Prequel;
    }
    match body {
        None => Place::TopLevel,
        Some(_) if commands => match significant.as_slice() {
            [.., command, last] if last.kind == SyntaxKind::L_PAREN => match command.text {
                "channel" => Place::Channel,
                "mode" | "pushMode" => Place::Mode,
                _ => Place::LexerBody,
            },
            _ => Place::LexerCommand,
        },
        Some(true) => Place::LexerBody,
        Some(false) => Place::ParserBody,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const GRAMMAR: &str = "grammar T;\nchannels { COMMENTS }\nexpr: term;\nterm: ID;\nID: Letter+;\nfragment Letter: [a-z];\nmode Inside;\nX: 'x';\n";

    fn labels(source: &str, row: u32, column: u32) -> Vec<String> {
        let context = GrammarContext::new("T.g4", source);
        completions(&context, &[], Position::new(row, column))
            .into_iter()
            .map(|item| item.label.to_string())
            .collect()
    }

    #[rstest]
    #[case("grammar T;\n\n", 2, 0, "grammar")]
    #[case("grammar T;\nr: a;\nfr", 3, 2, "fragment")]
    fn test_top_level_keywords(
        #[case] source: &str,
        #[case] row: u32,
        #[case] column: u32,
        #[case] expected: &str,
    ) {
        assert!(labels(source, row, column).contains(&expected.to_string()));
    }

    #[test]
    fn test_parser_body_offers_rules_and_tokens() {
        let source = format!("{GRAMMAR}s: ");
        let items = labels(&source, 9, 3);
        assert!(items.contains(&"expr".to_string()));
        assert!(items.contains(&"ID".to_string()));
        assert!(items.contains(&"EOF".to_string()));
        assert!(!items.contains(&"Letter".to_string()));
        assert!(!items.contains(&"grammar".to_string()));
    }

    #[test]
    fn test_prefix_filters_candidates() {
        let source = format!("{GRAMMAR}s: te");
        assert_eq!(labels(&source, 9, 5), vec!["term".to_string()]);
    }

    #[test]
    fn test_lexer_body_offers_fragments() {
        let source = format!("{GRAMMAR}Y: Le");
        assert_eq!(labels(&source, 9, 5), vec!["Letter".to_string()]);
    }

    #[test]
    fn test_lexer_command_arguments() {
        let source = format!("{GRAMMAR}WS: ' ' -> channel(");
        let items = labels(&source, 9, 19);
        assert!(items.contains(&"COMMENTS".to_string()));
        assert!(items.contains(&"HIDDEN".to_string()));

        let source = format!("{GRAMMAR}WS: ' ' -> pushMode(");
        let items = labels(&source, 9, 20);
        assert_eq!(items, vec!["Inside".to_string(), "DEFAULT_MODE".to_string()]);

        let source = format!("{GRAMMAR}WS: ' ' -> s");
        assert_eq!(labels(&source, 9, 12), vec!["skip".to_string()]);
    }

    #[test]
    fn test_completion_kind_to_lsp() {
        assert_eq!(CompletionKind::Keyword.to_lsp(), 14);
        assert_eq!(CompletionKind::ParserRule.to_lsp(), 3);
    }

    #[test]
    fn test_out_of_range_position() {
        assert!(labels("grammar T;", 40, 0).is_empty());
    }
}
