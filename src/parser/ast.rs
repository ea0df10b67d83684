//! Typed AST wrappers over the untyped rowan CST.
//!
//! Each struct wraps a SyntaxNode and provides methods to access children.

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};
use rowan::TextRange;

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;

    /// Range of the node without surrounding trivia
    fn range(&self) -> TextRange {
        self.syntax().text_range()
    }
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

macro_rules! first_child_method {
    ($method:ident, $ty:ident) => {
        pub fn $method(&self) -> Option<$ty> {
            self.0.children().find_map($ty::cast)
        }
    };
}

/// First non-trivia token of a node that satisfies the predicate.
fn token_where(node: &SyntaxNode, pred: impl Fn(SyntaxKind) -> bool) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| pred(t.kind()))
}

/// Direct child tokens of a node, trivia excluded.
pub fn significant_tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + '_ {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia())
}

/// First and last non-trivia tokens anywhere below a node.
pub fn token_bounds(node: &SyntaxNode) -> Option<(SyntaxToken, SyntaxToken)> {
    let mut tokens = node
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia());
    let first = tokens.next()?;
    let last = tokens.last().unwrap_or_else(|| first.clone());
    Some((first, last))
}

// ============================================================================
// Root
// ============================================================================

/// The kind of a grammar, from its declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GrammarType {
    Lexer,
    Parser,
    #[default]
    Combined,
}

ast_node!(GrammarFile, GRAMMAR_FILE);

impl GrammarFile {
    pub(crate) fn from_root(node: SyntaxNode) -> Self {
        Self(node)
    }

    first_child_method!(decl, GrammarDecl);

    pub fn grammar_type(&self) -> GrammarType {
        self.decl().map(|d| d.grammar_type()).unwrap_or_default()
    }

    pub fn name(&self) -> Option<String> {
        self.decl()?.name().map(|t| t.text().to_string())
    }

    /// Top-level members in source order
    pub fn members(&self) -> impl Iterator<Item = Member> + '_ {
        self.0.children().filter_map(Member::cast)
    }

    pub fn options_specs(&self) -> impl Iterator<Item = OptionsSpec> + '_ {
        self.0.children().filter_map(OptionsSpec::cast)
    }

    pub fn imports(&self) -> impl Iterator<Item = ImportSpec> + '_ {
        self.0.children().filter_map(ImportSpec::cast)
    }

    pub fn tokens_specs(&self) -> impl Iterator<Item = TokensSpec> + '_ {
        self.0.children().filter_map(TokensSpec::cast)
    }

    pub fn channels_specs(&self) -> impl Iterator<Item = ChannelsSpec> + '_ {
        self.0.children().filter_map(ChannelsSpec::cast)
    }

    pub fn named_actions(&self) -> impl Iterator<Item = NamedAction> + '_ {
        self.0.children().filter_map(NamedAction::cast)
    }

    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.0.children().filter_map(Rule::cast)
    }

    /// Value of a grammar level option (`options { key = value; }`)
    pub fn option_value(&self, key: &str) -> Option<String> {
        self.options_specs()
            .flat_map(|spec| spec.options().collect::<Vec<_>>())
            .find(|o| o.name().is_some_and(|n| n.text() == key))
            .and_then(|o| o.value_text())
    }

    /// Rules paired with the lexer mode they belong to (`None` for the default mode)
    pub fn rules_with_modes(&self) -> Vec<(Rule, Option<SyntaxToken>)> {
        let mut mode = None;
        let mut result = Vec::new();
        for member in self.members() {
            match member {
                Member::Mode(spec) => mode = spec.name(),
                Member::Rule(rule) => result.push((rule, mode.clone())),
                _ => {}
            }
        }
        result
    }

    /// Names of grammars this one depends on: imports (aliased imports use the
    /// right-hand name) and `tokenVocab`, in source order without duplicates.
    pub fn dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for member in self.members() {
            let found: Vec<String> = match member {
                Member::Import(spec) => spec
                    .delegates()
                    .filter_map(|d| d.grammar().map(|t| t.text().to_string()))
                    .collect(),
                Member::Options(spec) => spec
                    .options()
                    .filter(|o| o.name().is_some_and(|n| n.text() == "tokenVocab"))
                    .filter_map(|o| o.value_text())
                    .collect(),
                _ => Vec::new(),
            };
            for name in found {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

// ============================================================================
// Top-level members
// ============================================================================

/// Any top-level element of a grammar file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Member {
    Decl(GrammarDecl),
    Options(OptionsSpec),
    Tokens(TokensSpec),
    Channels(ChannelsSpec),
    Import(ImportSpec),
    Action(NamedAction),
    Mode(ModeSpec),
    Rule(Rule),
}

impl AstNode for Member {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::GRAMMAR_DECL
                | SyntaxKind::OPTIONS_SPEC
                | SyntaxKind::TOKENS_SPEC
                | SyntaxKind::CHANNELS_SPEC
                | SyntaxKind::IMPORT_SPEC
                | SyntaxKind::NAMED_ACTION
                | SyntaxKind::MODE_SPEC
        ) || Rule::can_cast(kind)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::GRAMMAR_DECL => Some(Self::Decl(GrammarDecl(node))),
            SyntaxKind::OPTIONS_SPEC => Some(Self::Options(OptionsSpec(node))),
            SyntaxKind::TOKENS_SPEC => Some(Self::Tokens(TokensSpec(node))),
            SyntaxKind::CHANNELS_SPEC => Some(Self::Channels(ChannelsSpec(node))),
            SyntaxKind::IMPORT_SPEC => Some(Self::Import(ImportSpec(node))),
            SyntaxKind::NAMED_ACTION => Some(Self::Action(NamedAction(node))),
            SyntaxKind::MODE_SPEC => Some(Self::Mode(ModeSpec(node))),
            _ => Rule::cast(node).map(Self::Rule),
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Decl(n) => n.syntax(),
            Self::Options(n) => n.syntax(),
            Self::Tokens(n) => n.syntax(),
            Self::Channels(n) => n.syntax(),
            Self::Import(n) => n.syntax(),
            Self::Action(n) => n.syntax(),
            Self::Mode(n) => n.syntax(),
            Self::Rule(n) => n.syntax(),
        }
    }
}

ast_node!(GrammarDecl, GRAMMAR_DECL);

impl GrammarDecl {
    pub fn grammar_type(&self) -> GrammarType {
        match token_where(&self.0, |k| !k.is_trivia()).map(|t| t.kind()) {
            Some(SyntaxKind::LEXER_KW) => GrammarType::Lexer,
            Some(SyntaxKind::PARSER_KW) => GrammarType::Parser,
            _ => GrammarType::Combined,
        }
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_ident)
    }
}

ast_node!(OptionsSpec, OPTIONS_SPEC);

impl OptionsSpec {
    pub fn options(&self) -> impl Iterator<Item = OptionEntry> + '_ {
        self.0.children().filter_map(OptionEntry::cast)
    }
}

ast_node!(OptionEntry, OPTION);

impl OptionEntry {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_ident)
    }

    pub fn value(&self) -> Option<SyntaxNode> {
        self.0.children().find(|n| n.kind() == SyntaxKind::OPTION_VALUE)
    }

    /// Option value with trivia removed (`a . b` reads as `a.b`)
    pub fn value_text(&self) -> Option<String> {
        let value = self.value()?;
        let text: String = value
            .descendants_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| !t.kind().is_trivia())
            .map(|t| t.text().to_string())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

ast_node!(TokensSpec, TOKENS_SPEC);

impl TokensSpec {
    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        significant_tokens(&self.0).filter(|t| t.kind().is_ident())
    }
}

ast_node!(ChannelsSpec, CHANNELS_SPEC);

impl ChannelsSpec {
    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        significant_tokens(&self.0).filter(|t| t.kind().is_ident())
    }
}

ast_node!(ImportSpec, IMPORT_SPEC);

impl ImportSpec {
    pub fn delegates(&self) -> impl Iterator<Item = DelegateGrammar> + '_ {
        self.0.children().filter_map(DelegateGrammar::cast)
    }
}

ast_node!(DelegateGrammar, DELEGATE_GRAMMAR);

impl DelegateGrammar {
    /// The imported grammar: `Y` in both `import Y;` and `import X = Y;`
    pub fn grammar(&self) -> Option<SyntaxToken> {
        significant_tokens(&self.0)
            .filter(|t| t.kind().is_ident())
            .last()
    }

    pub fn alias(&self) -> Option<SyntaxToken> {
        let mut idents = significant_tokens(&self.0).filter(|t| t.kind().is_ident());
        let first = idents.next()?;
        idents.next().map(|_| first)
    }
}

ast_node!(NamedAction, NAMED_ACTION);

impl NamedAction {
    /// `lexer` in `@lexer::members {...}`
    pub fn scope(&self) -> Option<SyntaxToken> {
        let tokens: Vec<_> = significant_tokens(&self.0).collect();
        let pos = tokens.iter().position(|t| t.kind() == SyntaxKind::COLON_COLON)?;
        pos.checked_sub(1).map(|i| tokens[i].clone())
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        significant_tokens(&self.0)
            .filter(|t| t.kind().is_ident())
            .last()
    }

    pub fn action(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| k == SyntaxKind::ACTION_BLOCK)
    }
}

ast_node!(RuleAction, RULE_ACTION);

impl RuleAction {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_ident)
    }

    pub fn action(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| k == SyntaxKind::ACTION_BLOCK)
    }
}

ast_node!(ModeSpec, MODE_SPEC);

impl ModeSpec {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_ident)
    }
}

// ============================================================================
// Rules
// ============================================================================

/// A parser or lexer rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    Parser(ParserRule),
    Lexer(LexerRule),
}

impl AstNode for Rule {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::PARSER_RULE | SyntaxKind::LEXER_RULE)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::PARSER_RULE => Some(Self::Parser(ParserRule(node))),
            SyntaxKind::LEXER_RULE => Some(Self::Lexer(LexerRule(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Parser(n) => n.syntax(),
            Self::Lexer(n) => n.syntax(),
        }
    }
}

impl Rule {
    pub fn name(&self) -> Option<SyntaxToken> {
        match self {
            Self::Parser(r) => r.name(),
            Self::Lexer(r) => r.name(),
        }
    }

    pub fn alt_list(&self) -> Option<AltList> {
        match self {
            Self::Parser(r) => r.alt_list(),
            Self::Lexer(r) => r.alt_list(),
        }
    }

    pub fn is_lexer(&self) -> bool {
        matches!(self, Self::Lexer(_))
    }

    /// Text of the doc comment directly preceding the rule, if any
    pub fn doc_comment(&self) -> Option<String> {
        let mut sibling = self.syntax().prev_sibling_or_token();
        while let Some(element) = sibling {
            match element.kind() {
                SyntaxKind::WHITESPACE => sibling = element.prev_sibling_or_token(),
                SyntaxKind::DOC_COMMENT => {
                    return element.into_token().map(|t| t.text().to_string());
                }
                _ => return None,
            }
        }
        None
    }
}

ast_node!(ParserRule, PARSER_RULE);

impl ParserRule {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| k == SyntaxKind::RULE_REF)
    }

    first_child_method!(alt_list, AltList);
    first_child_method!(options, OptionsSpec);

    pub fn rule_actions(&self) -> impl Iterator<Item = RuleAction> + '_ {
        self.0.children().filter_map(RuleAction::cast)
    }

    /// The `[...]` argument, `returns [...]` and `locals [...]` nodes
    pub fn argument_nodes(&self) -> impl Iterator<Item = SyntaxNode> + '_ {
        self.0.children().filter(|n| {
            matches!(
                n.kind(),
                SyntaxKind::ARG_ACTION | SyntaxKind::RULE_RETURNS | SyntaxKind::LOCALS
            )
        })
    }

    /// Action blocks of `catch [...] {...}` and `finally {...}` clauses
    pub fn exception_actions(&self) -> Vec<SyntaxToken> {
        self.0
            .children()
            .filter(|n| n.kind() == SyntaxKind::EXCEPTION_GROUP)
            .flat_map(|n| {
                significant_tokens(&n)
                    .filter(|t| t.kind() == SyntaxKind::ACTION_BLOCK)
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

ast_node!(LexerRule, LEXER_RULE);

impl LexerRule {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_ident)
    }

    pub fn is_fragment(&self) -> bool {
        token_where(&self.0, |k| k == SyntaxKind::FRAGMENT_KW).is_some()
    }

    first_child_method!(alt_list, AltList);
}

// ============================================================================
// Alternatives
// ============================================================================

ast_node!(AltList, ALT_LIST);

impl AltList {
    pub fn alternatives(&self) -> impl Iterator<Item = Alternative> + '_ {
        self.0.children().filter_map(Alternative::cast)
    }
}

ast_node!(Alternative, ALTERNATIVE);

impl Alternative {
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.0.children().filter_map(Element::cast)
    }

    pub fn label(&self) -> Option<SyntaxToken> {
        let label = self.0.children().find(|n| n.kind() == SyntaxKind::ALT_LABEL)?;
        token_where(&label, SyntaxKind::is_ident)
    }

    /// Alternative option such as `<assoc=right>`
    pub fn option(&self, key: &str) -> Option<String> {
        option_below(&self.0, key)
    }

    pub fn lexer_commands(&self) -> impl Iterator<Item = LexerCommand> + '_ {
        self.0
            .children()
            .filter(|n| n.kind() == SyntaxKind::LEXER_COMMANDS)
            .flat_map(|n| n.children().filter_map(LexerCommand::cast).collect::<Vec<_>>())
    }
}

ast_node!(LexerCommand, LEXER_COMMAND);

impl LexerCommand {
    pub fn name(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| k.is_ident() || k == SyntaxKind::MODE_KW)
    }

    pub fn argument(&self) -> Option<SyntaxToken> {
        significant_tokens(&self.0)
            .skip_while(|t| t.kind() != SyntaxKind::L_PAREN)
            .nth(1)
            .filter(|t| t.kind().is_ident() || t.kind() == SyntaxKind::INT)
    }
}

// ============================================================================
// Elements
// ============================================================================

/// EBNF suffix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EbnfOp {
    Optional,
    ZeroOrMore,
    OneOrMore,
}

/// One element of an alternative
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Labeled(SyntaxNode),
    Terminal(SyntaxNode),
    RuleRef(SyntaxNode),
    CharRange(SyntaxNode),
    NotSet(SyntaxNode),
    Wildcard(SyntaxNode),
    CharSet(SyntaxNode),
    Block(SyntaxNode),
    Action(SyntaxNode),
    Predicate(SyntaxNode),
    Ebnf(SyntaxNode),
}

impl AstNode for Element {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::LABELED_ELEMENT
                | SyntaxKind::TERMINAL
                | SyntaxKind::RULE_REF_ELEMENT
                | SyntaxKind::CHAR_RANGE
                | SyntaxKind::NOT_SET
                | SyntaxKind::WILDCARD
                | SyntaxKind::LEXER_CHAR_SET
                | SyntaxKind::BLOCK
                | SyntaxKind::ACTION_ELEMENT
                | SyntaxKind::PREDICATE
                | SyntaxKind::EBNF
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        let element = match node.kind() {
            SyntaxKind::LABELED_ELEMENT => Self::Labeled(node),
            SyntaxKind::TERMINAL => Self::Terminal(node),
            SyntaxKind::RULE_REF_ELEMENT => Self::RuleRef(node),
            SyntaxKind::CHAR_RANGE => Self::CharRange(node),
            SyntaxKind::NOT_SET => Self::NotSet(node),
            SyntaxKind::WILDCARD => Self::Wildcard(node),
            SyntaxKind::LEXER_CHAR_SET => Self::CharSet(node),
            SyntaxKind::BLOCK => Self::Block(node),
            SyntaxKind::ACTION_ELEMENT => Self::Action(node),
            SyntaxKind::PREDICATE => Self::Predicate(node),
            SyntaxKind::EBNF => Self::Ebnf(node),
            _ => return None,
        };
        Some(element)
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Labeled(n)
            | Self::Terminal(n)
            | Self::RuleRef(n)
            | Self::CharRange(n)
            | Self::NotSet(n)
            | Self::Wildcard(n)
            | Self::CharSet(n)
            | Self::Block(n)
            | Self::Action(n)
            | Self::Predicate(n)
            | Self::Ebnf(n) => n,
        }
    }
}

impl Element {
    /// First significant token of the element (name, literal, bracket or action)
    pub fn main_token(&self) -> Option<SyntaxToken> {
        token_where(self.syntax(), |k| !k.is_trivia())
    }

    /// The element wrapped by a label, EBNF suffix or `~`
    pub fn inner(&self) -> Option<Element> {
        match self {
            Self::Labeled(n) | Self::Ebnf(n) | Self::NotSet(n) => n.children().find_map(Element::cast),
            _ => None,
        }
    }

    /// Label token of a labeled element
    pub fn label(&self) -> Option<SyntaxToken> {
        match self {
            Self::Labeled(n) => token_where(n, SyntaxKind::is_ident),
            _ => None,
        }
    }

    /// EBNF operator and greediness of a suffixed element
    pub fn ebnf_op(&self) -> Option<(EbnfOp, bool)> {
        let Self::Ebnf(node) = self else {
            return None;
        };
        let ops: Vec<SyntaxKind> = significant_tokens(node).map(|t| t.kind()).collect();
        let op = match ops.first()? {
            SyntaxKind::QUESTION => EbnfOp::Optional,
            SyntaxKind::STAR => EbnfOp::ZeroOrMore,
            SyntaxKind::PLUS => EbnfOp::OneOrMore,
            _ => return None,
        };
        Some((op, ops.len() < 2))
    }

    /// Alternatives of a block element
    pub fn alt_list(&self) -> Option<AltList> {
        match self {
            Self::Block(n) => n.children().find_map(AltList::cast),
            _ => None,
        }
    }

    /// Both endpoints of a `'a'..'z'` range
    pub fn range_bounds(&self) -> Option<(SyntaxToken, SyntaxToken)> {
        let Self::CharRange(node) = self else {
            return None;
        };
        let mut literals =
            significant_tokens(node).filter(|t| t.kind() == SyntaxKind::STRING_LITERAL);
        Some((literals.next()?, literals.next()?))
    }

    /// Value of an element option such as `<fail='msg'>`
    pub fn element_option(&self, key: &str) -> Option<String> {
        option_below(self.syntax(), key)
    }
}

/// Value of `key` in the `<key=value, ...>` options directly below a node.
fn option_below(node: &SyntaxNode, key: &str) -> Option<String> {
    let options = node
        .children()
        .find(|n| n.kind() == SyntaxKind::ELEMENT_OPTIONS)?;
    let tokens: Vec<_> = significant_tokens(&options).collect();
    tokens.windows(3).find_map(|w| {
        (w[0].text() == key && w[1].kind() == SyntaxKind::ASSIGN).then(|| w[2].text().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_dependency_names_from_imports_and_vocab() {
        let parse = parse(
            "parser grammar P;\noptions { tokenVocab = L; }\nimport A, B = C, A;\nr: X;",
        );
        assert!(parse.ok(), "{:?}", parse.errors);
        assert_eq!(parse.tree().dependency_names(), vec!["L", "A", "C"]);
    }

    #[test]
    fn test_grammar_types() {
        assert_eq!(parse("lexer grammar L;").tree().grammar_type(), GrammarType::Lexer);
        assert_eq!(parse("parser grammar P;").tree().grammar_type(), GrammarType::Parser);
        assert_eq!(parse("grammar G;").tree().grammar_type(), GrammarType::Combined);
        assert_eq!(parse("grammar G;").tree().name().as_deref(), Some("G"));
    }

    #[test]
    fn test_rules_with_modes() {
        let parse = parse("lexer grammar L;\nA: 'a';\nmode M;\nB: 'b';\n");
        let rules = parse.tree().rules_with_modes();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].1.is_none());
        assert_eq!(rules[1].1.as_ref().map(|t| t.text().to_string()).as_deref(), Some("M"));
    }

    #[test]
    fn test_doc_comment_attaches_to_rule() {
        let parse = parse("grammar G;\n/** The start rule. */\nstart: A;\n");
        let rule = parse.tree().rules().next().unwrap();
        assert_eq!(rule.doc_comment().as_deref(), Some("/** The start rule. */"));
    }

    #[test]
    fn test_ebnf_and_labels() {
        let parse = parse("grammar G;\nr: x=ID+? ids+=ID*;\n");
        let rule = parse.tree().rules().next().unwrap();
        let alt = rule.alt_list().unwrap().alternatives().next().unwrap();
        let elements: Vec<_> = alt.elements().collect();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].ebnf_op(), Some((EbnfOp::OneOrMore, false)));
        let labeled = elements[0].inner().unwrap();
        assert_eq!(labeled.label().unwrap().text(), "x");
        assert_eq!(elements[1].ebnf_op(), Some((EbnfOp::ZeroOrMore, true)));
    }
}
