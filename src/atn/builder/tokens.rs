//! Token type assignment.
//!
//! Types are handed out in definition order starting at 1. A lexer rule whose
//! only alternative is a single string literal (`PLUS: '+';`) makes that literal
//! an alias of its token type.

use indexmap::IndexMap;

use crate::atn::model::{MIN_USER_TOKEN_TYPE, TOKEN_EOF, TOKEN_INVALID, Vocabulary};

#[derive(Debug, Clone, Default)]
pub(crate) struct TokenTypes {
    by_name: IndexMap<String, i32>,
    by_literal: IndexMap<String, i32>,
    literal_names: Vec<Option<String>>,
    symbolic_names: Vec<Option<String>>,
}

impl TokenTypes {
    pub fn new() -> Self {
        Self {
            literal_names: vec![None],
            symbolic_names: vec![None],
            ..Self::default()
        }
    }

    /// Starts from an existing vocabulary (`tokenVocab`).
    pub fn from_vocabulary(vocabulary: &Vocabulary) -> Self {
        let mut types = Self::new();
        let max = vocabulary.max_token_type();
        for token_type in MIN_USER_TOKEN_TYPE..=max {
            types.ensure_slot(token_type);
            if let Some(name) = vocabulary.symbolic_name(token_type) {
                types.by_name.entry(name.to_string()).or_insert(token_type);
                types.symbolic_names[token_type as usize] = Some(name.to_string());
            }
            if let Some(literal) = vocabulary.literal_name(token_type) {
                types.by_literal.entry(literal.to_string()).or_insert(token_type);
                types.literal_names[token_type as usize] = Some(literal.to_string());
            }
        }
        types
    }

    fn ensure_slot(&mut self, token_type: i32) {
        let needed = token_type as usize + 1;
        if self.literal_names.len() < needed {
            self.literal_names.resize(needed, None);
            self.symbolic_names.resize(needed, None);
        }
    }

    pub fn max_token_type(&self) -> i32 {
        self.literal_names.len() as i32 - 1
    }

    fn next_type(&mut self) -> i32 {
        let token_type = (self.max_token_type() + 1).max(MIN_USER_TOKEN_TYPE);
        self.ensure_slot(token_type);
        token_type
    }

    /// Defines a named token if it is not known yet and returns its type.
    pub fn define_name(&mut self, name: &str) -> i32 {
        if let Some(existing) = self.by_name.get(name) {
            return *existing;
        }
        let token_type = self.next_type();
        self.by_name.insert(name.to_string(), token_type);
        self.symbolic_names[token_type as usize] = Some(name.to_string());
        token_type
    }

    /// Defines an implicit token (`T__0`) for a literal: named, but without a
    /// symbolic name in the vocabulary.
    pub fn define_implicit(&mut self, name: &str, literal: &str) -> i32 {
        let token_type = self.next_type();
        self.by_name.insert(name.to_string(), token_type);
        self.alias_literal(literal, token_type);
        token_type
    }

    /// Makes `literal` an alias of `token_type` unless the literal already has one.
    pub fn alias_literal(&mut self, literal: &str, token_type: i32) {
        if self.by_literal.contains_key(literal) || token_type < MIN_USER_TOKEN_TYPE {
            return;
        }
        self.ensure_slot(token_type);
        self.by_literal.insert(literal.to_string(), token_type);
        self.literal_names[token_type as usize] = Some(literal.to_string());
    }

    pub fn name_type(&self, name: &str) -> Option<i32> {
        if name == "EOF" {
            return Some(TOKEN_EOF);
        }
        self.by_name.get(name).copied()
    }

    pub fn literal_type(&self, literal: &str) -> Option<i32> {
        self.by_literal.get(literal).copied()
    }

    /// Type of a token reference or literal, `0` when unknown.
    pub fn type_of(&self, text: &str) -> i32 {
        let found = if text.starts_with('\'') {
            self.literal_type(text)
        } else {
            self.name_type(text)
        };
        found.unwrap_or(TOKEN_INVALID)
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(self.literal_names.clone(), self.symbolic_names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_are_sequential_and_stable() {
        let mut types = TokenTypes::new();
        assert_eq!(types.define_name("A"), 1);
        assert_eq!(types.define_implicit("T__0", "'x'"), 2);
        assert_eq!(types.define_name("A"), 1);
        types.alias_literal("'a'", 1);
        assert_eq!(types.type_of("'a'"), 1);
        assert_eq!(types.type_of("'x'"), 2);
        assert_eq!(types.type_of("T__0"), 2);
        assert_eq!(types.type_of("EOF"), TOKEN_EOF);
        assert_eq!(types.type_of("Nope"), TOKEN_INVALID);

        let vocabulary = types.vocabulary();
        assert_eq!(vocabulary.symbolic_name(2), None);
        assert_eq!(vocabulary.literal_name(2), Some("'x'"));
        assert_eq!(vocabulary.max_token_type(), 2);
    }

    #[test]
    fn test_from_vocabulary_continues_numbering() {
        let vocabulary = Vocabulary::new(
            vec![None, Some("'+'".into())],
            vec![None, Some("PLUS".into()), Some("ID".into())],
        );
        let mut types = TokenTypes::from_vocabulary(&vocabulary);
        assert_eq!(types.type_of("ID"), 2);
        assert_eq!(types.type_of("'+'"), 1);
        assert_eq!(types.define_name("NEW"), 3);
    }
}
