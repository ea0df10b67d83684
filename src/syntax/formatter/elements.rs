//! Splitting of the token stream into top-level elements
//!
//! Elements are the unit of formatting, of directive scoping and of range
//! formatting. An element owns its significant tokens (comments inside it
//! included) plus an optional comment on the same line after its end.

use tokio_util::sync::CancellationToken;

use crate::parser::{SyntaxKind, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ElementKind {
    Comment,
    /// `grammar X;` with its optional `lexer`/`parser` prefix
    Declaration,
    /// `options {...}`, `tokens {...}` or `channels {...}`
    Block,
    /// `import ...;` or `mode ...;`
    Statement,
    NamedAction,
    Rule,
    Other,
}

#[derive(Debug, Clone)]
pub(super) struct Element {
    pub kind: ElementKind,
    /// Indices of the non-whitespace tokens, in order
    pub tokens: Vec<usize>,
    pub trailing_comment: Option<usize>,
    /// Byte range in the source, trailing comment included
    pub start: usize,
    pub end: usize,
    pub blank_lines_before: usize,
    /// False when the element ends before its terminator or contains bad tokens
    pub complete: bool,
}

pub(super) fn is_comment(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::LINE_COMMENT | SyntaxKind::BLOCK_COMMENT | SyntaxKind::DOC_COMMENT
    )
}

pub(super) fn start_of(token: &Token) -> usize {
    u32::from(token.offset) as usize
}

pub(super) fn end_of(token: &Token) -> usize {
    u32::from(token.end()) as usize
}

/// Kinds that always begin a new top-level element.
fn starts_element(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::GRAMMAR_KW
            | SyntaxKind::IMPORT_KW
            | SyntaxKind::MODE_KW
            | SyntaxKind::FRAGMENT_KW
            | SyntaxKind::AT
    )
}

/// Splits `tokens` into elements. Returns `None` if cancelled.
pub(super) fn split_elements(
    tokens: &[Token],
    cancel: &CancellationToken,
) -> Option<Vec<Element>> {
    let mut elements: Vec<Element> = Vec::new();
    let mut newlines = 0;
    let mut index = 0;

    while index < tokens.len() {
        if cancel.is_cancelled() {
            return None;
        }
        let token = &tokens[index];
        if token.kind == SyntaxKind::WHITESPACE {
            newlines += token.text.matches('\n').count();
            index += 1;
            continue;
        }

        let (kind, scan) = match token.kind {
            kind if is_comment(kind) => (
                ElementKind::Comment,
                Scan {
                    members: vec![index],
                    next: index + 1,
                    complete: true,
                },
            ),
            SyntaxKind::GRAMMAR_KW | SyntaxKind::LEXER_KW | SyntaxKind::PARSER_KW => (
                ElementKind::Declaration,
                scan_until(tokens, index, SyntaxKind::SEMI, |kind| {
                    kind != SyntaxKind::GRAMMAR_KW && starts_element(kind)
                }),
            ),
            SyntaxKind::OPTIONS_KW | SyntaxKind::TOKENS_KW | SyntaxKind::CHANNELS_KW => (
                ElementKind::Block,
                scan_until(tokens, index, SyntaxKind::R_BRACE, |kind| {
                    starts_element(kind)
                        || matches!(kind, SyntaxKind::COLON | SyntaxKind::PIPE)
                }),
            ),
            SyntaxKind::IMPORT_KW | SyntaxKind::MODE_KW => (
                ElementKind::Statement,
                scan_until(tokens, index, SyntaxKind::SEMI, starts_element),
            ),
            SyntaxKind::AT => (
                ElementKind::NamedAction,
                scan_until(tokens, index, SyntaxKind::ACTION_BLOCK, |kind| {
                    !matches!(
                        kind,
                        SyntaxKind::TOKEN_REF
                            | SyntaxKind::RULE_REF
                            | SyntaxKind::COLON_COLON
                            | SyntaxKind::LEXER_KW
                            | SyntaxKind::PARSER_KW
                    ) && !is_comment(kind)
                }),
            ),
            SyntaxKind::FRAGMENT_KW | SyntaxKind::TOKEN_REF | SyntaxKind::RULE_REF => {
                (ElementKind::Rule, scan_rule(tokens, index))
            }
            _ => (
                ElementKind::Other,
                Scan {
                    members: vec![index],
                    next: index + 1,
                    complete: false,
                },
            ),
        };

        let Scan {
            members,
            mut next,
            complete,
        } = scan;
        let trailing_comment = if kind == ElementKind::Comment {
            None
        } else {
            same_line_comment(tokens, next)
        };
        if let Some(comment) = trailing_comment {
            next = comment + 1;
        }

        let start = start_of(&tokens[members[0]]);
        let last = trailing_comment.or(members.last().copied()).unwrap_or(index);
        let complete = complete
            && members
                .iter()
                .all(|&member| tokens[member].kind != SyntaxKind::ERROR);
        elements.push(Element {
            kind,
            blank_lines_before: if elements.is_empty() {
                0
            } else {
                newlines.saturating_sub(1)
            },
            tokens: members,
            trailing_comment,
            start,
            end: end_of(&tokens[last]),
            complete,
        });
        newlines = 0;
        index = next;
    }

    Some(elements)
}

struct Scan {
    members: Vec<usize>,
    next: usize,
    complete: bool,
}

/// Collects tokens up to and including the first token of kind `end`. Stops
/// early, before the offending token, when `stop` accepts a token kind.
fn scan_until(
    tokens: &[Token],
    start: usize,
    end: SyntaxKind,
    stop: impl Fn(SyntaxKind) -> bool,
) -> Scan {
    let mut members = vec![start];
    let mut index = start + 1;
    while index < tokens.len() {
        let kind = tokens[index].kind;
        if kind != SyntaxKind::WHITESPACE {
            if kind == end {
                members.push(index);
                return Scan {
                    members,
                    next: index + 1,
                    complete: true,
                };
            }
            if stop(kind) {
                break;
            }
            members.push(index);
        }
        index += 1;
    }
    Scan {
        members,
        next: index,
        complete: false,
    }
}

/// Collects a rule up to its terminating semicolon plus any exception handlers.
fn scan_rule(tokens: &[Token], start: usize) -> Scan {
    let mut members = vec![start];
    let mut parens = 0i32;
    let mut braces = 0i32;
    let mut index = start + 1;
    let mut complete = false;

    while index < tokens.len() {
        let kind = tokens[index].kind;
        index += 1;
        match kind {
            SyntaxKind::WHITESPACE => continue,
            SyntaxKind::L_PAREN => parens += 1,
            SyntaxKind::R_PAREN => parens -= 1,
            SyntaxKind::OPTIONS_KW | SyntaxKind::TOKENS_KW | SyntaxKind::CHANNELS_KW => {
                braces += 1
            }
            SyntaxKind::R_BRACE => braces -= 1,
            SyntaxKind::GRAMMAR_KW | SyntaxKind::IMPORT_KW | SyntaxKind::MODE_KW
                if parens <= 0 && braces <= 0 =>
            {
                index -= 1;
                break;
            }
            _ => {}
        }
        members.push(index - 1);
        if kind == SyntaxKind::SEMI && parens <= 0 && braces <= 0 {
            complete = true;
            break;
        }
    }

    if complete {
        index = scan_handlers(tokens, index, &mut members);
    }
    Scan {
        members,
        next: index,
        complete,
    }
}

/// Appends `catch [...] {...}` and `finally {...}` handlers following a rule.
fn scan_handlers(tokens: &[Token], mut index: usize, members: &mut Vec<usize>) -> usize {
    loop {
        let Some(keyword) = next_significant(tokens, index) else {
            return index;
        };
        let shape: &[SyntaxKind] = match tokens[keyword].kind {
            SyntaxKind::CATCH_KW => &[SyntaxKind::BRACKET_BLOCK, SyntaxKind::ACTION_BLOCK],
            SyntaxKind::FINALLY_KW => &[SyntaxKind::ACTION_BLOCK],
            _ => return index,
        };
        let mut handler = vec![keyword];
        let mut cursor = keyword + 1;
        for expected in shape {
            match next_significant(tokens, cursor) {
                Some(found) if tokens[found].kind == *expected => {
                    handler.push(found);
                    cursor = found + 1;
                }
                _ => return index,
            }
        }
        members.extend(handler);
        index = cursor;
    }
}

fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&index| tokens[index].kind != SyntaxKind::WHITESPACE)
}

/// A comment starting on the same line right after `index`, if any.
fn same_line_comment(tokens: &[Token], index: usize) -> Option<usize> {
    let mut candidate = index;
    if let Some(token) = tokens.get(index) {
        if token.kind == SyntaxKind::WHITESPACE {
            if token.text.contains('\n') {
                return None;
            }
            candidate += 1;
        }
    }
    let token = tokens.get(candidate)?;
    let single_line = match token.kind {
        SyntaxKind::LINE_COMMENT => true,
        SyntaxKind::BLOCK_COMMENT | SyntaxKind::DOC_COMMENT => !token.text.contains('\n'),
        _ => false,
    };
    single_line.then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    fn kinds(source: &str) -> Vec<(ElementKind, usize, bool)> {
        let tokens = tokenize(source);
        split_elements(&tokens, &CancellationToken::new())
            .unwrap()
            .into_iter()
            .map(|e| (e.kind, e.blank_lines_before, e.complete))
            .collect()
    }

    #[test]
    fn test_top_level_elements() {
        let source = "grammar T;\noptions { a = b; }\n\n\n// note\nimport A;\n@header {x}\nr: (a | b) ;\n";
        assert_eq!(
            kinds(source),
            vec![
                (ElementKind::Declaration, 0, true),
                (ElementKind::Block, 0, true),
                (ElementKind::Comment, 2, true),
                (ElementKind::Statement, 0, true),
                (ElementKind::NamedAction, 0, true),
                (ElementKind::Rule, 0, true),
            ]
        );
    }

    #[test]
    fn test_rule_ends_at_outer_semicolon() {
        let source = "r options { k = v; } : a ;\ns: b;";
        let tokens = tokenize(source);
        let elements = split_elements(&tokens, &CancellationToken::new()).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(&source[elements[0].start..elements[0].end], "r options { k = v; } : a ;");
    }

    #[test]
    fn test_trailing_comment_and_handlers() {
        let source = "r: a; catch [E e] {x} finally {y} // done\n// own line\n";
        let tokens = tokenize(source);
        let elements = split_elements(&tokens, &CancellationToken::new()).unwrap();
        assert_eq!(elements.len(), 2);
        assert!(elements[0].trailing_comment.is_some());
        assert_eq!(
            &source[elements[0].start..elements[0].end],
            "r: a; catch [E e] {x} finally {y} // done"
        );
        assert_eq!(elements[1].kind, ElementKind::Comment);
    }

    #[test]
    fn test_unterminated_rule_is_incomplete() {
        assert_eq!(
            kinds("grammar T;\nr: a\nmode M;\n"),
            vec![
                (ElementKind::Declaration, 0, true),
                (ElementKind::Rule, 0, false),
                (ElementKind::Statement, 0, true),
            ]
        );
    }

    #[test]
    fn test_cancelled_split() {
        let tokens = tokenize("grammar T;");
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(split_elements(&tokens, &cancel).is_none());
    }
}
