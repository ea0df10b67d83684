//! Decoding of grammar string literals and lexer character sets.

use std::iter::Peekable;
use std::str::Chars;

use crate::atn::interval_set::IntervalSet;

/// Code points of a quoted string literal such as `'a\n'` or `'A'`.
pub(crate) fn literal_code_points(text: &str) -> Vec<i32> {
    let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text);
    let mut chars = inner.chars().peekable();
    let mut result = Vec::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(code) = read_escape(&mut chars) {
                result.push(code);
            }
        } else {
            result.push(c as i32);
        }
    }
    result
}

/// The set described by a lexer character set such as `[a-zA-Z_\-]`.
pub(crate) fn char_set(text: &str) -> IntervalSet {
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text);
    let mut chars = inner.chars().peekable();
    let mut set = IntervalSet::new();
    let mut previous: Option<i32> = None;
    while let Some(c) = chars.next() {
        let code = match c {
            '\\' => match read_escape(&mut chars) {
                Some(code) => code,
                None => continue,
            },
            '-' if previous.is_some() && chars.peek().is_some() => {
                let Some(start) = previous.take() else {
                    continue;
                };
                let stop = match chars.next() {
                    Some('\\') => read_escape(&mut chars),
                    Some(c) => Some(c as i32),
                    None => None,
                };
                if let Some(stop) = stop {
                    set.add_range(start, stop);
                }
                continue;
            }
            c => c as i32,
        };
        set.add(code);
        previous = Some(code);
    }
    set
}

/// Reads the escape sequence after a backslash. Unicode property escapes
/// (`\p{...}`) are skipped.
fn read_escape(chars: &mut Peekable<Chars<'_>>) -> Option<i32> {
    let c = chars.next()?;
    let code = match c {
        'n' => '\n' as i32,
        'r' => '\r' as i32,
        't' => '\t' as i32,
        'b' => 0x08,
        'f' => 0x0C,
        'u' => {
            if chars.peek() == Some(&'{') {
                chars.next();
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                i32::from_str_radix(&hex, 16).ok()?
            } else {
                let hex: String = chars.by_ref().take(4).collect();
                i32::from_str_radix(&hex, 16).ok()?
            }
        }
        'p' | 'P' => {
            if chars.peek() == Some(&'{') {
                chars.by_ref().take_while(|c| *c != '}').for_each(drop);
            }
            return None;
        }
        other => other as i32,
    };
    Some(code)
}
