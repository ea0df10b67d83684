//! Text manipulation utilities for working with grammar source.

/// Check if a character is considered part of a grammar identifier.
///
/// Uses Unicode Standard Annex #31 rules, as ANTLR identifiers do.
#[inline]
pub fn is_word_character(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// The word fragment immediately left of the cursor, used as a completion prefix.
///
/// Returns an empty string when the character before the cursor is not a word character.
pub fn word_prefix_before(line: &str, position: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    let end = position.min(chars.len());
    let mut start = end;
    while start > 0 && is_word_character(chars[start - 1]) {
        start -= 1;
    }
    chars[start..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("expr: ter", 9, "ter")]
    #[case("expr: ", 6, "")]
    #[case("ab", 1, "a")]
    fn test_word_prefix_before(#[case] line: &str, #[case] position: usize, #[case] expected: &str) {
        assert_eq!(word_prefix_before(line, position), expected);
    }
}
