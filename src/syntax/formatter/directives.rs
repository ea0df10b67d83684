//! `$antlr-format` directives
//!
//! A line comment of the form `// $antlr-format key value, key value` changes
//! the active options for all following elements, whether it stands alone or
//! sits inside a rule or block. `on` and `off` toggle formatting, `reset` restores the
//! options the formatter was called with.

use tracing::debug;

use crate::parser::Token;

use super::elements::{Element, is_comment};
use super::options::FormattingOptions;

const MARKER: &str = "$antlr-format";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Directive {
    On,
    Off,
    Reset,
    Set(String, String),
}

/// Options in effect for one element.
#[derive(Debug, Clone)]
pub(super) struct Settings {
    pub options: FormattingOptions,
    pub enabled: bool,
}

pub(super) fn is_directive(comment: &str) -> bool {
    parse_directives(comment).is_some()
}

/// Directives in a line comment, `None` if it is not a directive comment.
pub(super) fn parse_directives(comment: &str) -> Option<Vec<Directive>> {
    let body = comment.strip_prefix("//")?.trim_start().strip_prefix(MARKER)?;
    if body.starts_with(|c: char| !c.is_whitespace()) {
        return None;
    }
    Some(
        body.split(',')
            .filter_map(|part| {
                let mut words = part.split_whitespace();
                let key = words.next()?;
                match (key, words.next()) {
                    ("on", None) => Some(Directive::On),
                    ("off", None) => Some(Directive::Off),
                    ("reset", None) => Some(Directive::Reset),
                    (key, Some(value)) => Some(Directive::Set(key.to_string(), value.to_string())),
                    (_, None) => None,
                }
            })
            .collect(),
    )
}

/// Settings for each element. A directive takes effect from the element after
/// the one carrying it.
pub(super) fn resolve(
    elements: &[Element],
    tokens: &[Token],
    base: &FormattingOptions,
) -> Vec<Settings> {
    let mut current = Settings {
        options: base.clone(),
        enabled: true,
    };
    let mut settings = Vec::with_capacity(elements.len());
    for element in elements {
        settings.push(current.clone());
        let comments = element
            .tokens
            .iter()
            .chain(&element.trailing_comment)
            .filter(|&&index| is_comment(tokens[index].kind));
        for directive in comments.filter_map(|&index| parse_directives(tokens[index].text)).flatten() {
            match directive {
                Directive::On => current.enabled = true,
                Directive::Off => current.enabled = false,
                Directive::Reset => current.options = base.clone(),
                Directive::Set(key, value) => {
                    if !current.options.set(&key, &value) {
                        debug!(%key, %value, "ignoring unknown format directive");
                    }
                }
            }
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::parser::tokenize;
    use crate::syntax::formatter::elements::split_elements;

    fn column_limits(source: &str) -> Vec<usize> {
        let tokens = tokenize(source);
        let elements = split_elements(&tokens, &CancellationToken::new()).unwrap();
        resolve(&elements, &tokens, &FormattingOptions::default())
            .into_iter()
            .map(|settings| settings.options.column_limit)
            .collect()
    }

    #[test]
    fn test_parse_directive_list() {
        assert_eq!(
            parse_directives("// $antlr-format columnLimit 20, useTab on"),
            Some(vec![
                Directive::Set("columnLimit".into(), "20".into()),
                Directive::Set("useTab".into(), "on".into()),
            ])
        );
        assert_eq!(parse_directives("//$antlr-format off"), Some(vec![Directive::Off]));
        assert_eq!(parse_directives("// $antlr-format reset"), Some(vec![Directive::Reset]));
        assert_eq!(parse_directives("// plain comment"), None);
        assert_eq!(parse_directives("// $antlr-formatting on"), None);
    }

    #[test]
    fn test_directive_inside_rule_applies_to_later_elements() {
        let source = "grammar T;\na\n    // $antlr-format columnLimit 20\n    : 'x';\n\nb: 'y';\nc: 'z';\n";
        assert_eq!(column_limits(source), vec![100, 100, 20, 20]);
    }

    #[test]
    fn test_trailing_directive_applies_to_later_elements() {
        let source = "grammar T;\na: 'x'; // $antlr-format columnLimit 30\nb: 'y';\n";
        assert_eq!(column_limits(source), vec![100, 100, 30]);
    }
}
