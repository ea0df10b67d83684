//! Layout of single top-level elements into lines of cells
//!
//! Token text is never rewritten, only the whitespace between tokens. Rules are
//! laid out either on one line or one alternative per line; elements this
//! module cannot lay out safely (comments in odd places, incomplete input) are
//! kept verbatim.

use std::borrow::Cow;

use crate::parser::{SyntaxKind, Token};

use super::directives::is_directive;
use super::elements::{Element, ElementKind, end_of, is_comment, start_of};
use super::options::{AlignColons, AlignSemicolons, FormattingOptions};
use super::writer::{AlignKind, Line, advance};

pub(super) struct Layout<'a> {
    source: &'a str,
    tokens: &'a [Token<'a>],
    options: &'a FormattingOptions,
}

/// A run of tokens printed without spaces between them.
#[derive(Debug)]
struct Word {
    text: String,
    hard_break: bool,
}

/// One top-level alternative of a rule with its trailing markers split off.
#[derive(Debug, Default)]
struct Alternative {
    main: Vec<usize>,
    action: Option<usize>,
    commands: Vec<usize>,
    label: Vec<usize>,
    /// Comments after the alternative, flagged when starting their own line
    comments: Vec<(usize, bool)>,
}

impl<'a> Layout<'a> {
    pub(super) fn new(
        source: &'a str,
        tokens: &'a [Token<'a>],
        options: &'a FormattingOptions,
    ) -> Self {
        Self {
            source,
            tokens,
            options,
        }
    }

    pub(super) fn element(&self, element: &Element) -> Vec<Line> {
        if !element.complete {
            return self.verbatim(element);
        }
        let lines = match element.kind {
            ElementKind::Comment => Some(self.comment(element)),
            ElementKind::Declaration | ElementKind::Statement => self.statement(element),
            ElementKind::Block => self.block(element),
            ElementKind::NamedAction => self.named_action(element),
            ElementKind::Rule => self.rule(element),
            ElementKind::Other => None,
        };
        lines.unwrap_or_else(|| self.verbatim(element))
    }

    pub(super) fn verbatim(&self, element: &Element) -> Vec<Line> {
        vec![Line::verbatim(&self.source[element.start..element.end])]
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn kind(&self, index: usize) -> SyntaxKind {
        self.tokens[index].kind
    }

    fn text(&self, index: usize) -> Cow<'a, str> {
        let token = &self.tokens[index];
        match token.kind {
            SyntaxKind::OPTIONS_KW | SyntaxKind::TOKENS_KW | SyntaxKind::CHANNELS_KW => {
                Cow::Owned(format!("{} {{", block_keyword(token.text)))
            }
            _ => Cow::Borrowed(token.text),
        }
    }

    fn has_comment(&self, indices: &[usize]) -> bool {
        indices.iter().any(|&index| is_comment(self.kind(index)))
    }

    /// True if a line break separates `index` from the token before it.
    fn starts_line(&self, index: usize) -> bool {
        index > 0 && {
            let previous = &self.tokens[index - 1];
            previous.kind == SyntaxKind::WHITESPACE && previous.text.contains('\n')
        }
    }

    fn align(&self, kind: AlignKind) -> Option<AlignKind> {
        let options = self.options;
        let trailer = |enabled: bool| {
            if options.align_trailers {
                Some(AlignKind::Trailer)
            } else {
                enabled.then_some(kind)
            }
        };
        match kind {
            AlignKind::Colon => (options.align_colons == AlignColons::Trailing).then_some(kind),
            AlignKind::FirstToken => options.align_first_tokens.then_some(kind),
            AlignKind::Action => trailer(options.align_actions),
            AlignKind::LexerCommand => trailer(options.align_lexer_commands),
            AlignKind::Label => trailer(options.align_labels),
            AlignKind::TrailingComment => trailer(options.align_trailing_comments),
            AlignKind::Trailer => Some(kind),
        }
    }

    fn attach_trailing_comment(&self, line: &mut Line, element: &Element) {
        if let Some(comment) = element.trailing_comment {
            line.push(
                self.tokens[comment].text.trim_end(),
                1,
                self.align(AlignKind::TrailingComment),
            );
        }
    }

    fn space_between(&self, previous: usize, next: usize, in_angle: bool, in_options: bool) -> bool {
        use SyntaxKind::*;

        let adjacent = next == previous + 1;
        match (self.kind(previous), self.kind(next)) {
            (L_PAREN | TILDE | AT | DOLLAR | LT, _) => false,
            (_, R_PAREN | COMMA | SEMI | QUESTION | STAR | PLUS | GT) => false,
            (RANGE | COLON_COLON, _) | (_, RANGE | COLON_COLON) => false,
            (COLON | PIPE, LT) => true,
            (_, LT) => false,
            (ASSIGN | PLUS_ASSIGN, _) | (_, ASSIGN | PLUS_ASSIGN) => {
                !in_angle && self.options.space_before_assignment_operators
            }
            (DOT, _) | (_, DOT) if in_options => false,
            (TOKEN_REF | RULE_REF, BRACKET_BLOCK | L_PAREN) => !adjacent,
            _ => true,
        }
    }

    /// Groups tokens into words. Hard breaks are only produced when
    /// `breakable` is set.
    fn words(&self, indices: &[usize], in_options: bool, breakable: bool) -> Vec<Word> {
        let mut words: Vec<Word> = Vec::new();
        let mut previous: Option<usize> = None;
        let mut angle = 0usize;
        for &index in indices {
            let kind = self.kind(index);
            let joined = previous
                .is_some_and(|previous| !self.space_between(previous, index, angle > 0, in_options));
            match kind {
                SyntaxKind::LT => angle += 1,
                SyntaxKind::GT => angle = angle.saturating_sub(1),
                _ => {}
            }
            previous = Some(index);
            match words.last_mut() {
                Some(word) if joined => word.text.push_str(&self.text(index)),
                _ => {
                    let hard_break = breakable
                        && ((kind == SyntaxKind::PIPE
                            && !self.options.allow_short_blocks_on_a_single_line)
                            || (kind == SyntaxKind::L_PAREN && self.options.break_before_parens));
                    words.push(Word {
                        text: self.text(index).into_owned(),
                        hard_break,
                    });
                }
            }
        }
        words
    }

    fn joined(&self, indices: &[usize], in_options: bool) -> String {
        join(&self.words(indices, in_options, false))
    }

    // ========================================================================
    // Simple elements
    // ========================================================================

    fn comment(&self, element: &Element) -> Vec<Line> {
        let token = &self.tokens[element.tokens[0]];
        let text = token.text.trim_end();
        if token.kind != SyntaxKind::LINE_COMMENT {
            return vec![Line::verbatim(text)];
        }
        if self.options.reflow_comments
            && text.chars().count() > self.options.column_limit
            && !is_directive(text)
        {
            if let Some(body) = text.strip_prefix("// ") {
                return self.reflow(body);
            }
        }
        vec![Line::new(0).with(text, 0, None)]
    }

    fn reflow(&self, body: &str) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut current = String::from("//");
        for word in body.split_whitespace() {
            if current.len() > 2
                && current.chars().count() + 1 + word.chars().count() > self.options.column_limit
            {
                lines.push(Line::new(0).with(std::mem::replace(&mut current, "//".into()), 0, None));
            }
            current.push(' ');
            current.push_str(word);
        }
        lines.push(Line::new(0).with(current, 0, None));
        lines
    }

    fn statement(&self, element: &Element) -> Option<Vec<Line>> {
        if self.has_comment(&element.tokens) {
            return None;
        }
        let mut line = Line::new(0).with(self.joined(&element.tokens, false), 0, None);
        self.attach_trailing_comment(&mut line, element);
        Some(vec![line])
    }

    fn named_action(&self, element: &Element) -> Option<Vec<Line>> {
        let (&action, head) = element.tokens.split_last()?;
        if self.kind(action) != SyntaxKind::ACTION_BLOCK || self.has_comment(head) {
            return None;
        }
        let head = self.joined(head, false);
        let action = self.tokens[action].text;
        let mut lines = if self.options.break_before_braces {
            vec![Line::new(0).with(head, 0, None), Line::new(0).with(action, 0, None)]
        } else {
            vec![Line::new(0).with(head, 0, None).with(action, 1, None)]
        };
        if let Some(last) = lines.last_mut() {
            self.attach_trailing_comment(last, element);
        }
        Some(lines)
    }

    /// `options`, `tokens` and `channels` blocks.
    fn block(&self, element: &Element) -> Option<Vec<Line>> {
        let (&open, rest) = element.tokens.split_first()?;
        let (&close, inner) = rest.split_last()?;
        if self.kind(close) != SyntaxKind::R_BRACE {
            return None;
        }
        let keyword = block_keyword(self.tokens[open].text);
        let in_options = keyword == "options";
        let options = self.options;

        enum Entry {
            Item(Vec<usize>, Option<usize>),
            Comment(usize),
        }
        let mut entries: Vec<Entry> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        for &index in inner {
            let kind = self.kind(index);
            if is_comment(kind) {
                if !current.is_empty() {
                    return None;
                }
                if !self.starts_line(index) {
                    if let Some(Entry::Item(_, slot @ None)) = entries.last_mut() {
                        *slot = Some(index);
                        continue;
                    }
                }
                entries.push(Entry::Comment(index));
                continue;
            }
            current.push(index);
            if matches!(kind, SyntaxKind::SEMI | SyntaxKind::COMMA) {
                entries.push(Entry::Item(std::mem::take(&mut current), None));
            }
        }
        if !current.is_empty() {
            entries.push(Entry::Item(current, None));
        }

        if options.allow_short_blocks_on_a_single_line && !self.has_comment(inner) {
            let items: Vec<String> = entries
                .iter()
                .filter_map(|entry| match entry {
                    Entry::Item(indices, _) => Some(self.joined(indices, in_options)),
                    Entry::Comment(_) => None,
                })
                .collect();
            let text = if items.is_empty() {
                format!("{keyword} {{}}")
            } else {
                format!("{keyword} {{ {} }}", items.join(" "))
            };
            let mut line = Line::new(0).with(text, 0, None);
            if line.width() <= options.column_limit {
                self.attach_trailing_comment(&mut line, element);
                return Some(vec![line]);
            }
        }

        let mut lines = if options.break_before_braces {
            vec![Line::new(0).with(keyword, 0, None), Line::new(0).with("{", 0, None)]
        } else {
            vec![Line::new(0).with(format!("{keyword} {{"), 0, None)]
        };
        if options.keep_empty_lines_at_the_start_of_blocks {
            if let Some(&first) = inner.first() {
                let gap = &self.source[end_of(&self.tokens[open])..start_of(&self.tokens[first])];
                if gap.matches('\n').count() > 1 {
                    lines.push(Line::new(0));
                }
            }
        }
        for entry in &entries {
            match entry {
                Entry::Item(indices, comment) => {
                    let mut line = Line::new(options.indent_width)
                        .with(self.joined(indices, in_options), 0, None);
                    if let Some(comment) = comment {
                        line.push(
                            self.tokens[*comment].text.trim_end(),
                            1,
                            self.align(AlignKind::TrailingComment),
                        );
                    }
                    lines.push(line);
                }
                Entry::Comment(comment) => {
                    lines.push(Line::new(options.indent_width).with(
                        self.tokens[*comment].text.trim_end(),
                        0,
                        None,
                    ));
                }
            }
        }
        let mut closing = Line::new(0).with("}", 0, None);
        self.attach_trailing_comment(&mut closing, element);
        lines.push(closing);
        Some(lines)
    }

    // ========================================================================
    // Rules
    // ========================================================================

    /// Position in `members` of the first token at nesting depth zero
    /// matching `kind`, searching from `from`.
    fn find_at_depth(&self, members: &[usize], from: usize, kind: SyntaxKind) -> Option<usize> {
        let mut depth = 0i32;
        for (position, &index) in members.iter().enumerate() {
            let token_kind = self.kind(index);
            if position >= from && depth == 0 && token_kind == kind {
                return Some(position);
            }
            depth += nesting(token_kind);
        }
        None
    }

    fn rule(&self, element: &Element) -> Option<Vec<Line>> {
        let members = &element.tokens;
        let colon = self.find_at_depth(members, 0, SyntaxKind::COLON)?;
        let semicolon = self.find_at_depth(members, colon + 1, SyntaxKind::SEMI)?;
        let header = &members[..colon];
        let handlers = &members[semicolon + 1..];
        if self.has_comment(header) || self.has_comment(handlers) {
            return None;
        }

        let (name, internals) = self.split_header(header);
        let name = self.joined(name, false);
        let internals: Vec<String> = internals
            .iter()
            .map(|piece| self.joined(piece, true))
            .collect();
        let alternatives = self.alternatives(&members[colon + 1..semicolon])?;
        let words: Vec<Vec<Word>> = alternatives
            .iter()
            .map(|alternative| self.words(&alternative.main, false, true))
            .collect();

        let mut lines = match self.single_line_rule(&name, &internals, &alternatives, &words) {
            Some(line) => vec![line],
            None => self.multi_line_rule(name, internals, &alternatives, &words),
        };
        for handler in split_handlers(self.tokens, handlers) {
            lines.push(Line::new(0).with(self.joined(handler, false), 0, None));
        }
        if let Some(last) = lines.last_mut() {
            self.attach_trailing_comment(last, element);
        }
        Some(lines)
    }

    /// Splits a rule header into the name part (with `fragment` and arguments)
    /// and the internals (`returns`, `locals`, `throws`, options, actions).
    fn split_header<'h>(&self, header: &'h [usize]) -> (&'h [usize], Vec<&'h [usize]>) {
        let mut end = 0;
        if header
            .first()
            .is_some_and(|&index| self.kind(index) == SyntaxKind::FRAGMENT_KW)
        {
            end += 1;
        }
        end = (end + 1).min(header.len());
        if header
            .get(end)
            .is_some_and(|&index| self.kind(index) == SyntaxKind::BRACKET_BLOCK)
        {
            end += 1;
        }

        let mut pieces = Vec::new();
        let mut start = end;
        for position in end + 1..header.len() {
            if matches!(
                self.kind(header[position]),
                SyntaxKind::RETURNS_KW
                    | SyntaxKind::LOCALS_KW
                    | SyntaxKind::THROWS_KW
                    | SyntaxKind::OPTIONS_KW
                    | SyntaxKind::AT
            ) {
                pieces.push(&header[start..position]);
                start = position;
            }
        }
        if start < header.len() {
            pieces.push(&header[start..]);
        }
        (&header[..end], pieces)
    }

    fn alternatives(&self, body: &[usize]) -> Option<Vec<Alternative>> {
        let mut alternatives = Vec::new();
        let mut current = Vec::new();
        let mut depth = 0i32;
        for &index in body {
            let kind = self.kind(index);
            if kind == SyntaxKind::PIPE && depth == 0 {
                alternatives.push(self.alternative(std::mem::take(&mut current))?);
                continue;
            }
            depth += nesting(kind);
            current.push(index);
        }
        alternatives.push(self.alternative(current)?);
        Some(alternatives)
    }

    fn alternative(&self, mut main: Vec<usize>) -> Option<Alternative> {
        let split = main
            .iter()
            .rposition(|&index| !is_comment(self.kind(index)))
            .map_or(0, |position| position + 1);
        let comments = main
            .split_off(split)
            .into_iter()
            .map(|index| (index, self.starts_line(index)))
            .collect();
        if self.has_comment(&main) {
            return None;
        }

        let length = main.len();
        let label = if length >= 2
            && self.kind(main[length - 2]) == SyntaxKind::POUND
            && matches!(self.kind(main[length - 1]), SyntaxKind::TOKEN_REF | SyntaxKind::RULE_REF)
        {
            main.split_off(length - 2)
        } else {
            Vec::new()
        };
        let commands = match main
            .iter()
            .position(|&index| self.kind(index) == SyntaxKind::ARROW)
        {
            Some(position) => main.split_off(position),
            None => Vec::new(),
        };
        let action = match main.last() {
            Some(&last) if main.len() > 1 && self.kind(last) == SyntaxKind::ACTION_BLOCK => {
                main.pop()
            }
            _ => None,
        };
        Some(Alternative {
            main,
            action,
            commands,
            label,
            comments,
        })
    }

    /// Action, lexer command and label cells of an alternative.
    fn push_markers(&self, line: &mut Line, alternative: &Alternative) {
        if let Some(action) = alternative.action {
            line.push(self.tokens[action].text, 1, self.align(AlignKind::Action));
        }
        line.push(
            self.joined(&alternative.commands, false),
            1,
            self.align(AlignKind::LexerCommand),
        );
        line.push(self.joined(&alternative.label, false), 1, self.align(AlignKind::Label));
    }

    /// Inline text of an alternative, markers included.
    fn inline_alternative(&self, alternative: &Alternative, words: &[Word]) -> String {
        let mut parts = vec![join(words)];
        if let Some(action) = alternative.action {
            parts.push(self.tokens[action].text.to_string());
        }
        parts.push(self.joined(&alternative.commands, false));
        parts.push(self.joined(&alternative.label, false));
        parts.retain(|part| !part.is_empty());
        parts.join(" ")
    }

    fn single_line_rule(
        &self,
        name: &str,
        internals: &[String],
        alternatives: &[Alternative],
        words: &[Vec<Word>],
    ) -> Option<Line> {
        let options = self.options;
        let allowed = options.allow_short_rules_on_a_single_line
            && alternatives.iter().all(|alternative| alternative.comments.is_empty())
            && words.iter().flatten().all(|word| !word.hard_break)
            && (options.align_colons != AlignColons::Hanging
                || options.single_line_overrules_hanging_colon)
            && (internals.is_empty() || options.rule_internals_on_single_line);
        if !allowed {
            return None;
        }

        let (last, leading) = alternatives.split_last()?;
        let mut texts: Vec<String> = leading
            .iter()
            .zip(words)
            .map(|(alternative, words)| self.inline_alternative(alternative, words))
            .collect();
        texts.push(join(&words[leading.len()]));
        let body = join_alternatives(&texts);

        let mut line = Line::new(0).with(head(name, internals), 0, None);
        line.push(":", usize::from(options.space_before_colon), self.align(AlignKind::Colon));
        line.push(body, 1, self.align(AlignKind::FirstToken));
        self.push_markers(&mut line, last);
        line.append(";");
        (line.width() <= options.column_limit).then_some(line)
    }

    fn multi_line_rule(
        &self,
        name: String,
        internals: Vec<String>,
        alternatives: &[Alternative],
        words: &[Vec<Word>],
    ) -> Vec<Line> {
        let options = self.options;
        let indent = options.indent_width;
        let hanging = options.align_colons == AlignColons::Hanging
            || (!internals.is_empty() && !options.rule_internals_on_single_line);
        let inline_semicolon = options.align_semicolons == AlignSemicolons::None
            && alternatives
                .last()
                .is_none_or(|alternative| alternative.comments.iter().all(|&(_, own)| !own));

        let mut lines = Vec::new();
        let mut first_prefix = if hanging {
            if options.rule_internals_on_single_line {
                lines.push(Line::new(0).with(head(&name, &internals), 0, None));
            } else {
                lines.push(Line::new(0).with(name, 0, None));
                for piece in internals {
                    lines.push(Line::new(indent).with(piece, 0, None));
                }
            }
            Line::new(indent).with(":", 0, None)
        } else {
            Line::new(0).with(head(&name, &internals), 0, None).with(
                ":",
                usize::from(options.space_before_colon),
                self.align(AlignKind::Colon),
            )
        };

        for (position, (alternative, words)) in alternatives.iter().zip(words).enumerate() {
            let prefix = if position == 0 {
                std::mem::take(&mut first_prefix)
            } else {
                Line::new(indent).with("|", 0, None)
            };
            let last = position + 1 == alternatives.len();
            let first_token = position == 0 && !hanging;
            self.alternative_lines(
                alternative,
                words,
                prefix,
                first_token,
                last && inline_semicolon,
                &mut lines,
            );
        }

        if !inline_semicolon {
            let column = match options.align_semicolons {
                AlignSemicolons::OwnLine if !hanging => 0,
                _ => indent,
            };
            lines.push(Line::new(column).with(";", 0, None));
        }
        lines
    }

    fn alternative_lines(
        &self,
        alternative: &Alternative,
        words: &[Word],
        mut line: Line,
        first_token: bool,
        semicolon: bool,
        lines: &mut Vec<Line>,
    ) {
        let options = self.options;
        let continuation = options.indent_width + options.continuation_indent_width;
        let wrapped = wrap(words, line.width() + 1, continuation, options.column_limit);

        let mut wrapped = wrapped.into_iter();
        if let Some(first) = wrapped.next() {
            let align = if first_token {
                self.align(AlignKind::FirstToken)
            } else {
                None
            };
            line.push(first, 1, align);
        }
        for text in wrapped {
            lines.push(std::mem::replace(
                &mut line,
                Line::new(continuation).with(text, 0, None),
            ));
        }
        self.push_markers(&mut line, alternative);
        if semicolon {
            line.append(";");
        }

        let mut own_lines = Vec::new();
        for (position, &(comment, own_line)) in alternative.comments.iter().enumerate() {
            let text = self.tokens[comment].text.trim_end();
            if position == 0 && !own_line {
                line.push(text, 1, self.align(AlignKind::TrailingComment));
            } else {
                own_lines.push(Line::new(options.indent_width).with(text, 0, None));
            }
        }
        lines.push(line);
        lines.extend(own_lines);
    }
}

/// Net change in nesting depth caused by a token.
fn nesting(kind: SyntaxKind) -> i32 {
    match kind {
        SyntaxKind::L_PAREN
        | SyntaxKind::OPTIONS_KW
        | SyntaxKind::TOKENS_KW
        | SyntaxKind::CHANNELS_KW => 1,
        SyntaxKind::R_PAREN | SyntaxKind::R_BRACE => -1,
        _ => 0,
    }
}

/// `options` from an `options {` keyword token.
fn block_keyword(text: &str) -> &str {
    text.split(|c: char| c.is_whitespace() || c == '{')
        .next()
        .unwrap_or(text)
}

fn join(words: &[Word]) -> String {
    words
        .iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn head(name: &str, internals: &[String]) -> String {
    std::iter::once(name)
        .chain(internals.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins alternative texts with `|`, keeping empty alternatives.
fn join_alternatives(texts: &[String]) -> String {
    let mut body = String::new();
    for (position, text) in texts.iter().enumerate() {
        if position > 0 {
            body.push_str(if body.is_empty() { "|" } else { " |" });
        }
        if !text.is_empty() {
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(text);
        }
    }
    body
}

/// Greedy line filling. The first line starts at `first_column`, later lines
/// at `continuation_column`.
fn wrap(words: &[Word], first_column: usize, continuation_column: usize, limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut column = first_column;
    for word in words {
        if !current.is_empty() {
            if word.hard_break || advance(column + 1, &word.text) > limit {
                lines.push(std::mem::take(&mut current));
                column = continuation_column;
            } else {
                current.push(' ');
                column += 1;
            }
        }
        current.push_str(&word.text);
        column = advance(column, &word.text);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Splits the handlers after a rule at each `catch` and `finally`.
fn split_handlers<'h>(tokens: &[Token], handlers: &'h [usize]) -> Vec<&'h [usize]> {
    let mut result = Vec::new();
    let mut start = 0;
    for position in 1..handlers.len() {
        if matches!(
            tokens[handlers[position]].kind,
            SyntaxKind::CATCH_KW | SyntaxKind::FINALLY_KW
        ) {
            result.push(&handlers[start..position]);
            start = position;
        }
    }
    if start < handlers.len() {
        result.push(&handlers[start..]);
    }
    result
}
