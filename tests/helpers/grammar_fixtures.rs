//! Common grammar sources for tests.

/// Combined grammar with one unknown token and one unknown channel.
/// `B: 'B';` sits on row 7, columns 0 to 6.
pub const UNRESOLVED: &str = "grammar t;\n\na: ZZ b;\nb: c+;\nc: A | B;\nA: 'A';\nB: 'B';\nX: 'x' -> channel(BLAH);\n";

pub const STATEMENTS_LEXER: &str = r#"lexer grammar StatementsLexer;

Semicolon: ';';
Assign: '=';
ID: [a-z]+;
INT: [0-9]+;
WS: [ \t\r\n]+ -> skip;
LBrace: '{';
RBrace: '}';
"#;

/// Parser grammar referencing `Semicolon` four times.
pub const STATEMENTS_PARSER: &str = r#"parser grammar StatementsParser;

options { tokenVocab = StatementsLexer; }

program: statement* EOF;
statement: assignment Semicolon | block Semicolon Semicolon | Semicolon;
block: LBrace statement+ RBrace;
assignment: ID Assign value;
value: ID | INT;
"#;

pub const CALC: &str = r#"grammar Calc;

calc: expr EOF;
expr: expr ('*' | '/') expr
    | expr ('+' | '-') expr
    | INT
    | '(' expr ')'
    ;

INT: [0-9]+;
WS: [ \t\r\n]+ -> skip;
"#;

pub const COMMON_LEXER: &str = "lexer grammar Common;\nID: [a-z]+;\nWS: ' ' -> skip;\n";

pub const OTHER_LEXER: &str = "lexer grammar Other;\nNAME: [A-Z]+;\n";
