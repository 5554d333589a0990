//! # Lexer - Tokenizing Snippet Source
//!
//! This module provides the first stage of parsing: breaking snippet source
//! into tokens using the [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! Every byte of the input appears in exactly one token. Nothing is skipped,
//! which is what lets the parser fall back to the raw source text whenever a
//! construct fails to match:
//!
//! ```
//! use snippet_syntax::lexer::lex;
//!
//! let input = "${1:foo} bar";
//! let tokens = lex(input);
//!
//! let reconstructed: String = tokens.iter().map(|t| &input[t.span.clone()]).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Why Two Token Enums?
//!
//! [`LexToken`] is the enum Logos derives on. [`TokenKind`] is what the parser
//! sees; it adds [`TokenKind::Eof`], which the scanner returns once the input
//! is exhausted and which Logos never produces itself.
//!
//! ## Maximal Munch
//!
//! - a run of ASCII digits is an [`TokenKind::Int`]
//! - a run of `[A-Za-z_][A-Za-z0-9_]*` is a [`TokenKind::VariableName`]
//! - each punctuation character with meaning in some grammar rule is its own
//!   single-character token
//! - any other run of characters is a [`TokenKind::Format`] token
//!
//! The lexer is dialect-agnostic. Backticks and parentheses are always
//! tokens; the TextMate grammar simply treats them as text.
//!
//! ## Public API
//!
//! - [`Scanner`] - restartable tokenizer (`reset` / `next`)
//! - [`lex`] - tokenize a whole input into a `Vec<Token>`

use std::ops::Range;

use logos::Logos;

/// Token kinds produced by the Logos lexer.
///
/// The `#[logos(skip r"")]` attribute means "skip nothing".
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"")]
pub enum LexToken {
    #[token("$")]
    Dollar,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("{")]
    CurlyOpen,

    #[token("}")]
    CurlyClose,

    #[token("\\")]
    Backslash,

    #[token("/")]
    Forwardslash,

    #[token("|")]
    Pipe,

    #[token("+")]
    Plus,

    #[token("-")]
    Dash,

    #[token("?")]
    QuestionMark,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    /// UltiSnips code block delimiter
    #[token("`")]
    Backtick,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r"[_A-Za-z][_A-Za-z0-9]*")]
    VariableName,

    /// Anything not matched by other rules
    #[regex(r"[^$:,{}\\/|+?()`0-9A-Za-z_-]+")]
    Format,
}

impl LexToken {
    /// Convert to the parser-facing kind.
    pub fn to_token_kind(self) -> TokenKind {
        match self {
            LexToken::Dollar => TokenKind::Dollar,
            LexToken::Colon => TokenKind::Colon,
            LexToken::Comma => TokenKind::Comma,
            LexToken::CurlyOpen => TokenKind::CurlyOpen,
            LexToken::CurlyClose => TokenKind::CurlyClose,
            LexToken::Backslash => TokenKind::Backslash,
            LexToken::Forwardslash => TokenKind::Forwardslash,
            LexToken::Pipe => TokenKind::Pipe,
            LexToken::Plus => TokenKind::Plus,
            LexToken::Dash => TokenKind::Dash,
            LexToken::QuestionMark => TokenKind::QuestionMark,
            LexToken::OpenParen => TokenKind::OpenParen,
            LexToken::CloseParen => TokenKind::CloseParen,
            LexToken::Backtick => TokenKind::Backtick,
            LexToken::Int => TokenKind::Int,
            LexToken::VariableName => TokenKind::VariableName,
            LexToken::Format => TokenKind::Format,
        }
    }
}

/// Token kinds seen by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Dollar,
    Colon,
    Comma,
    CurlyOpen,
    CurlyClose,
    Backslash,
    Forwardslash,
    Pipe,
    Plus,
    Dash,
    QuestionMark,
    OpenParen,
    CloseParen,
    Backtick,
    Int,
    VariableName,
    Format,
    Eof,
}

/// A lexed token: its kind and the byte span it covers in the scanned source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    /// The slice of `source` covered by this token.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.clone()]
    }
}

/// A restartable tokenizer.
///
/// The scanner owns a copy of its input so a single instance can be reused
/// across parses; [`Scanner::reset`] clears all state left by the previous
/// input without reallocating when the new source fits.
#[derive(Debug, Default, Clone)]
pub struct Scanner {
    source: String,
    pos: usize,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all scanning state and install `source` as the new input.
    pub fn reset(&mut self, source: &str) {
        self.source.clear();
        self.source.push_str(source);
        self.pos = 0;
    }

    /// The currently installed input.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Return the next token, or an empty [`TokenKind::Eof`] token once the
    /// input is exhausted. Calling it again after the end keeps returning EOF.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Token {
        let rest = &self.source[self.pos..];
        let mut lexer = LexToken::lexer(rest);

        match lexer.next() {
            None => Token {
                kind: TokenKind::Eof,
                span: self.pos..self.pos,
            },
            Some(result) => {
                let span = lexer.span();
                // Every character is covered by some rule; an error can only
                // come from an unforeseen input and is treated as format text.
                let kind = result
                    .map(LexToken::to_token_kind)
                    .unwrap_or(TokenKind::Format);
                let start = self.pos + span.start;
                let end = self.pos + span.end;
                self.pos = end;
                Token {
                    kind,
                    span: start..end,
                }
            }
        }
    }

    /// Text of a token produced by this scanner.
    pub fn token_text(&self, token: &Token) -> &str {
        token.text(&self.source)
    }
}

/// Lex the whole input into a sequence of tokens, excluding the final EOF.
pub fn lex(input: &str) -> Vec<Token> {
    let mut scanner = Scanner::new();
    scanner.reset(input);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next();
        if token.kind == TokenKind::Eof {
            break;
        }
        tokens.push(token);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_empty() {
        assert!(lex("").is_empty());
    }

    #[rstest]
    #[case("abc() ", vec![TokenKind::VariableName, TokenKind::OpenParen, TokenKind::CloseParen, TokenKind::Format])]
    #[case("abc 123", vec![TokenKind::VariableName, TokenKind::Format, TokenKind::Int])]
    #[case("$foo", vec![TokenKind::Dollar, TokenKind::VariableName])]
    #[case("$foo_bar", vec![TokenKind::Dollar, TokenKind::VariableName])]
    #[case("$foo-bar", vec![TokenKind::Dollar, TokenKind::VariableName, TokenKind::Dash, TokenKind::VariableName])]
    #[case("${foo}", vec![TokenKind::Dollar, TokenKind::CurlyOpen, TokenKind::VariableName, TokenKind::CurlyClose])]
    #[case("${1223:foo}", vec![TokenKind::Dollar, TokenKind::CurlyOpen, TokenKind::Int, TokenKind::Colon, TokenKind::VariableName, TokenKind::CurlyClose])]
    #[case("\\${}", vec![TokenKind::Backslash, TokenKind::Dollar, TokenKind::CurlyOpen, TokenKind::CurlyClose])]
    #[case("${1|a,b|}", vec![TokenKind::Dollar, TokenKind::CurlyOpen, TokenKind::Int, TokenKind::Pipe, TokenKind::VariableName, TokenKind::Comma, TokenKind::VariableName, TokenKind::Pipe, TokenKind::CurlyClose])]
    #[case("(?1:+-)", vec![TokenKind::OpenParen, TokenKind::QuestionMark, TokenKind::Int, TokenKind::Colon, TokenKind::Plus, TokenKind::Dash, TokenKind::CloseParen])]
    #[case("`!p x`", vec![TokenKind::Backtick, TokenKind::Format, TokenKind::VariableName, TokenKind::Format, TokenKind::VariableName, TokenKind::Backtick])]
    #[case("123abc", vec![TokenKind::Int, TokenKind::VariableName])]
    #[case("äö ü", vec![TokenKind::Format])]
    fn lex_token_kinds(#[case] input: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn lex_is_lossless() {
        let input = "foo${1:bar\\}}`!p snip.rv = t[1]` ${2/(.*)/${1:/upcase}/gi} é";
        let reconstructed: String = lex(input)
            .iter()
            .map(|t| t.text(input))
            .collect();
        assert_eq!(reconstructed, input);
    }

    #[test]
    fn scanner_returns_eof_repeatedly() {
        let mut scanner = Scanner::new();
        scanner.reset("a");
        assert_eq!(scanner.next().kind, TokenKind::VariableName);
        assert_eq!(scanner.next().kind, TokenKind::Eof);
        assert_eq!(scanner.next().kind, TokenKind::Eof);
    }

    #[test]
    fn scanner_reset_discards_previous_input() {
        let mut scanner = Scanner::new();
        scanner.reset("abc def");
        let first = scanner.next();
        assert_eq!(scanner.token_text(&first), "abc");

        scanner.reset("12");
        let token = scanner.next();
        assert_eq!(token.kind, TokenKind::Int);
        assert_eq!(token.span, 0..2);
        assert_eq!(scanner.token_text(&token), "12");
        assert_eq!(scanner.next().kind, TokenKind::Eof);
    }

    #[test]
    fn spans_are_byte_offsets() {
        let mut scanner = Scanner::new();
        scanner.reset("é$1");
        assert_eq!(scanner.next().span, 0..2);
        assert_eq!(scanner.next().span, 2..3);
        assert_eq!(scanner.next().span, 3..4);
    }
}
