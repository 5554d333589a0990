//! # Grammar Rules
//!
//! Each function takes a `&mut Parser`, inspects tokens, and emits events.
//! Rules that may fail return `bool`; on failure they rewind the parser to
//! where they started so the next alternative sees the same input.
//!
//! ## Element Alternatives
//!
//! [`element`] tries, in order:
//!
//! | Rule | Matches |
//! |------|---------|
//! | [`escaped`] | `\$`, `\}`, `\\` (and `` \` ``, `\{` in UltiSnips) |
//! | [`tabstop::tabstop_or_variable_name`] | `$1`, `$name` |
//! | [`tabstop::complex_placeholder`] | `${1}`, `${1:..}`, `${1\|a,b\|}`, `${1/../../}` |
//! | [`tabstop::complex_variable`] | `${name}`, `${name:..}`, `${name/../../}` |
//! | [`code::code_block`] | `` `cmd` ``, `` `!p ..` ``, `` `!v ..` `` (UltiSnips) |
//! | [`anything`] | any single token as literal text |
//!
//! ## Module Structure
//!
//! - [`tabstop`] - placeholders, variables and choices
//! - [`transform`] - `/regex/format/flags` and replacement templates
//! - [`code`] - UltiSnips code blocks

mod code;
mod tabstop;
mod transform;

use crate::lexer::TokenKind;
use crate::parser::Parser;

/// Parse the whole input into children of the root.
pub fn root(p: &mut Parser) {
    while element(p) {}
}

/// Parse one element; `false` only at end of input.
pub(super) fn element(p: &mut Parser) -> bool {
    if p.at_end() {
        return false;
    }
    escaped(p)
        || tabstop::tabstop_or_variable_name(p)
        || tabstop::complex_placeholder(p)
        || tabstop::complex_variable(p)
        || code::code_block(p)
        || anything(p)
}

/// A backslash escape in literal text. An escape of anything else keeps the
/// backslash; the following token is parsed normally.
fn escaped(p: &mut Parser) -> bool {
    if !p.at(TokenKind::Backslash) {
        return false;
    }
    let escapable = match p.nth(1) {
        TokenKind::Dollar | TokenKind::CurlyClose | TokenKind::Backslash => true,
        TokenKind::Backtick | TokenKind::CurlyOpen => p.dialect().is_ultisnips(),
        _ => false,
    };
    p.bump();
    if escapable {
        p.bump_as_text();
    } else {
        p.push_text("\\");
    }
    true
}

/// Any token as literal text.
fn anything(p: &mut Parser) -> bool {
    if p.at_end() {
        return false;
    }
    p.bump_as_text();
    true
}
