//! `/regex/format/flags}` after a placeholder index or variable name.
//!
//! Transforms are values attached to their owner rather than tree nodes, so
//! these rules return the parsed value instead of emitting events. The
//! caller rewinds on `None`.

use crate::lexer::TokenKind;
use crate::parser::Parser;
use crate::transform::{
    CaseEscape, ConditionMarker, ConditionString, FormatString, Shorthand, TemplatePiece,
    Transform, TransformFlags,
};

/// Parse the rest of a transform; the opening `/` is already consumed.
pub(super) fn transform(p: &mut Parser) -> Option<Transform> {
    let pattern = regex_pattern(p)?;

    let mut pieces = Vec::new();
    loop {
        if p.eat(TokenKind::Forwardslash) {
            break;
        }
        if !template_piece(p, &mut pieces) {
            return None;
        }
    }

    let mut flags = String::new();
    loop {
        if p.eat(TokenKind::CurlyClose) {
            break;
        }
        if p.at_end() {
            return None;
        }
        flags.push_str(p.current_text());
        p.bump();
    }

    let flags = TransformFlags::parse(&flags).ok()?;
    Transform::new(pattern, merge_text(pieces), flags).ok()
}

/// Source of the regex up to the next unescaped `/`.
fn regex_pattern(p: &mut Parser) -> Option<String> {
    let ultisnips = p.dialect().is_ultisnips();
    let mut pattern = String::new();
    loop {
        if p.eat(TokenKind::Forwardslash) {
            return Some(pattern);
        }
        if p.at_end() {
            return None;
        }
        if p.eat(TokenKind::Backslash) {
            if p.eat(TokenKind::Forwardslash) {
                pattern.push('/');
            } else if ultisnips && p.at(TokenKind::VariableName) && p.current_text().starts_with('Z') {
                // python's end-of-string anchor
                pattern.push_str("\\z");
                pattern.push_str(&p.current_text()[1..]);
                p.bump();
            } else {
                pattern.push('\\');
            }
            continue;
        }
        pattern.push_str(p.current_text());
        p.bump();
    }
}

/// Join adjacent text pieces.
fn merge_text(pieces: Vec<TemplatePiece>) -> Vec<TemplatePiece> {
    let mut merged: Vec<TemplatePiece> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if let TemplatePiece::Text(text) = &piece
            && let Some(TemplatePiece::Text(last)) = merged.last_mut()
        {
            last.push_str(text);
            continue;
        }
        merged.push(piece);
    }
    merged
}

fn push_text(pieces: &mut Vec<TemplatePiece>, text: &str) {
    pieces.push(TemplatePiece::Text(text.to_string()));
}

/// One piece of a replacement template; `false` at end of input.
fn template_piece(p: &mut Parser, pieces: &mut Vec<TemplatePiece>) -> bool {
    let ultisnips = p.dialect().is_ultisnips();
    match p.current() {
        TokenKind::Eof => false,
        TokenKind::Backslash => {
            p.bump();
            match p.current() {
                TokenKind::Backslash
                | TokenKind::Forwardslash
                | TokenKind::Dollar
                | TokenKind::CurlyClose => {
                    push_text(pieces, p.current_text());
                    p.bump();
                }
                TokenKind::OpenParen | TokenKind::CloseParen | TokenKind::Colon if ultisnips => {
                    push_text(pieces, p.current_text());
                    p.bump();
                }
                TokenKind::VariableName if ultisnips => {
                    let text = p.current_text();
                    let mut chars = text.chars();
                    match chars.next().and_then(CaseEscape::from_char) {
                        Some(escape) => {
                            let rest = chars.as_str().to_string();
                            pieces.push(TemplatePiece::Escape(escape));
                            if !rest.is_empty() {
                                pieces.push(TemplatePiece::Text(rest));
                            }
                            p.bump();
                        }
                        None => push_text(pieces, "\\"),
                    }
                }
                _ => push_text(pieces, "\\"),
            }
            true
        }
        TokenKind::Dollar => {
            match format_string(p) {
                Some(format) => pieces.push(TemplatePiece::Format(format)),
                None => {
                    push_text(pieces, p.current_text());
                    p.bump();
                }
            }
            true
        }
        TokenKind::OpenParen if ultisnips && p.nth(1) == TokenKind::QuestionMark => {
            match condition(p) {
                Some(piece) => pieces.push(piece),
                None => {
                    push_text(pieces, p.current_text());
                    p.bump();
                }
            }
            true
        }
        _ => {
            push_text(pieces, p.current_text());
            p.bump();
            true
        }
    }
}

/// `$1`, `${1}`, and in TextMate also `${1:/upcase}`, `${1:+if}`,
/// `${1:-else}`, `${1:?if:else}`, `${1:else}`.
fn format_string(p: &mut Parser) -> Option<FormatString> {
    let checkpoint = p.checkpoint();
    let result = format_string_inner(p);
    if result.is_none() {
        p.rewind(checkpoint);
    }
    result
}

fn format_string_inner(p: &mut Parser) -> Option<FormatString> {
    p.bump(); // $
    let complex = p.eat(TokenKind::CurlyOpen);
    if !p.at(TokenKind::Int) {
        return None;
    }
    let index = p.current_text().parse::<usize>().ok()?;
    p.bump();

    if !complex || p.eat(TokenKind::CurlyClose) {
        return Some(FormatString::new(index));
    }
    if p.dialect().is_ultisnips() || !p.eat(TokenKind::Colon) {
        return None;
    }

    if p.eat(TokenKind::Forwardslash) {
        if !p.at(TokenKind::VariableName) {
            return None;
        }
        let shorthand = Shorthand::from_name(p.current_text());
        p.bump();
        return p
            .eat(TokenKind::CurlyClose)
            .then(|| FormatString::with_shorthand(index, shorthand));
    }
    if p.eat(TokenKind::Plus) {
        let if_value = until(p, TokenKind::CurlyClose)?;
        return Some(FormatString::with_branches(index, Some(if_value), None));
    }
    if p.eat(TokenKind::Dash) {
        let else_value = until(p, TokenKind::CurlyClose)?;
        return Some(FormatString::with_branches(index, None, Some(else_value)));
    }
    if p.eat(TokenKind::QuestionMark) {
        let if_value = until(p, TokenKind::Colon)?;
        let else_value = until(p, TokenKind::CurlyClose)?;
        return Some(FormatString::with_branches(
            index,
            Some(if_value),
            Some(else_value),
        ));
    }
    let else_value = until(p, TokenKind::CurlyClose)?;
    Some(FormatString::with_branches(index, None, Some(else_value)))
}

/// Text up to and including `stop`, unescaping `\$`, `\}` and `\\`.
/// Fails on end of input, on any other escape, and on empty text.
fn until(p: &mut Parser, stop: TokenKind) -> Option<String> {
    let mut value = String::new();
    loop {
        if p.eat(stop) {
            break;
        }
        if p.at_end() {
            return None;
        }
        if p.eat(TokenKind::Backslash)
            && !matches!(
                p.current(),
                TokenKind::Dollar | TokenKind::CurlyClose | TokenKind::Backslash
            )
        {
            return None;
        }
        value.push_str(p.current_text());
        p.bump();
    }
    (!value.is_empty()).then_some(value)
}

/// `(?N:if:else)` or `(?N:if)`.
fn condition(p: &mut Parser) -> Option<TemplatePiece> {
    let checkpoint = p.checkpoint();
    let result = condition_inner(p);
    if result.is_none() {
        p.rewind(checkpoint);
    }
    result
}

fn condition_inner(p: &mut Parser) -> Option<TemplatePiece> {
    p.bump(); // (
    p.bump(); // ?
    if !p.at(TokenKind::Int) {
        return None;
    }
    let index = p.current_text().parse::<usize>().ok()?;
    p.bump();
    if !p.eat(TokenKind::Colon) {
        return None;
    }

    let if_branch = branch(p, &[TokenKind::Colon, TokenKind::CloseParen])?;
    let else_branch = if p.eat(TokenKind::Colon) {
        branch(p, &[TokenKind::CloseParen])?
    } else {
        Vec::new()
    };
    if !p.eat(TokenKind::CloseParen) {
        return None;
    }

    let if_branch = merge_text(if_branch);
    let else_branch = merge_text(else_branch);
    match (plain_text(&if_branch), plain_text(&else_branch)) {
        (Some(if_text), Some(else_text)) => Some(TemplatePiece::ConditionString(
            ConditionString::new(index, if_text, else_text),
        )),
        _ => Some(TemplatePiece::ConditionMarker(ConditionMarker::new(
            index,
            if_branch,
            else_branch,
        ))),
    }
}

/// Template pieces up to (not including) one of `stops`.
fn branch(p: &mut Parser, stops: &[TokenKind]) -> Option<Vec<TemplatePiece>> {
    let mut pieces = Vec::new();
    while !stops.contains(&p.current()) {
        if p.at(TokenKind::Forwardslash) || !template_piece(p, &mut pieces) {
            return None;
        }
    }
    Some(pieces)
}

/// The text of a branch made only of literal text.
fn plain_text(pieces: &[TemplatePiece]) -> Option<String> {
    match pieces {
        [] => Some(String::new()),
        [TemplatePiece::Text(text)] => Some(text.clone()),
        _ => None,
    }
}
