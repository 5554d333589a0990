//! Tab stops, variables and choices.

use super::{element, transform};
use crate::lexer::TokenKind;
use crate::parser::{Checkpoint, Parser, PendingNode};
use crate::tree::{Choice, Marker, Placeholder, Variable};

fn fail(p: &mut Parser, node: PendingNode, checkpoint: Checkpoint) -> bool {
    node.abandon(p);
    p.rewind(checkpoint);
    false
}

/// `$1` or `$name`.
pub(super) fn tabstop_or_variable_name(p: &mut Parser) -> bool {
    if !p.at(TokenKind::Dollar) {
        return false;
    }
    match p.nth(1) {
        TokenKind::Int => {
            let Ok(index) = p.nth_text(1).parse::<u32>() else {
                return false;
            };
            p.bump();
            p.bump();
            p.leaf(Marker::Placeholder(Placeholder::new(index)));
            true
        }
        TokenKind::VariableName if p.dialect().accepts_variable(p.nth_text(1)) => {
            let name = p.nth_text(1).to_string();
            p.bump();
            p.bump();
            p.leaf(Marker::Variable(Variable::new(name)));
            true
        }
        _ => false,
    }
}

/// `${1}`, `${1:default}`, `${1|one,two|}`, `${1/regex/format/flags}`.
pub(super) fn complex_placeholder(p: &mut Parser) -> bool {
    if !(p.at(TokenKind::Dollar) && p.nth(1) == TokenKind::CurlyOpen && p.nth(2) == TokenKind::Int) {
        return false;
    }
    let Ok(index) = p.nth_text(2).parse::<u32>() else {
        return false;
    };
    let opener = format!("${{{}:", p.nth_text(2));
    let checkpoint = p.checkpoint();
    let node = p.start();
    p.bump(); // $
    p.bump(); // {
    p.bump(); // index
    let mut placeholder = Placeholder::new(index);

    if p.eat(TokenKind::Colon) {
        loop {
            if p.eat(TokenKind::CurlyClose) {
                node.complete(p, Marker::Placeholder(placeholder));
                return true;
            }
            if element(p) {
                continue;
            }
            // unterminated: keep the children, the opener becomes text
            node.abandon_as_text(p, opener);
            return true;
        }
    }

    if index > 0 && p.eat(TokenKind::Pipe) {
        let mut options = Vec::new();
        loop {
            let Some(option) = choice_option(p) else {
                break;
            };
            options.push(option);
            if p.eat(TokenKind::Comma) {
                continue;
            }
            if p.eat(TokenKind::Pipe) && p.eat(TokenKind::CurlyClose) {
                p.leaf(Marker::Choice(Choice::new(options)));
                node.complete(p, Marker::Placeholder(placeholder));
                return true;
            }
            break;
        }
        return fail(p, node, checkpoint);
    }

    if p.eat(TokenKind::Forwardslash) {
        return match transform::transform(p) {
            Some(t) => {
                placeholder.transform = Some(t);
                node.complete(p, Marker::Placeholder(placeholder));
                true
            }
            None => fail(p, node, checkpoint),
        };
    }

    if p.eat(TokenKind::CurlyClose) {
        node.complete(p, Marker::Placeholder(placeholder));
        return true;
    }

    fail(p, node, checkpoint)
}

/// One choice option, up to the next `,` or `|`. Options may escape `,`,
/// `|` and `\`; an empty option or end of input fails.
fn choice_option(p: &mut Parser) -> Option<String> {
    let mut value = String::new();
    loop {
        match p.current() {
            TokenKind::Comma | TokenKind::Pipe => break,
            TokenKind::Eof => return None,
            TokenKind::Backslash => {
                p.bump();
                if matches!(
                    p.current(),
                    TokenKind::Comma | TokenKind::Pipe | TokenKind::Backslash
                ) {
                    value.push_str(p.current_text());
                    p.bump();
                } else {
                    value.push('\\');
                }
            }
            _ => {
                value.push_str(p.current_text());
                p.bump();
            }
        }
    }
    (!value.is_empty()).then_some(value)
}

/// `${name}`, `${name:default}`, `${name/regex/format/flags}`.
pub(super) fn complex_variable(p: &mut Parser) -> bool {
    if !(p.at(TokenKind::Dollar)
        && p.nth(1) == TokenKind::CurlyOpen
        && p.nth(2) == TokenKind::VariableName
        && p.dialect().accepts_variable(p.nth_text(2)))
    {
        return false;
    }
    let name = p.nth_text(2).to_string();
    let opener = format!("${{{name}:");
    let checkpoint = p.checkpoint();
    let node = p.start();
    p.bump(); // $
    p.bump(); // {
    p.bump(); // name
    let mut variable = Variable::new(name);

    if p.eat(TokenKind::Colon) {
        loop {
            if p.eat(TokenKind::CurlyClose) {
                node.complete(p, Marker::Variable(variable));
                return true;
            }
            if element(p) {
                continue;
            }
            node.abandon_as_text(p, opener);
            return true;
        }
    }

    if p.eat(TokenKind::Forwardslash) {
        return match transform::transform(p) {
            Some(t) => {
                variable.transform = Some(t);
                node.complete(p, Marker::Variable(variable));
                true
            }
            None => fail(p, node, checkpoint),
        };
    }

    if p.eat(TokenKind::CurlyClose) {
        node.complete(p, Marker::Variable(variable));
        return true;
    }

    fail(p, node, checkpoint)
}
