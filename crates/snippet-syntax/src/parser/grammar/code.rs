//! UltiSnips interpolation: `` `shell` ``, `` `!v vim` `` and `` `!p python` ``.

use crate::lexer::TokenKind;
use crate::parser::Parser;
use crate::tree::{CodeBlock, CodeKind, Marker};

pub(super) fn code_block(p: &mut Parser) -> bool {
    if !p.dialect().is_ultisnips() || !p.at(TokenKind::Backtick) {
        return false;
    }
    let checkpoint = p.checkpoint();
    p.bump();

    let kind = if p.at(TokenKind::Format) && p.current_text() == "!" {
        match p.nth_text(1) {
            "p" => Some(CodeKind::Python),
            "v" => Some(CodeKind::Vim),
            _ => None,
        }
    } else {
        None
    };
    let kind = match kind {
        Some(kind) => {
            p.bump();
            p.bump();
            kind
        }
        None => CodeKind::Shell,
    };

    let mut body = String::new();
    loop {
        match p.current() {
            TokenKind::Backtick => {
                p.bump();
                break;
            }
            TokenKind::Eof => {
                p.rewind(checkpoint);
                return false;
            }
            TokenKind::Backslash if p.nth(1) == TokenKind::Backtick => {
                body.push_str("\\`");
                p.bump();
                p.bump();
            }
            _ => {
                body.push_str(p.current_text());
                p.bump();
            }
        }
    }

    let code = match kind {
        CodeKind::Python => python_body(&body),
        CodeKind::Shell | CodeKind::Vim => body.trim().to_string(),
    };
    p.leaf(Marker::CodeBlock(CodeBlock::new(kind, code)));
    true
}

/// Drop a blank first line (or the leading whitespace of a one-line body),
/// then remove the indentation shared by all lines.
fn python_body(body: &str) -> String {
    let body = match body.split_once('\n') {
        Some((first, rest)) if first.trim().is_empty() => rest,
        _ => body.trim_start(),
    };
    dedent(body).trim_end().to_string()
}

fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}
