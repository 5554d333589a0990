//! # Transform Engine
//!
//! A [`Transform`] is the `/regex/format/flags` suffix of a placeholder or
//! variable: a compiled regex plus a replacement template. The template is a
//! list of [`TemplatePiece`]s:
//!
//! - literal text
//! - [`FormatString`] - a capture group reference (`$1`, `${1:/upcase}`, ...)
//! - [`ConditionString`] / [`ConditionMarker`] - `(?1:if:else)` (UltiSnips)
//! - [`CaseEscape`] - `\u`, `\U`, ... directives (UltiSnips)
//!
//! ## Resolution
//!
//! [`Transform::resolve`] behaves like a regex replace: the first match (or
//! every match with the `g` flag) is substituted by the rendered template
//! while the unmatched parts of the input are kept. Input that the regex does
//! not match at all resolves to the empty string.
//!
//! ## Regex Dialect
//!
//! Patterns are compiled with the [`regex`] crate. Lookaround and
//! backreferences are not supported by it; a transform using them fails to
//! compile and the parser degrades the whole construct to literal text.

mod condition;
mod escape;
mod format;

use std::borrow::Cow;
use std::fmt;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::dialect::Dialect;

pub use condition::{ConditionMarker, ConditionString};
pub use escape::{CaseEscape, apply_case_escapes};
pub use format::{FormatString, Shorthand};

pub(crate) use escape::{Segment, fold_segments};

/// Why a transform could not be built.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unknown regex flag '{0}'")]
    UnknownFlag(char),

    #[error("invalid regex pattern")]
    Regex(#[from] regex::Error),
}

/// Regex flags accepted after the final `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransformFlags {
    /// `g` - replace every match instead of the first
    pub global: bool,
    /// `i`
    pub case_insensitive: bool,
    /// `m` - `^`/`$` match at line boundaries
    pub multi_line: bool,
    /// `s` - `.` matches newlines
    pub dot_matches_new_line: bool,
    /// `u` - accepted for compatibility; patterns are always Unicode-aware
    pub unicode: bool,
    /// `a` - fold the input to ASCII before matching
    pub ascii: bool,
}

impl TransformFlags {
    pub fn parse(flags: &str) -> Result<Self, TransformError> {
        let mut parsed = TransformFlags::default();
        for c in flags.chars() {
            match c {
                'g' => parsed.global = true,
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_matches_new_line = true,
                'u' => parsed.unicode = true,
                'a' => parsed.ascii = true,
                other => return Err(TransformError::UnknownFlag(other)),
            }
        }
        Ok(parsed)
    }
}

impl fmt::Display for TransformFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.case_insensitive, 'i'),
            (self.global, 'g'),
            (self.multi_line, 'm'),
            (self.dot_matches_new_line, 's'),
            (self.unicode, 'u'),
            (self.ascii, 'a'),
        ];
        for (set, flag) in flags {
            if set {
                write!(f, "{flag}")?;
            }
        }
        Ok(())
    }
}

/// One element of a replacement template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplatePiece {
    Text(String),
    Escape(CaseEscape),
    Format(FormatString),
    ConditionString(ConditionString),
    ConditionMarker(ConditionMarker),
}

pub(crate) fn render_pieces(pieces: &[TemplatePiece], groups: &[Option<&str>], out: &mut Vec<Segment>) {
    for piece in pieces {
        match piece {
            TemplatePiece::Text(text) => out.push(Segment::Text(text.clone())),
            TemplatePiece::Escape(escape) => out.push(Segment::Escape(*escape)),
            TemplatePiece::Format(format) => {
                let value = groups.get(format.index).copied().flatten();
                out.push(Segment::Text(format.resolve(value)));
            }
            TemplatePiece::ConditionString(condition) => {
                out.push(Segment::Text(condition.resolve(groups)));
            }
            TemplatePiece::ConditionMarker(condition) => condition.render(groups, out),
        }
    }
}

/// Escape literal template text so it parses back as the same text.
pub(crate) fn escape_template_text(text: &str, dialect: Dialect) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let special = match c {
            '\\' | '/' | '$' | '}' => true,
            '(' | ')' | ':' => dialect.is_ultisnips(),
            _ => false,
        };
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) fn write_pieces(
    f: &mut fmt::Formatter<'_>,
    pieces: &[TemplatePiece],
    dialect: Dialect,
) -> fmt::Result {
    for piece in pieces {
        match piece {
            TemplatePiece::Text(text) => write!(f, "{}", escape_template_text(text, dialect))?,
            TemplatePiece::Escape(escape) => write!(f, "\\{}", escape.as_char())?,
            TemplatePiece::Format(format) => write!(f, "{format}")?,
            TemplatePiece::ConditionString(condition) => write!(f, "{condition}")?,
            TemplatePiece::ConditionMarker(condition) => write!(f, "{condition}")?,
        }
    }
    Ok(())
}

/// Strip diacritics: decompose and drop combining marks.
fn fold_to_ascii(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// A regex rewrite rule: `/pattern/template/flags`.
#[derive(Debug, Clone)]
pub struct Transform {
    pattern: String,
    regex: Regex,
    flags: TransformFlags,
    pieces: Vec<TemplatePiece>,
}

impl Transform {
    pub fn new(
        pattern: impl Into<String>,
        pieces: Vec<TemplatePiece>,
        flags: TransformFlags,
    ) -> Result<Self, TransformError> {
        let pattern = pattern.into();
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .build()?;
        Ok(Self {
            pattern,
            regex,
            flags,
            pieces,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn flags(&self) -> TransformFlags {
        self.flags
    }

    pub fn pieces(&self) -> &[TemplatePiece] {
        &self.pieces
    }

    /// Rewrite `input`; returns `""` when the regex does not match.
    pub fn resolve(&self, input: &str) -> String {
        let subject: Cow<'_, str> = if self.flags.ascii {
            Cow::Owned(fold_to_ascii(input))
        } else {
            Cow::Borrowed(input)
        };

        let mut segments = Vec::new();
        let mut last = 0;
        let mut matched = false;

        for captures in self.regex.captures_iter(&subject) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            matched = true;
            segments.push(Segment::Text(subject[last..whole.start()].to_string()));
            let groups: Vec<Option<&str>> = captures
                .iter()
                .map(|group| group.map(|m| m.as_str()))
                .collect();
            render_pieces(&self.pieces, &groups, &mut segments);
            last = whole.end();
            if !self.flags.global {
                break;
            }
        }

        if !matched {
            return String::new();
        }
        segments.push(Segment::Text(subject[last..].to_string()));
        fold_segments(&segments)
    }

    /// Canonical `regex/template/flags` source (without the leading `/`).
    pub fn to_source(&self, dialect: Dialect) -> String {
        struct Template<'a>(&'a [TemplatePiece], Dialect);

        impl fmt::Display for Template<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_pieces(f, self.0, self.1)
            }
        }

        format!(
            "{}/{}/{}",
            self.pattern.replace('/', "\\/"),
            Template(&self.pieces, dialect),
            self.flags
        )
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.flags == other.flags && self.pieces == other.pieces
    }
}

impl Eq for Transform {}
