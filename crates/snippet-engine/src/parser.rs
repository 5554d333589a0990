//! Entry point for turning snippet source into a live [`Snippet`].

use snippet_syntax::{Dialect, Marker, MarkerKind, Parser, apply_case_escapes, parse};

use crate::snippet::Snippet;

/// Parses snippet source of one dialect. The underlying scanner is reused
/// between calls.
pub struct SnippetParser {
    parser: Parser,
}

impl SnippetParser {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            parser: Parser::new(dialect),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.parser.dialect()
    }

    /// Parse `source` into a snippet with primaries assigned and mirrors in
    /// sync, appending `$0` when asked and none exists.
    pub fn parse(&mut self, source: &str, insert_final_tabstop: bool) -> Snippet {
        let mut snippet = Snippet::new(self.parser.parse(source));
        if insert_final_tabstop {
            snippet.insert_final_tabstop();
        }
        snippet
    }

    /// The text `source` displays before any variable or code is resolved.
    pub fn flatten_to_text(&mut self, source: &str) -> String {
        let text = self.parse(source, false).to_string();
        match self.dialect() {
            Dialect::UltiSnips => apply_case_escapes(&text),
            Dialect::TextMate => text,
        }
    }

    /// Escape `value` so it parses back as literal text.
    pub fn escape(value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            if matches!(c, '\\' | '$' | '}') {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }

    /// Whether `value` parses as TextMate text without any snippet construct,
    /// apart from a trailing empty `$0`.
    pub fn is_plain_text(value: &str) -> bool {
        let tree = parse(value, Dialect::TextMate);
        let root = tree.root();
        let mut children = tree.children(root);
        if let [rest @ .., last] = children
            && tree.placeholder(*last).is_some_and(|p| p.is_final())
            && tree.children(*last).is_empty()
        {
            children = rest;
        }
        children.iter().all(|child| {
            tree.walk(*child).into_iter().all(|id| {
                matches!(tree.marker(id), Some(Marker::Text(_)))
                    || tree.kind(id) == Some(MarkerKind::Snippet)
            })
        })
    }
}
