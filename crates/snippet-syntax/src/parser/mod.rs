//! # Parser - Event-Based Tree Construction
//!
//! This module turns the token stream of a [`Scanner`] into a
//! [`MarkerTree`] using the event-based architecture from rust-analyzer.
//!
//! ## Why Event-Based Parsing?
//!
//! Snippet syntax is resilient: any construct that fails to match (an
//! unterminated `${`, an invalid regex, an unknown flag) degrades to literal
//! text. That means the grammar constantly parses speculatively and backs
//! out. With events, backing out is cheap: a [`Checkpoint`] records the
//! token position and event count, and [`Parser::rewind`] truncates to it.
//!
//! ## The Pending Node System
//!
//! `parser.start()` reserves a slot in the event list and returns a
//! [`PendingNode`], which **must** be either:
//!
//! - completed with `node.complete(parser, marker)`
//! - abandoned with `node.abandon(parser)`
//! - turned into literal text with `node.abandon_as_text(parser, text)`,
//!   which keeps the children parsed so far but splices them into the
//!   parent (how an unterminated `${1:foo${2:bar}` keeps its inner tab stop)
//!
//! Dropping a pending node without doing either panics.
//!
//! ```ignore
//! let node = p.start();
//! p.bump(); // `$`
//! p.bump(); // `1`
//! node.complete(p, Marker::Placeholder(Placeholder::new(1)));
//! ```
//!
//! ## Public API
//!
//! ```
//! use snippet_syntax::{Dialect, Parser};
//!
//! let mut parser = Parser::new(Dialect::TextMate);
//! let tree = parser.parse("${1:value}");
//! assert_eq!(tree.render(tree.root()), "value");
//! ```

pub mod event;
pub mod sink;

mod grammar;

use crate::dialect::Dialect;
use crate::lexer::{Scanner, Token, TokenKind};
use crate::tree::{Marker, MarkerTree};
use event::Event;
use sink::Sink;

/// The parser state machine.
///
/// Owns a reusable [`Scanner`]; every call to [`Parser::parse`] resets it
/// with the new source. Grammar functions receive `&mut Parser` and use:
///
/// - Inspect tokens: `current()`, `nth()`, `at()`, `at_end()`, `current_text()`
/// - Consume tokens: `bump()`, `eat()`, `bump_as_text()`
/// - Build structure: `start()` -> `PendingNode` -> `complete()`/`abandon()`
/// - Backtrack: `checkpoint()` / `rewind()`
pub struct Parser {
    dialect: Dialect,
    scanner: Scanner,
    tokens: Vec<Token>,
    pos: usize,
    events: Vec<Event>,
}

/// A saved parser position to backtrack to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pos: usize,
    events: usize,
}

impl Parser {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            scanner: Scanner::new(),
            tokens: Vec::new(),
            pos: 0,
            events: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse `source` into a marker tree.
    pub fn parse(&mut self, source: &str) -> MarkerTree {
        self.scanner.reset(source);
        self.tokens.clear();
        self.pos = 0;
        self.events.clear();
        loop {
            let token = self.scanner.next();
            if token.kind == TokenKind::Eof {
                break;
            }
            self.tokens.push(token);
        }

        grammar::root(self);

        let events = std::mem::take(&mut self.events);
        Sink::new(self.dialect, events).finish()
    }

    /// Start a new node and return its pending handle.
    pub(crate) fn start(&mut self) -> PendingNode {
        let pos = self.events.len();
        self.events.push(Event::Placeholder);
        PendingNode {
            pos,
            completed: false,
        }
    }

    /// Emit a node with no children.
    pub(crate) fn leaf(&mut self, marker: Marker) {
        self.events.push(Event::start(marker));
        self.events.push(Event::Finish);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            events: self.events.len(),
        }
    }

    /// Restore the token position and drop every event emitted since
    /// `checkpoint`. Pending nodes started after it must already be
    /// completed or abandoned.
    pub(crate) fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.events.truncate(checkpoint.events);
    }

    /// Current token kind, or EOF if past end.
    pub(crate) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    /// Look ahead n tokens.
    pub(crate) fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    /// Consume the current token if it matches.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume the current token without emitting anything.
    pub(crate) fn bump(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    /// Emit the current token's text and consume it.
    pub(crate) fn bump_as_text(&mut self) {
        let text = self.current_text().to_string();
        self.push_text(text);
        self.bump();
    }

    pub(crate) fn push_text(&mut self, text: impl Into<String>) {
        self.events.push(Event::text(text));
    }

    /// Text of the token `n` ahead, or `""` past the end.
    pub(crate) fn nth_text(&self, n: usize) -> &str {
        self.tokens
            .get(self.pos + n)
            .map(|t| self.scanner.token_text(t))
            .unwrap_or("")
    }

    pub(crate) fn current_text(&self) -> &str {
        self.nth_text(0)
    }
}

/// A node being constructed.
#[must_use = "Pending nodes must be completed or abandoned, dropping them is a bug"]
pub(crate) struct PendingNode {
    /// Position in the events vector of our Placeholder
    pos: usize,
    completed: bool,
}

impl PendingNode {
    /// Complete this node with the given payload.
    pub(crate) fn complete(mut self, p: &mut Parser, marker: Marker) {
        self.completed = true;
        let event_at_pos = &mut p.events[self.pos];
        assert!(matches!(event_at_pos, Event::Placeholder));
        *event_at_pos = Event::start(marker);
        p.events.push(Event::Finish);
    }

    /// Abandon this node without creating it.
    ///
    /// Only removes the placeholder if it is the last event; otherwise the
    /// placeholder becomes inert and the events after it belong to the
    /// parent.
    pub(crate) fn abandon(mut self, p: &mut Parser) {
        self.completed = true;
        if self.pos == p.events.len() - 1 {
            match p.events.pop() {
                Some(Event::Placeholder) => {}
                _ => unreachable!(),
            }
        }
    }

    /// Abandon this node, emitting `text` in its place. Children parsed so
    /// far are kept and end up in the parent.
    pub(crate) fn abandon_as_text(mut self, p: &mut Parser, text: impl Into<String>) {
        self.completed = true;
        let event_at_pos = &mut p.events[self.pos];
        assert!(matches!(event_at_pos, Event::Placeholder));
        *event_at_pos = Event::text(text);
    }
}

impl Drop for PendingNode {
    fn drop(&mut self) {
        if !self.completed && !std::thread::panicking() {
            panic!("PendingNode must be either completed or abandoned");
        }
    }
}

/// Parse `source` with a fresh parser.
pub fn parse(source: &str, dialect: Dialect) -> MarkerTree {
    Parser::new(dialect).parse(source)
}
