//! # Parser Events
//!
//! The grammar does not build tree nodes directly. It emits a flat sequence
//! of events that the [`Sink`](super::sink::Sink) turns into a
//! [`MarkerTree`](crate::tree::MarkerTree):
//!
//! ```text
//! Start(Placeholder 1)   <- `${1:`
//!   Text("foo")
//! Finish                 <- `}`
//! ```
//!
//! Because nothing is built until parsing ends, backtracking out of a failed
//! construct is a matter of truncating the event list.

use crate::tree::Marker;

/// An event emitted by the parser during tree construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin a new node carrying `marker`.
    Start { marker: Marker },

    /// Literal text for the current node. Adjacent text events are merged
    /// into a single Text node by the sink.
    Text(String),

    /// Finish the current node.
    Finish,

    /// Reserved by `parser.start()`; replaced on completion, ignored by the
    /// sink when the node was abandoned.
    Placeholder,
}

impl Event {
    pub fn start(marker: Marker) -> Self {
        Event::Start { marker }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Event::Text(text.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_constructors() {
        assert_eq!(
            Event::start(Marker::Snippet),
            Event::Start {
                marker: Marker::Snippet
            }
        );
        assert_eq!(Event::text("a"), Event::Text("a".to_string()));
    }
}
