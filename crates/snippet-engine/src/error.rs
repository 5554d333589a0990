use snippet_syntax::{NodeId, TabIndex, TreeError};
use thiserror::Error;

/// Errors from runtime operations on a [`Snippet`](crate::Snippet).
///
/// A failed operation leaves the snippet unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SnippetError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("node {0:?} is not a placeholder")]
    NotAPlaceholder(NodeId),

    #[error("placeholder {0:?} is a mirror, not the primary of its index")]
    NotPrimary(NodeId),

    #[error("tab stop {index} would have two primary placeholders")]
    DuplicatePrimary { index: TabIndex },

    #[error("tab stop {index} is already used by an enclosing placeholder")]
    AncestorIndex { index: TabIndex },
}
