//! # snippet-engine
//!
//! Runtime behavior on top of [`snippet_syntax`] trees: a [`Snippet`] keeps
//! one primary placeholder per tab stop, propagates its text to mirrors,
//! resolves variables and evaluates code blocks through host capabilities,
//! and validates structural edits.
//!
//! ## Lifecycle
//!
//! ```text
//! source ─► SnippetParser::parse ─► Snippet
//!                                     │ resolve_variables(resolver).await
//!                                     │ evaluate_code_blocks(evaluator).await
//!                                     ▼
//!                         session edits a primary placeholder
//!                                     │ on_placeholder_update(primary)
//!                                     ▼
//!                          mirrors show the new text
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use snippet_engine::{Dialect, SnippetParser};
//!
//! let mut parser = SnippetParser::new(Dialect::UltiSnips);
//! let snippet = parser.parse("${1:foo} ${1/^(\\w)/\\u$1/}", true);
//! assert_eq!(snippet.to_string(), "foo Foo");
//! ```
//!
//! Everything runs on the caller's task. The only suspension points are the
//! awaited [`VariableResolver`] and [`CodeEvaluator`] calls.

pub mod capability;
pub mod error;
mod mirror;
mod mutation;
pub mod parser;
mod python;
mod resolve;
pub mod snippet;

pub use capability::{CodeEvaluator, EvalContext, VariableResolver};
pub use error::SnippetError;
pub use parser::SnippetParser;
pub use snippet::Snippet;

pub use snippet_syntax::{
    CodeBlock, CodeKind, Dialect, Marker, MarkerKind, MarkerTree, NodeId, Placeholder, TabIndex,
    TreeError,
};
