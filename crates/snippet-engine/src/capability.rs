//! # External Capabilities
//!
//! Variable values and code block output come from the host. Both are
//! modeled as object-safe async traits so a session can plug in anything
//! from a static table to an interactive prompt:
//!
//! ```
//! use std::collections::HashMap;
//! use snippet_engine::VariableResolver;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut vars = HashMap::new();
//! vars.insert("TM_FILENAME".to_string(), "main.rs".to_string());
//! assert_eq!(vars.resolve("TM_FILENAME").await?, Some("main.rs".to_string()));
//! assert_eq!(vars.resolve("MISSING").await?, None);
//! # Ok(())
//! # }
//! ```
//!
//! The engine calls capabilities one at a time, in document order, and
//! never while another call on the same snippet is pending. An `Err` is
//! treated exactly like "no value": the variable stays unresolved and the
//! code block renders empty.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use snippet_syntax::{CodeBlock, TabIndex};

/// Looks up the value of a snippet variable such as `TM_FILENAME`.
#[async_trait]
pub trait VariableResolver: Send + Sync {
    /// `Ok(None)` when the variable is unknown.
    async fn resolve(&self, name: &str) -> Result<Option<String>>;
}

#[async_trait]
impl VariableResolver for HashMap<String, String> {
    async fn resolve(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

#[async_trait]
impl VariableResolver for BTreeMap<String, String> {
    async fn resolve(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

/// What a code block can see of the snippet when it runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    /// Current text of every tab stop (`t[N]` in python blocks)
    pub values: BTreeMap<TabIndex, String>,
    /// Index of the placeholder the block lives in, if any
    pub index: Option<TabIndex>,
}

/// Runs shell, vim and python code blocks.
#[async_trait]
pub trait CodeEvaluator: Send + Sync {
    /// Evaluate `block` and return the text it produces. Blocks with empty
    /// code must be accepted.
    async fn evaluate(&self, block: &CodeBlock, context: &EvalContext) -> Result<String>;
}
