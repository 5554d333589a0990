//! Variable and code capabilities backed by the local machine.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use snippet_engine::{CodeBlock, CodeEvaluator, CodeKind, EvalContext, VariableResolver};

/// Looks variables up in the config table, then in the process environment.
pub struct ConfigResolver {
    variables: BTreeMap<String, String>,
}

impl ConfigResolver {
    pub fn new(variables: BTreeMap<String, String>) -> Self {
        Self { variables }
    }
}

#[async_trait]
impl VariableResolver for ConfigResolver {
    async fn resolve(&self, name: &str) -> Result<Option<String>> {
        if let Some(value) = self.variables.get(name) {
            return Ok(Some(value.clone()));
        }
        Ok(std::env::var(name).ok())
    }
}

/// Runs shell blocks as `<shell> -c <code>`. Vim and python blocks need an
/// editor and are rejected.
pub struct ShellEvaluator {
    shell: String,
}

impl ShellEvaluator {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl CodeEvaluator for ShellEvaluator {
    async fn evaluate(&self, block: &CodeBlock, _context: &EvalContext) -> Result<String> {
        if block.kind != CodeKind::Shell {
            log::warn!("Skipping {:?} block, only shell blocks can run here", block.kind);
            bail!("{:?} blocks are not supported", block.kind);
        }
        if block.code.trim().is_empty() {
            return Ok(String::new());
        }

        let output = tokio::process::Command::new(&self.shell)
            .arg("-c")
            .arg(&block.code)
            .output()
            .await
            .with_context(|| format!("Failed to start {}", self.shell))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "`{}` failed (exit {}): {}",
                block.code,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
            bail!("`{}` failed", block.code);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches(['\n', '\r']).to_string())
    }
}
