//! End-to-end expansion sessions: parse, resolve, evaluate, edit.
//!
//! The evaluator below stands in for real interpreters. Shell and vim
//! blocks echo their code. A python block returns the values of the tab
//! stops it reads joined with `+`, or its own code when it reads none.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use snippet_engine::{
    CodeBlock, CodeEvaluator, CodeKind, Dialect, EvalContext, Snippet, SnippetParser, TabIndex,
};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CodeEvaluator for Recorder {
    async fn evaluate(&self, block: &CodeBlock, context: &EvalContext) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(block.code.clone());
        }
        if block.code == "fail" {
            bail!("evaluation failed");
        }
        Ok(match block.kind {
            CodeKind::Shell => format!("sh:{}", block.code),
            CodeKind::Vim => format!("vim:{}", block.code),
            CodeKind::Python => {
                let related = block.related();
                if related.is_empty() {
                    block.code.clone()
                } else {
                    related
                        .into_iter()
                        .map(|n| {
                            context
                                .values
                                .get(&TabIndex::new(n))
                                .cloned()
                                .unwrap_or_default()
                        })
                        .collect::<Vec<_>>()
                        .join("+")
                }
            }
        })
    }
}

fn ulti(source: &str) -> Snippet {
    SnippetParser::new(Dialect::UltiSnips).parse(source, false)
}

fn edit(snippet: &mut Snippet, index: u32, text: &str) -> snippet_engine::NodeId {
    let primary = snippet.primary(TabIndex::new(index)).unwrap();
    let node = snippet.new_text(text);
    snippet.set_only_child(primary, node).unwrap();
    primary
}

#[tokio::test]
async fn shell_and_vim_blocks_run_first() {
    let mut snippet = ulti("${1:`!p one`} `date` `!v expand('%')`");
    let evaluator = Recorder::default();
    snippet.evaluate_code_blocks(&evaluator).await;

    assert_eq!(evaluator.calls(), vec!["date", "expand('%')", "one"]);
    assert_eq!(snippet.to_string(), "one sh:date vim:expand('%')");
}

#[tokio::test]
async fn python_blocks_see_earlier_tab_stops() {
    let mut snippet = ulti("${1:`!p one`} ${2:`!p t[1]`} ${3:`!p t[1] t[2]`} $3");
    let evaluator = Recorder::default();
    snippet.evaluate_code_blocks(&evaluator).await;
    assert_eq!(snippet.to_string(), "one one one+one one+one");
}

#[tokio::test]
async fn forward_references_skip_bound_python_blocks() {
    let mut snippet = ulti("${1:`!p t[2]`} ${2:`!p t[1]`} `!p free`");
    let evaluator = Recorder::default();
    snippet.evaluate_code_blocks(&evaluator).await;

    assert_eq!(evaluator.calls(), vec!["free"]);
    assert_eq!(snippet.to_string(), "  free");
}

#[tokio::test]
async fn editing_a_tab_stop_reevaluates_dependents() {
    let mut snippet = ulti("${1:a} ${2:`!p t[1]`} ${3:`!p t[2]`} $2");
    let evaluator = Recorder::default();
    snippet.evaluate_code_blocks(&evaluator).await;
    assert_eq!(snippet.to_string(), "a a a a");

    let primary = edit(&mut snippet, 1, "xyz");
    snippet
        .on_placeholder_update_with(primary, &evaluator)
        .await
        .unwrap();
    assert_eq!(snippet.to_string(), "xyz xyz xyz xyz");
    assert_eq!(evaluator.calls().len(), 4);
}

#[tokio::test]
async fn failing_block_renders_empty() {
    let mut snippet = ulti("[`fail`] [${1:`!p fail`}] $1");
    snippet.evaluate_code_blocks(&Recorder::default()).await;
    assert_eq!(snippet.to_string(), "[] [] ");
}

#[tokio::test]
async fn resolution_then_editing() {
    let mut parser = SnippetParser::new(Dialect::TextMate);
    let mut snippet = parser.parse(
        "class ${1:${TM_FILENAME/(.*)\\..+$/${1:/pascalcase}/}} {\n\t${CONSTRUCTOR:new}($2) -> $1$0\n}",
        false,
    );
    let variables: HashMap<String, String> =
        HashMap::from([("TM_FILENAME".to_string(), "user_account.rs".to_string())]);
    snippet.resolve_variables(&variables).await;
    assert_eq!(
        snippet.to_string(),
        "class UserAccount {\n\tnew() -> UserAccount\n}"
    );

    // The unresolved variable became tab stop 3.
    let three = snippet.primary(TabIndex::new(3)).unwrap();
    assert_eq!(snippet.render(three), "new");

    let primary = edit(&mut snippet, 1, "Session");
    snippet.on_placeholder_update(primary).unwrap();
    assert_eq!(
        snippet.to_string(),
        "class Session {\n\tnew() -> Session\n}"
    );
}

#[test]
fn positions_inside_nested_placeholders() {
    let snippet = SnippetParser::new(Dialect::TextMate).parse("This ${1:is ${2:nested}}$0", false);
    let one = snippet.primary(TabIndex::new(1)).unwrap();
    let two = snippet.primary(TabIndex::new(2)).unwrap();

    assert_eq!(snippet.offset(two), Some(8));
    assert_eq!(snippet.text_before(two, None).as_deref(), Some("This is "));
    assert_eq!(snippet.text_before(two, Some(one)).as_deref(), Some("is "));
    assert_eq!(snippet.enclosing_placeholders(two), vec![one]);
    assert_eq!(snippet.subtree_length(one), 9);
    assert_eq!(snippet.length(one), 0);
}

#[test]
fn cloned_snippets_edit_independently() {
    let original = ulti("${1:a} $1");
    let mut copy = original.clone();
    edit(&mut copy, 1, "b");
    let primary = copy.primary(TabIndex::new(1)).unwrap();
    copy.on_placeholder_update(primary).unwrap();

    assert_eq!(copy.to_string(), "b b");
    assert_eq!(original.to_string(), "a a");
}
