use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use snippet_config::Config;
use snippet_engine::{Dialect, Marker, MarkerTree, NodeId, SnippetParser};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

mod capabilities;

use capabilities::{ConfigResolver, ShellEvaluator};

#[derive(Parser)]
#[command(name = "snippet")]
#[command(version)]
#[command(about = "Render, inspect and escape TextMate and UltiSnips snippets")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Parse snippets as UltiSnips instead of TextMate
    #[arg(long, global = true)]
    ultisnips: bool,

    /// Do not append a final `$0` tab stop
    #[arg(long, global = true)]
    no_final_tabstop: bool,

    /// Config file to use instead of ~/.config/snippet-engine/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve variables, run shell blocks when enabled and print the text
    Render {
        /// Snippet file (reads stdin if not provided or `-`)
        file: Option<PathBuf>,

        /// Run shell code blocks even when the config does not enable it
        #[arg(long)]
        evaluate: bool,
    },

    /// Print the text the snippet shows before any resolution
    Flatten {
        /// Snippet file (reads stdin if not provided or `-`)
        file: Option<PathBuf>,
    },

    /// Print the canonical snippet source
    Canonical {
        /// Snippet file (reads stdin if not provided or `-`)
        file: Option<PathBuf>,
    },

    /// Print the parsed marker tree
    Tree {
        /// Snippet file (reads stdin if not provided or `-`)
        file: Option<PathBuf>,
    },

    /// Escape text so it can be embedded in a snippet literally
    Escape {
        /// Text file (reads stdin if not provided or `-`)
        file: Option<PathBuf>,
    },
}

impl Commands {
    fn file(&self) -> Option<&Path> {
        match self {
            Commands::Render { file, .. }
            | Commands::Flatten { file }
            | Commands::Canonical { file }
            | Commands::Tree { file }
            | Commands::Escape { file } => file.as_deref(),
        }
    }
}

/// Config file values with command-line flags applied on top.
fn load_config(cli: &Cli) -> Result<Config> {
    let loaded = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            log::debug!("Config path: {}", Config::config_path().display());
            Config::load().context("Failed to load config")?
        }
    };
    let mut config = loaded.unwrap_or_default();
    config.ultisnips |= cli.ultisnips;
    if cli.no_final_tabstop {
        config.insert_final_tabstop = false;
    }
    if let Commands::Render { evaluate: true, .. } = cli.command {
        config.evaluate_code = true;
    }
    Ok(config)
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    let content = match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut content = String::new();
            tokio::io::stdin()
                .read_to_string(&mut content)
                .await
                .context("Failed to read stdin")?;
            content
        }
    };
    // Editors save files with a trailing newline that is not part of the body
    Ok(match content.strip_suffix('\n') {
        Some(body) => body.to_string(),
        None => content,
    })
}

/// Indented dump of a marker tree, one node per line.
fn dump_tree(tree: &MarkerTree) -> String {
    let mut out = String::new();
    dump_node(tree, tree.root(), 0, &mut out);
    out
}

fn dump_node(tree: &MarkerTree, id: NodeId, depth: usize, out: &mut String) {
    let Some(marker) = tree.marker(id) else {
        return;
    };
    let label = match marker {
        Marker::Snippet => "Snippet".to_string(),
        Marker::Text(text) => format!("Text {text:?}"),
        Marker::Placeholder(p) => {
            let mut label = format!("Placeholder {}", p.index);
            if p.primary {
                label.push_str(" primary");
            }
            if let Some(transform) = &p.transform {
                label.push_str(&format!(" /{}", transform.to_source(tree.dialect())));
            }
            label
        }
        Marker::Variable(v) => match &v.value {
            Some(value) => format!("Variable {} = {value:?}", v.name),
            None => format!("Variable {}", v.name),
        },
        Marker::Choice(choice) => format!("Choice {:?}", choice.options),
        Marker::CodeBlock(block) => match &block.value {
            Some(value) => format!("CodeBlock {:?} {:?} = {value:?}", block.kind, block.code),
            None => format!("CodeBlock {:?} {:?}", block.kind, block.code),
        },
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&label);
    out.push('\n');
    for child in tree.children(id) {
        dump_node(tree, *child, depth + 1, out);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let input = read_input(cli.command.file()).await?;
    let dialect = Dialect::from_ultisnips(config.ultisnips);
    let mut parser = SnippetParser::new(dialect);

    match cli.command {
        Commands::Render { .. } => {
            let mut snippet = parser.parse(&input, config.insert_final_tabstop);
            snippet
                .resolve_variables(&ConfigResolver::new(config.variables))
                .await;
            if config.evaluate_code {
                snippet
                    .evaluate_code_blocks(&ShellEvaluator::new(config.shell))
                    .await;
            } else if snippet.has_code_block() {
                log::info!("Code blocks left empty; pass --evaluate to run shell blocks");
            }
            println!("{snippet}");
        }
        Commands::Flatten { .. } => println!("{}", parser.flatten_to_text(&input)),
        Commands::Canonical { .. } => {
            println!("{}", parser.parse(&input, config.insert_final_tabstop).to_source());
        }
        Commands::Tree { .. } => {
            let snippet = parser.parse(&input, config.insert_final_tabstop);
            print!("{}", dump_tree(snippet.tree()));
        }
        Commands::Escape { .. } => println!("{}", SnippetParser::escape(&input)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tree_dump_shows_every_node() {
        let snippet =
            SnippetParser::new(Dialect::TextMate).parse("a ${1:b} ${2|x,y|} $1 $NAME", true);
        assert_eq!(
            dump_tree(snippet.tree()),
            [
                "Snippet",
                "  Text \"a \"",
                "  Placeholder 1 primary",
                "    Text \"b\"",
                "  Text \" \"",
                "  Placeholder 2 primary",
                "    Choice [\"x\", \"y\"]",
                "  Text \" \"",
                "  Placeholder 1",
                "    Text \"b\"",
                "  Text \" \"",
                "  Variable NAME",
                "  Placeholder 0 primary",
                "",
            ]
            .join("\n")
        );
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "snippet",
            "--ultisnips",
            "--no-final-tabstop",
            "--config",
            "/nonexistent/snippet-config.toml",
            "render",
            "--evaluate",
        ]);
        let config = load_config(&cli).unwrap();
        assert!(config.ultisnips);
        assert!(!config.insert_final_tabstop);
        assert!(config.evaluate_code);
        assert_eq!(config.shell, "sh");
    }

    #[test]
    fn dash_means_stdin() {
        let cli = Cli::parse_from(["snippet", "escape", "-"]);
        assert_eq!(cli.command.file(), Some(Path::new("-")));
        let cli = Cli::parse_from(["snippet", "tree"]);
        assert_eq!(cli.command.file(), None);
    }
}
