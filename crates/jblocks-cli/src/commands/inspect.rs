use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use jblocks_syntax::SyntaxTree;
use jblocks_tree::build_blocks;
use jblocks_tree::Block;
use jblocks_tree::BlockKind;

#[derive(Debug, Parser)]
pub struct Inspect {
    /// Source file to parse.
    file: Utf8PathBuf,

    /// Emit the block tree as JSON instead of an outline.
    #[arg(long)]
    json: bool,
}

impl Inspect {
    pub fn execute(&self, quiet: bool) -> Result<ExitCode> {
        let bytes = std::fs::read(&self.file)
            .with_context(|| format!("failed to read {}", self.file))?;
        let tree = SyntaxTree::from_bytes(&bytes)
            .with_context(|| format!("{} is not valid UTF-8", self.file))?;
        let (blocks, _map) = build_blocks(&tree);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        } else {
            for root in blocks.roots() {
                print_outline(root, 0);
            }
        }

        if !quiet {
            for error in tree.errors() {
                let line = tree.line_index().to_line(error.span.start_offset());
                eprintln!("{}:{line}: {}", self.file, error.message);
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn print_outline(block: &Block, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}{} @{}{}", block.kind.tag(), block.line, detail(&block.kind));
    for child in &block.children {
        print_outline(child, depth + 1);
    }
}

/// Extra context for kinds whose tag alone is ambiguous.
fn detail(kind: &BlockKind) -> String {
    match kind {
        BlockKind::Method { name, .. } | BlockKind::MethodCall { name, .. } => {
            format!(" {name}")
        }
        BlockKind::Enum { name, .. } => format!(" {name}"),
        BlockKind::DeclareVariable { ty, name } => format!(" {ty} {name}"),
        BlockKind::ForEach { ty, var } => format!(" {ty} {var}"),
        BlockKind::Identifier { name } => format!(" {name}"),
        BlockKind::EnumConstant { ty, name } => format!(" {ty}.{name}"),
        BlockKind::StringLiteral { value } => format!(" {value:?}"),
        BlockKind::IntLiteral { text }
        | BlockKind::FloatLiteral { text }
        | BlockKind::DoubleLiteral { text } => format!(" {text}"),
        BlockKind::BooleanLiteral { value } => format!(" {value}"),
        _ => String::new(),
    }
}
