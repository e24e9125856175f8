use std::process::ExitCode;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use clap::Subcommand;
use jblocks_rewrite::StatementTemplate;
use jblocks_rewrite::TypeInfo;
use jblocks_tree::BlockId;
use jblocks_tree::BlockKind;
use jblocks_workspace::EditorSession;
use jblocks_workspace::EventBus;

#[derive(Debug, Parser)]
pub struct Edit {
    #[command(subcommand)]
    op: EditOp,
}

/// Statements are addressed by their source line, the way a renderer
/// addresses them through the line index.
#[derive(Debug, Subcommand)]
enum EditOp {
    /// Insert a fresh statement into the body of the block at --into
    Insert {
        file: Utf8PathBuf,
        /// Line of the container (method, if, while, ...) to insert into
        #[arg(long)]
        into: u32,
        /// Statement kind: print, if, while, do-while, for-each,
        /// switch, break, continue, return, wait, assign:NAME, or
        /// declare:TYPE
        #[arg(long)]
        kind: String,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Delete the statement on a line
    Delete {
        file: Utf8PathBuf,
        #[arg(long)]
        line: u32,
    },
    /// Move the statement on --line into the body of the block at --into
    Move {
        file: Utf8PathBuf,
        #[arg(long)]
        line: u32,
        #[arg(long)]
        into: u32,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Rename the variable or method declared on a line
    Rename {
        file: Utf8PathBuf,
        #[arg(long)]
        line: u32,
        name: String,
    },
    /// Change the declared type on a line, preserving initializer values
    SetType {
        file: Utf8PathBuf,
        #[arg(long)]
        line: u32,
        ty: String,
    },
}

impl Edit {
    pub fn execute(&self) -> Result<ExitCode> {
        let file = self.op.file();
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {file}"))?;
        let mut session =
            EditorSession::new(format!("file://{file}"), text, EventBus::default());

        self.op.apply(&mut session)?;

        print!("{}", session.snapshot().document.text());
        Ok(ExitCode::SUCCESS)
    }
}

impl EditOp {
    fn file(&self) -> &Utf8PathBuf {
        match self {
            EditOp::Insert { file, .. }
            | EditOp::Delete { file, .. }
            | EditOp::Move { file, .. }
            | EditOp::Rename { file, .. }
            | EditOp::SetType { file, .. } => file,
        }
    }

    fn apply(&self, session: &mut EditorSession) -> Result<()> {
        match self {
            EditOp::Insert {
                into, kind, index, ..
            } => {
                let body = body_at_line(session, *into)?;
                let template = parse_template(kind)?;
                session.edit(|rewriter| rewriter.insert_statement(body, *index, &template))?;
            }
            EditOp::Delete { line, .. } => {
                let target = block_at_line(session, *line)?;
                session.edit(|rewriter| rewriter.delete_statement(target))?;
            }
            EditOp::Move {
                line, into, index, ..
            } => {
                let target = block_at_line(session, *line)?;
                let body = body_at_line(session, *into)?;
                session.edit(|rewriter| rewriter.move_statement(target, body, *index))?;
            }
            EditOp::Rename { line, name, .. } => {
                let target = block_at_line(session, *line)?;
                session.edit(|rewriter| rewriter.rename_identifier(target, name))?;
            }
            EditOp::SetType { line, ty, .. } => {
                let target = block_at_line(session, *line)?;
                session.edit(|rewriter| rewriter.change_variable_type(target, ty))?;
            }
        }
        Ok(())
    }
}

fn block_at_line(session: &EditorSession, line: u32) -> Result<BlockId> {
    session
        .snapshot()
        .map
        .block_at_line(line)
        .with_context(|| format!("no block on line {line}"))
}

/// The body belonging to the block on a line: the block itself if it
/// is a body, otherwise its first body child.
fn body_at_line(session: &EditorSession, line: u32) -> Result<BlockId> {
    let id = block_at_line(session, line)?;
    let snapshot = session.snapshot();
    let block = snapshot
        .blocks
        .find(id)
        .with_context(|| format!("no block on line {line}"))?;
    if matches!(block.kind, BlockKind::Body) {
        return Ok(block.id);
    }
    block
        .children
        .iter()
        .find(|child| matches!(child.kind, BlockKind::Body))
        .map(|child| child.id)
        .with_context(|| format!("block on line {line} has no body"))
}

fn parse_template(kind: &str) -> Result<StatementTemplate> {
    if let Some(name) = kind.strip_prefix("assign:") {
        return Ok(StatementTemplate::Assign {
            name: name.to_owned(),
        });
    }
    if let Some(ty) = kind.strip_prefix("declare:") {
        return Ok(StatementTemplate::DeclareVariable(TypeInfo::parse(ty)));
    }
    Ok(match kind {
        "print" => StatementTemplate::Print,
        "if" => StatementTemplate::If,
        "while" => StatementTemplate::While,
        "do-while" => StatementTemplate::DoWhile,
        "for-each" => StatementTemplate::ForEach,
        "switch" => StatementTemplate::Switch,
        "break" => StatementTemplate::Break,
        "continue" => StatementTemplate::Continue,
        "return" => StatementTemplate::Return,
        "wait" => StatementTemplate::Wait,
        other => bail!("unknown statement kind `{other}`"),
    })
}
