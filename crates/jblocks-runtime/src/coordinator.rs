//! The compile → launch → attach pipeline, and the translation layer
//! between debugger line numbers and block identities.

use std::time::Duration;

use camino::Utf8PathBuf;
use jblocks_debug::AttachConfig;
use jblocks_debug::DebuggerSession;
use jblocks_debug::SessionEvent;
use jblocks_tree::BlockId;
use jblocks_tree::BlockTree;
use jblocks_tree::NodeBlockMap;
use tokio::sync::mpsc;

use crate::compile::Compiler;
use crate::error::RuntimeError;
use crate::launch;
use crate::launch::LaunchedProcess;
use crate::launch::ProcessOutput;

/// Everything a debug run needs that does not come from the snapshot.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub java: Utf8PathBuf,
    pub javac: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
    pub main_class: String,
    pub extra_flags: Vec<String>,
    pub attach_retries: u32,
    pub attach_delay: Duration,
    /// How long to wait for a graceful protocol shutdown before the
    /// process is force-killed.
    pub shutdown_grace: Duration,
}

/// What a debug run reports back to its owner. Pauses carry the block
/// resolved through the snapshot's line index when there is one; a
/// line with no block is still a pause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugNotice {
    Output(ProcessOutput),
    Attached,
    Paused {
        line: Option<u32>,
        block: Option<BlockId>,
    },
    Resumed,
    Finished,
}

/// One debug run: a compiled debuggee process plus the session
/// attached to it.
pub struct DebugCoordinator {
    session: DebuggerSession,
    process: LaunchedProcess,
    output: mpsc::UnboundedReceiver<ProcessOutput>,
    lines: NodeBlockMap,
    shutdown_grace: Duration,
    finished: bool,
}

/// Source lines to break on: every block carrying a breakpoint,
/// resolved through the map. With no breakpoints set the first mapped
/// line is used, so a run always stops before its first statement.
#[must_use]
pub fn breakpoint_lines(tree: &BlockTree, map: &NodeBlockMap) -> Vec<u32> {
    let mut lines: Vec<u32> = tree
        .preorder()
        .filter(|block| block.has_breakpoint)
        .filter_map(|block| map.line_of_block(block.id))
        .collect();
    lines.sort_unstable();
    lines.dedup();

    if lines.is_empty() {
        if let Some(first) = map.first_mapped_line() {
            lines.push(first);
        }
    }
    lines
}

impl DebugCoordinator {
    /// Compile the snapshot's source, launch it suspended under the
    /// debug agent, and attach with the snapshot's breakpoints.
    pub async fn start(
        config: RunConfig,
        source: &str,
        tree: &BlockTree,
        map: &NodeBlockMap,
    ) -> Result<Self, RuntimeError> {
        let compiler = Compiler::new(config.javac.clone(), config.out_dir.clone());
        compiler.compile(source, &config.main_class).await?;

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let mut process = launch::launch(
            &config.java,
            compiler.classpath(),
            &config.main_class,
            &config.extra_flags,
            output_tx,
        )?;

        let attach = AttachConfig {
            host: "127.0.0.1".to_owned(),
            port: process.port(),
            main_class: config.main_class.clone(),
            breakpoint_lines: breakpoint_lines(tree, map),
            max_retries: config.attach_retries,
            retry_delay: config.attach_delay,
        };
        let session = match DebuggerSession::attach(attach).await {
            Ok(session) => session,
            Err(error) => {
                process.kill().await;
                return Err(error.into());
            }
        };

        Ok(Self {
            session,
            process,
            output: output_rx,
            lines: map.clone(),
            shutdown_grace: config.shutdown_grace,
            finished: false,
        })
    }

    pub fn resume(&self) {
        self.session.resume();
    }

    pub fn step_over(&self) {
        self.session.step_over();
    }

    /// Next notification from the run, or `None` once it has finished
    /// and both output streams have drained.
    pub async fn next_notice(&mut self) -> Option<DebugNotice> {
        if self.finished {
            // Session over; drain remaining debuggee output.
            return self.output.recv().await.map(DebugNotice::Output);
        }
        tokio::select! {
            line = self.output.recv() => match line {
                Some(line) => Some(DebugNotice::Output(line)),
                // Output closed; keep relaying session events.
                None => self.session_notice().await,
            },
            event = self.session.next_event() => match event {
                Some(event) => Some(self.translate(event)),
                None => {
                    self.finished = true;
                    Some(DebugNotice::Finished)
                }
            },
        }
    }

    async fn session_notice(&mut self) -> Option<DebugNotice> {
        match self.session.next_event().await {
            Some(event) => Some(self.translate(event)),
            None => {
                self.finished = true;
                Some(DebugNotice::Finished)
            }
        }
    }

    fn translate(&mut self, event: SessionEvent) -> DebugNotice {
        match event {
            SessionEvent::Attached => DebugNotice::Attached,
            SessionEvent::Paused { line, .. } => DebugNotice::Paused {
                line,
                block: line.and_then(|line| self.lines.block_at_line(line)),
            },
            SessionEvent::Resumed => DebugNotice::Resumed,
            SessionEvent::Disconnected => {
                self.finished = true;
                DebugNotice::Finished
            }
        }
    }

    /// Tear the run down: ask the session to dispose, wait a bounded
    /// grace interval, then kill the process. Idempotent.
    pub async fn stop(&mut self) {
        if !self.finished {
            self.session.stop();
            let deadline = tokio::time::timeout(self.shutdown_grace, async {
                while let Some(event) = self.session.next_event().await {
                    if event == SessionEvent::Disconnected {
                        break;
                    }
                }
            });
            if deadline.await.is_err() {
                tracing::debug!("graceful shutdown timed out, killing debuggee");
            }
            self.finished = true;
        }
        self.process.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use jblocks_syntax::SyntaxTree;
    use jblocks_tree::build_blocks;

    use super::*;

    const SOURCE: &str = "\
public class Demo {
    public static void main(String[] args) {
        int x = 1;
        System.out.println(x);
    }
}
";

    fn snapshot() -> (BlockTree, NodeBlockMap) {
        let tree = SyntaxTree::parse(SOURCE);
        build_blocks(&tree)
    }

    #[test]
    fn breakpoints_resolve_to_their_blocks_lines() {
        let (mut tree, map) = snapshot();
        let print = tree
            .preorder()
            .find(|block| matches!(block.kind, jblocks_tree::BlockKind::Print))
            .expect("print block")
            .id;
        let mut wanted = rustc_hash::FxHashSet::default();
        wanted.insert(print);
        tree.mark_breakpoints(&wanted);

        assert_eq!(breakpoint_lines(&tree, &map), vec![4]);
    }

    #[test]
    fn breakpoint_resolution_is_idempotent() {
        let (mut tree, map) = snapshot();
        let ids: Vec<BlockId> = tree
            .preorder()
            .filter(|block| block.kind.is_statement())
            .map(|block| block.id)
            .collect();
        let wanted: rustc_hash::FxHashSet<BlockId> = ids.into_iter().collect();
        tree.mark_breakpoints(&wanted);

        let first = breakpoint_lines(&tree, &map);
        let second = breakpoint_lines(&tree, &map);
        assert_eq!(first, second);
    }

    #[test]
    fn no_breakpoints_falls_back_to_the_first_mapped_line() {
        let (tree, map) = snapshot();
        let lines = breakpoint_lines(&tree, &map);
        assert_eq!(lines, vec![map.first_mapped_line().expect("mapped line")]);
    }
}
