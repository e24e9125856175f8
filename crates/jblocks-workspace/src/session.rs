//! The editor session: the one owner of the document and its current
//! snapshot.
//!
//! All mutation funnels through [`EditorSession::commit`]; readers
//! take [`Snapshot`] clones (cheap `Arc`s) and keep working against
//! them even if a commit lands underneath, rather than observing a
//! half-updated view.

use std::sync::Arc;

use jblocks_rewrite::AstRewriter;
use jblocks_rewrite::RewriteError;
use jblocks_source::TextDocument;
use jblocks_syntax::SyntaxTree;
use jblocks_tree::build_blocks;
use jblocks_tree::carry_over;
use jblocks_tree::reconcile;
use jblocks_tree::BlockId;
use jblocks_tree::BlockTree;
use jblocks_tree::NodeBlockMap;
use rustc_hash::FxHashSet;

use crate::events::AppEvent;
use crate::events::Diagnostic;
use crate::events::EventBus;
use crate::events::Severity;

/// One immutable view of the program: text, syntax, blocks, and the
/// index tying them together. All four agree with each other; none
/// agree with any other snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: TextDocument,
    pub tree: SyntaxTree,
    pub blocks: BlockTree,
    pub map: NodeBlockMap,
}

pub struct EditorSession {
    current: Arc<Snapshot>,
    breakpoints: FxHashSet<BlockId>,
    highlighted: Option<BlockId>,
    bus: EventBus,
}

impl EditorSession {
    #[must_use]
    pub fn new(uri: String, text: String, bus: EventBus) -> Self {
        let tree = SyntaxTree::parse(&text);
        let document = TextDocument::new(uri, text);
        let (blocks, map) = build_blocks(&tree);
        Self {
            current: Arc::new(Snapshot {
                document,
                tree,
                blocks,
                map,
            }),
            breakpoints: FxHashSet::default(),
            highlighted: None,
            bus,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    #[must_use]
    pub fn breakpoints(&self) -> &FxHashSet<BlockId> {
        &self.breakpoints
    }

    #[must_use]
    pub fn highlighted(&self) -> Option<BlockId> {
        self.highlighted
    }

    /// Run one edit intent against the current snapshot and commit its
    /// result. A stale target leaves the document untouched and the
    /// error propagates to the caller, who should refresh and may
    /// retry.
    pub fn edit<F>(&mut self, op: F) -> Result<(), RewriteError>
    where
        F: FnOnce(&AstRewriter<'_>) -> Result<String, RewriteError>,
    {
        let snapshot = Arc::clone(&self.current);
        let rewriter = AstRewriter::new(&snapshot.tree, &snapshot.map);
        let new_text = op(&rewriter)?;
        self.commit(new_text);
        Ok(())
    }

    /// Commit a full text replacement: reparse, rebuild blocks, carry
    /// breakpoints and highlight across to the new identities, and
    /// swap the snapshot in atomically.
    pub fn commit(&mut self, new_text: String) {
        let old = Arc::clone(&self.current);

        let mut document = old.document.clone();
        let tree = SyntaxTree::parse(&new_text);
        document.commit(new_text);
        let (mut blocks, map) = build_blocks(&tree);

        let mapping = reconcile(&old.blocks, old.tree.text(), &blocks, tree.text());
        self.breakpoints = carry_over(&self.breakpoints, &blocks, &mapping);
        self.highlighted = self.highlighted.and_then(|id| {
            if blocks.contains(id) {
                Some(id)
            } else {
                mapping.get(&id).copied()
            }
        });
        blocks.mark_breakpoints(&self.breakpoints);

        let version = document.version();
        let diagnostics: Vec<Diagnostic> = tree
            .errors()
            .iter()
            .map(|error| Diagnostic {
                span: error.span,
                message: error.message.clone(),
                severity: Severity::Error,
            })
            .collect();

        tracing::debug!(version, blocks = blocks.preorder().count(), "snapshot replaced");
        self.current = Arc::new(Snapshot {
            document,
            tree,
            blocks,
            map,
        });
        self.bus.publish(AppEvent::SnapshotReplaced { version });
        self.bus.publish(AppEvent::Diagnostics {
            version,
            diagnostics,
        });
    }

    /// Toggle a breakpoint; returns whether it is now set. Unknown
    /// identities are ignored.
    pub fn toggle_breakpoint(&mut self, block: BlockId) -> bool {
        if !self.current.blocks.contains(block) {
            tracing::debug!(?block, "breakpoint toggle on unknown block ignored");
            return false;
        }
        let now_set = if self.breakpoints.remove(&block) {
            false
        } else {
            self.breakpoints.insert(block);
            true
        };

        let mut blocks = self.current.blocks.clone();
        blocks.mark_breakpoints(&self.breakpoints);
        self.current = Arc::new(Snapshot {
            document: self.current.document.clone(),
            tree: self.current.tree.clone(),
            blocks,
            map: self.current.map.clone(),
        });

        self.bus.publish(AppEvent::BreakpointsChanged {
            blocks: self.breakpoints.iter().copied().collect(),
        });
        now_set
    }

    /// Move the execution highlight, clearing it with `None`.
    pub fn highlight(&mut self, block: Option<BlockId>) {
        self.highlighted = block.filter(|id| self.current.blocks.contains(*id));
        self.bus.publish(AppEvent::HighlightChanged {
            block: self.highlighted,
        });
    }
}

#[cfg(test)]
mod tests {
    use jblocks_rewrite::StatementTemplate;
    use jblocks_tree::BlockKind;

    use super::*;

    const SOURCE: &str = "\
public class Demo {
    public static void main(String[] args) {
        int x = 1;
        System.out.println(x);
    }
}
";

    fn session() -> EditorSession {
        EditorSession::new(
            "file:///Demo.java".to_owned(),
            SOURCE.to_owned(),
            EventBus::default(),
        )
    }

    fn find_kind(session: &EditorSession, tag: &str) -> BlockId {
        session
            .snapshot()
            .blocks
            .preorder()
            .find(|block| block.kind.tag() == tag)
            .expect("block of requested kind")
            .id
    }

    fn main_body(session: &EditorSession) -> BlockId {
        let snapshot = session.snapshot();
        let id = snapshot
            .blocks
            .preorder()
            .find(|block| matches!(block.kind, BlockKind::Start))
            .and_then(|start| start.children.first())
            .expect("main body")
            .id;
        id
    }

    #[test]
    fn an_edit_commits_and_bumps_the_version() {
        let mut session = session();
        let body = main_body(&session);

        session
            .edit(|rewriter| rewriter.insert_statement(body, 0, &StatementTemplate::Print))
            .expect("insert");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.document.version(), 1);
        assert!(snapshot.document.text().contains("System.out.println(\"\");"));
    }

    #[test]
    fn a_stale_edit_leaves_the_document_untouched() {
        let mut session = session();
        let print = find_kind(&session, "print");

        // Delete the print, then try to delete it again with the old id.
        session
            .edit(|rewriter| rewriter.delete_statement(print))
            .expect("first delete");
        let before = session.snapshot();
        let result = session.edit(|rewriter| rewriter.delete_statement(print));

        assert!(matches!(result, Err(RewriteError::TargetNotFound(_))));
        let after = session.snapshot();
        assert_eq!(after.document.version(), before.document.version());
        assert_eq!(after.document.text(), before.document.text());
    }

    #[test]
    fn breakpoints_follow_their_statement_across_an_unrelated_edit() {
        let mut session = session();
        let print = find_kind(&session, "print");
        assert!(session.toggle_breakpoint(print));

        // Inserting above shifts the print's path; the breakpoint must
        // ride along to the re-minted identity.
        let body = main_body(&session);
        session
            .edit(|rewriter| {
                rewriter.insert_statement(
                    body,
                    0,
                    &StatementTemplate::Assign {
                        name: "x".to_owned(),
                    },
                )
            })
            .expect("insert");

        let snapshot = session.snapshot();
        let carried: Vec<_> = snapshot
            .blocks
            .preorder()
            .filter(|block| block.has_breakpoint)
            .collect();
        assert_eq!(carried.len(), 1);
        assert!(matches!(carried[0].kind, BlockKind::Print));
    }

    #[test]
    fn toggling_twice_clears_the_breakpoint() {
        let mut session = session();
        let print = find_kind(&session, "print");
        assert!(session.toggle_breakpoint(print));
        assert!(!session.toggle_breakpoint(print));
        assert!(session.breakpoints().is_empty());
    }

    #[test]
    fn readers_keep_their_snapshot_across_a_commit() {
        let mut session = session();
        let held = session.snapshot();
        let body = main_body(&session);

        session
            .edit(|rewriter| rewriter.insert_statement(body, 0, &StatementTemplate::Print))
            .expect("insert");

        // The held snapshot still reflects the old text.
        assert_eq!(held.document.version(), 0);
        assert_eq!(held.document.text(), SOURCE);
        assert_ne!(session.snapshot().document.text(), SOURCE);
    }

    #[tokio::test]
    async fn commits_announce_snapshot_and_diagnostics() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let mut session =
            EditorSession::new("file:///Demo.java".to_owned(), SOURCE.to_owned(), bus);

        session.commit(SOURCE.replace("int x = 1;", "int x = ;"));

        assert_eq!(
            rx.recv().await.unwrap(),
            AppEvent::SnapshotReplaced { version: 1 }
        );
        let AppEvent::Diagnostics {
            version,
            diagnostics,
        } = rx.recv().await.unwrap()
        else {
            panic!("expected diagnostics event");
        };
        assert_eq!(version, 1);
        assert!(!diagnostics.is_empty());
    }
}
