//! Application event bus.
//!
//! A single broadcast channel with a closed event enum. Publishing is
//! fire and forget: nobody listening is fine, and one slow subscriber
//! lagging off the end of the buffer does not affect the others.

use jblocks_source::Span;
use jblocks_tree::BlockId;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// One problem reported against the committed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
    pub severity: Severity,
}

/// Everything the application can announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A new document version was committed and its snapshot swapped
    /// in.
    SnapshotReplaced { version: u64 },
    /// Parse problems in the committed text; an empty list clears
    /// earlier ones.
    Diagnostics {
        version: u64,
        diagnostics: Vec<Diagnostic>,
    },
    BreakpointsChanged { blocks: Vec<BlockId> },
    HighlightChanged { block: Option<BlockId> },
    /// A line of debuggee output, relayed from the run.
    DebuggeeOutput { line: String, is_stderr: bool },
    DebuggeePaused {
        line: Option<u32>,
        block: Option<BlockId>,
    },
    DebuggeeResumed,
    DebuggeeFinished,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Fire and forget; an event with no subscribers is dropped.
    pub fn publish(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event published with no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
