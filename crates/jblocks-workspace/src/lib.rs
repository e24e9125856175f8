//! Session ownership and application events: one `EditorSession` owns
//! the document and swaps immutable snapshots on commit; everything
//! else observes through the broadcast bus.

mod events;
mod session;

pub use events::AppEvent;
pub use events::Diagnostic;
pub use events::EventBus;
pub use events::Severity;
pub use session::EditorSession;
pub use session::Snapshot;
