//! JDWP debugging support: a wire codec, an async protocol client,
//! and a session state machine that drives breakpoints and stepping.

mod client;
mod error;
mod session;
pub mod wire;

pub use client::JdwpClient;
pub use client::MethodInfo;
pub use error::DebugError;
pub use session::AttachConfig;
pub use session::DebugIntent;
pub use session::DebuggerSession;
pub use session::SessionEvent;
pub use session::SessionState;
