//! Running the program under the debugger: compile with line tables,
//! launch suspended under the JDWP agent, attach, and translate pause
//! lines back into block identities.

mod compile;
mod coordinator;
mod error;
mod launch;

pub use compile::friendly_diagnostic;
pub use compile::Compiler;
pub use coordinator::breakpoint_lines;
pub use coordinator::DebugCoordinator;
pub use coordinator::DebugNotice;
pub use coordinator::RunConfig;
pub use error::CompileFailure;
pub use error::RuntimeError;
pub use launch::free_port;
pub use launch::launch;
pub use launch::LaunchedProcess;
pub use launch::ProcessOutput;
