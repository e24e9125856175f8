use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("debuggee did not complete the protocol handshake")]
    Handshake,

    #[error("malformed packet from debuggee")]
    Truncated,

    #[error("debuggee rejected command (error code {0})")]
    Command(u16),

    /// The protocol connection is gone. Always terminal; the session
    /// transitions to its final state and surfaces this, never
    /// swallows it.
    #[error("debuggee disconnected")]
    Disconnected,

    #[error("could not attach to debuggee after {attempts} attempts")]
    AttachFailed { attempts: u32 },
}

impl DebugError {
    /// Connection-refused is the one attach failure worth retrying;
    /// the debuggee may still be starting its listener.
    #[must_use]
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, DebugError::Io(e) if e.kind() == std::io::ErrorKind::ConnectionRefused)
    }
}
