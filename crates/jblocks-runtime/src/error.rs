use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("compilation failed: {}", .0.message())]
    Compile(CompileFailure),

    #[error(transparent)]
    Debug(#[from] jblocks_debug::DebugError),
}

/// A failed compiler run: the raw diagnostic text plus, when the
/// diagnostic is one we recognize, a friendlier explanation.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    pub raw: String,
    pub friendly: Option<String>,
}

impl CompileFailure {
    /// The friendly explanation when there is one, the raw compiler
    /// output otherwise.
    #[must_use]
    pub fn message(&self) -> &str {
        self.friendly.as_deref().unwrap_or(&self.raw)
    }
}
