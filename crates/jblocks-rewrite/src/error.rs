use jblocks_tree::BlockId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    /// The targeted block identity does not resolve in the current
    /// map. The caller must refresh its snapshot before retrying;
    /// there is no implicit retry here.
    #[error("block {0:?} no longer resolves in the current map")]
    TargetNotFound(BlockId),

    #[error("edit not applicable: {0}")]
    NotApplicable(String),
}
