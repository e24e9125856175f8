//! Structural edits over a parsed document.
//!
//! Operations resolve a target block identity, compute the minimal
//! text splices for the edit, and return new source text; committing
//! the text is the caller's job. Unaffected bytes always come through
//! identical, so a diff of old and new text shows only the intended
//! region.

mod edits;
mod error;
mod rewriter;
mod templates;
mod types;

pub use error::RewriteError;
pub use rewriter::AstRewriter;
pub use templates::ExpressionTemplate;
pub use templates::StatementTemplate;
pub use types::collect_leaves;
pub use types::LeafKind;
pub use types::PreservedLeaf;
pub use types::TypeInfo;
