use jblocks_source::Span;
use serde::Serialize;
use thiserror::Error;

/// Input that cannot be tokenized at all.
///
/// Syntactically invalid but tokenizable input never produces this;
/// it degrades to `Unknown` nodes so the editor can still render
/// blocks for code with errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("source is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// A recoverable syntax problem recorded during an error-tolerant parse.
///
/// The affected region is still present in the tree as an `Unknown`
/// node; this carries the diagnostic for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxError {
    pub span: Span,
    pub message: String,
}

impl SyntaxError {
    #[must_use]
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}
