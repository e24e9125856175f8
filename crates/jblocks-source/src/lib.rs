mod document;
mod position;
mod span;

pub use document::TextDocument;
pub use position::ByteOffset;
pub use position::LineCol;
pub use position::LineIndex;
pub use span::Span;
