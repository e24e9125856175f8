//! Error-tolerant lexer and parser for the supported Java subset.
//!
//! The parse never fails on tokenizable input: statements the grammar
//! does not cover become [`NodeKind::Unknown`] nodes with a recorded
//! [`SyntaxError`], so the block editor can still render and edit the
//! rest of the document.

mod ast;
mod error;
mod lexer;
mod parser;
mod tokens;

pub use ast::AssignOp;
pub use ast::BinOp;
pub use ast::IncDecOp;
pub use ast::ListFlavor;
pub use ast::NodeId;
pub use ast::NodeKind;
pub use ast::NumKind;
pub use ast::SyntaxTree;
pub use error::ParseError;
pub use error::SyntaxError;
pub use lexer::Lexer;
pub use tokens::Comment;
pub use tokens::Kw;
pub use tokens::Punct;
pub use tokens::Token;
pub use tokens::TokenKind;
