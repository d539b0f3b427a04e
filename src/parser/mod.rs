//! Declaration-level Dart front end.
//!
//! This module provides:
//! - `treesitter`: generic tree-sitter parser driven by a capture query
//! - `dart`: tree-sitter-dart configuration and extraction of directives,
//!   class-like headers, const constructors, fields and a restricted
//!   constant expression grammar
//!
//! Any syntax error in the tree fails the whole file with its position.

use thiserror::Error;

mod dart;
pub mod treesitter;

pub use dart::parse_unit;

/// A syntax error with its 1-indexed position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}
