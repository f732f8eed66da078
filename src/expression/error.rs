//! Error types for expression parsing.

use thiserror::Error;

/// Reasons the expression under the cursor could not be parsed.
///
/// Callers that only need "parsed or not" use [`super::Parser::parse`],
/// which discards the reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// No `}}` after the cursor.
    #[error("No closing '}}}}' at or after offset {offset}")]
    MissingEndToken { offset: usize },

    /// No `{{` before the cursor.
    #[error("No opening '{{{{' before offset {offset}")]
    MissingStartToken { offset: usize },

    /// Token offsets do not frame the cursor.
    #[error("Cursor offset {offset} is outside the expression content ({start}..{end})")]
    ContentOutOfRange {
        offset: usize,
        start: usize,
        end: usize,
    },

    /// The text before the cursor is not a valid variable path.
    #[error("Invalid variable path: '{path}'")]
    InvalidPath { path: String },
}
