//! Parsing and tree matching for `{{path}}` variable expressions.
//!
//! This module turns the editor line under the cursor into structured path
//! segments and matches those segments against a [`VariableTree`].
//!
//! # Supported Syntax
//!
//! - `{{` and `}}` - Expression delimiters
//! - `key` - Object key (letters, CJK included, digits and `_`)
//! - `.` - Key separator
//! - `[index]` - Non-negative array index, directly after a key
//! - trailing `.` - Empty last component while the next key is being typed
//!
//! # Examples
//!
//! ```
//! // {{user.name}}            - nested object keys
//! // {{orders[0].total}}      - index into an array-typed variable
//! // {{user.}}                - cursor waiting for the next key
//! ```
//!
//! [`VariableTree`]: crate::document::tree::VariableTree

pub mod ast;
pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod tree_helper;

pub use ast::{ParseData, Segment};
pub use error::ExpressionError;
pub use parser::Parser;
pub use tree_helper::{PruneFallback, TreeHelper};
