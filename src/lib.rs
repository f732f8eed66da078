//! Expression autocompletion for `{{path.to[0].variable}}` references in
//! prompt text.
//!
//! - [`expression`] locates the expression under the cursor and parses it
//!   into segments, then matches segments against a variable tree.
//! - [`document`] holds the variable tree and the registry it is built from.
//! - [`suggestion`] derives what to offer while the user types.
//! - [`template`] handles `{#Mark ...#}` template tags.

pub mod config;
pub mod document;
pub mod expression;
pub mod file;
pub mod suggestion;
pub mod template;
