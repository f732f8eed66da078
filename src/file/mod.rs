//! File I/O for variable schemas.
//!
//! Schemas can be loaded from disk or stdin, plain or gzip-compressed, in
//! JSON or YAML.

pub mod loader;
