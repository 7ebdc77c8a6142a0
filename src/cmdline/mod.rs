// src/cmdline/mod.rs

//! Structured task inputs and their flat argv encoding.
//!
//! - [`arguments`] is the flag-name → values mapping handed to every backend.
//! - [`filter`] is the record predicate (OR of AND-groups of substring checks).
//!
//! Both marshal to `--flag value` pairs so they can cross process and
//! container boundaries. Values containing `,` or `=` are not escaped when a
//! filter is marshaled; callers must avoid them.

pub mod arguments;
pub mod filter;

pub use arguments::Arguments;
pub use filter::{Filter, MatchGroup};
