//! Deterministic JSON serialization for the session file.
//!
//! Output is stable between writes:
//! - Object keys sorted (via `BTreeMap` in the stored types)
//! - 2-space indentation
//! - Trailing newline

mod json;

pub use json::*;
