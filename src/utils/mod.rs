//! Generic utility primitives with zero domain knowledge.
//!
//! - `shell` - Shell-style quoting for log output

pub mod shell;
