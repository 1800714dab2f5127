//! Channel layer for expect-style interactive sessions.
//!
//! This module handles output buffering with ANSI stripping, ordered
//! alternative matching and the [`InteractiveSession`] primitive the
//! classifier is written against.

mod buffer;
mod patterns;
mod session;

pub use buffer::PatternBuffer;
pub use patterns::{compile_prompt_pattern, first_match, AltMatch};
pub use session::{Expect, InteractiveSession, SshSession};
