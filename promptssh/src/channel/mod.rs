//! Channel layer for pattern matching over a client's terminal.
//!
//! This module handles the interactive side of a session: accumulating
//! output, prompt detection with timeouts, and end-of-stream handling.

mod buffer;
mod patterns;
mod pty;

#[cfg(test)]
pub(crate) mod testing;

pub use buffer::{BufferMatch, PatternBuffer};
pub use patterns::CompiledPrompts;
pub use pty::{ExpectMatch, PtyChannel, PtyConfig};
