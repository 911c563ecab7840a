//! Output buffer with tail-limited prompt search.
//!
//! Prompts only ever show up at the end of what the remote side has sent so
//! far, so searches only look at the last `search_depth` bytes. Match offsets
//! are reported relative to the whole buffer.

use std::fmt;
use std::ops::Range;

use regex::bytes::Regex;
use vte::{Parser, Perform};

/// A pattern match inside a [`PatternBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferMatch {
    /// Index of the pattern that matched.
    pub index: usize,

    /// Byte range of the match, relative to the buffer start.
    pub range: Range<usize>,
}

/// Buffer for accumulating client output and searching it for prompts.
pub struct PatternBuffer {
    /// The accumulated, not yet consumed output.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Escape sequence parser, `None` when output is kept raw.
    ///
    /// Lives as long as the buffer so that sequences and UTF-8 characters
    /// split across reads are still recognised.
    parser: Option<Parser>,
}

/// Receives parsed terminal output and keeps only the text.
struct TextSink<'a>(&'a mut Vec<u8>);

impl Perform for TextSink<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.push(byte);
        }
    }
}

impl PatternBuffer {
    /// Create a new pattern buffer.
    ///
    /// # Arguments
    ///
    /// * `search_depth` - Number of bytes from the end to search for patterns.
    /// * `strip_ansi` - Whether to remove ANSI escape codes from incoming data.
    pub fn new(search_depth: usize, strip_ansi: bool) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: strip_ansi.then(Parser::new),
        }
    }

    /// Append newly received data.
    ///
    /// With ANSI stripping on, escape sequences are dropped along with
    /// control characters other than line feed, carriage return and tab.
    pub fn extend(&mut self, data: &[u8]) {
        match &mut self.parser {
            Some(parser) => parser.advance(&mut TextSink(&mut self.buffer), data),
            None => self.buffer.extend_from_slice(data),
        }
    }

    /// Find the earliest match of any pattern in the buffer tail.
    ///
    /// When two patterns match at the same offset the lower index wins.
    pub fn find_earliest(&self, patterns: &[&Regex]) -> Option<BufferMatch> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        let tail = &self.buffer[start..];

        patterns
            .iter()
            .enumerate()
            .filter_map(|(index, pattern)| {
                pattern.find(tail).map(|m| BufferMatch {
                    index,
                    range: start + m.start()..start + m.end(),
                })
            })
            .min_by_key(|m| (m.range.start, m.index))
    }

    /// Remove and return everything up to `end`, keeping the rest buffered.
    pub fn consume(&mut self, end: usize) -> Vec<u8> {
        let end = end.min(self.buffer.len());
        let rest = self.buffer.split_off(end);
        std::mem::replace(&mut self.buffer, rest)
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .field("strip_ansi", &self.parser.is_some())
            .finish()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000, true)
    }
}
