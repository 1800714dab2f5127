//! Output buffer for expect-style matching.
//!
//! Prompt detection only searches the last N bytes of the buffer; the
//! classifier's alternatives search everything received since the last
//! match, because the fingerprint can appear anywhere in a long banner.

use regex::bytes::Regex;

use super::patterns::{first_match, AltMatch};

/// Buffer for accumulating session output and searching it for patterns.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: Vec<u8>,

    /// How many bytes from the end `search_tail` looks at.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified tail search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Search only the last `search_depth` bytes of the buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.find(&self.buffer[start..])
    }

    /// Find the first of `alternatives` (in list order) that matches
    /// anywhere in the buffer.
    pub fn find_first(&self, alternatives: &[Regex]) -> Option<AltMatch> {
        first_match(alternatives, &self.buffer)
    }

    /// Remove and return everything up to and including `end`.
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

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mArista\x1b[0m vEOS");
        assert_eq!(buffer.as_slice(), b"Arista vEOS");
    }

    #[test]
    fn test_tail_search_ignores_old_output() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"switch#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"switch#").unwrap();
        assert!(buffer.search_tail(&pattern).is_none());
        assert!(buffer.find_first(&[pattern]).is_some());
    }

    #[test]
    fn test_consume_keeps_remainder() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Cisco Nexus\nswitch# ");

        let consumed = buffer.consume(5);
        assert_eq!(consumed, b"Cisco");
        assert_eq!(buffer.as_slice(), b" Nexus\nswitch# ");
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::default();
        buffer.extend(b"test data");
        assert_eq!(buffer.take(), b"test data");
        assert!(buffer.is_empty());
    }
}
