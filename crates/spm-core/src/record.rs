//! Stream records
//!
//! The two shapes delivered to consumers: single bytes as they arrive and
//! completed newline-terminated lines.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Line terminator byte
pub const TERMINATOR: u8 = b'\n';

/// A single byte read from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawByte {
    /// The octet itself
    pub value: u8,
    /// When the byte was framed
    pub timestamp: DateTime<Utc>,
}

impl RawByte {
    /// Create a new raw byte
    pub fn new(value: u8, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

/// A completed line
///
/// `content` keeps the terminator and any `\r` preceding it, exactly as read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// When the terminator was framed
    pub timestamp: DateTime<Utc>,
    /// Line bytes including the trailing `\n`
    pub content: Vec<u8>,
}

impl LineRecord {
    /// Create a new line record
    pub fn new(timestamp: DateTime<Utc>, content: Vec<u8>) -> Self {
        Self { timestamp, content }
    }

    /// Line content as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Line content without the trailing `\n` / `\r\n`
    pub fn trimmed(&self) -> &[u8] {
        let mut end = self.content.len();
        if end > 0 && self.content[end - 1] == TERMINATOR {
            end -= 1;
        }
        if end > 0 && self.content[end - 1] == b'\r' {
            end -= 1;
        }
        &self.content[..end]
    }

    /// Epoch milliseconds of the record timestamp
    pub fn time_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Number of bytes in the line, terminator included
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the line holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_strips_crlf() {
        let record = LineRecord::new(Utc::now(), b"hello\r\n".to_vec());
        assert_eq!(record.trimmed(), b"hello");
        assert_eq!(record.len(), 7);
    }

    #[test]
    fn test_trimmed_keeps_inner_cr() {
        let record = LineRecord::new(Utc::now(), b"a\rb\n".to_vec());
        assert_eq!(record.trimmed(), b"a\rb");
    }

    #[test]
    fn test_text_is_lossy() {
        let record = LineRecord::new(Utc::now(), vec![b'o', b'k', 0xFF, b'\n']);
        assert_eq!(record.text(), "ok\u{FFFD}\n");
    }

    #[test]
    fn test_bare_terminator_line() {
        let record = LineRecord::new(Utc::now(), b"\n".to_vec());
        assert!(record.trimmed().is_empty());
        assert!(!record.is_empty());
    }
}
