//! Line framing
//!
//! Recovers newline-terminated lines from a byte stream fed one byte at a time.
//!
//! Every byte other than the terminator is reported back as a partial byte so
//! callers can mirror live output. The terminator itself is never reported as
//! a partial byte; it only ends up inside the completed [`LineRecord`].
//!
//! Lines are bounded. A line that would exceed the limit is dropped: the
//! framer reports [`FramingError::LineTooLong`] once, discards everything up to
//! and including the next terminator, and then frames normally again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{LineRecord, RawByte, TERMINATOR};

/// Default maximum line length in bytes, terminator included
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Errors raised while framing
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramingError {
    /// A line outgrew the buffer and is being skipped
    #[error("Line exceeds {limit} bytes, discarded {discarded} bytes")]
    LineTooLong {
        /// Configured limit
        limit: usize,
        /// Bytes dropped when the limit was hit
        discarded: usize,
    },
}

/// Outcome of feeding one byte to the framer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A non-terminator byte was appended to the current line
    Partial(RawByte),
    /// The terminator arrived and closed the current line
    LineComplete(LineRecord),
    /// The byte belongs to an overlong line that is being skipped
    Discarded(RawByte),
}

/// Incremental line framer
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_length: usize,
    resyncing: bool,
}

impl LineFramer {
    /// Create a framer with the default line limit
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a framer with a custom line limit (terminator included, minimum 1)
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        let max_line_length = max_line_length.max(1);
        Self {
            buffer: Vec::with_capacity(initial_capacity(max_line_length)),
            max_line_length,
            resyncing: false,
        }
    }

    /// Feed one byte, stamped with the time it is framed
    pub fn push(&mut self, byte: u8, at: DateTime<Utc>) -> Result<FrameEvent, FramingError> {
        if self.resyncing {
            if byte == TERMINATOR {
                self.resyncing = false;
            }
            return Ok(FrameEvent::Discarded(RawByte::new(byte, at)));
        }

        if byte == TERMINATOR {
            self.buffer.push(byte);
            let content = std::mem::replace(
                &mut self.buffer,
                Vec::with_capacity(initial_capacity(self.max_line_length)),
            );
            return Ok(FrameEvent::LineComplete(LineRecord::new(at, content)));
        }

        // One slot is always kept free for the terminator.
        if self.buffer.len() + 1 >= self.max_line_length {
            let discarded = self.buffer.len() + 1;
            self.buffer.clear();
            self.resyncing = true;
            return Err(FramingError::LineTooLong {
                limit: self.max_line_length,
                discarded,
            });
        }

        self.buffer.push(byte);
        Ok(FrameEvent::Partial(RawByte::new(byte, at)))
    }

    /// Bytes of the line currently being assembled
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the framer is skipping the rest of an overlong line
    pub fn is_resyncing(&self) -> bool {
        self.resyncing
    }

    /// Configured line limit
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Drop any partial line and leave resync mode
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.resyncing = false;
    }
}

fn initial_capacity(max_line_length: usize) -> usize {
    max_line_length.min(DEFAULT_MAX_LINE_LENGTH)
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
