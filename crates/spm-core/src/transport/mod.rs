//! Byte transports
//!
//! The session only needs three primitives from the link: a blocking
//! single-byte read, a write, and an open check. Reads come from exactly one
//! reader thread while writes may come from any number of callers, so the
//! trait works through `&self` and implementations handle their own locking.

mod error;
pub mod serial;

pub use error::TransportError;
pub use serial::{SerialSettings, SerialTransport};

/// Default baud rate for device communication
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default read timeout in milliseconds
///
/// Bounds how long a stop request waits on a silent line.
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// A bidirectional byte link
pub trait Transport: Send + Sync {
    /// Block until one byte is available
    ///
    /// [`TransportError::Timeout`] means no byte arrived yet; every other
    /// error ends the read loop.
    fn read_byte(&self) -> Result<u8, TransportError>;

    /// Write all of `bytes`
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Whether the link is still usable
    fn is_open(&self) -> bool;
}
