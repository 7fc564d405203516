//! Transport errors

use thiserror::Error;

/// Errors raised by a [`Transport`](super::Transport)
#[derive(Error, Debug)]
pub enum TransportError {
    /// No byte arrived within the port timeout; not a failure of the link
    #[error("Read timed out")]
    Timeout,

    /// The device went away or the port returned end of stream
    #[error("Device disconnected")]
    Disconnected,

    /// The transport was closed
    #[error("Transport is not open")]
    NotOpen,

    /// Error reported by the serial port driver
    #[error("Serial port error: {0}")]
    Serial(String),

    /// I/O error on the port
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether a read loop should give up on this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Timeout)
    }
}

impl From<serialport::Error> for TransportError {
    fn from(e: serialport::Error) -> Self {
        TransportError::Serial(e.to_string())
    }
}
