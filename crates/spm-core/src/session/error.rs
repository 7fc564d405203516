//! Session errors

use thiserror::Error;

use super::SessionState;
use crate::framer::FramingError;
use crate::transport::TransportError;

/// Errors that end or prevent a stream session
#[derive(Error, Debug)]
pub enum SessionError {
    /// `start` was called on a session that is not idle
    #[error("Session cannot start from state {0:?}")]
    AlreadyStarted(SessionState),

    /// A read failed
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// A line exceeded the limit under the terminate policy
    #[error("Framing failure: {0}")]
    Framing(#[from] FramingError),

    /// The reader thread could not be created
    #[error("Failed to spawn reader thread: {0}")]
    Spawn(std::io::Error),

    /// The reader thread panicked
    #[error("Reader thread panicked")]
    ReaderPanicked,
}
