//! Stream session
//!
//! Owns the read loop for one transport. The loop runs on its own thread,
//! reads one byte at a time, frames it and hands the result to an
//! [`EventSink`]. Writes go straight to the transport and never touch the
//! loop.
//!
//! Lifecycle is `Idle -> Running -> Stopped`; a session is never restarted.
//! Dropping a [`StreamSession`] stops its read loop, which then releases the
//! transport.
//! Stopping is cooperative: the flag is polled once per byte (or per read
//! timeout on a silent line) and a byte that arrives after the stop request
//! is dropped without being delivered.

mod error;
mod sink;

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::framer::{FrameEvent, LineFramer, DEFAULT_MAX_LINE_LENGTH};
use crate::transport::{Transport, TransportError};

pub use error::SessionError;
pub use sink::{Callbacks, ChannelSink, EventHub, EventSink, SessionEvent};

use crate::record::{LineRecord, RawByte};

/// Default name of the reader thread
pub const DEFAULT_READER_THREAD_NAME: &str = "spm-reader";

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, not started
    Idle,
    /// Read loop active
    Running,
    /// Terminal
    Stopped,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Running => 1,
            SessionState::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Idle,
            1 => SessionState::Running,
            _ => SessionState::Stopped,
        }
    }
}

/// What to do when a line exceeds the configured maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// End the session with [`SessionError::Framing`]
    #[default]
    Terminate,
    /// Drop the line, report it to the sink and keep reading
    Resync,
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum line length in bytes, terminator included
    pub max_line_length: usize,

    /// Overlong line handling
    pub overflow_policy: OverflowPolicy,

    /// Name given to the reader thread
    pub reader_thread_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            overflow_policy: OverflowPolicy::default(),
            reader_thread_name: DEFAULT_READER_THREAD_NAME.to_string(),
        }
    }
}

/// Counters reported when the read loop ends cleanly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Bytes taken from the transport and framed
    pub bytes_read: u64,
    /// Completed lines delivered
    pub lines: u64,
    /// Partial bytes delivered
    pub partials: u64,
    /// Overlong lines dropped
    pub overflows: u64,
}

struct Shared {
    listening: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn request_stop(&self) {
        self.listening.store(false, Ordering::Release);
        // A session stopped before it started never runs.
        let _ = self.state.compare_exchange(
            SessionState::Idle.as_u8(),
            SessionState::Stopped.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        tracing::debug!("Session stop requested");
    }
}

/// Marks the session stopped however the reader thread exits
struct StoppedOnDrop(Arc<Shared>);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0
            .state
            .store(SessionState::Stopped.as_u8(), Ordering::Release);
    }
}

/// A transport paired with its read loop
pub struct StreamSession {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    shared: Arc<Shared>,
}

impl StreamSession {
    /// Bind a session to an already open transport
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            shared: Arc::new(Shared {
                listening: AtomicBool::new(true),
                state: AtomicU8::new(SessionState::Idle.as_u8()),
            }),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether the read loop is (still) allowed to run
    pub fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::Acquire)
    }

    /// Session settings
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start reading, delivering to a pair of closures
    pub fn start<R, P>(&self, on_record: R, on_partial: P) -> Result<SessionHandle, SessionError>
    where
        R: FnMut(LineRecord) + Send + 'static,
        P: FnMut(RawByte) + Send + 'static,
    {
        self.start_with(Callbacks::new(on_record, on_partial))
    }

    /// Start reading, delivering to `sink`
    pub fn start_with<S: EventSink>(&self, sink: S) -> Result<SessionHandle, SessionError> {
        self.shared
            .state
            .compare_exchange(
                SessionState::Idle.as_u8(),
                SessionState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|current| SessionError::AlreadyStarted(SessionState::from_u8(current)))?;

        let reader = Reader {
            transport: self.transport.clone(),
            shared: self.shared.clone(),
            framer: LineFramer::with_max_line_length(self.config.max_line_length),
            policy: self.config.overflow_policy,
            summary: SessionSummary::default(),
        };

        let spawned = thread::Builder::new()
            .name(self.config.reader_thread_name.clone())
            .spawn(move || reader.run(sink));

        match spawned {
            Ok(join) => {
                tracing::info!(
                    max_line_length = self.config.max_line_length,
                    policy = ?self.config.overflow_policy,
                    "Session started"
                );
                Ok(SessionHandle {
                    join,
                    shared: self.shared.clone(),
                })
            }
            Err(e) => {
                self.shared.listening.store(false, Ordering::Release);
                self.shared
                    .state
                    .store(SessionState::Stopped.as_u8(), Ordering::Release);
                Err(SessionError::Spawn(e))
            }
        }
    }

    /// Send bytes to the device exactly as given
    pub fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        tracing::trace!(len = bytes.len(), "Writing to transport");
        self.transport.write(bytes)
    }

    /// Request the read loop to end; does not wait for it
    pub fn stop(&self) {
        self.shared.request_stop();
    }
}

// The reader holds its own transport handle, so it has to be told to exit
// once nothing can stop it any more.
impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.shared.listening.load(Ordering::Acquire) {
            self.shared.request_stop();
        }
    }
}

/// Completion handle of a running read loop
pub struct SessionHandle {
    join: JoinHandle<Result<SessionSummary, SessionError>>,
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Request the read loop to end; does not wait for it
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Whether the reader thread has exited
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Block until the read loop ends and return its outcome
    pub fn join(self) -> Result<SessionSummary, SessionError> {
        self.join
            .join()
            .map_err(|_| SessionError::ReaderPanicked)?
    }

    /// Await the read loop from async code without blocking the runtime
    pub async fn wait(self) -> Result<SessionSummary, SessionError> {
        tokio::task::spawn_blocking(move || self.join())
            .await
            .map_err(|_| SessionError::ReaderPanicked)?
    }
}

struct Reader {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    framer: LineFramer,
    policy: OverflowPolicy,
    summary: SessionSummary,
}

impl Reader {
    fn run<S: EventSink>(mut self, mut sink: S) -> Result<SessionSummary, SessionError> {
        let _stopped = StoppedOnDrop(self.shared.clone());

        match self.read_loop(&mut sink) {
            Ok(()) => {
                tracing::info!(
                    bytes = self.summary.bytes_read,
                    lines = self.summary.lines,
                    overflows = self.summary.overflows,
                    "Session stopped"
                );
                Ok(self.summary)
            }
            Err(e) => {
                self.shared.listening.store(false, Ordering::Release);
                tracing::error!("Session terminated: {e}");
                Err(e)
            }
        }
    }

    fn read_loop<S: EventSink>(&mut self, sink: &mut S) -> Result<(), SessionError> {
        while self.shared.listening.load(Ordering::Acquire) {
            let byte = match self.transport.read_byte() {
                Ok(byte) => byte,
                Err(TransportError::Timeout) => continue,
                Err(e) => return Err(e.into()),
            };

            // Stop arrived while blocked in the read.
            if !self.shared.listening.load(Ordering::Acquire) {
                break;
            }
            self.summary.bytes_read += 1;

            match self.framer.push(byte, Utc::now()) {
                Ok(FrameEvent::Partial(raw)) => {
                    self.summary.partials += 1;
                    sink.on_partial(raw);
                }
                Ok(FrameEvent::LineComplete(record)) => {
                    self.summary.lines += 1;
                    tracing::trace!(len = record.len(), "Line complete");
                    sink.on_record(record);
                }
                Ok(FrameEvent::Discarded(_)) => {}
                Err(e) => {
                    self.summary.overflows += 1;
                    match self.policy {
                        OverflowPolicy::Terminate => return Err(e.into()),
                        OverflowPolicy::Resync => {
                            tracing::warn!("Dropping overlong line: {e}");
                            sink.on_framing_error(&e);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
