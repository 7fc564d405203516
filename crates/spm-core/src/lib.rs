//! # spm Core Library
//!
//! Core functionality for the spm serial port monitor.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Line framing of a continuous serial byte stream
//! - Decoding of device telemetry log lines into typed measurements
//! - A stream session that runs the reader on its own thread and delivers
//!   completed lines and live bytes to consumers
//! - A `serialport`-backed transport and JSON configuration
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use spm_core::prelude::*;
//!
//! let config = MonitorConfig::load_or_default(MonitorConfig::default_path()?)?;
//! let transport = Arc::new(SerialTransport::open(&config.serial)?);
//!
//! let session = StreamSession::new(transport, config.session);
//! let handle = session.start(
//!     |record| {
//!         if let Ok(frame) = telemetry::decode_record(&record) {
//!             println!("{} -> {:.1} C", frame.serial_number, frame.meter.temperature);
//!         }
//!     },
//!     |byte| print!("{}", byte.value as char),
//! )?;
//!
//! session.write(&ConsoleInput::line("status").to_bytes())?;
//! session.stop();
//! handle.join()?;
//! ```

pub mod config;
pub mod console;
pub mod framer;
pub mod record;
pub mod session;
pub mod telemetry;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MonitorConfig;
    pub use crate::console::{ConsoleInput, InputMode};
    pub use crate::framer::{FrameEvent, LineFramer};
    pub use crate::record::{LineRecord, RawByte};
    pub use crate::session::{
        Callbacks, ChannelSink, EventHub, EventSink, SessionConfig, SessionEvent, SessionHandle,
        SessionState, StreamSession,
    };
    pub use crate::telemetry::{self, DecodeError, MeterReadings, TelemetryFrame};
    pub use crate::transport::{SerialSettings, SerialTransport, Transport, TransportError};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
