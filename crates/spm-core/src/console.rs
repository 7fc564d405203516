//! Console input
//!
//! Builds the bytes a user sends to the device. The device console expects a
//! carriage return after a typed line; in interactive mode every keystroke is
//! sent as-is. The session itself never appends anything to a write.

use serde::{Deserialize, Serialize};

/// Terminator appended in line mode
pub const LINE_TERMINATOR: u8 = b'\r';

/// How user input is forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Send whole lines followed by `\r`
    #[default]
    Line,
    /// Send each keystroke immediately
    Interactive,
}

/// Text to send to the device console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleInput {
    /// The text as typed
    pub text: String,
    /// Forwarding mode
    pub mode: InputMode,
}

impl ConsoleInput {
    /// A complete line (e.g., "help", "status")
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: InputMode::Line,
        }
    }

    /// A raw keystroke or partial input
    pub fn keystroke(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: InputMode::Interactive,
        }
    }

    /// Input in the given mode
    pub fn with_mode(text: impl Into<String>, mode: InputMode) -> Self {
        Self {
            text: text.into(),
            mode,
        }
    }

    /// Bytes for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.text.as_bytes().to_vec();
        if self.mode == InputMode::Line {
            bytes.push(LINE_TERMINATOR);
        }
        bytes
    }
}
