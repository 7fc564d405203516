//! Serial port transport
//!
//! Provides the [`Transport`] implementation backed by the `serialport` crate.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::{Transport, TransportError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub port_name: Option<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Data bits per character (5-8)
    pub data_bits: u8,

    /// Stop bits (1 or 2)
    pub stop_bits: u8,

    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port_name: None,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SerialSettings {
    /// Settings for a named port, defaults otherwise
    pub fn for_port(name: impl Into<String>) -> Self {
        Self {
            port_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// `serialport` data bits for these settings
    pub fn data_bits(&self) -> Result<DataBits, TransportError> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            n => Err(TransportError::Serial(format!("unsupported data bits: {}", n))),
        }
    }

    /// `serialport` stop bits for these settings
    pub fn stop_bits(&self) -> Result<StopBits, TransportError> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            n => Err(TransportError::Serial(format!("unsupported stop bits: {}", n))),
        }
    }
}

/// Serial port split into independently locked read and write halves
pub struct SerialTransport {
    name: String,
    reader: Mutex<Box<dyn SerialPort>>,
    writer: Mutex<Box<dyn SerialPort>>,
    open: AtomicBool,
}

impl SerialTransport {
    /// Open and configure the port named in `settings`
    pub fn open(settings: &SerialSettings) -> Result<Self, TransportError> {
        let name = settings
            .port_name
            .clone()
            .ok_or_else(|| TransportError::Serial("no port name configured".to_string()))?;

        // Parity and flow control are fixed: the devices never use them.
        let port = serialport::new(&name, settings.baud_rate)
            .data_bits(settings.data_bits()?)
            .stop_bits(settings.stop_bits()?)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .open()?;

        tracing::debug!(
            port = %name,
            baud = settings.baud_rate,
            data_bits = settings.data_bits,
            stop_bits = settings.stop_bits,
            "Opened serial port"
        );

        Self::from_port(name, port)
    }

    /// Wrap an already opened port
    pub fn from_port(name: String, port: Box<dyn SerialPort>) -> Result<Self, TransportError> {
        let writer = port.try_clone()?;
        Ok(Self {
            name,
            reader: Mutex::new(port),
            writer: Mutex::new(writer),
            open: AtomicBool::new(true),
        })
    }

    /// Port name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the transport closed; subsequent reads and writes fail
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::debug!(port = %self.name, "Closed serial port");
        }
    }

    /// Discard bytes received but not yet read
    pub fn clear_input(&self) -> Result<(), TransportError> {
        let port = self
            .reader
            .lock()
            .map_err(|e| TransportError::Serial(e.to_string()))?;
        port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn read_byte(&self) -> Result<u8, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }

        let mut port = self
            .reader
            .lock()
            .map_err(|e| TransportError::Serial(e.to_string()))?;

        let mut buf = [0u8; 1];
        match port.read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => {
                self.close();
                Err(TransportError::Disconnected)
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                Err(TransportError::Timeout)
            }
            Err(e) => {
                self.close();
                Err(TransportError::Io(e))
            }
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }

        let mut port = self
            .writer
            .lock()
            .map_err(|e| TransportError::Serial(e.to_string()))?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
