//! Shared test helpers

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spm_core::telemetry::{MeterReadings, TelemetryFrame, METER_FIELD_COUNT};
use spm_core::transport::{Transport, TransportError};

/// In-memory transport fed from the test through a [`Feeder`]
///
/// Reads block on the feed channel. In polling mode a read gives up after the
/// poll interval with `Timeout`, like a serial port with a read timeout.
/// Dropping the feeder makes the next read fail with `Disconnected`.
pub struct ScriptedTransport {
    rx: Mutex<Receiver<u8>>,
    poll: Option<Duration>,
    written: Mutex<Vec<u8>>,
    fail_writes: AtomicBool,
    open: AtomicBool,
}

/// Test side of a [`ScriptedTransport`]
pub struct Feeder {
    tx: Sender<u8>,
}

impl Feeder {
    pub fn send(&self, bytes: &[u8]) {
        for &b in bytes {
            self.tx.send(b).expect("transport dropped");
        }
    }
}

impl ScriptedTransport {
    /// Transport whose reads time out every 10ms when idle
    pub fn polling() -> (Arc<Self>, Feeder) {
        Self::build(Some(Duration::from_millis(10)))
    }

    /// Transport whose reads block until a byte arrives
    pub fn blocking() -> (Arc<Self>, Feeder) {
        Self::build(None)
    }

    fn build(poll: Option<Duration>) -> (Arc<Self>, Feeder) {
        let (tx, rx) = mpsc::channel();
        let transport = Arc::new(Self {
            rx: Mutex::new(rx),
            poll,
            written: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            open: AtomicBool::new(true),
        });
        (transport, Feeder { tx })
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Bytes fed but not yet read
    pub fn unread(&self) -> Vec<u8> {
        self.rx.lock().unwrap().try_iter().collect()
    }
}

impl Transport for ScriptedTransport {
    fn read_byte(&self) -> Result<u8, TransportError> {
        let rx = self.rx.lock().unwrap();
        match self.poll {
            Some(interval) => match rx.recv_timeout(interval) {
                Ok(b) => Ok(b),
                Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout),
                Err(RecvTimeoutError::Disconnected) => {
                    self.open.store(false, Ordering::SeqCst);
                    Err(TransportError::Disconnected)
                }
            },
            None => rx.recv().map_err(|_| {
                self.open.store(false, Ordering::SeqCst);
                TransportError::Disconnected
            }),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write failed",
            )));
        }
        self.written.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Render a frame the way the device firmware prints it
pub fn telemetry_line(frame: &TelemetryFrame) -> String {
    let meter: Vec<String> = frame
        .meter
        .to_values()
        .iter()
        .map(|v| v.to_string())
        .collect();

    format!(
        "log[{}]:0;{};{};{};{};0;{};0;0;{}|{}|{}|{}|{},{},{}\n",
        frame.serial_number,
        if frame.locked { 1 } else { 0 },
        frame.pp,
        frame.cp,
        frame.cpn,
        meter.join(","),
        frame.dfix_value,
        frame.do_status,
        frame.led_status,
        frame.meter_kwh,
        frame.cp100,
        frame.cpn100,
        frame.last_iterations,
    )
}

/// A frame with distinct, easily recognised values
pub fn sample_frame() -> TelemetryFrame {
    let mut values = [0.0; METER_FIELD_COUNT];
    for (i, v) in values.iter_mut().enumerate() {
        *v = 100.0 + i as f64 + 0.25;
    }

    TelemetryFrame {
        serial_number: "EW-0042".to_string(),
        locked: false,
        pp: 13.0,
        cp: 9.5,
        cpn: -11.75,
        meter: MeterReadings::from_values(values),
        dfix_value: "DF1".to_string(),
        do_status: "on".to_string(),
        led_status: 7,
        meter_kwh: "123.4".to_string(),
        cp100: "5".to_string(),
        cpn100: "6".to_string(),
        last_iterations: "17".to_string(),
    }
}
