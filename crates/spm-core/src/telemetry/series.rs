//! Time-series rows derived from telemetry
//!
//! Maps a decoded frame onto the `(time, value)` rows a time-series store
//! keeps per measurement. The store itself is supplied by the integrator
//! through [`SeriesSink`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::TelemetryFrame;

/// Series names in insertion order
pub const SERIES_NAMES: [&str; 6] = ["temperature", "led", "locked", "pp", "cp", "current_l1"];

/// A single stored value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesValue {
    /// Measurement
    Float(f64),
    /// Status code
    Int(i32),
    /// Flag
    Bool(bool),
}

impl fmt::Display for SeriesValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesValue::Float(v) => write!(f, "{}", v),
            SeriesValue::Int(v) => write!(f, "{}", v),
            SeriesValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// One row for one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSample {
    /// Series (table) name
    pub series: &'static str,
    /// Epoch milliseconds
    pub time_ms: i64,
    /// Stored value
    pub value: SeriesValue,
}

impl TelemetryFrame {
    /// Rows for this frame, all keyed by `at`
    pub fn series_samples(&self, at: DateTime<Utc>) -> Vec<SeriesSample> {
        let time_ms = at.timestamp_millis();
        let values = [
            SeriesValue::Float(self.meter.temperature),
            SeriesValue::Int(self.led_status),
            SeriesValue::Bool(self.locked),
            SeriesValue::Float(self.pp),
            SeriesValue::Float(self.cp),
            SeriesValue::Float(self.meter.current_l1),
        ];

        SERIES_NAMES
            .into_iter()
            .zip(values)
            .map(|(series, value)| SeriesSample {
                series,
                time_ms,
                value,
            })
            .collect()
    }
}

/// Destination for series rows
pub trait SeriesSink {
    /// Store error type
    type Error: fmt::Display;

    /// Insert a single row
    fn insert(&mut self, sample: &SeriesSample) -> Result<(), Self::Error>;
}

/// Insert every row of `frame`, returning how many were stored
///
/// A failed row is logged and skipped; the remaining rows are still inserted.
pub fn persist_frame<S: SeriesSink>(sink: &mut S, frame: &TelemetryFrame, at: DateTime<Utc>) -> usize {
    let mut written = 0;
    for sample in frame.series_samples(at) {
        match sink.insert(&sample) {
            Ok(()) => written += 1,
            Err(e) => tracing::warn!(
                series = sample.series,
                serial = %frame.serial_number,
                "Failed to insert series row: {e}"
            ),
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MeterReadings;

    fn frame() -> TelemetryFrame {
        TelemetryFrame {
            serial_number: "SN9".to_string(),
            locked: true,
            pp: 1.5,
            cp: 2.5,
            cpn: -12.0,
            meter: MeterReadings {
                current_l1: 16.0,
                temperature: 41.5,
                ..Default::default()
            },
            dfix_value: String::new(),
            do_status: String::new(),
            led_status: 3,
            meter_kwh: String::new(),
            cp100: String::new(),
            cpn100: String::new(),
            last_iterations: String::new(),
        }
    }

    struct FlakySink {
        rows: Vec<SeriesSample>,
        reject: &'static str,
    }

    impl SeriesSink for FlakySink {
        type Error = String;

        fn insert(&mut self, sample: &SeriesSample) -> Result<(), String> {
            if sample.series == self.reject {
                return Err("table missing".to_string());
            }
            self.rows.push(sample.clone());
            Ok(())
        }
    }

    #[test]
    fn test_series_mapping() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).expect("valid time");
        let samples = frame().series_samples(at);

        assert_eq!(samples.len(), 6);
        assert!(samples.iter().all(|s| s.time_ms == 1_700_000_000_123));
        assert_eq!(samples[0].value, SeriesValue::Float(41.5));
        assert_eq!(samples[1].value, SeriesValue::Int(3));
        assert_eq!(samples[2].value, SeriesValue::Bool(true));
        assert_eq!(samples[5].series, "current_l1");
        assert_eq!(samples[5].value, SeriesValue::Float(16.0));
    }

    #[test]
    fn test_persist_skips_failed_rows() {
        let mut sink = FlakySink {
            rows: Vec::new(),
            reject: "led",
        };
        let written = persist_frame(&mut sink, &frame(), Utc::now());

        assert_eq!(written, 5);
        assert!(sink.rows.iter().all(|s| s.series != "led"));
    }
}
