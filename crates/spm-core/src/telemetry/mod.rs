//! Telemetry decoding
//!
//! Decodes the device's `log[...]` lines into typed measurements.
//!
//! Line shape (all positions fixed by the firmware, nothing self-describing):
//!
//! ```text
//! log[<serial>]:<p0>;<locked>;<pp>;<cp>;<cpn>;<p5>;<meter>;<p7>;<p8>;<suffix>
//!
//! meter  = 27 comma separated values (see MeterReadings)
//! suffix = <dfix>|<do>|<led>|<meter_kwh>|<cp100>,<cpn100>,<last_iterations>
//! ```

mod decode;
mod frame;
pub mod series;

pub use decode::{decode, decode_record, DecodeError, DecodeStage};
pub use frame::{MeterReadings, TelemetryFrame, METER_FIELDS, METER_FIELD_COUNT};

/// Marker every telemetry line starts with
pub const TELEMETRY_PREFIX: &str = "log[";

/// Minimum number of `;` separated parameters
pub const MIN_PARAMETERS: usize = 10;

/// Minimum number of `|` separated suffix parts
pub const MIN_SUFFIX_PARTS: usize = 5;

/// Minimum number of `,` separated parts in the suffix tail
pub const MIN_TAIL_PARTS: usize = 3;
