//! Telemetry line decoder

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::frame::{MeterReadings, TelemetryFrame, METER_FIELDS, METER_FIELD_COUNT};
use super::{MIN_PARAMETERS, MIN_SUFFIX_PARTS, MIN_TAIL_PARTS, TELEMETRY_PREFIX};
use crate::record::LineRecord;

const LOCKED_PARAM: usize = 1;
const PP_PARAM: usize = 2;
const CP_PARAM: usize = 3;
const CPN_PARAM: usize = 4;
const METER_PARAM: usize = 6;
const SUFFIX_PARAM: usize = 9;

/// Where in the line decoding gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// `;` separated parameter list
    TopLevel,
    /// `,` separated meter block
    Meter,
    /// `|` separated suffix block and its `,` separated tail
    Suffix,
    /// Text to number conversion
    Numeric,
}

impl DecodeStage {
    /// Stable name of the stage
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeStage::TopLevel => "top-level",
            DecodeStage::Meter => "meter",
            DecodeStage::Suffix => "suffix",
            DecodeStage::Numeric => "numeric",
        }
    }
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`decode`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The line does not start with `log[`; an ordinary line, not a fault
    #[error("Line is not a telemetry record")]
    NotTelemetry,

    /// The line has the marker but its structure or a value is off
    #[error("Malformed telemetry frame at {stage} stage{}", field_suffix(.field))]
    MalformedFrame {
        /// Where decoding gave up
        stage: DecodeStage,
        /// The numeric field that failed to parse, if any
        field: Option<&'static str>,
    },
}

impl DecodeError {
    fn malformed(stage: DecodeStage) -> Self {
        DecodeError::MalformedFrame { stage, field: None }
    }

    fn numeric(field: &'static str) -> Self {
        DecodeError::MalformedFrame {
            stage: DecodeStage::Numeric,
            field: Some(field),
        }
    }

    /// The stage at which a malformed frame was rejected
    pub fn stage(&self) -> Option<DecodeStage> {
        match self {
            DecodeError::NotTelemetry => None,
            DecodeError::MalformedFrame { stage, .. } => Some(*stage),
        }
    }
}

fn field_suffix(field: &Option<&'static str>) -> String {
    match field {
        Some(name) => format!(" (field `{}`)", name),
        None => String::new(),
    }
}

fn parse_field<T: FromStr>(raw: &str, field: &'static str) -> Result<T, DecodeError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| DecodeError::numeric(field))
}

/// Decode one line of text
///
/// Trailing `\r`/`\n` are ignored. Returns [`DecodeError::NotTelemetry`] for
/// lines without the `log[` marker and [`DecodeError::MalformedFrame`] when
/// the delimiter structure or a numeric field is off. Never partially decodes.
pub fn decode(content: &str) -> Result<TelemetryFrame, DecodeError> {
    let line = content.trim_end_matches(['\r', '\n']);
    let rest = line
        .strip_prefix(TELEMETRY_PREFIX)
        .ok_or(DecodeError::NotTelemetry)?;

    let serial_number = rest.split(']').next().unwrap_or_default();
    let (_, body) = rest
        .split_once("]:")
        .ok_or_else(|| DecodeError::malformed(DecodeStage::TopLevel))?;

    let params: Vec<&str> = body.split(';').collect();
    if params.len() < MIN_PARAMETERS {
        return Err(DecodeError::malformed(DecodeStage::TopLevel));
    }

    let meter_raw: Vec<&str> = params[METER_PARAM].split(',').collect();
    if meter_raw.len() < METER_FIELD_COUNT {
        return Err(DecodeError::malformed(DecodeStage::Meter));
    }

    let suffix: Vec<&str> = params[SUFFIX_PARAM].split('|').collect();
    if suffix.len() < MIN_SUFFIX_PARTS {
        return Err(DecodeError::malformed(DecodeStage::Suffix));
    }
    let tail: Vec<&str> = suffix[4].split(',').collect();
    if tail.len() < MIN_TAIL_PARTS {
        return Err(DecodeError::malformed(DecodeStage::Suffix));
    }

    let locked: i64 = parse_field(params[LOCKED_PARAM], "locked")?;
    let pp = parse_field(params[PP_PARAM], "pp")?;
    let cp = parse_field(params[CP_PARAM], "cp")?;
    let cpn = parse_field(params[CPN_PARAM], "cpn")?;

    let mut meter_values = [0.0; METER_FIELD_COUNT];
    for (idx, slot) in meter_values.iter_mut().enumerate() {
        *slot = parse_field(meter_raw[idx], METER_FIELDS[idx])?;
    }

    let led_status = parse_field(suffix[2], "led_status")?;

    Ok(TelemetryFrame {
        serial_number: serial_number.to_string(),
        locked: locked != 0,
        pp,
        cp,
        cpn,
        meter: MeterReadings::from_values(meter_values),
        dfix_value: suffix[0].trim().to_string(),
        do_status: suffix[1].trim().to_string(),
        led_status,
        meter_kwh: suffix[3].trim().to_string(),
        cp100: tail[0].trim().to_string(),
        cpn100: tail[1].trim().to_string(),
        last_iterations: tail[2].trim().to_string(),
    })
}

/// Decode the content of a framed line
pub fn decode_record(record: &LineRecord) -> Result<TelemetryFrame, DecodeError> {
    decode(&record.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "log[SN123]:0;1;2.5;3.5;4;5;1.0,2.0,3.0,4.0,5.0,6.0,7.0,8.0,9.0,10.0,11.0,12.0,13.0,14.0,15.0,16.0,17.0,18.0,19.0,20.0,21.0,22.0,23.0,24.0,25.0,26.0,99.9;7;8;A|B|42|D|10,20,30\n";

    #[test]
    fn test_decode_sample() {
        let frame = decode(SAMPLE).expect("sample decodes");
        assert_eq!(frame.serial_number, "SN123");
        assert!(frame.locked);
        assert_eq!(frame.pp, 2.5);
        assert_eq!(frame.cp, 3.5);
        assert_eq!(frame.cpn, 4.0);
        assert_eq!(frame.meter.energy, 1.0);
        assert_eq!(frame.meter.current_l1, 2.0);
        assert!((frame.meter.temperature - 99.9).abs() < 1e-9);
        assert_eq!(frame.dfix_value, "A");
        assert_eq!(frame.do_status, "B");
        assert_eq!(frame.led_status, 42);
        assert_eq!(frame.meter_kwh, "D");
        assert_eq!(frame.cp100, "10");
        assert_eq!(frame.cpn100, "20");
        assert_eq!(frame.last_iterations, "30");
    }

    #[test]
    fn test_not_telemetry() {
        assert_eq!(decode("hello world\n"), Err(DecodeError::NotTelemetry));
        assert_eq!(decode(""), Err(DecodeError::NotTelemetry));
        assert_eq!(decode("LOG[SN1]:"), Err(DecodeError::NotTelemetry));
    }

    #[test]
    fn test_missing_colon_is_top_level() {
        let err = decode("log[SN1]0;1;2").unwrap_err();
        assert_eq!(err.stage(), Some(DecodeStage::TopLevel));
    }

    #[test]
    fn test_unlocked_when_zero() {
        let line = SAMPLE.replacen(":0;1;", ":0;0;", 1);
        assert!(!decode(&line).expect("decodes").locked);
    }

    #[test]
    fn test_error_display_names_field() {
        let err = DecodeError::numeric("pp");
        assert_eq!(
            err.to_string(),
            "Malformed telemetry frame at numeric stage (field `pp`)"
        );
        let err = DecodeError::malformed(DecodeStage::Meter);
        assert_eq!(err.to_string(), "Malformed telemetry frame at meter stage");
    }
}
