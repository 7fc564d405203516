//! Decoded telemetry types

use serde::{Deserialize, Serialize};

/// Number of values in the meter block
pub const METER_FIELD_COUNT: usize = 27;

/// Meter field names in wire order
pub const METER_FIELDS: [&str; METER_FIELD_COUNT] = [
    "energy",
    "current_l1",
    "current_l2",
    "current_l3",
    "power_l1",
    "power_l2",
    "power_l3",
    "voltage_l1",
    "voltage_l2",
    "voltage_l3",
    "frequency",
    "power_factor",
    "active_power",
    "reactive_power",
    "positive_active_energy_l1",
    "negative_active_energy_l1",
    "positive_reactive_energy_l1",
    "negative_reactive_energy_l1",
    "positive_active_energy_l2",
    "negative_active_energy_l2",
    "positive_reactive_energy_l2",
    "negative_reactive_energy_l2",
    "positive_active_energy_l3",
    "negative_active_energy_l3",
    "positive_reactive_energy_l3",
    "negative_reactive_energy_l3",
    "temperature",
];

/// The 27 values of the energy meter block
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeterReadings {
    /// Total energy register
    pub energy: f64,
    /// Phase 1 current
    pub current_l1: f64,
    /// Phase 2 current
    pub current_l2: f64,
    /// Phase 3 current
    pub current_l3: f64,
    /// Phase 1 power
    pub power_l1: f64,
    /// Phase 2 power
    pub power_l2: f64,
    /// Phase 3 power
    pub power_l3: f64,
    /// Phase 1 voltage
    pub voltage_l1: f64,
    /// Phase 2 voltage
    pub voltage_l2: f64,
    /// Phase 3 voltage
    pub voltage_l3: f64,
    /// Line frequency
    pub frequency: f64,
    /// Power factor
    pub power_factor: f64,
    /// Total active power
    pub active_power: f64,
    /// Total reactive power
    pub reactive_power: f64,
    /// Phase 1 positive active energy
    pub positive_active_energy_l1: f64,
    /// Phase 1 negative active energy
    pub negative_active_energy_l1: f64,
    /// Phase 1 positive reactive energy
    pub positive_reactive_energy_l1: f64,
    /// Phase 1 negative reactive energy
    pub negative_reactive_energy_l1: f64,
    /// Phase 2 positive active energy
    pub positive_active_energy_l2: f64,
    /// Phase 2 negative active energy
    pub negative_active_energy_l2: f64,
    /// Phase 2 positive reactive energy
    pub positive_reactive_energy_l2: f64,
    /// Phase 2 negative reactive energy
    pub negative_reactive_energy_l2: f64,
    /// Phase 3 positive active energy
    pub positive_active_energy_l3: f64,
    /// Phase 3 negative active energy
    pub negative_active_energy_l3: f64,
    /// Phase 3 positive reactive energy
    pub positive_reactive_energy_l3: f64,
    /// Phase 3 negative reactive energy
    pub negative_reactive_energy_l3: f64,
    /// Device temperature
    pub temperature: f64,
}

impl MeterReadings {
    /// Build from values in wire order
    pub fn from_values(v: [f64; METER_FIELD_COUNT]) -> Self {
        Self {
            energy: v[0],
            current_l1: v[1],
            current_l2: v[2],
            current_l3: v[3],
            power_l1: v[4],
            power_l2: v[5],
            power_l3: v[6],
            voltage_l1: v[7],
            voltage_l2: v[8],
            voltage_l3: v[9],
            frequency: v[10],
            power_factor: v[11],
            active_power: v[12],
            reactive_power: v[13],
            positive_active_energy_l1: v[14],
            negative_active_energy_l1: v[15],
            positive_reactive_energy_l1: v[16],
            negative_reactive_energy_l1: v[17],
            positive_active_energy_l2: v[18],
            negative_active_energy_l2: v[19],
            positive_reactive_energy_l2: v[20],
            negative_reactive_energy_l2: v[21],
            positive_active_energy_l3: v[22],
            negative_active_energy_l3: v[23],
            positive_reactive_energy_l3: v[24],
            negative_reactive_energy_l3: v[25],
            temperature: v[26],
        }
    }

    /// Values in wire order
    pub fn to_values(&self) -> [f64; METER_FIELD_COUNT] {
        [
            self.energy,
            self.current_l1,
            self.current_l2,
            self.current_l3,
            self.power_l1,
            self.power_l2,
            self.power_l3,
            self.voltage_l1,
            self.voltage_l2,
            self.voltage_l3,
            self.frequency,
            self.power_factor,
            self.active_power,
            self.reactive_power,
            self.positive_active_energy_l1,
            self.negative_active_energy_l1,
            self.positive_reactive_energy_l1,
            self.negative_reactive_energy_l1,
            self.positive_active_energy_l2,
            self.negative_active_energy_l2,
            self.positive_reactive_energy_l2,
            self.negative_reactive_energy_l2,
            self.positive_active_energy_l3,
            self.negative_active_energy_l3,
            self.positive_reactive_energy_l3,
            self.negative_reactive_energy_l3,
            self.temperature,
        ]
    }

    /// Look up a value by its field name
    pub fn get(&self, name: &str) -> Option<f64> {
        METER_FIELDS
            .iter()
            .position(|field| *field == name)
            .map(|idx| self.to_values()[idx])
    }
}

/// A decoded telemetry line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Device serial number from `log[<serial>]`
    pub serial_number: String,
    /// Lock state (parameter 1, non-zero means locked)
    pub locked: bool,
    /// Proximity pilot reading
    pub pp: f64,
    /// Control pilot reading
    pub cp: f64,
    /// Negative control pilot reading
    pub cpn: f64,
    /// Energy meter block
    pub meter: MeterReadings,
    /// Fixed-current setting, as sent
    pub dfix_value: String,
    /// Digital output state, as sent
    pub do_status: String,
    /// LED state code
    pub led_status: i32,
    /// Meter energy counter, as sent
    pub meter_kwh: String,
    /// Control pilot sample, as sent
    pub cp100: String,
    /// Negative control pilot sample, as sent
    pub cpn100: String,
    /// Firmware loop iteration count, as sent
    pub last_iterations: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_values_order() {
        let mut values = [0.0; METER_FIELD_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as f64;
        }
        let readings = MeterReadings::from_values(values);

        assert_eq!(readings.energy, 0.0);
        assert_eq!(readings.current_l1, 1.0);
        assert_eq!(readings.voltage_l3, 9.0);
        assert_eq!(readings.frequency, 10.0);
        assert_eq!(readings.positive_active_energy_l1, 14.0);
        assert_eq!(readings.negative_reactive_energy_l3, 25.0);
        assert_eq!(readings.temperature, 26.0);
        assert_eq!(readings.to_values(), values);
    }

    #[test]
    fn test_meter_get_by_name() {
        let mut values = [0.0; METER_FIELD_COUNT];
        values[11] = 0.98;
        let readings = MeterReadings::from_values(values);
        assert_eq!(readings.get("power_factor"), Some(0.98));
        assert_eq!(readings.get("nope"), None);
    }
}
