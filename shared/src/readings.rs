//! One polling pass worth of sensor data

/// Distance reported when the range sensor sees nothing within reach
pub const DISTANCE_OUT_OF_RANGE: u32 = 0xFFFF;

/// Map a raw range reading onto the value placed in [`SensorReadings`].
///
/// The range sensor reports 0 when the target is too far to measure.
pub fn normalize_distance(raw_mm: u32) -> u32 {
    if raw_mm == 0 {
        DISTANCE_OUT_OF_RANGE
    } else {
        raw_mm
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct TriAxis {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl TriAxis {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Snapshot of every measured quantity.
///
/// Fields a sensor failed to deliver keep their [`Default`] value: zero for
/// everything except `distance`, which holds [`DISTANCE_OUT_OF_RANGE`].
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    /// BME680 temperature [°C]
    pub temperature_bme: f32,
    /// BME680 pressure [hPa]
    pub pressure_bme: f32,
    /// BME680 relative humidity [%RH]
    pub humidity_bme: f32,
    /// BME680 gas resistance [Ω]
    pub gas_resistance_bme: f32,
    /// BSEC CO2 equivalent [ppm]
    pub co2_equivalent_bme: f32,
    /// BSEC breath VOC equivalent [ppm]
    pub breath_voc_equivalent_bme: f32,
    /// BSEC indoor air quality index
    pub iaq_score_bme: f32,
    /// BSEC IAQ accuracy, 0 (unreliable) to 3 (high)
    pub iaq_accuracy_bme: u8,
    /// MAX44009 ambient light [lx]
    pub lux: f32,
    /// Si7021 relative humidity [m%RH]
    pub humidity_si: u32,
    /// Si7021 temperature [m°C]
    pub temperature_si: u32,
    /// LSM9DS1 acceleration [g]
    pub accel: TriAxis,
    /// LSM9DS1 angular rate [dps]
    pub gyro: TriAxis,
    /// LSM9DS1 magnetic field [gauss]
    pub mag: TriAxis,
    /// VL53L0X distance [mm]
    pub distance: u32,
    /// Battery voltage [V]
    pub battery_voltage: f32,
}

impl Default for SensorReadings {
    fn default() -> Self {
        Self {
            temperature_bme: 0.0,
            pressure_bme: 0.0,
            humidity_bme: 0.0,
            gas_resistance_bme: 0.0,
            co2_equivalent_bme: 0.0,
            breath_voc_equivalent_bme: 0.0,
            iaq_score_bme: 0.0,
            iaq_accuracy_bme: 0,
            lux: 0.0,
            humidity_si: 0,
            temperature_si: 0,
            accel: TriAxis::default(),
            gyro: TriAxis::default(),
            mag: TriAxis::default(),
            distance: DISTANCE_OUT_OF_RANGE,
            battery_voltage: 0.0,
        }
    }
}

/// Which half of the readings goes into the next uplink
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageSlot {
    /// Environmental fields, sent as `Data_Msg_0`
    #[default]
    SlotA,
    /// Motion, range and battery fields, sent as `Data_Msg_1`
    SlotB,
}

impl MessageSlot {
    #[inline]
    pub fn next(self) -> Self {
        match self {
            MessageSlot::SlotA => MessageSlot::SlotB,
            MessageSlot::SlotB => MessageSlot::SlotA,
        }
    }

    /// Name of the JSON object the slot is wrapped in
    pub fn message_name(self) -> &'static str {
        match self {
            MessageSlot::SlotA => "Data_Msg_0",
            MessageSlot::SlotB => "Data_Msg_1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_means_out_of_range() {
        assert_eq!(normalize_distance(0), DISTANCE_OUT_OF_RANGE);
        assert_eq!(normalize_distance(1), 1);
        assert_eq!(normalize_distance(1200), 1200);
    }

    #[test]
    fn default_readings_use_sentinels() {
        let readings = SensorReadings::default();
        assert_eq!(readings.distance, DISTANCE_OUT_OF_RANGE);
        assert_eq!(readings.iaq_accuracy_bme, 0);
        assert_eq!(readings.accel, TriAxis::new(0.0, 0.0, 0.0));
        assert_eq!(readings.battery_voltage, 0.0);
    }

    #[test]
    fn slots_alternate() {
        let mut slot = MessageSlot::default();
        let mut seen = [MessageSlot::SlotA; 4];
        for entry in seen.iter_mut() {
            *entry = slot;
            slot = slot.next();
        }
        assert_eq!(
            seen,
            [
                MessageSlot::SlotA,
                MessageSlot::SlotB,
                MessageSlot::SlotA,
                MessageSlot::SlotB
            ]
        );
    }

    #[test]
    fn readings_survive_a_trip_through_json() {
        let readings = SensorReadings {
            temperature_bme: 21.5,
            iaq_accuracy_bme: 3,
            humidity_si: 45_100,
            accel: TriAxis::new(0.0, -0.5, 1.0),
            distance: normalize_distance(0),
            battery_voltage: 3.75,
            ..SensorReadings::default()
        };

        let text = serde_json::to_string(&readings).unwrap();
        assert!(text.contains("\"accel\":{\"x\":0.0,\"y\":-0.5,\"z\":1.0}"), "{}", text);
        assert!(text.contains("\"distance\":65535"), "{}", text);
        let parsed: SensorReadings = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, readings);
    }

    #[test]
    fn slot_serializes_by_name() {
        assert_eq!(serde_json::to_string(&MessageSlot::SlotB).unwrap(), "\"SlotB\"");
        let slot: MessageSlot = serde_json::from_str("\"SlotA\"").unwrap();
        assert_eq!(slot, MessageSlot::SlotA);
    }
}
