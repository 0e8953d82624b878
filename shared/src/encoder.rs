//! Uplink payload encoding
//!
//! Each uplink is a single JSON object named after its [`MessageSlot`],
//! holding only that slot's fields. Floats are rendered with three decimals,
//! non-finite ones as `null`.

use core::fmt::{self, Write};

use heapless::Vec;

use crate::readings::{MessageSlot, SensorReadings};

/// Capacity of the uplink buffer in bytes
pub const TX_BUFFER_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Rendered payload does not fit into [`TX_BUFFER_SIZE`] bytes
    Overflow,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "payload exceeds {} bytes", TX_BUFFER_SIZE),
        }
    }
}

/// Fixed capacity uplink buffer, reused across send cycles
#[derive(Debug, Clone, Default)]
pub struct TransmitBuffer {
    bytes: Vec<u8, TX_BUFFER_SIZE>,
}

impl TransmitBuffer {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload as text, `None` only if bytes were pushed from outside `fmt::Write`
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zero the payload and reset the length
    pub fn clear(&mut self) {
        self.bytes.iter_mut().for_each(|byte| *byte = 0);
        self.bytes.clear();
    }
}

impl Write for TransmitBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.bytes
            .extend_from_slice(s.as_bytes())
            .map_err(|_| fmt::Error)
    }
}

/// Float field value, three decimals, `null` when NaN or infinite
struct Decimal(f32);

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_finite() {
            write!(f, "{:.3}", self.0)
        } else {
            f.write_str("null")
        }
    }
}

/// Render the `slot` half of `readings` into `buffer`, replacing its contents.
///
/// A NaN or infinite reading is written as `null` so the rest of the slot
/// still parses. Returns the payload length. On overflow the buffer is left
/// empty.
pub fn encode_into(
    readings: &SensorReadings,
    slot: MessageSlot,
    buffer: &mut TransmitBuffer,
) -> Result<usize, EncodeError> {
    buffer.clear();

    let r = readings;
    let rendered = match slot {
        MessageSlot::SlotA => write!(
            buffer,
            "{{\"{}\":{{\"temp_bme\":{},\"pres_bme\":{},\"hum_bme\":{},\"gas_res_bme\":{},\
             \"co2_eq_bme\":{},\"breath_voc_eq_bme\":{},\"iaq_score_bme\":{},\
             \"iaq_acc_bme\":{},\"lux\":{}}}}}",
            slot.message_name(),
            Decimal(r.temperature_bme),
            Decimal(r.pressure_bme),
            Decimal(r.humidity_bme),
            Decimal(r.gas_resistance_bme),
            Decimal(r.co2_equivalent_bme),
            Decimal(r.breath_voc_equivalent_bme),
            Decimal(r.iaq_score_bme),
            r.iaq_accuracy_bme,
            Decimal(r.lux),
        ),
        MessageSlot::SlotB => write!(
            buffer,
            "{{\"{}\":{{\"hum_si\":{},\"temp_si\":{},\
             \"x_accel\":{},\"y_accel\":{},\"z_accel\":{},\
             \"x_mag\":{},\"y_mag\":{},\"z_mag\":{},\
             \"x_gyro\":{},\"y_gyro\":{},\"z_gyro\":{},\
             \"dist\":{},\"vbat\":{}}}}}",
            slot.message_name(),
            r.humidity_si,
            r.temperature_si,
            Decimal(r.accel.x),
            Decimal(r.accel.y),
            Decimal(r.accel.z),
            Decimal(r.mag.x),
            Decimal(r.mag.y),
            Decimal(r.mag.z),
            Decimal(r.gyro.x),
            Decimal(r.gyro.y),
            Decimal(r.gyro.z),
            r.distance,
            Decimal(r.battery_voltage),
        ),
    };

    if rendered.is_err() {
        buffer.clear();
        return Err(EncodeError::Overflow);
    }
    Ok(buffer.len())
}

pub fn encode(readings: &SensorReadings, slot: MessageSlot) -> Result<TransmitBuffer, EncodeError> {
    let mut buffer = TransmitBuffer::new();
    encode_into(readings, slot, &mut buffer)?;
    Ok(buffer)
}
