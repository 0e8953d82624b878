//! Sensor capabilities consumed by the hub
//!
//! One trait per device on the board. Drivers implement the trait for their
//! part; the hub only ever sees these.

pub mod battery;

pub use battery::BatteryMonitor;

use shared::TriAxis;

use crate::prelude::*;

/// BME680 with the BSEC air quality outputs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentSample {
    pub temperature: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub gas_resistance: f32,
    pub co2_equivalent: f32,
    pub breath_voc_equivalent: f32,
    pub iaq_score: f32,
    pub iaq_accuracy: u8,
}

/// Si7021 sample in thousandths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HumiditySample {
    pub humidity: u32,
    pub temperature: u32,
}

pub trait EnvironmentSensor {
    fn init(&mut self) -> Result<(), SensorError>;
    fn read(&mut self) -> Result<EnvironmentSample, SensorError>;
}

pub trait LightSensor {
    /// The MAX44009 has no identification register to check
    fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
    fn read_lux(&mut self) -> Result<f32, SensorError>;
}

pub trait HumiditySensor {
    fn init(&mut self) -> Result<(), SensorError>;
    /// Trigger a conversion and read both channels
    fn measure(&mut self) -> Result<HumiditySample, SensorError>;
}

pub trait RangeSensor {
    fn init(&mut self) -> Result<(), SensorError>;
    /// Raw distance in mm, 0 when nothing is in range
    fn read_distance(&mut self) -> Result<u32, SensorError>;
}

/// 9-axis IMU, each read converts raw counts to physical units
pub trait MotionSensor {
    /// Bring the part up and calibrate it
    fn init(&mut self) -> Result<(), SensorError>;
    fn read_accel(&mut self) -> Result<TriAxis, SensorError>;
    fn read_gyro(&mut self) -> Result<TriAxis, SensorError>;
    fn read_mag(&mut self) -> Result<TriAxis, SensorError>;
}

pub trait BatterySensor {
    fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }
    fn read_voltage(&mut self) -> Result<f32, SensorError>;
}

/// Single ended ADC channel
pub trait AnalogInput {
    /// Sample scaled to 0.0..=1.0 of the reference voltage
    fn read_normalized(&mut self) -> Result<f32, SensorError>;
}
