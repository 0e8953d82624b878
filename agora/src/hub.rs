//! Sensor polling
//!
//! [`SensorHub`] owns one driver per device and turns a polling pass into a
//! [`SensorReadings`] snapshot. A failing device only costs its own fields.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;
use log::{debug, info, warn};
use shared::{normalize_distance, SensorReadings};

use crate::prelude::*;
use crate::sensors::{
    BatterySensor, EnvironmentSensor, HumiditySensor, LightSensor, MotionSensor, RangeSensor,
};

/// Sensor power domain settle time, in ms
pub const SENSOR_POWER_SETTLE_MS: u32 = 100;

/// Something that produces a readings snapshot on demand
pub trait ReadingSource {
    fn poll(&mut self) -> SensorReadings;
}

/// Which sensors came up during [`SensorHub::power_up`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    pub environment: bool,
    pub light: bool,
    pub humidity: bool,
    pub range: bool,
    pub motion: bool,
    pub battery: bool,
}

impl InitReport {
    pub fn all_ok(&self) -> bool {
        self.environment && self.light && self.humidity && self.range && self.motion && self.battery
    }
}

pub struct SensorHub<E, L, H, R, M, B> {
    environment: E,
    light: L,
    humidity: H,
    range: R,
    motion: M,
    battery: B,
}

impl<E, L, H, R, M, B> SensorHub<E, L, H, R, M, B>
where
    E: EnvironmentSensor,
    L: LightSensor,
    H: HumiditySensor,
    R: RangeSensor,
    M: MotionSensor,
    B: BatterySensor,
{
    pub fn new(environment: E, light: L, humidity: H, range: R, motion: M, battery: B) -> Self {
        SensorHub {
            environment,
            light,
            humidity,
            range,
            motion,
            battery,
        }
    }

    /// Enable the sensor power domain and initialise every sensor.
    ///
    /// Sensors that fail to initialise stay in the hub and report failures
    /// when polled. Only a power enable pin fault is an error.
    pub fn power_up<P, D>(&mut self, power_en: &mut P, delay: &mut D) -> Result<InitReport, SensorError>
    where
        P: OutputPin,
        D: DelayMs<u32>,
    {
        power_en.set_high().map_err(|_| SensorError::Pin)?;
        delay.delay_ms(SENSOR_POWER_SETTLE_MS);

        info!("Initializing sensors...");
        let report = InitReport {
            environment: init_status("BME680", self.environment.init()),
            light: init_status("MAX44009", self.light.init()),
            humidity: init_status("Si7021", self.humidity.init()),
            range: init_status("VL53L0X", self.range.init()),
            motion: init_status("LSM9DS1", self.motion.init()),
            battery: init_status("VBAT", self.battery.init()),
        };
        Ok(report)
    }
}

fn init_status(name: &str, result: Result<(), SensorError>) -> bool {
    match result {
        Ok(()) => {
            info!("\t {}: OK", name);
            true
        }
        Err(error) => {
            warn!("\t {}: FAILED ({})", name, error);
            false
        }
    }
}

/// Log a failed read and turn it into `None`
fn sampled<T>(name: &str, result: Result<T, SensorError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!("{} read failed: {}", name, error);
            None
        }
    }
}

impl<E, L, H, R, M, B> ReadingSource for SensorHub<E, L, H, R, M, B>
where
    E: EnvironmentSensor,
    L: LightSensor,
    H: HumiditySensor,
    R: RangeSensor,
    M: MotionSensor,
    B: BatterySensor,
{
    fn poll(&mut self) -> SensorReadings {
        debug!("Polling sensors...");
        let mut readings = SensorReadings::default();

        if let Some(env) = sampled("BME680", self.environment.read()) {
            readings.temperature_bme = env.temperature;
            readings.pressure_bme = env.pressure;
            readings.humidity_bme = env.humidity;
            readings.gas_resistance_bme = env.gas_resistance;
            readings.co2_equivalent_bme = env.co2_equivalent;
            readings.breath_voc_equivalent_bme = env.breath_voc_equivalent;
            readings.iaq_score_bme = env.iaq_score;
            readings.iaq_accuracy_bme = env.iaq_accuracy;
            debug!(
                "BME680: temperature {:.2}, pressure {:.2}, humidity {:.2}, gas resistance {:.2}",
                env.temperature, env.pressure, env.humidity, env.gas_resistance
            );
            debug!(
                "BME680: co2 eq {:.2}, breath voc eq {:.2}, iaq {:.2} (accuracy {})",
                env.co2_equivalent, env.breath_voc_equivalent, env.iaq_score, env.iaq_accuracy
            );
        }

        if let Some(lux) = sampled("MAX44009", self.light.read_lux()) {
            readings.lux = lux;
            debug!("MAX44009: {:.2} lx", lux);
        }

        if let Some(si) = sampled("Si7021", self.humidity.measure()) {
            readings.humidity_si = si.humidity;
            readings.temperature_si = si.temperature;
            debug!("Si7021: temperature {}, humidity {}", si.temperature, si.humidity);
        }

        if let Some(raw) = sampled("VL53L0X", self.range.read_distance()) {
            readings.distance = normalize_distance(raw);
            debug!("VL53L0X: distance {}", readings.distance);
        }

        if let Some(accel) = sampled("LSM9DS1 accel", self.motion.read_accel()) {
            readings.accel = accel;
            debug!("LSM9DS1: accel ({:.2}, {:.2}, {:.2})", accel.x, accel.y, accel.z);
        }
        if let Some(gyro) = sampled("LSM9DS1 gyro", self.motion.read_gyro()) {
            readings.gyro = gyro;
            debug!("LSM9DS1: gyro  ({:.2}, {:.2}, {:.2})", gyro.x, gyro.y, gyro.z);
        }
        if let Some(mag) = sampled("LSM9DS1 mag", self.motion.read_mag()) {
            readings.mag = mag;
            debug!("LSM9DS1: mag   ({:.2}, {:.2}, {:.2})", mag.x, mag.y, mag.z);
        }

        if let Some(vbat) = sampled("VBAT", self.battery.read_voltage()) {
            readings.battery_voltage = vbat;
            debug!("Battery Voltage: {:.2} V", vbat);
        }

        readings
    }
}
