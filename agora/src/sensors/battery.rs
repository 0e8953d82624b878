use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;
use log::warn;

use super::{AnalogInput, BatterySensor};
use crate::prelude::*;

/// ADC reference voltage
pub const VBAT_REFERENCE: f32 = 3.3;
/// Battery divider ratio in front of the ADC
pub const VBAT_DIVIDER: f32 = 2.0;
/// Divider settle time after enabling the monitor, in ms
pub const BATTERY_SETTLE_MS: u32 = 10;

/// Battery voltage through a switched divider.
///
/// The divider is only powered while a sample is taken.
pub struct BatteryMonitor<EN, ADC, D> {
    enable: EN,
    adc: ADC,
    delay: D,
}

impl<EN, ADC, D> BatteryMonitor<EN, ADC, D>
where
    EN: OutputPin,
    ADC: AnalogInput,
    D: DelayMs<u32>,
{
    pub fn new(enable: EN, adc: ADC, delay: D) -> Self {
        BatteryMonitor { enable, adc, delay }
    }

    pub fn release(self) -> (EN, ADC, D) {
        (self.enable, self.adc, self.delay)
    }
}

/// Holds the monitor enable pin high until dropped
struct MonitorEnable<'a, P: OutputPin>(&'a mut P);

impl<'a, P: OutputPin> MonitorEnable<'a, P> {
    fn acquire(pin: &'a mut P) -> Result<Self, SensorError> {
        pin.set_high().map_err(|_| SensorError::Pin)?;
        Ok(MonitorEnable(pin))
    }
}

impl<P: OutputPin> Drop for MonitorEnable<'_, P> {
    fn drop(&mut self) {
        if self.0.set_low().is_err() {
            warn!("battery monitor enable could not be released");
        }
    }
}

impl<EN, ADC, D> BatterySensor for BatteryMonitor<EN, ADC, D>
where
    EN: OutputPin,
    ADC: AnalogInput,
    D: DelayMs<u32>,
{
    fn read_voltage(&mut self) -> Result<f32, SensorError> {
        let _enable = MonitorEnable::acquire(&mut self.enable)?;
        self.delay.delay_ms(BATTERY_SETTLE_MS);
        let sample = self.adc.read_normalized()?;
        Ok(sample * VBAT_REFERENCE * VBAT_DIVIDER)
    }
}
