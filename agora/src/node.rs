//! Node bring-up
//!
//! Sensors come up first so the first uplink after the join already carries
//! real readings, then the radio is started and the queue runs until the
//! network drops the node.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;
use log::{info, warn};

use crate::config::NodeConfig;
use crate::dispatch::{EventQueue, EventSource};
use crate::hub::SensorHub;
use crate::link::{LinkController, Task};
use crate::prelude::*;
use crate::radio::LoraStack;
use crate::sensors::{
    BatterySensor, EnvironmentSensor, HumiditySensor, LightSensor, MotionSensor, RangeSensor,
};

/// Board resources only needed while powering up the sensors
pub struct SensorPower<P, D> {
    pub enable: P,
    pub delay: D,
}

/// Power and initialise the sensors, join the network and dispatch.
///
/// Returns once the network disconnects, or with the first fatal error.
/// Sensor faults are logged and never stop the node.
pub fn run<R, E, L, H, G, M, B, P, D, Src, const N: usize>(
    stack: R,
    mut hub: SensorHub<E, L, H, G, M, B>,
    power: &mut SensorPower<P, D>,
    config: NodeConfig,
    queue: &mut EventQueue<Task, N>,
    source: &mut Src,
) -> NodeResult<()>
where
    R: LoraStack,
    E: EnvironmentSensor,
    L: LightSensor,
    H: HumiditySensor,
    G: RangeSensor,
    M: MotionSensor,
    B: BatterySensor,
    P: OutputPin,
    D: DelayMs<u32>,
    Src: EventSource<Task>,
{
    info!("Agora node starting");
    match hub.power_up(&mut power.enable, &mut power.delay) {
        Ok(report) if report.all_ok() => info!("All sensors initialized"),
        Ok(report) => warn!("Sensors offline: {:?}", report),
        Err(e) => warn!("Sensor power not enabled: {}", e),
    }

    let mut controller = LinkController::new(stack, hub, config);
    controller.run(queue, source)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use super::*;
    use crate::dispatch::mock::Scripted;
    use crate::hub::mock::{Env, Imu, Light, Range, Si};
    use crate::radio::{JoinParams, JoinStatus, LinkEvent, MessageType, Received};
    use crate::sensors::battery::mock::{FixedAdc, RecordingDelay, RecordingPin};
    use crate::sensors::BatteryMonitor;

    type Journal = Rc<RefCell<Vec<&'static str>>>;

    /// Sensor power pin writing into the shared journal
    struct PowerPin {
        journal: Journal,
        fail: bool,
    }

    impl OutputPin for PowerPin {
        type Error = ();

        fn set_low(&mut self) -> Result<(), ()> {
            self.journal.borrow_mut().push("sensor power off");
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.journal.borrow_mut().push("sensor power on");
            Ok(())
        }
    }

    struct Stack(Journal);

    impl LoraStack for Stack {
        fn initialize(&mut self) -> Result<(), StackError> {
            self.0.borrow_mut().push("initialize");
            Ok(())
        }

        fn set_confirmed_msg_retries(&mut self, _count: u8) -> Result<(), StackError> {
            Ok(())
        }

        fn disable_adaptive_datarate(&mut self) -> Result<(), StackError> {
            Ok(())
        }

        fn connect(&mut self, _params: &JoinParams) -> Result<JoinStatus, StackError> {
            self.0.borrow_mut().push("connect");
            Ok(JoinStatus::InProgress)
        }

        fn set_datarate(&mut self, _datarate: u8) -> Result<(), StackError> {
            Ok(())
        }

        fn send(&mut self, _port: u8, payload: &[u8], _kind: MessageType) -> Result<usize, StackError> {
            self.0.borrow_mut().push("send");
            Ok(payload.len())
        }

        fn receive(&mut self, _buffer: &mut [u8]) -> Result<Received, StackError> {
            Err(StackError::WouldBlock)
        }
    }

    type Hub = SensorHub<Env, Light, Si, Range, Imu, BatteryMonitor<RecordingPin, FixedAdc, RecordingDelay>>;

    fn hub() -> Hub {
        let battery = BatteryMonitor::new(
            RecordingPin::default(),
            FixedAdc(Ok(0.6)),
            RecordingDelay::default(),
        );
        SensorHub::new(Env(false), Light(false), Si(false), Range(false, 412), Imu(false), battery)
    }

    fn boot(fail_power: bool) -> (NodeResult<()>, Vec<&'static str>, Vec<u32>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let journal = Journal::default();
        let delay = RecordingDelay::default();
        let mut power = SensorPower {
            enable: PowerPin {
                journal: journal.clone(),
                fail: fail_power,
            },
            delay: delay.clone(),
        };
        let mut queue: EventQueue<Task, 8> = EventQueue::new();
        let mut source = Scripted::new([
            (1_000, Task::Link(LinkEvent::Connected)),
            (2_000, Task::Link(LinkEvent::Disconnected)),
        ]);
        let config = NodeConfig::default().with_duty_cycle(false);

        let result = run(Stack(journal.clone()), hub(), &mut power, config, &mut queue, &mut source);
        let entries = journal.borrow().clone();
        let waits = delay.waits.borrow().clone();
        (result, entries, waits)
    }

    #[test]
    fn sensors_power_up_before_the_radio_starts() {
        let (result, journal, waits) = boot(false);

        assert_eq!(result, Ok(()));
        assert_eq!(journal, ["sensor power on", "initialize", "connect", "send"]);
        assert_eq!(waits, [crate::hub::SENSOR_POWER_SETTLE_MS]);
    }

    #[test]
    fn sensor_power_fault_still_joins() {
        let (result, journal, waits) = boot(true);

        assert_eq!(result, Ok(()));
        assert_eq!(journal, ["initialize", "connect", "send"]);
        assert!(waits.is_empty());
    }
}
