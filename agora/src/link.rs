//! LoRaWAN connection lifecycle and uplink cadence
//!
//! [`LinkController`] joins the network at startup, then reacts to the
//! stack's [`LinkEvent`]s and its own timers, all delivered as [`Task`]s by
//! the event queue. Each send cycle polls the sensors, encodes the current
//! [`MessageSlot`] and hands the payload to the stack.
//!
//! The slot flips as soon as a payload is built, whether or not the stack
//! takes it, so consecutive cycles always alternate between the two halves
//! of the readings. A payload the stack refuses with `WouldBlock` is kept and
//! resubmitted unchanged after [`NodeConfig::retry_delay_ms`], unless a newer
//! cycle replaced it first.

use log::{debug, error, info, warn};
use shared::{encode_into, MessageSlot, TransmitBuffer, TX_BUFFER_SIZE};

use crate::config::NodeConfig;
use crate::dispatch::{EventQueue, EventSource, Scheduler, TimerId};
use crate::hub::ReadingSource;
use crate::prelude::*;
use crate::radio::{JoinParams, LinkEvent, LoraStack, MessageType, Received};

/// Downlink buffer size
pub const RX_BUFFER_SIZE: usize = TX_BUFFER_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Joining,
    Connected,
    /// Disconnected after having joined, nothing runs anymore
    Terminated,
}

/// Work items run by the event queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Notification from the stack
    Link(LinkEvent),
    /// Poll, encode and send
    SendCycle,
    /// Resubmit the payload of send cycle `cycle`
    RetrySend { cycle: u32 },
}

pub struct LinkController<R, S> {
    stack: R,
    sensors: S,
    config: NodeConfig,
    state: ConnectionState,
    slot: MessageSlot,
    tx_buffer: TransmitBuffer,
    rx_buffer: [u8; RX_BUFFER_SIZE],
    /// Number of the most recent send cycle
    cycle: u32,
    /// Cycle whose payload sits in `tx_buffer` waiting for a retry
    pending_retry: Option<u32>,
    immediate_retries: u8,
    send_timer: Option<TimerId>,
}

impl<R, S> LinkController<R, S>
where
    R: LoraStack,
    S: ReadingSource,
{
    pub fn new(stack: R, sensors: S, config: NodeConfig) -> Self {
        LinkController {
            stack,
            sensors,
            config,
            state: ConnectionState::Disconnected,
            slot: MessageSlot::default(),
            tx_buffer: TransmitBuffer::new(),
            rx_buffer: [0; RX_BUFFER_SIZE],
            cycle: 0,
            pending_retry: None,
            immediate_retries: 0,
            send_timer: None,
        }
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Slot the next send cycle will encode
    #[inline]
    pub fn slot(&self) -> MessageSlot {
        self.slot
    }

    #[inline]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn stack(&self) -> &R {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut R {
        &mut self.stack
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    /// Payload retained for a pending retry, empty otherwise
    pub fn tx_buffer(&self) -> &TransmitBuffer {
        &self.tx_buffer
    }

    /// Configure the stack and request the OTAA join.
    ///
    /// Any rejection here is fatal, the node cannot run without a session.
    pub fn start(&mut self) -> NodeResult<()> {
        self.stack
            .initialize()
            .map_err(|e| startup_failed(StartupStep::Initialize, e))?;
        info!("LoRaWAN stack initialized");

        self.stack
            .set_confirmed_msg_retries(self.config.confirmed_msg_retries)
            .map_err(|e| startup_failed(StartupStep::ConfirmedRetries, e))?;
        info!("CONFIRMED message retries : {}", self.config.confirmed_msg_retries);

        self.stack
            .disable_adaptive_datarate()
            .map_err(|e| startup_failed(StartupStep::AdaptiveDatarate, e))?;
        info!("Adaptive data rate (ADR) - Disabled");

        let params = JoinParams {
            credentials: self.config.credentials,
            trials: self.config.join_trials,
        };
        self.stack
            .connect(&params)
            .map_err(|e| startup_failed(StartupStep::Connect, e))?;

        self.state = ConnectionState::Joining;
        info!("Connection - In Progress ...");
        Ok(())
    }

    /// Start the link and dispatch until the network disconnects.
    pub fn run<Src, const N: usize>(
        &mut self,
        queue: &mut EventQueue<Task, N>,
        source: &mut Src,
    ) -> NodeResult<()>
    where
        Src: EventSource<Task>,
    {
        self.start()?;
        queue.dispatch_forever(source, |task, queue| self.handle(task, queue))
    }

    /// Run one task from the event queue
    pub fn handle<Q: Scheduler<Task>>(&mut self, task: Task, queue: &mut Q) -> NodeResult<()> {
        if let Task::Link(LinkEvent::Unknown(code)) = task {
            error!("Unknown event code {}", code);
            return Err(NodeError::UnknownEvent(code));
        }
        if self.state == ConnectionState::Terminated {
            debug!("{:?} ignored after disconnect", task);
            return Ok(());
        }

        match task {
            Task::Link(event) => self.on_event(event, queue),
            Task::SendCycle if self.state == ConnectionState::Connected => {
                self.send_cycle(queue);
                Ok(())
            }
            Task::RetrySend { cycle } if self.state == ConnectionState::Connected => {
                self.retry(cycle, queue);
                Ok(())
            }
            task => {
                debug!("{:?} ignored while {:?}", task, self.state);
                Ok(())
            }
        }
    }

    fn on_event<Q: Scheduler<Task>>(&mut self, event: LinkEvent, queue: &mut Q) -> NodeResult<()> {
        match event {
            LinkEvent::Connected => {
                if self.state != ConnectionState::Joining {
                    warn!("Connected while {:?}, ignored", self.state);
                    return Ok(());
                }
                self.state = ConnectionState::Connected;
                info!("Connection - Successful");

                if let Err(e) = self.stack.set_datarate(self.config.datarate) {
                    warn!("set_datarate({}) failed: {}", self.config.datarate, e);
                }

                if self.config.duty_cycle {
                    let timer = queue.post_every(self.config.tx_interval_ms, Task::SendCycle)?;
                    self.send_timer = Some(timer);
                } else {
                    self.send_cycle(queue);
                }
            }
            LinkEvent::Disconnected => {
                self.state = ConnectionState::Terminated;
                if let Some(timer) = self.send_timer.take() {
                    queue.cancel(timer);
                }
                queue.break_dispatch();
                info!("Disconnected Successfully");
            }
            LinkEvent::SendComplete => {
                info!("Message Sent to Network Server");
                self.immediate_retries = 0;
                if self.connected() && !self.config.duty_cycle {
                    self.send_cycle(queue);
                }
            }
            LinkEvent::SendFailed(failure) => {
                warn!("Transmission Error - {}", failure);
                if self.connected() && !self.config.duty_cycle {
                    self.resend_after_failure(queue);
                }
            }
            LinkEvent::ReceiveReady => {
                info!("Received message from Network Server");
                self.receive_message();
            }
            LinkEvent::ReceiveTimeout | LinkEvent::ReceiveError => {
                warn!("Error in reception - {:?}", event);
            }
            LinkEvent::JoinFailure => {
                error!("OTAA Failed - Check Keys");
            }
            LinkEvent::UplinkRequired => {
                info!("Uplink required by NS");
                if self.connected() && !self.config.duty_cycle {
                    self.send_cycle(queue);
                }
            }
            LinkEvent::Unknown(code) => return Err(NodeError::UnknownEvent(code)),
        }
        Ok(())
    }

    #[inline]
    fn connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Send straight away a few times, then fall back to the retry delay so a
    /// persistently failing link cannot monopolise the queue.
    fn resend_after_failure<Q: Scheduler<Task>>(&mut self, queue: &mut Q) {
        if self.immediate_retries < self.config.max_immediate_retries {
            self.immediate_retries += 1;
            self.send_cycle(queue);
            return;
        }

        self.immediate_retries = 0;
        warn!(
            "{} resends failed, next attempt in {} ms",
            self.config.max_immediate_retries, self.config.retry_delay_ms
        );
        if queue
            .post_in(self.config.retry_delay_ms, Task::SendCycle)
            .is_err()
        {
            warn!("resend not scheduled: event queue full");
        }
    }

    /// Poll, encode and submit one uplink
    fn send_cycle<Q: Scheduler<Task>>(&mut self, queue: &mut Q) {
        let readings = self.sensors.poll();

        let slot = self.slot;
        self.slot = slot.next();
        self.cycle = self.cycle.wrapping_add(1);
        self.pending_retry = None;

        if let Err(e) = encode_into(&readings, slot, &mut self.tx_buffer) {
            error!("{:?} not encoded: {}", slot, e);
            return;
        }
        self.submit(queue);
    }

    fn retry<Q: Scheduler<Task>>(&mut self, cycle: u32, queue: &mut Q) {
        if self.pending_retry != Some(cycle) {
            debug!("retry of cycle {} superseded", cycle);
            return;
        }
        self.pending_retry = None;
        self.submit(queue);
    }

    /// Hand `tx_buffer` to the stack
    fn submit<Q: Scheduler<Task>>(&mut self, queue: &mut Q) {
        let result = self.stack.send(
            self.config.app_port,
            self.tx_buffer.as_bytes(),
            MessageType::Unconfirmed,
        );

        match result {
            Ok(sent) => {
                info!("{} bytes scheduled for transmission", sent);
                self.tx_buffer.clear();
            }
            Err(StackError::WouldBlock) if self.config.duty_cycle => {
                warn!("send - WOULD BLOCK, retrying in {} ms", self.config.retry_delay_ms);
                let retry = Task::RetrySend { cycle: self.cycle };
                match queue.post_in(self.config.retry_delay_ms, retry) {
                    Ok(_) => self.pending_retry = Some(self.cycle),
                    Err(_) => {
                        warn!("retry not scheduled: event queue full");
                        self.tx_buffer.clear();
                    }
                }
            }
            Err(e) => {
                warn!("send() - {}", e);
                self.tx_buffer.clear();
            }
        }
    }

    /// Drain one downlink; its content does not affect uplinks
    fn receive_message(&mut self) {
        match self.stack.receive(&mut self.rx_buffer) {
            Ok(Received { port, len }) => {
                let len = len.min(RX_BUFFER_SIZE);
                info!("RX Data on port {} ({} bytes)", port, len);
                debug!("{:02x?}", &self.rx_buffer[..len]);
                self.rx_buffer[..len].fill(0);
            }
            Err(e) => warn!("receive() - {}", e),
        }
    }
}

fn startup_failed(step: StartupStep, error: StackError) -> NodeError {
    error!("{} failed! {}", step, error);
    NodeError::Startup(step, error)
}
