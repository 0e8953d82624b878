//! Node errors

use core::fmt;

use crate::dispatch::QueueFull;

pub type NodeResult<T> = core::result::Result<T, NodeError>;

/// A single sensor read or init failed; recovered with default values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No answer on the sensor bus
    Bus,
    /// Sensor has no fresh sample yet
    NotReady,
    /// Sensor never came up during init
    Offline,
    /// Power enable pin could not be driven
    Pin,
    /// Analog conversion failed
    Adc,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus error"),
            Self::NotReady => write!(f, "no sample ready"),
            Self::Offline => write!(f, "sensor offline"),
            Self::Pin => write!(f, "enable pin error"),
            Self::Adc => write!(f, "ADC error"),
        }
    }
}

/// Status codes returned by the LoRaWAN stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// Stack cannot take the request right now, try again later
    WouldBlock,
    Busy,
    InvalidParameter,
    NotInitialized,
    NoActiveSessions,
    /// Any other negative status code
    Code(i16),
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WouldBlock => write!(f, "would block"),
            Self::Busy => write!(f, "busy"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::NotInitialized => write!(f, "not initialized"),
            Self::NoActiveSessions => write!(f, "no active session"),
            Self::Code(code) => write!(f, "error code {}", code),
        }
    }
}

/// Startup request rejected by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    Initialize,
    ConfirmedRetries,
    AdaptiveDatarate,
    Connect,
}

impl fmt::Display for StartupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialize => write!(f, "LoRa initialization"),
            Self::ConfirmedRetries => write!(f, "set_confirmed_msg_retries"),
            Self::AdaptiveDatarate => write!(f, "disable_adaptive_datarate"),
            Self::Connect => write!(f, "connect"),
        }
    }
}

/// Fatal errors, these end the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    Startup(StartupStep, StackError),
    /// Stack reported an event code outside the known set
    UnknownEvent(u8),
    /// Event queue had no room for a timer the node depends on
    QueueFull,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup(step, error) => write!(f, "{} failed: {}", step, error),
            Self::UnknownEvent(code) => write!(f, "unknown event code {}", code),
            Self::QueueFull => write!(f, "event queue full"),
        }
    }
}

impl From<QueueFull> for NodeError {
    fn from(_: QueueFull) -> Self {
        NodeError::QueueFull
    }
}
