//! LoRaWAN stack interface
//!
//! The stack (MAC, join, crypto, channel plan, duty-cycle enforcement) lives
//! outside this crate. The node drives it through [`LoraStack`] and hears back
//! through [`LinkEvent`]s the platform posts to the event queue.

use core::fmt;

use crate::config::Credentials;
use crate::error::StackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Unconfirmed,
    Confirmed,
}

/// OTAA join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinParams {
    pub credentials: Credentials,
    /// Join attempts before the stack reports `JoinFailure`
    pub trials: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    Connected,
    /// Join accepted, completion arrives as [`LinkEvent::Connected`]
    InProgress,
}

/// A downlink drained from the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub port: u8,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxFailure {
    Timeout,
    Error,
    Crypto,
    Scheduling,
}

impl fmt::Display for TxFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
            Self::Crypto => write!(f, "crypto error"),
            Self::Scheduling => write!(f, "scheduling error"),
        }
    }
}

/// Notifications raised by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    SendComplete,
    SendFailed(TxFailure),
    ReceiveReady,
    ReceiveTimeout,
    ReceiveError,
    JoinFailure,
    /// Network server asks for an uplink
    UplinkRequired,
    /// Code outside the known event set
    Unknown(u8),
}

impl From<u8> for LinkEvent {
    /// Numbering of the stack's event enumeration
    fn from(code: u8) -> Self {
        match code {
            0 => LinkEvent::Connected,
            1 => LinkEvent::Disconnected,
            2 => LinkEvent::SendComplete,
            3 => LinkEvent::SendFailed(TxFailure::Timeout),
            4 => LinkEvent::SendFailed(TxFailure::Error),
            5 => LinkEvent::SendFailed(TxFailure::Crypto),
            6 => LinkEvent::SendFailed(TxFailure::Scheduling),
            7 => LinkEvent::ReceiveReady,
            8 => LinkEvent::ReceiveTimeout,
            9 => LinkEvent::ReceiveError,
            10 => LinkEvent::JoinFailure,
            11 => LinkEvent::UplinkRequired,
            code => LinkEvent::Unknown(code),
        }
    }
}

pub trait LoraStack {
    fn initialize(&mut self) -> Result<(), StackError>;

    /// Retries for CONFIRMED messages
    fn set_confirmed_msg_retries(&mut self, count: u8) -> Result<(), StackError>;

    fn disable_adaptive_datarate(&mut self) -> Result<(), StackError>;

    fn connect(&mut self, params: &JoinParams) -> Result<JoinStatus, StackError>;

    fn set_datarate(&mut self, datarate: u8) -> Result<(), StackError>;

    /// Queue `payload` for uplink on `port`, returns the number of bytes taken.
    ///
    /// The stack copies the payload before returning.
    fn send(&mut self, port: u8, payload: &[u8], kind: MessageType) -> Result<usize, StackError>;

    /// Move one pending downlink into `buffer`
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Received, StackError>;
}
