#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod encoder;
pub mod readings;

pub use encoder::{encode, encode_into, EncodeError, TransmitBuffer, TX_BUFFER_SIZE};
pub use readings::{normalize_distance, MessageSlot, SensorReadings, TriAxis, DISTANCE_OUT_OF_RANGE};
