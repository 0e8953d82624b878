#![cfg_attr(not(test), no_std)]

//! Firmware core of the Agora environmental sensor node.
//!
//! The node polls its sensors, packs the readings into two alternating JSON
//! uplinks and sends them over LoRaWAN. Board support (pins, buses, drivers,
//! the radio stack itself) plugs in through the traits in [`sensors`] and
//! [`radio`], everything runs from a single [`dispatch::EventQueue`] and
//! [`node::run`] brings the whole node up.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod link;
pub mod node;
pub mod radio;
pub mod sensors;

pub mod prelude {
    pub use crate::error::*;
}

pub use config::{Credentials, NodeConfig};
pub use dispatch::{EventQueue, EventSource, Scheduler};
pub use hub::{InitReport, ReadingSource, SensorHub};
pub use link::{ConnectionState, LinkController, Task};
pub use node::SensorPower;
pub use radio::{LinkEvent, LoraStack};
