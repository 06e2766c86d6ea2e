//! BLE peripheral that streams a timestamped sample to one subscribed central.

#![cfg_attr(not(test), no_std)]

pub mod bluetooth;
pub mod config;
pub mod errors;
pub mod led;
pub mod messages;
pub mod payload;
pub mod scheduler;
pub mod state;

#[cfg(feature = "embedded")]
pub mod platform;
