use thiserror::Error;

use crate::bluetooth::{GattStatus, SetupStep};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    #[error("{0:?} completed with status {1:?}")]
    CompletionFailed(SetupStep, GattStatus),

    #[error("Stack rejected the {0:?} command")]
    CommandRejected(SetupStep),
}

#[derive(Error, Debug)]
pub enum NotifyError<E>
where
    E: core::fmt::Debug, // Bound only on the inner error type
{
    #[error("Notification rejected by transport: {0:?}")]
    Transport(E),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload has wrong length (got {0}, expected 12)")]
    InvalidLength(usize),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("CCCD write has wrong length (got {0}, expected 2)")]
    CccdLength(usize),

    #[error("Unknown CCCD value: {0:#06x}")]
    CccdValue(u16),
}

#[cfg(feature = "embedded")]
pub use self::peripheral::PeripheralError;

#[cfg(feature = "embedded")]
mod peripheral {
    use thiserror::Error;
    use trouble_host::{BleHostError, Error};

    #[derive(Error, Debug)]
    pub enum PeripheralError<E>
    where
        E: core::fmt::Debug,
    {
        #[error("Failed to create advertiser: {0:?}")]
        AdvertiserError(BleHostError<E>),

        #[error("Failed to create connection: {0:?}")]
        ConnectionError(Error),

        #[error("Failed to attach attribute server: {0:?}")]
        GattConnectionError(Error),
    }
}
