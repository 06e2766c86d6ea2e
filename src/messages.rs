use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use thiserror::Error;

use crate::bluetooth::{Notifier, NotifyTarget};
use crate::payload::PAYLOAD_LEN;

pub const OUTBOUND_QUEUE_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outbound {
    pub target: NotifyTarget,
    pub value: [u8; PAYLOAD_LEN],
}

// Channel declarations
pub static NOTIFY_CHANNEL: Channel<CriticalSectionRawMutex, Outbound, OUTBOUND_QUEUE_LEN> =
    Channel::new();

/// Drops notifications still queued for an earlier connection, which may
/// share the new one's handle. Returns how many were dropped.
pub fn discard_pending_notifications() -> usize {
    let mut dropped = 0;
    while NOTIFY_CHANNEL.try_receive().is_ok() {
        dropped += 1;
    }
    dropped
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("Notification queue full (no connection task draining it)")]
    QueueFull,
}

pub struct ChannelNotifier;

impl Notifier for ChannelNotifier {
    type Error = TransportError;

    async fn notify(
        &mut self,
        target: NotifyTarget,
        value: &[u8; PAYLOAD_LEN],
    ) -> Result<(), TransportError> {
        NOTIFY_CHANNEL
            .try_send(Outbound {
                target,
                value: *value,
            })
            .map_err(|_| TransportError::QueueFull)
    }
}
