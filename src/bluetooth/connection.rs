use embassy_sync::blocking_mutex::raw::RawMutex;
use log::*;

use super::events::{BdAddr, ConnId, GattStatus, TransId};
use super::stack::GattStack;
use crate::errors::ProtocolViolation;
use crate::payload::CccdValue;
use crate::state::{DisconnectOutcome, SharedState};

pub fn on_connect<M: RawMutex>(shared: &SharedState<M>, conn_id: ConnId, remote: BdAddr) {
    info!("[Connection] Connected conn_id={} remote {}", conn_id.0, remote);
    if let Some(previous) = shared.connect(conn_id) {
        if previous != conn_id {
            warn!(
                "[Connection] Replacing active connection {} with {}",
                previous.0, conn_id.0
            );
        }
    }
}

/// Clears the connection. Returns `true` when advertising should resume.
pub fn on_disconnect<M: RawMutex>(
    shared: &SharedState<M>,
    conn_id: ConnId,
    remote: BdAddr,
    reason: u8,
) -> bool {
    info!(
        "[Connection] Disconnected conn_id={} remote {} reason={:#04x}",
        conn_id.0, remote, reason
    );
    match shared.disconnect(conn_id) {
        DisconnectOutcome::Cleared => true,
        DisconnectOutcome::Stale { current } => {
            warn!(
                "[Connection] Ignoring disconnect of {}, connection {} is current",
                conn_id.0, current.0
            );
            false
        }
    }
}

/// Applies a write to the CCCD. Unknown values and wrong lengths leave the
/// state unchanged.
pub fn apply_cccd_write<M: RawMutex>(
    shared: &SharedState<M>,
    value: &[u8],
) -> Result<bool, ProtocolViolation> {
    match CccdValue::parse(value) {
        Some(CccdValue::NotificationsEnabled) => {
            shared.set_notifications(true);
            info!("[Connection] Notifications ENABLED");
            Ok(true)
        }
        Some(CccdValue::Disabled) => {
            shared.set_notifications(false);
            info!("[Connection] Notifications DISABLED");
            Ok(false)
        }
        Some(CccdValue::Unrecognized(raw)) => Err(ProtocolViolation::CccdValue(raw)),
        None => Err(ProtocolViolation::CccdLength(value.len())),
    }
}

pub fn on_cccd_write<M: RawMutex, S: GattStack>(
    shared: &SharedState<M>,
    stack: &mut S,
    conn_id: ConnId,
    trans_id: TransId,
    value: &[u8],
    need_rsp: bool,
) {
    if let Err(violation) = apply_cccd_write(shared, value) {
        warn!("[Connection] {}", violation);
    }
    if need_rsp {
        acknowledge(stack, conn_id, trans_id);
    }
}

pub(crate) fn acknowledge<S: GattStack>(stack: &mut S, conn_id: ConnId, trans_id: TransId) {
    if let Err(e) = stack.send_response(conn_id, trans_id, GattStatus::Ok, None) {
        warn!("[Connection] Error sending write response: {:?}", e);
    }
}
