use embassy_sync::blocking_mutex::raw::RawMutex;
use log::*;

use super::connection::acknowledge;
use super::events::{AttHandle, ConnId, GattStatus, TransId};
use super::stack::GattStack;
use crate::payload::CccdValue;
use crate::state::SharedState;

/// Answers reads of the sample value and its CCCD with the last stored
/// state. Other handles belong to the stack (GAP, declarations) and get
/// no response here.
pub fn on_read<M: RawMutex, S: GattStack>(
    shared: &SharedState<M>,
    stack: &mut S,
    conn_id: ConnId,
    trans_id: TransId,
    handle: AttHandle,
) {
    let result = match shared.handles() {
        Some(h) if h.characteristic == handle => {
            let value = shared.value();
            trace!("[Responder] Read of sample value: {:?}", value);
            stack.send_response(conn_id, trans_id, GattStatus::Ok, Some(&value[..]))
        }
        Some(h) if h.cccd == handle => {
            let value = CccdValue::encode(shared.snapshot().notifications_enabled);
            stack.send_response(conn_id, trans_id, GattStatus::Ok, Some(&value[..]))
        }
        _ => {
            trace!("[Responder] Read of handle {} left to the stack", handle.0);
            return;
        }
    };
    if let Err(e) = result {
        warn!("[Responder] Error sending read response: {:?}", e);
    }
}

/// Writes outside the CCCD carry no meaning but still get the response the
/// attribute protocol requires.
pub fn on_write<S: GattStack>(
    stack: &mut S,
    conn_id: ConnId,
    trans_id: TransId,
    handle: AttHandle,
    value: &[u8],
    need_rsp: bool,
) {
    debug!(
        "[Responder] Write of {} bytes to handle {} ignored",
        value.len(),
        handle.0
    );
    if need_rsp {
        acknowledge(stack, conn_id, trans_id);
    }
}
