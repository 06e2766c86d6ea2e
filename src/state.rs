use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::bluetooth::{AttHandle, ConnId, NotifyTarget};
use crate::payload::PAYLOAD_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeHandles {
    pub service: AttHandle,
    pub characteristic: AttHandle,
    pub cccd: AttHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionState {
    pub connection: Option<ConnId>,
    pub notifications_enabled: bool,
    pub setup_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The current connection (or no connection at all) was cleared.
    Cleared,
    /// Another connection is current; nothing changed.
    Stale { current: ConnId },
}

struct Inner {
    subscription: SubscriptionState,
    handles: Option<AttributeHandles>,
    value: [u8; PAYLOAD_LEN],
}

pub struct SharedState<M: RawMutex> {
    inner: Mutex<M, RefCell<Inner>>,
}

impl<M: RawMutex> SharedState<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                subscription: SubscriptionState {
                    connection: None,
                    notifications_enabled: false,
                    setup_ready: false,
                },
                handles: None,
                value: [0u8; PAYLOAD_LEN],
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        self.inner.lock(|inner| f(&mut inner.borrow_mut()))
    }

    pub fn snapshot(&self) -> SubscriptionState {
        self.with(|inner| inner.subscription)
    }

    pub fn handles(&self) -> Option<AttributeHandles> {
        self.with(|inner| inner.handles)
    }

    /// Publishes the handles and opens the setup gate. Returns `false` if the
    /// gate was already open, in which case nothing changes.
    pub fn mark_ready(&self, handles: AttributeHandles) -> bool {
        self.with(|inner| {
            if inner.subscription.setup_ready {
                return false;
            }
            inner.handles = Some(handles);
            inner.subscription.setup_ready = true;
            true
        })
    }

    /// Records a new connection and clears the subscription. Returns the
    /// connection that was replaced, if any.
    pub fn connect(&self, conn_id: ConnId) -> Option<ConnId> {
        self.with(|inner| {
            let previous = inner.subscription.connection.replace(conn_id);
            inner.subscription.notifications_enabled = false;
            previous
        })
    }

    pub fn disconnect(&self, conn_id: ConnId) -> DisconnectOutcome {
        self.with(|inner| match inner.subscription.connection {
            Some(current) if current != conn_id => DisconnectOutcome::Stale { current },
            _ => {
                inner.subscription.connection = None;
                inner.subscription.notifications_enabled = false;
                DisconnectOutcome::Cleared
            }
        })
    }

    /// Returns the previous value of the flag.
    pub fn set_notifications(&self, enabled: bool) -> bool {
        self.with(|inner| {
            core::mem::replace(&mut inner.subscription.notifications_enabled, enabled)
        })
    }

    /// Target for the next notification, or `None` while any gate is closed.
    pub fn notify_target(&self) -> Option<NotifyTarget> {
        self.with(|inner| {
            let state = inner.subscription;
            if !state.setup_ready || !state.notifications_enabled {
                return None;
            }
            Some(NotifyTarget {
                conn_id: state.connection?,
                handle: inner.handles?.characteristic,
            })
        })
    }

    pub fn store_value(&self, value: [u8; PAYLOAD_LEN]) {
        self.with(|inner| inner.value = value)
    }

    pub fn value(&self) -> [u8; PAYLOAD_LEN] {
        self.with(|inner| inner.value)
    }
}

impl<M: RawMutex> Default for SharedState<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn handles() -> AttributeHandles {
        AttributeHandles {
            service: AttHandle(40),
            characteristic: AttHandle(42),
            cccd: AttHandle(43),
        }
    }

    #[test]
    fn connect_always_clears_notifications() {
        let shared = SharedState::<NoopRawMutex>::new();
        shared.connect(ConnId(0));
        shared.set_notifications(true);

        assert_eq!(shared.connect(ConnId(1)), Some(ConnId(0)));
        let state = shared.snapshot();
        assert_eq!(state.connection, Some(ConnId(1)));
        assert!(!state.notifications_enabled);
    }

    #[test]
    fn disconnect_clears_current_connection() {
        let shared = SharedState::<NoopRawMutex>::new();
        shared.connect(ConnId(3));
        shared.set_notifications(true);

        assert_eq!(shared.disconnect(ConnId(3)), DisconnectOutcome::Cleared);
        let state = shared.snapshot();
        assert_eq!(state.connection, None);
        assert!(!state.notifications_enabled);
    }

    #[test]
    fn disconnect_of_other_connection_is_stale() {
        let shared = SharedState::<NoopRawMutex>::new();
        shared.connect(ConnId(3));
        shared.set_notifications(true);

        assert_eq!(
            shared.disconnect(ConnId(2)),
            DisconnectOutcome::Stale { current: ConnId(3) }
        );
        assert!(shared.snapshot().notifications_enabled);
    }

    #[test]
    fn ready_gate_is_one_way() {
        let shared = SharedState::<NoopRawMutex>::new();
        assert!(shared.mark_ready(handles()));

        let other = AttributeHandles {
            cccd: AttHandle(99),
            ..handles()
        };
        assert!(!shared.mark_ready(other));
        assert!(shared.snapshot().setup_ready);
        assert_eq!(shared.handles(), Some(handles()));
    }

    #[test]
    fn notify_target_requires_every_gate() {
        let shared = SharedState::<NoopRawMutex>::new();
        shared.connect(ConnId(1));
        shared.set_notifications(true);
        assert_eq!(shared.notify_target(), None);

        shared.mark_ready(handles());
        assert_eq!(
            shared.notify_target(),
            Some(NotifyTarget {
                conn_id: ConnId(1),
                handle: AttHandle(42),
            })
        );

        shared.set_notifications(false);
        assert_eq!(shared.notify_target(), None);

        shared.set_notifications(true);
        shared.disconnect(ConnId(1));
        assert_eq!(shared.notify_target(), None);
    }
}
