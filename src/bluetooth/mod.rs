mod advertising;
mod connection;
mod events;
mod responder;
mod server;
mod setup;
mod stack;

pub use advertising::{AdvertisingController, ConfigProgress, ADV_CONFIG_FLAG, SCAN_RSP_CONFIG_FLAG};
pub use connection::apply_cccd_write;
pub use events::{AttHandle, BdAddr, ConnId, GapEvent, GattStatus, GattsEvent, StackEvent, TransId};
pub use server::GattServer;
pub use setup::{Completion, SetupAction, SetupSequencer, SetupState, SetupStep};
pub use stack::{
    AdvFilterPolicy, AdvType, AdvertisingData, AdvertisingParams, GattStack, Notifier,
    NotifyTarget, OwnAddrType, ADV_CHANNEL_ALL, BR_EDR_NOT_SUPPORTED, LE_GENERAL_DISCOVERABLE,
    PERM_READ, PERM_WRITE, PROP_NOTIFY, PROP_READ,
};
