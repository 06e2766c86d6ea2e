use core::fmt::Debug;

use super::events::{AttHandle, ConnId, GattStatus, TransId};
use crate::payload::PAYLOAD_LEN;

pub const PERM_READ: u8 = 0x01;
pub const PERM_WRITE: u8 = 0x10;

pub const PROP_READ: u8 = 0x02;
pub const PROP_NOTIFY: u8 = 0x10;

// Advertising flags (AD type 0x01)
pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
pub const BR_EDR_NOT_SUPPORTED: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingData {
    pub set_scan_rsp: bool,
    pub include_name: bool,
    pub include_txpower: bool,
    /// Preferred peripheral connection interval, units of 1.25 ms.
    pub min_interval: u16,
    pub max_interval: u16,
    pub appearance: u16,
    pub flags: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvType {
    ConnectableUndirected,
    ScannableUndirected,
    NonConnectableUndirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnAddrType {
    Public,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvFilterPolicy {
    AllowScanAnyConnAny,
    AllowScanWhitelistConnAny,
    AllowScanAnyConnWhitelist,
    AllowScanWhitelistConnWhitelist,
}

pub const ADV_CHANNEL_ALL: u8 = 0x07;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParams {
    /// Advertising interval bounds, units of 0.625 ms.
    pub adv_int_min: u16,
    pub adv_int_max: u16,
    pub adv_type: AdvType,
    pub own_addr_type: OwnAddrType,
    pub channel_map: u8,
    pub filter_policy: AdvFilterPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyTarget {
    pub conn_id: ConnId,
    pub handle: AttHandle,
}

pub trait GattStack {
    type Error: Debug;

    fn register_app(&mut self, app_id: u16) -> Result<(), Self::Error>;

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), Self::Error>;

    fn config_adv_data(&mut self, data: &AdvertisingData) -> Result<(), Self::Error>;

    fn config_scan_rsp_data(&mut self, data: &AdvertisingData) -> Result<(), Self::Error>;

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), Self::Error>;

    fn create_service(&mut self, uuid: u16, num_handles: u16) -> Result<(), Self::Error>;

    fn start_service(&mut self, service: AttHandle) -> Result<(), Self::Error>;

    fn add_characteristic(
        &mut self,
        service: AttHandle,
        uuid: u128,
        permissions: u8,
        properties: u8,
        initial_value: &[u8; PAYLOAD_LEN],
    ) -> Result<(), Self::Error>;

    /// Attaches a descriptor to the most recently added characteristic.
    fn add_descriptor(
        &mut self,
        service: AttHandle,
        uuid: u16,
        permissions: u8,
    ) -> Result<(), Self::Error>;

    fn send_response(
        &mut self,
        conn_id: ConnId,
        trans_id: TransId,
        status: GattStatus,
        value: Option<&[u8]>,
    ) -> Result<(), Self::Error>;
}

#[allow(async_fn_in_trait)]
pub trait Notifier {
    type Error: Debug;

    async fn notify(
        &mut self,
        target: NotifyTarget,
        value: &[u8; PAYLOAD_LEN],
    ) -> Result<(), Self::Error>;
}
