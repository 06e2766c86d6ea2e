use embassy_time::Duration;
use heapless::Deque;
use log::*;
use thiserror::Error;
use trouble_host::prelude::{
    AdStructure, AdvFilterPolicy as HostFilterPolicy, AdvertisementParameters,
};

use super::gatt::Server;
use crate::bluetooth::{
    AdvFilterPolicy, AdvertisingData, AdvertisingParams, AttHandle, ConnId, GapEvent, GattServer,
    GattStack, GattStatus, GattsEvent, StackEvent, TransId,
};
use crate::config::{DEVICE_NAME, SENSOR_CHARACTERISTIC, SENSOR_SERVICE};
use crate::led::Feedback;
use crate::payload::PAYLOAD_LEN;

use embassy_sync::blocking_mutex::raw::RawMutex;

const EVENT_QUEUE_LEN: usize = 8;
const AD_LEN: usize = 31;
const ADV_UNIT_US: u64 = 625;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Completion queue is full")]
    EventQueueFull,

    #[error("Failed to encode AdStructure data")]
    AdStructureError,

    #[error("Service {0:#06x} is not declared")]
    UnknownService(u16),

    #[error("Characteristic {0:#034x} is not declared")]
    UnknownCharacteristic(u128),

    #[error("Characteristic has no CCCD")]
    MissingCccd,

    #[error("Attribute table error: {0:?}")]
    Host(trouble_host::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub status: GattStatus,
    value: [u8; PAYLOAD_LEN],
    len: usize,
}

impl Reply {
    pub fn value(&self) -> Option<&[u8]> {
        (self.len > 0).then(|| &self.value[..self.len])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdPayload {
    adv: [u8; AD_LEN],
    adv_len: usize,
    scan: [u8; AD_LEN],
    scan_len: usize,
}

impl AdPayload {
    pub fn adv_data(&self) -> &[u8] {
        &self.adv[..self.adv_len]
    }

    pub fn scan_data(&self) -> &[u8] {
        &self.scan[..self.scan_len]
    }
}

// The attribute table is fixed at compile time, so bring-up commands are
// checked against `Server` and queue their completion immediately.
pub struct TroubleStack<'s, 'v> {
    server: &'s Server<'v>,
    events: Deque<StackEvent<'static>, EVENT_QUEUE_LEN>,
    adv_data: [u8; AD_LEN],
    adv_len: usize,
    scan_data: [u8; AD_LEN],
    scan_len: usize,
    advertise: Option<AdvertisingParams>,
    reply: Option<Reply>,
    next_trans_id: u32,
}

impl<'s, 'v> TroubleStack<'s, 'v> {
    pub fn new(server: &'s Server<'v>) -> Self {
        Self {
            server,
            events: Deque::new(),
            adv_data: [0; AD_LEN],
            adv_len: 0,
            scan_data: [0; AD_LEN],
            scan_len: 0,
            advertise: None,
            reply: None,
            next_trans_id: 0,
        }
    }

    /// Feeds every queued completion to the core, including completions
    /// queued while handling earlier ones.
    pub fn drain<M: RawMutex, F: Feedback>(&mut self, gatt: &mut GattServer<'_, M, F>) {
        while let Some(event) = self.events.pop_front() {
            gatt.dispatch(self, event);
        }
    }

    pub fn ad_payload(&self) -> AdPayload {
        AdPayload {
            adv: self.adv_data,
            adv_len: self.adv_len,
            scan: self.scan_data,
            scan_len: self.scan_len,
        }
    }

    pub fn take_advertise_request(&mut self) -> Option<AdvertisingParams> {
        self.advertise.take()
    }

    pub fn take_reply(&mut self) -> Option<Reply> {
        self.reply.take()
    }

    pub fn next_trans_id(&mut self) -> TransId {
        self.next_trans_id = self.next_trans_id.wrapping_add(1);
        TransId(self.next_trans_id)
    }

    fn push(&mut self, event: StackEvent<'static>) -> Result<(), StackError> {
        self.events
            .push_back(event)
            .map_err(|_| StackError::EventQueueFull)
    }

    fn encode(data: &AdvertisingData, out: &mut [u8; AD_LEN]) -> Result<usize, StackError> {
        let result = if data.include_name {
            AdStructure::encode_slice(
                &[
                    AdStructure::Flags(data.flags),
                    AdStructure::CompleteLocalName(DEVICE_NAME.as_bytes()),
                ],
                &mut out[..],
            )
        } else {
            AdStructure::encode_slice(&[AdStructure::Flags(data.flags)], &mut out[..])
        };
        result.map_err(|_| StackError::AdStructureError)
    }

    fn characteristic_handle(&self) -> u16 {
        self.server.sensor_service.sample.handle
    }
}

impl GattStack for TroubleStack<'_, '_> {
    type Error = StackError;

    fn register_app(&mut self, app_id: u16) -> Result<(), StackError> {
        self.push(StackEvent::Gatts(GattsEvent::Registered {
            status: GattStatus::Ok,
            app_id,
        }))
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        // ATT MTU is bounded by the host packet pool, chosen at build time
        debug!("[Stack] Local MTU request {}", mtu);
        Ok(())
    }

    fn config_adv_data(&mut self, data: &AdvertisingData) -> Result<(), StackError> {
        self.adv_len = Self::encode(data, &mut self.adv_data)?;
        self.push(StackEvent::Gap(GapEvent::AdvDataSetComplete {
            status: GattStatus::Ok,
        }))
    }

    fn config_scan_rsp_data(&mut self, data: &AdvertisingData) -> Result<(), StackError> {
        self.scan_len = Self::encode(data, &mut self.scan_data)?;
        self.push(StackEvent::Gap(GapEvent::ScanRspDataSetComplete {
            status: GattStatus::Ok,
        }))
    }

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), StackError> {
        self.advertise = Some(*params);
        Ok(())
    }

    fn create_service(&mut self, uuid: u16, num_handles: u16) -> Result<(), StackError> {
        if uuid != SENSOR_SERVICE {
            return Err(StackError::UnknownService(uuid));
        }
        debug!("[Stack] Service {:#06x} with {} handles", uuid, num_handles);
        // Service declaration, then characteristic declaration, then value
        let service_handle = AttHandle(self.characteristic_handle().saturating_sub(2));
        self.push(StackEvent::Gatts(GattsEvent::ServiceCreated {
            status: GattStatus::Ok,
            service_handle,
        }))
    }

    fn start_service(&mut self, service: AttHandle) -> Result<(), StackError> {
        self.push(StackEvent::Gatts(GattsEvent::ServiceStarted {
            status: GattStatus::Ok,
            service_handle: service,
        }))
    }

    fn add_characteristic(
        &mut self,
        _service: AttHandle,
        uuid: u128,
        _permissions: u8,
        _properties: u8,
        initial_value: &[u8; PAYLOAD_LEN],
    ) -> Result<(), StackError> {
        if uuid != SENSOR_CHARACTERISTIC {
            return Err(StackError::UnknownCharacteristic(uuid));
        }
        self.server
            .sensor_service
            .sample
            .set(self.server, initial_value)
            .map_err(StackError::Host)?;
        let attr_handle = AttHandle(self.characteristic_handle());
        self.push(StackEvent::Gatts(GattsEvent::CharacteristicAdded {
            status: GattStatus::Ok,
            attr_handle,
        }))
    }

    fn add_descriptor(
        &mut self,
        _service: AttHandle,
        _uuid: u16,
        _permissions: u8,
    ) -> Result<(), StackError> {
        let cccd = self
            .server
            .sensor_service
            .sample
            .cccd_handle
            .ok_or(StackError::MissingCccd)?;
        self.push(StackEvent::Gatts(GattsEvent::DescriptorAdded {
            status: GattStatus::Ok,
            attr_handle: AttHandle(cccd),
        }))
    }

    fn send_response(
        &mut self,
        _conn_id: ConnId,
        _trans_id: TransId,
        status: GattStatus,
        value: Option<&[u8]>,
    ) -> Result<(), StackError> {
        let mut reply = Reply {
            status,
            value: [0; PAYLOAD_LEN],
            len: 0,
        };
        if let Some(value) = value {
            let len = value.len().min(PAYLOAD_LEN);
            reply.value[..len].copy_from_slice(&value[..len]);
            reply.len = len;
        }
        self.reply = Some(reply);
        Ok(())
    }
}

pub fn advertisement_parameters(params: &AdvertisingParams) -> AdvertisementParameters {
    let filter_policy = match params.filter_policy {
        AdvFilterPolicy::AllowScanAnyConnAny => HostFilterPolicy::Unfiltered,
        AdvFilterPolicy::AllowScanWhitelistConnAny => HostFilterPolicy::FilterScan,
        AdvFilterPolicy::AllowScanAnyConnWhitelist => HostFilterPolicy::FilterConn,
        AdvFilterPolicy::AllowScanWhitelistConnWhitelist => HostFilterPolicy::FilterConnAndScan,
    };
    AdvertisementParameters {
        interval_min: Duration::from_micros(u64::from(params.adv_int_min) * ADV_UNIT_US),
        interval_max: Duration::from_micros(u64::from(params.adv_int_max) * ADV_UNIT_US),
        filter_policy,
        ..Default::default()
    }
}
