use crate::bluetooth::{
    AdvFilterPolicy, AdvType, AdvertisingData, AdvertisingParams, OwnAddrType, ADV_CHANNEL_ALL,
    BR_EDR_NOT_SUPPORTED, LE_GENERAL_DISCOVERABLE,
};
use smart_leds::RGB8;

// Configuration constants
pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
pub const DEVICE_NAME: &str = "ESP32-SENSOR";
pub const APP_ID: u16 = 0;
pub const LOCAL_MTU: u16 = 500;

// Host resources, a single central at a time
pub const CONNECTIONS_MAX: usize = 1;
pub const L2CAP_CHANNELS_MAX: usize = 2;

// Notification timing
pub const NOTIFY_PERIOD_MS: u64 = 1000;
pub const LED_PULSE_MS: u64 = 250;

// Feedback LED
pub const LED_ACTIVE_COLOR: RGB8 = RGB8 { r: 0, g: 255, b: 0 };
pub const LED_BRIGHTNESS: u8 = 255;

// 16-bit UUIDs as u16
pub const SENSOR_SERVICE: u16 = 0x181A;
pub const CLIENT_CHARACTERISTIC_CONFIG: u16 = 0x2902;

// 128-bit UUIDs as u128
pub const SENSOR_CHARACTERISTIC: u128 = 0x0015a1a1_1212_efde_1523_785feabcd123;

// Service declaration + characteristic declaration + value + CCCD, with headroom
pub const SENSOR_NUM_HANDLE: u16 = 6;

pub const ADV_DATA: AdvertisingData = AdvertisingData {
    set_scan_rsp: false,
    include_name: true,
    include_txpower: false,
    min_interval: 0x0006,
    max_interval: 0x0010,
    appearance: 0x00,
    flags: LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED,
};

pub const ADV_PARAMS: AdvertisingParams = AdvertisingParams {
    adv_int_min: 0x20, // 20ms
    adv_int_max: 0x40, // 40ms
    adv_type: AdvType::ConnectableUndirected,
    own_addr_type: OwnAddrType::Public,
    channel_map: ADV_CHANNEL_ALL,
    filter_policy: AdvFilterPolicy::AllowScanAnyConnAny,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattServerConfig {
    pub app_id: u16,
    pub local_mtu: u16,
    pub service_uuid: u16,
    pub characteristic_uuid: u128,
    pub num_handles: u16,
    pub adv_data: AdvertisingData,
    pub scan_rsp_data: Option<AdvertisingData>,
    pub adv_params: AdvertisingParams,
}

impl Default for GattServerConfig {
    fn default() -> Self {
        Self {
            app_id: APP_ID,
            local_mtu: LOCAL_MTU,
            service_uuid: SENSOR_SERVICE,
            characteristic_uuid: SENSOR_CHARACTERISTIC,
            num_handles: SENSOR_NUM_HANDLE,
            adv_data: ADV_DATA,
            scan_rsp_data: None,
            adv_params: ADV_PARAMS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub period_ms: u64,
    /// Must be shorter than the period.
    pub pulse_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: NOTIFY_PERIOD_MS,
            pulse_ms: LED_PULSE_MS,
        }
    }
}
