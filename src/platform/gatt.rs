use trouble_host::prelude::*;

use crate::config::{SENSOR_CHARACTERISTIC, SENSOR_SERVICE};
use crate::payload::PAYLOAD_LEN;

//GATT Server config

#[gatt_service(uuid = SENSOR_SERVICE.to_le_bytes())]
pub struct SensorService {
    #[characteristic(uuid = SENSOR_CHARACTERISTIC.to_le_bytes(), read, notify)]
    pub sample: [u8; PAYLOAD_LEN],
}

#[gatt_server]
pub struct Server {
    pub sensor_service: SensorService,
}
