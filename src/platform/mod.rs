mod gatt;
mod peripheral;
mod stack;
mod time;

pub use gatt::*;
pub use peripheral::ble_peripheral_task;
pub use stack::{advertisement_parameters, AdPayload, Reply, StackError, TroubleStack};
pub use time::EmbassyTimebase;
