#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use sensor_notify::bluetooth::GattServer;
use sensor_notify::config::{
    GattServerConfig, SchedulerConfig, CONNECTIONS_MAX, DEVICE_NAME, L2CAP_CHANNELS_MAX,
    LOG_LEVEL,
};
use sensor_notify::led::{PixelFeedback, SharedFeedback};
use sensor_notify::messages::ChannelNotifier;
use sensor_notify::platform::{ble_peripheral_task, EmbassyTimebase, Server};
use sensor_notify::scheduler::NotificationScheduler;
use sensor_notify::state::SharedState;

use bt_hci::{controller::ExternalController, uuid::appearance};

use esp_hal::clock::CpuClock;
use esp_hal::timer::systimer::SystemTimer;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::{rmt::Rmt, time::Rate};

use esp_hal_smartled::{smart_led_buffer, SmartLedsAdapter};

use esp_wifi::ble::controller::BleConnector;

use log::*;

use embassy_executor::Spawner;

use esp_backtrace as _;
use trouble_host::Address;
use trouble_host::{
    gap::{GapConfig, PeripheralConfig},
    prelude::DefaultPacketPool,
    Host, HostResources,
};

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_hal_embassy::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger(LOG_LEVEL);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::_80MHz);
    let peripherals = esp_hal::init(config);

    let led = match Rmt::new(peripherals.RMT, Rate::from_mhz(80)) {
        Ok(rmt) => Some(SmartLedsAdapter::new(
            rmt.channel0,
            peripherals.GPIO35,
            smart_led_buffer!(1),
        )),
        Err(e) => {
            warn!("[Main] Failed to initialize RMT0: {:?}", e);
            None
        }
    };
    let feedback: SharedFeedback<CriticalSectionRawMutex, _> =
        SharedFeedback::new(PixelFeedback::new(led));
    let shared: SharedState<CriticalSectionRawMutex> = SharedState::new();

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);
    let rng = esp_hal::rng::Rng::new(peripherals.RNG);
    let timer1 = TimerGroup::new(peripherals.TIMG0);
    let wifi_init = esp_wifi::init(timer1.timer0, rng)
        .expect("[Main] Failed to initialize WIFI/BLE controller");

    let transport = BleConnector::new(&wifi_init, peripherals.BT);
    let controller = ExternalController::<_, 20>::new(transport);
    let address = Address::random([0xff, 0x8f, 0x1b, 0x05, 0xe4, 0xff]);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();
    let stack = trouble_host::new(controller, &mut resources).set_random_address(address);

    let server = match Server::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: DEVICE_NAME,
        appearance: &appearance::sensor::GENERIC_SENSOR,
    })) {
        Ok(result) => result,
        Err(e) => {
            error!("[Main] Failed to setup GATT server: {:?}", e);
            return;
        }
    };

    let mut gatt = GattServer::new(GattServerConfig::default(), &shared, &feedback);
    let mut scheduler = NotificationScheduler::new(
        SchedulerConfig::default(),
        &shared,
        &feedback,
        ChannelNotifier,
        EmbassyTimebase,
    );
    info!("[Main] Setup complete....");

    let Host {
        mut runner,
        mut peripheral,
        ..
    } = stack.build();

    match select3(
        runner.run(),
        ble_peripheral_task(&server, &mut peripheral, &mut gatt),
        scheduler.run(),
    )
    .await
    {
        Either3::First(result) => match result {
            Ok(()) => info!("[Main] Runner Task ended."),
            Err(e) => error!("[Main] Runner task encounterd an error: {:?}", e),
        },
        Either3::Second(_) => {
            info!("[Main] BLE Peripheral Task ended.")
        }
        Either3::Third(_) => {
            info!("[Main] Scheduler Task ended.")
        }
    };
    error!("[Main] Stopping main application - byebye");
}
