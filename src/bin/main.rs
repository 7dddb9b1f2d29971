#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use at_modem::AtModem;
use embassy_executor::Spawner;
use embassy_time::Timer;
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Level, Output, OutputConfig},
    interrupt::{Priority, software::SoftwareInterruptControl},
    rtc_cntl::Rtc,
    time::Duration as HalDuration,
    timer::timg::TimerGroup,
    uart::{Config as UartConfig, Uart},
};
use hivemon_core::network::{NetworkConfig, NetworkManager};
use hivemon_hal_esp32s3::{
    network::{ConnectivityHandle, EspWifiRadio, ModemLink},
    platform::BoardPlatform,
};
use esp_radio::Controller;
use esp_rtos::embassy::InterruptExecutor;
use log::{LevelFilter, info, warn};
use static_cell::StaticCell;

use store::BoardStore;

#[path = "main/net.rs"]
mod net;
#[path = "main/provision.rs"]
mod provision;
#[path = "main/store.rs"]
mod store;

const RECONCILE_INTERVAL_MS: u64 = 1_000;
const WATCHDOG_TIMEOUT_SECS: u64 = 30;
const MODEM_BAUD: u32 = 115_200;
const MODEM_PWRKEY_PULSE_MS: u64 = 1_000;
const MODEM_BOOT_MS: u64 = 3_000;
const NET_SEED: u64 = 0x4869_7665_4D6F_6E31;

static CONNECTIVITY: ConnectivityHandle = ConnectivityHandle::new();
static RADIO: StaticCell<Controller<'static>> = StaticCell::new();
// The control loop blocks during joins and attach waits; the network stack
// runs on a higher-priority executor so it keeps moving.
static NET_EXECUTOR: StaticCell<InterruptExecutor<2>> = StaticCell::new();

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

async fn halt(reason: &str) -> ! {
    warn!("boot: {}; halting", reason);
    loop {
        Timer::after_secs(1).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: hivemon starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);
    let sw_ints = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);

    let mut store = BoardStore::open();
    provision::seed_wifi_credentials(&mut store);

    // SIM7080G wiring: PWRKEY=GPIO41, modem RXD=GPIO5 (our TX), TXD=GPIO4 (our RX).
    let mut pwrkey = Output::new(peripherals.GPIO41, Level::Low, OutputConfig::default());
    pwrkey.set_high();
    Timer::after_millis(MODEM_PWRKEY_PULSE_MS).await;
    pwrkey.set_low();
    Timer::after_millis(MODEM_BOOT_MS).await;

    let uart = Uart::new(
        peripherals.UART1,
        UartConfig::default().with_baudrate(MODEM_BAUD),
    )
    .unwrap()
    .with_tx(peripherals.GPIO5)
    .with_rx(peripherals.GPIO4);
    let modem = ModemLink::new(AtModem::new(
        uart,
        Delay::new(),
        at_modem::Config::default(),
    ));

    let radio = match esp_radio::init() {
        Ok(radio) => &*RADIO.init(radio),
        Err(err) => {
            info!("esp-radio init failed: {:?}", err);
            halt("no radio").await
        }
    };

    let (wifi_controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                info!("wifi peripheral init failed: {:?}", err);
                halt("no wifi").await
            }
        };

    let net_executor = NET_EXECUTOR.init(InterruptExecutor::new(sw_ints.software_interrupt2));
    let net_spawner = net_executor.start(Priority::Priority2);
    net_spawner.must_spawn(net::net_bootstrap(interfaces.sta, NET_SEED, &CONNECTIVITY));
    let wifi = EspWifiRadio::new(wifi_controller, &CONNECTIVITY);

    let platform = BoardPlatform::new(
        Rtc::new(peripherals.LPWR),
        HalDuration::from_secs(WATCHDOG_TIMEOUT_SECS),
        &CONNECTIVITY,
    );

    let mut network_config = NetworkConfig::default();
    match provision::modem_apn() {
        Some(apn) => {
            info!("lte: APN {} configured", apn.apn);
            network_config = network_config.with_apn(apn);
        }
        None => info!("lte: no APN configured (set HIVEMON_MODEM_APN); LTE attach disabled"),
    }

    let mut manager = NetworkManager::new(store, wifi, modem, platform, network_config);
    manager.init();
    manager.start();
    CONNECTIVITY.publish(&manager.status());

    let mut last_logged = None;
    loop {
        if let Some(raw) = CONNECTIVITY.take_preference_request() {
            manager.set_preference_raw(raw);
        }
        manager.reconcile();

        let status = manager.status();
        CONNECTIVITY.publish(&status);
        manager.platform_mut().feed_watchdog();

        let snapshot = CONNECTIVITY.snapshot();
        let summary = (snapshot.indicator(), snapshot.active, snapshot.preference);
        if last_logged != Some(summary) {
            info!(
                "net: [{}] pref={} active={} user_hold={}ms modem_hold={}ms wifi_rssi={:?} lte_rssi={:?} ip={:?}",
                snapshot.indicator(),
                snapshot.preference.label(),
                snapshot.active.log_label(),
                status.user_hold_remaining_ms,
                status.modem_hold_remaining_ms,
                snapshot.wifi_rssi_dbm,
                snapshot.lte_rssi_dbm,
                status.local_ip
            );
            last_logged = Some(summary);
        }

        Timer::after_millis(RECONCILE_INTERVAL_MS).await;
    }
}
