//! Board implementation of the manager's runtime hooks.

use esp_hal::{
    delay::Delay,
    rtc_cntl::{Rtc, RwdtStage},
    time::{Duration, Instant},
};
use hivemon_core::platform::NetworkPlatform;
use log::info;

use crate::network::ConnectivityHandle;

/// Clock, busy-wait delay and watchdog for the blocking connectivity calls.
///
/// Every pump feeds the RTC watchdog and flags the shared snapshot as
/// switching, so a multi-second WiFi join neither resets the chip nor looks
/// like a hang to observers.
pub struct BoardPlatform<'d> {
    boot: Instant,
    delay: Delay,
    rtc: Rtc<'d>,
    connectivity: &'static ConnectivityHandle,
}

impl<'d> BoardPlatform<'d> {
    pub fn new(
        mut rtc: Rtc<'d>,
        watchdog_timeout: Duration,
        connectivity: &'static ConnectivityHandle,
    ) -> Self {
        rtc.rwdt.set_timeout(RwdtStage::Stage0, watchdog_timeout);
        rtc.rwdt.enable();
        Self {
            boot: Instant::now(),
            delay: Delay::new(),
            rtc,
            connectivity,
        }
    }

    pub fn feed_watchdog(&mut self) {
        self.rtc.rwdt.feed();
    }
}

impl NetworkPlatform for BoardPlatform<'_> {
    fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.feed_watchdog();
        self.delay.delay_millis(ms);
    }

    fn service_clients(&mut self) {
        self.feed_watchdog();
        self.connectivity.mark_switching();
    }

    fn stop_key_server(&mut self) {
        info!("net: LTE active, local key server disabled");
        self.connectivity.disable_key_server();
    }
}
