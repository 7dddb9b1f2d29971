//! Connectivity manager: arbitrates between the WiFi station and the
//! cellular modem.
//!
//! The two radios are mutually exclusive in intended use. Explicit user
//! choices go through [`NetworkManager::set_preference`]; the periodic
//! [`NetworkManager::reconcile`] pass retries and falls back automatically,
//! but never while a user action is settling (the user hold) and never
//! attaches LTE while the modem hold is open or WiFi was pinned by the user.

pub mod gate;


use core::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::{
    platform::NetworkPlatform,
    prefs::{Access, Namespace, PreferenceStore, PrefsError},
    radio::{ApnConfig, CellularModem, SSID_MAX, WifiCredentials, WifiMode, WifiRadio},
};

use gate::{Deadline, LteBlock, RetryTimer, lte_block};

pub const APP_NAMESPACE: &str = "beehive_app";
pub const WIFI_NAMESPACE: &str = "beehive";
pub const KEY_NET_PREF: &str = "net_pref";
pub const KEY_NET_FORCED: &str = "net_forced";
pub const KEY_WIFI_SSID: [&str; 2] = ["wifi_ssid1", "wifi_ssid2"];
pub const KEY_WIFI_PSK: [&str; 2] = ["wifi_psk1", "wifi_psk2"];

/// User-selected connectivity policy. Persisted as `net_pref`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(i32)]
pub enum ConnectivityPreference {
    #[default]
    Auto = 0,
    LteOnly = 1,
    WifiOnly = 2,
    Offline = 3,
}

impl ConnectivityPreference {
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Auto),
            1 => Some(Self::LteOnly),
            2 => Some(Self::WifiOnly),
            3 => Some(Self::Offline),
            _ => None,
        }
    }

    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::LteOnly => "LTE",
            Self::WifiOnly => "WIFI",
            Self::Offline => "OFFLINE",
        }
    }
}

/// Radio believed to carry connectivity right now. Never persisted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ActiveRadio {
    #[default]
    None,
    Wifi,
    Lte,
}

impl ActiveRadio {
    /// Network column value used by the SD logger.
    pub const fn log_label(self) -> &'static str {
        match self {
            Self::None => "Offline",
            Self::Wifi => "WiFi",
            Self::Lte => "LTE",
        }
    }
}

/// Durations and timeouts of the manager. Defaults match the field units.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkConfig {
    pub user_hold_ms: u32,
    pub modem_hold_on_change_ms: u32,
    pub modem_hold_on_wifi_reaffirm_ms: u32,
    pub user_wifi_timeout_ms: u32,
    pub auto_wifi_timeout_ms: u32,
    pub wifi_probe_timeout_ms: u32,
    pub wifi_retry_ms: u32,
    pub lte_retry_ms: u32,
    pub fallback_lte_retry_ms: u32,
    pub fallback_wifi_probe_ms: u32,
    pub poll_step_ms: u32,
    /// Upper bound for the data session to come up after an attach starts.
    pub lte_attach_timeout_ms: u32,
    pub lte_attach_poll_ms: u32,
    pub gprs_settle_ms: u32,
    pub radio_settle_ms: u32,
    pub apn: Option<ApnConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_hold_ms: 15_000,
            modem_hold_on_change_ms: 60_000,
            modem_hold_on_wifi_reaffirm_ms: 120_000,
            user_wifi_timeout_ms: 10_000,
            auto_wifi_timeout_ms: 8_000,
            wifi_probe_timeout_ms: 5_000,
            wifi_retry_ms: 10_000,
            lte_retry_ms: 10_000,
            fallback_lte_retry_ms: 20_000,
            fallback_wifi_probe_ms: 15_000,
            poll_step_ms: 50,
            lte_attach_timeout_ms: 30_000,
            lte_attach_poll_ms: 1_000,
            gprs_settle_ms: 200,
            radio_settle_ms: 100,
            apn: None,
        }
    }
}

impl NetworkConfig {
    pub fn with_apn(mut self, apn: ApnConfig) -> Self {
        self.apn = Some(apn);
        self
    }

    pub const fn with_user_hold_ms(mut self, user_hold_ms: u32) -> Self {
        self.user_hold_ms = user_hold_ms;
        self
    }

    pub const fn with_wifi_timeouts(mut self, user_ms: u32, auto_ms: u32, probe_ms: u32) -> Self {
        self.user_wifi_timeout_ms = user_ms;
        self.auto_wifi_timeout_ms = auto_ms;
        self.wifi_probe_timeout_ms = probe_ms;
        self
    }

    pub const fn with_poll_step_ms(mut self, poll_step_ms: u32) -> Self {
        self.poll_step_ms = poll_step_ms;
        self
    }

    pub const fn with_lte_attach(mut self, timeout_ms: u32, poll_ms: u32) -> Self {
        self.lte_attach_timeout_ms = timeout_ms;
        self.lte_attach_poll_ms = poll_ms;
        self
    }
}

/// Snapshot for the UI and other consumers deciding on a transport.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NetworkStatus {
    pub preference: ConnectivityPreference,
    pub forced: bool,
    pub active: ActiveRadio,
    pub wifi_connected: bool,
    pub lte_registered: bool,
    pub wifi_rssi_dbm: Option<i8>,
    pub lte_rssi_dbm: Option<i16>,
    pub local_ip: Option<Ipv4Addr>,
    pub user_hold_remaining_ms: u64,
    pub modem_hold_remaining_ms: u64,
}

impl NetworkStatus {
    /// Four-character LCD segment shown in the top-right corner.
    pub const fn indicator(&self) -> &'static str {
        link_indicator(self.wifi_connected, self.lte_registered)
    }
}

/// Four-character link label. Both links up is a transient state while one
/// radio is being torn down.
pub const fn link_indicator(wifi_connected: bool, lte_registered: bool) -> &'static str {
    match (wifi_connected, lte_registered) {
        (true, true) => "DUAL",
        (true, false) => "WIFI",
        (false, true) => "LTE ",
        (false, false) => "    ",
    }
}

/// Owns the radios, the preference store and all connectivity state.
///
/// Single-threaded by construction: every method runs to completion on the
/// caller's loop. Blocking waits call [`NetworkPlatform::service_clients`].
pub struct NetworkManager<S, W, M, P>
where
    S: PreferenceStore,
    W: WifiRadio,
    M: CellularModem,
    P: NetworkPlatform,
{
    store: S,
    wifi: W,
    modem: M,
    platform: P,
    config: NetworkConfig,
    preference: ConnectivityPreference,
    forced: bool,
    active: ActiveRadio,
    user_hold: Deadline,
    modem_hold: Deadline,
    wifi_retry: RetryTimer,
    lte_retry: RetryTimer,
}

impl<S, W, M, P> NetworkManager<S, W, M, P>
where
    S: PreferenceStore,
    W: WifiRadio,
    M: CellularModem,
    P: NetworkPlatform,
{
    /// Builds the manager without touching storage or radios; call
    /// [`NetworkManager::init`] before use.
    pub fn new(store: S, wifi: W, modem: M, platform: P, config: NetworkConfig) -> Self {
        Self {
            store,
            wifi,
            modem,
            platform,
            config,
            preference: ConnectivityPreference::Auto,
            forced: false,
            active: ActiveRadio::None,
            user_hold: Deadline::expired(),
            modem_hold: Deadline::expired(),
            wifi_retry: RetryTimer::new(),
            lte_retry: RetryTimer::new(),
        }
    }

    /// Loads the persisted preference and forced flag. Takes no network
    /// action; the first reconcile pass or user action connects.
    pub fn init(&mut self) {
        let mut ns = Namespace::open(&mut self.store, APP_NAMESPACE, Access::ReadOnly);
        let raw = ns.int_or(KEY_NET_PREF, ConnectivityPreference::Auto.as_raw());
        self.forced = ns.bool_or(KEY_NET_FORCED, false);
        drop(ns);

        self.preference = ConnectivityPreference::from_raw(raw).unwrap_or_else(|| {
            warn!("net: stored net_pref={} out of range, using AUTO", raw);
            ConnectivityPreference::Auto
        });
        info!(
            "net: init net_pref={} ({}) user_forced={}",
            self.preference.as_raw(),
            self.preference.label(),
            self.forced as u8
        );
    }

    /// Boot-time WiFi join for AUTO and WIFI_ONLY. Reconciliation only
    /// retries WiFi on its own cadence, so this is the first attempt.
    pub fn start(&mut self) {
        match self.preference {
            ConnectivityPreference::Auto | ConnectivityPreference::WifiOnly => {}
            ConnectivityPreference::LteOnly | ConnectivityPreference::Offline => return,
        }
        if !self.has_primary_credentials() {
            info!("net: no saved WiFi network, skipping boot join");
            return;
        }

        let now_ms = self.platform.now_ms();
        self.wifi_retry.mark(now_ms);
        if self.connect_wifi_from_prefs(self.config.auto_wifi_timeout_ms) {
            info!("net: WiFi up at boot");
        } else {
            warn!("net: boot WiFi join failed, leaving it to reconciliation");
        }
    }

    pub fn preference(&self) -> ConnectivityPreference {
        self.preference
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn active_radio(&self) -> ActiveRadio {
        self.active
    }

    pub fn user_hold(&self) -> Deadline {
        self.user_hold
    }

    pub fn modem_hold(&self) -> Deadline {
        self.modem_hold
    }

    /// `true` while a recent user action holds off automatic switching.
    pub fn is_user_active(&self) -> bool {
        self.user_hold.is_active(self.platform.now_ms())
    }

    /// Queries both radios live.
    pub fn status(&mut self) -> NetworkStatus {
        let now_ms = self.platform.now_ms();
        let wifi_connected = self.wifi_connected();
        let lte_registered = self.lte_registered();

        NetworkStatus {
            preference: self.preference,
            forced: self.forced,
            active: self.active,
            wifi_connected,
            lte_registered,
            wifi_rssi_dbm: if wifi_connected {
                self.wifi.rssi_dbm()
            } else {
                None
            },
            lte_rssi_dbm: if lte_registered {
                self.modem.rssi_dbm()
            } else {
                None
            },
            local_ip: if wifi_connected {
                self.wifi.local_ip()
            } else {
                None
            },
            user_hold_remaining_ms: self.user_hold.remaining_ms(now_ms),
            modem_hold_remaining_ms: self.modem_hold.remaining_ms(now_ms),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access for provisioning; the manager itself never
    /// writes credentials.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    fn wifi_connected(&mut self) -> bool {
        match self.wifi.is_connected() {
            Ok(connected) => connected,
            Err(err) => {
                warn!("wifi: status query failed: {:?}", err);
                false
            }
        }
    }

    fn lte_registered(&mut self) -> bool {
        match self.modem.is_network_registered() {
            Ok(registered) => registered,
            Err(err) => {
                warn!("lte: registration query failed: {:?}", err);
                false
            }
        }
    }

    fn persist_app(
        &mut self,
        what: &str,
        write: impl FnOnce(&mut Namespace<'_, S>) -> Result<(), PrefsError<S::Error>>,
    ) {
        let mut ns = Namespace::open(&mut self.store, APP_NAMESPACE, Access::ReadWrite);
        let result = write(&mut ns).and_then(|()| ns.close());
        if let Err(err) = result {
            warn!("prefs: persisting {} failed: {:?}", what, err);
        }
    }

    fn persist_forced(&mut self, forced: bool) {
        self.forced = forced;
        self.persist_app(KEY_NET_FORCED, |ns| ns.put_bool(KEY_NET_FORCED, forced));
    }
}

include!("preference.rs");
include!("reconcile.rs");
include!("links.rs");
