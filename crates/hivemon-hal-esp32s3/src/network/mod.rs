//! Connectivity state shared between the control loop and its observers.

mod modem;
mod wifi;

pub use modem::ModemLink;
pub use wifi::EspWifiRadio;

use core::{
    net::Ipv4Addr,
    sync::atomic::{AtomicBool, AtomicI16, AtomicU8, AtomicU32, Ordering},
};

use hivemon_core::network::{
    ActiveRadio, ConnectivityPreference, NetworkStatus, link_indicator,
};

const RSSI_UNKNOWN: i16 = i16::MIN;
const NO_REQUEST: u8 = u8::MAX;
const NO_ADDRESS: u32 = 0;

/// Immutable connectivity snapshot for the display and the SD logger.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectivitySnapshot {
    pub preference: ConnectivityPreference,
    pub active: ActiveRadio,
    pub wifi_connected: bool,
    pub lte_registered: bool,
    /// A blocking radio switch is in progress.
    pub switching: bool,
    pub key_server_enabled: bool,
    pub wifi_rssi_dbm: Option<i16>,
    pub lte_rssi_dbm: Option<i16>,
    pub revision: u32,
}

impl ConnectivitySnapshot {
    pub const fn indicator(self) -> &'static str {
        link_indicator(self.wifi_connected, self.lte_registered)
    }
}

/// Lock-free shared connectivity status.
#[derive(Debug)]
pub struct ConnectivityHandle {
    preference: AtomicU8,
    active: AtomicU8,
    wifi_connected: AtomicBool,
    lte_registered: AtomicBool,
    switching: AtomicBool,
    key_server_enabled: AtomicBool,
    wifi_rssi: AtomicI16,
    lte_rssi: AtomicI16,
    revision: AtomicU32,
    requested_preference: AtomicU8,
    /// DHCP address of the station interface, written by the network task.
    local_ip: AtomicU32,
}

impl ConnectivityHandle {
    pub const fn new() -> Self {
        Self {
            preference: AtomicU8::new(ConnectivityPreference::Auto.as_raw() as u8),
            active: AtomicU8::new(active_to_raw(ActiveRadio::None)),
            wifi_connected: AtomicBool::new(false),
            lte_registered: AtomicBool::new(false),
            switching: AtomicBool::new(false),
            key_server_enabled: AtomicBool::new(true),
            wifi_rssi: AtomicI16::new(RSSI_UNKNOWN),
            lte_rssi: AtomicI16::new(RSSI_UNKNOWN),
            revision: AtomicU32::new(0),
            requested_preference: AtomicU8::new(NO_REQUEST),
            local_ip: AtomicU32::new(NO_ADDRESS),
        }
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        ConnectivitySnapshot {
            preference: ConnectivityPreference::from_raw(
                self.preference.load(Ordering::Acquire) as i32,
            )
            .unwrap_or_default(),
            active: active_from_raw(self.active.load(Ordering::Acquire)),
            wifi_connected: self.wifi_connected.load(Ordering::Acquire),
            lte_registered: self.lte_registered.load(Ordering::Acquire),
            switching: self.switching.load(Ordering::Acquire),
            key_server_enabled: self.key_server_enabled.load(Ordering::Acquire),
            wifi_rssi_dbm: rssi_from_raw(self.wifi_rssi.load(Ordering::Acquire)),
            lte_rssi_dbm: rssi_from_raw(self.lte_rssi.load(Ordering::Acquire)),
            revision: self.revision.load(Ordering::Acquire),
        }
    }

    /// Stores a fresh manager status and clears the switching flag.
    pub fn publish(&self, status: &NetworkStatus) {
        let mut changed = false;
        changed |= self.store_u8(&self.preference, status.preference.as_raw() as u8);
        changed |= self.store_u8(&self.active, active_to_raw(status.active));
        changed |= self.store_bool(&self.wifi_connected, status.wifi_connected);
        changed |= self.store_bool(&self.lte_registered, status.lte_registered);
        changed |= self.store_bool(&self.switching, false);
        changed |= self.store_rssi(&self.wifi_rssi, status.wifi_rssi_dbm.map(i16::from));
        changed |= self.store_rssi(&self.lte_rssi, status.lte_rssi_dbm);
        if changed {
            self.bump_revision();
        }
    }

    /// Queues a user preference choice for the control loop. A newer request
    /// replaces one not yet taken.
    pub fn request_preference(&self, preference: ConnectivityPreference) {
        self.requested_preference
            .store(preference.as_raw() as u8, Ordering::Release);
    }

    pub fn take_preference_request(&self) -> Option<i32> {
        match self.requested_preference.swap(NO_REQUEST, Ordering::AcqRel) {
            NO_REQUEST => None,
            raw => Some(raw as i32),
        }
    }

    pub fn set_local_ip(&self, address: Option<Ipv4Addr>) {
        let raw = address.map_or(NO_ADDRESS, u32::from);
        self.local_ip.store(raw, Ordering::Release);
    }

    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        match self.local_ip.load(Ordering::Acquire) {
            NO_ADDRESS => None,
            raw => Some(Ipv4Addr::from(raw)),
        }
    }

    pub fn mark_switching(&self) {
        if self.store_bool(&self.switching, true) {
            self.bump_revision();
        }
    }

    pub fn disable_key_server(&self) {
        if self.store_bool(&self.key_server_enabled, false) {
            self.bump_revision();
        }
    }

    fn store_u8(&self, cell: &AtomicU8, next: u8) -> bool {
        cell.swap(next, Ordering::AcqRel) != next
    }

    fn store_bool(&self, cell: &AtomicBool, next: bool) -> bool {
        cell.swap(next, Ordering::AcqRel) != next
    }

    fn store_rssi(&self, cell: &AtomicI16, next: Option<i16>) -> bool {
        let next = next.unwrap_or(RSSI_UNKNOWN);
        cell.swap(next, Ordering::AcqRel) != next
    }

    fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for ConnectivityHandle {
    fn default() -> Self {
        Self::new()
    }
}

const fn active_to_raw(active: ActiveRadio) -> u8 {
    match active {
        ActiveRadio::None => 0,
        ActiveRadio::Wifi => 1,
        ActiveRadio::Lte => 2,
    }
}

const fn active_from_raw(raw: u8) -> ActiveRadio {
    match raw {
        1 => ActiveRadio::Wifi,
        2 => ActiveRadio::Lte,
        _ => ActiveRadio::None,
    }
}

const fn rssi_from_raw(raw: i16) -> Option<i16> {
    if raw == RSSI_UNKNOWN { None } else { Some(raw) }
}
