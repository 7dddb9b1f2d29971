//! Radio driver seams: the WiFi station and the cellular modem.

use core::net::Ipv4Addr;

use heapless::String;

pub const SSID_MAX: usize = 32;
pub const PASSPHRASE_MAX: usize = 64;
pub const APN_MAX: usize = 64;
pub const APN_CREDENTIAL_MAX: usize = 32;

/// WiFi radio operating mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WifiMode {
    Off,
    Station,
}

/// WiFi station driver.
///
/// `begin` only initiates association; callers poll `is_connected`.
pub trait WifiRadio {
    type Error: core::fmt::Debug;

    fn is_connected(&mut self) -> Result<bool, Self::Error>;
    fn mode(&self) -> WifiMode;
    fn set_mode(&mut self, mode: WifiMode) -> Result<(), Self::Error>;
    fn begin(&mut self, ssid: &str, passphrase: &str) -> Result<(), Self::Error>;
    /// Drops the association; `power_off` also releases the radio.
    fn disconnect(&mut self, power_off: bool) -> Result<(), Self::Error>;
    fn rssi_dbm(&mut self) -> Option<i8>;
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

/// Cellular modem, high-level attach surface only.
pub trait CellularModem {
    type Error: core::fmt::Debug;

    fn is_network_registered(&mut self) -> Result<bool, Self::Error>;
    /// Starts bringing up a packet data session; callers poll
    /// `is_gprs_active` for the outcome.
    fn gprs_begin(&mut self, apn: &ApnConfig) -> Result<(), Self::Error>;
    fn is_gprs_active(&mut self) -> Result<bool, Self::Error>;
    fn gprs_disconnect(&mut self) -> Result<(), Self::Error>;
    fn rssi_dbm(&mut self) -> Option<i16>;
}

/// One stored WiFi network.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WifiCredentials {
    pub ssid: String<SSID_MAX>,
    pub passphrase: String<PASSPHRASE_MAX>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, passphrase: &str) -> Option<Self> {
        let mut credentials = Self::default();
        credentials.ssid.push_str(ssid).ok()?;
        credentials.passphrase.push_str(passphrase).ok()?;
        Some(credentials)
    }

    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

/// Packet data access point settings for the modem.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ApnConfig {
    pub apn: String<APN_MAX>,
    pub user: String<APN_CREDENTIAL_MAX>,
    pub password: String<APN_CREDENTIAL_MAX>,
}

impl ApnConfig {
    pub fn new(apn: &str, user: &str, password: &str) -> Option<Self> {
        let mut config = Self::default();
        config.apn.push_str(apn).ok()?;
        config.user.push_str(user).ok()?;
        config.password.push_str(password).ok()?;
        Some(config)
    }
}
