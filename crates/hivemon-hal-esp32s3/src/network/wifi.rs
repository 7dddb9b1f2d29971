use core::net::Ipv4Addr;

use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiError};
use hivemon_core::radio::{WifiMode, WifiRadio};
use log::info;

use super::ConnectivityHandle;

/// Station-mode adapter over the esp-radio controller.
///
/// `begin` only starts the association; the manager polls
/// [`WifiRadio::is_connected`] for the outcome. The DHCP address comes from
/// the network task through the shared handle.
pub struct EspWifiRadio<'d> {
    controller: WifiController<'d>,
    link: &'static ConnectivityHandle,
    mode: WifiMode,
}

impl<'d> EspWifiRadio<'d> {
    pub fn new(controller: WifiController<'d>, link: &'static ConnectivityHandle) -> Self {
        Self {
            controller,
            link,
            mode: WifiMode::Off,
        }
    }

    fn ensure_started(&mut self) -> Result<(), WifiError> {
        if !self.controller.is_started()? {
            self.controller.start()?;
        }
        Ok(())
    }
}

impl WifiRadio for EspWifiRadio<'_> {
    type Error = WifiError;

    fn is_connected(&mut self) -> Result<bool, Self::Error> {
        if self.mode == WifiMode::Off {
            return Ok(false);
        }
        self.controller.is_connected()
    }

    fn mode(&self) -> WifiMode {
        self.mode
    }

    fn set_mode(&mut self, mode: WifiMode) -> Result<(), Self::Error> {
        match mode {
            WifiMode::Station => {
                if self.mode != WifiMode::Station {
                    self.controller
                        .set_config(&ModeConfig::Client(ClientConfig::default()))?;
                    self.ensure_started()?;
                }
            }
            WifiMode::Off => {
                if self.controller.is_started()? {
                    self.controller.stop()?;
                    info!("wifi: radio stopped");
                }
            }
        }
        self.mode = mode;
        Ok(())
    }

    fn begin(&mut self, ssid: &str, passphrase: &str) -> Result<(), Self::Error> {
        let client = ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(passphrase.into());
        self.controller.set_config(&ModeConfig::Client(client))?;
        self.ensure_started()?;
        self.mode = WifiMode::Station;
        info!("wifi: joining {}", ssid);
        self.controller.connect()
    }

    fn disconnect(&mut self, power_off: bool) -> Result<(), Self::Error> {
        if self.controller.is_connected()? {
            self.controller.disconnect()?;
        }
        if power_off {
            self.set_mode(WifiMode::Off)?;
        }
        Ok(())
    }

    fn rssi_dbm(&mut self) -> Option<i8> {
        self.controller
            .rssi()
            .ok()
            .and_then(|rssi| i8::try_from(rssi).ok())
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        if self.mode == WifiMode::Off {
            return None;
        }
        self.link.local_ip()
    }
}
