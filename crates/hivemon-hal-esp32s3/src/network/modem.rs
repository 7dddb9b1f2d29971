use at_modem::AtModem;
use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use hivemon_core::radio::{ApnConfig, CellularModem};
use log::warn;

/// Binds the AT driver to the manager's modem seam.
pub struct ModemLink<U, D> {
    modem: AtModem<U, D>,
}

impl<U, D> ModemLink<U, D>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    /// Wraps the driver and checks that the modem answers.
    pub fn new(mut modem: AtModem<U, D>) -> Self {
        if let Err(err) = modem.probe() {
            warn!("lte: modem not responding to AT: {:?}", err);
        }
        Self { modem }
    }
}

impl<U, D> CellularModem for ModemLink<U, D>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    type Error = at_modem::Error<U::Error>;

    fn is_network_registered(&mut self) -> Result<bool, Self::Error> {
        self.modem.is_network_registered()
    }

    fn gprs_begin(&mut self, apn: &ApnConfig) -> Result<(), Self::Error> {
        self.modem.activate_pdp(&apn.apn, &apn.user, &apn.password)
    }

    fn is_gprs_active(&mut self) -> Result<bool, Self::Error> {
        self.modem.is_pdp_active()
    }

    fn gprs_disconnect(&mut self) -> Result<(), Self::Error> {
        self.modem.gprs_disconnect()
    }

    fn rssi_dbm(&mut self) -> Option<i16> {
        self.modem.rssi_dbm().ok().flatten()
    }
}
