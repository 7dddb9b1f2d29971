impl<S, W, M, P> NetworkManager<S, W, M, P>
where
    S: PreferenceStore,
    W: WifiRadio,
    M: CellularModem,
    P: NetworkPlatform,
{
    /// Tries the stored networks in order, each for up to `timeout_ms`.
    ///
    /// Blocks, but keeps calling [`NetworkPlatform::service_clients`] while
    /// waiting. On success WiFi becomes the active radio.
    pub fn connect_wifi_from_prefs(&mut self, timeout_ms: u32) -> bool {
        let credentials = self.load_credentials();

        for (slot, entry) in credentials.iter().enumerate() {
            if !entry.is_configured() {
                continue;
            }
            if self.join_network(entry, timeout_ms) {
                self.active = ActiveRadio::Wifi;
                info!("wifi: connected to saved network {} ({})", slot + 1, entry.ssid);
                return true;
            }
            warn!(
                "wifi: saved network {} ({}) not connected within {}ms",
                slot + 1,
                entry.ssid,
                timeout_ms
            );
        }
        false
    }

    /// Automatic LTE attach. Refused without touching the modem while the
    /// modem hold is open or the user pinned WiFi.
    pub fn try_start_lte(&mut self) -> bool {
        let now_ms = self.platform.now_ms();
        match lte_block(self.preference, self.forced, now_ms, self.modem_hold) {
            Some(LteBlock::ModemHold { remaining_ms }) => {
                info!("lte: attach suppressed (remaining={}ms)", remaining_ms);
                false
            }
            Some(LteBlock::ForcedWifi) => {
                info!("lte: attach suppressed, user forced WiFi");
                false
            }
            None => self.attach_lte(),
        }
    }

    /// User-directed attach: the modem hold armed by the same action does
    /// not apply, the forced-WiFi guard still does.
    fn attach_lte_for_user(&mut self) -> bool {
        let now_ms = self.platform.now_ms();
        if lte_block(self.preference, self.forced, now_ms, Deadline::expired()).is_some() {
            info!("lte: attach suppressed, user forced WiFi");
            return false;
        }
        self.attach_lte()
    }

    fn attach_lte(&mut self) -> bool {
        let Some(apn) = self.config.apn.as_ref() else {
            warn!("lte: APN not configured, cannot attach");
            return false;
        };

        info!("lte: attempting GPRS attach (apn={})", apn.apn);
        if let Err(err) = self.modem.gprs_begin(apn) {
            warn!("lte: GPRS attach failed: {:?}", err);
            self.active = ActiveRadio::None;
            return false;
        }
        if !self.wait_for_gprs() {
            warn!(
                "lte: data session not active within {}ms",
                self.config.lte_attach_timeout_ms
            );
            self.active = ActiveRadio::None;
            return false;
        }

        info!("lte: GPRS attach ok");
        self.platform.stop_key_server();
        self.active = ActiveRadio::Lte;
        true
    }

    /// Polls the modem until the data session is up or the attach timeout
    /// passes, pumping the platform between polls.
    fn wait_for_gprs(&mut self) -> bool {
        let started_ms = self.platform.now_ms();
        loop {
            match self.modem.is_gprs_active() {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => debug!("lte: data session query failed: {:?}", err),
            }
            let elapsed_ms = self.platform.now_ms().saturating_sub(started_ms);
            if elapsed_ms >= self.config.lte_attach_timeout_ms as u64 {
                return false;
            }
            self.platform.service_clients();
            self.platform.delay_ms(self.config.lte_attach_poll_ms);
        }
    }

    /// Disconnects GPRS if the modem is registered, then waits `settle_ms`.
    fn release_lte_session(&mut self, settle_ms: u32) {
        if !self.lte_registered() {
            return;
        }

        info!("lte: disconnecting GPRS");
        if let Err(err) = self.modem.gprs_disconnect() {
            warn!("lte: GPRS disconnect failed: {:?}", err);
        }
        if self.active == ActiveRadio::Lte {
            self.active = ActiveRadio::None;
        }
        if settle_ms > 0 {
            self.platform.delay_ms(settle_ms);
        }
    }

    fn power_off_wifi(&mut self) {
        if let Err(err) = self.wifi.disconnect(true) {
            warn!("wifi: disconnect failed: {:?}", err);
        }
        if let Err(err) = self.wifi.set_mode(WifiMode::Off) {
            warn!("wifi: power off failed: {:?}", err);
        }
        if self.active == ActiveRadio::Wifi {
            self.active = ActiveRadio::None;
        }
        self.platform.delay_ms(self.config.radio_settle_ms);
    }

    fn join_network(&mut self, entry: &WifiCredentials, timeout_ms: u32) -> bool {
        if let Err(err) = self.wifi.set_mode(WifiMode::Station) {
            warn!("wifi: station mode failed: {:?}", err);
            return false;
        }
        if let Err(err) = self.wifi.begin(&entry.ssid, &entry.passphrase) {
            warn!("wifi: join {} failed to start: {:?}", entry.ssid, err);
            return false;
        }

        let started_ms = self.platform.now_ms();
        loop {
            if self.wifi_connected() {
                return true;
            }
            if self.platform.now_ms().saturating_sub(started_ms) >= timeout_ms as u64 {
                return false;
            }
            self.platform.service_clients();
            self.platform.delay_ms(self.config.poll_step_ms);
        }
    }

    fn has_primary_credentials(&mut self) -> bool {
        let mut ns = Namespace::open(&mut self.store, WIFI_NAMESPACE, Access::ReadOnly);
        !ns.string_or::<SSID_MAX>(KEY_WIFI_SSID[0], "").is_empty()
    }

    fn load_credentials(&mut self) -> [WifiCredentials; 2] {
        let mut ns = Namespace::open(&mut self.store, WIFI_NAMESPACE, Access::ReadOnly);
        core::array::from_fn(|slot| WifiCredentials {
            ssid: ns.string_or(KEY_WIFI_SSID[slot], ""),
            passphrase: ns.string_or(KEY_WIFI_PSK[slot], ""),
        })
    }
}
