impl<S, W, M, P> NetworkManager<S, W, M, P>
where
    S: PreferenceStore,
    W: WifiRadio,
    M: CellularModem,
    P: NetworkPlatform,
{
    /// Raw entry point for callers holding the persisted integer encoding.
    /// Out-of-range values are ignored.
    pub fn set_preference_raw(&mut self, raw: i32) {
        match ConnectivityPreference::from_raw(raw) {
            Some(preference) => self.set_preference(preference),
            None => debug!("net: ignoring out-of-range preference {}", raw),
        }
    }

    /// Applies an explicit user choice.
    ///
    /// Selecting the current preference again is a reaffirmation: nothing is
    /// re-persisted, but the holds are refreshed and the chosen radio is
    /// brought up immediately.
    pub fn set_preference(&mut self, preference: ConnectivityPreference) {
        let now_ms = self.platform.now_ms();
        if preference == self.preference {
            self.reaffirm_preference(now_ms);
        } else {
            self.change_preference(preference, now_ms);
        }
    }

    /// Drops the user hold and the forced flag so automatic logic resumes on
    /// the next pass.
    pub fn clear_user_block(&mut self) {
        self.user_hold.clear();
        self.persist_forced(false);
        info!("net: cleared user hold and forced flag");
    }

    /// Holds off automatic LTE attach for at least `duration_ms`. An already
    /// longer hold is kept.
    pub fn suppress_modem_attach(&mut self, duration_ms: u32) {
        let now_ms = self.platform.now_ms();
        if self.modem_hold.extend(now_ms, duration_ms) {
            info!("net: modem auto-attach suppressed for {}ms", duration_ms);
        } else {
            debug!(
                "net: modem hold of {}ms kept, {}ms already remaining",
                duration_ms,
                self.modem_hold.remaining_ms(now_ms)
            );
        }
    }

    fn reaffirm_preference(&mut self, now_ms: u64) {
        info!(
            "net: preference {} reaffirmed, refreshing user hold",
            self.preference.label()
        );
        self.user_hold.extend(now_ms, self.config.user_hold_ms);
        self.persist_forced(true);

        match self.preference {
            ConnectivityPreference::WifiOnly => {
                self.suppress_modem_attach(self.config.modem_hold_on_wifi_reaffirm_ms);
                info!("net: WiFi reaffirmed, connecting now");
                self.release_lte_session(self.config.gprs_settle_ms);
                if self.connect_wifi_from_prefs(self.config.user_wifi_timeout_ms) {
                    info!("net: WiFi connected per user reaffirm");
                } else {
                    warn!("net: WiFi connect after reaffirm failed");
                }
            }
            ConnectivityPreference::LteOnly => {
                info!("net: LTE reaffirmed, ensuring WiFi off and LTE on");
                if self.wifi.mode() != WifiMode::Off || self.wifi_connected() {
                    self.power_off_wifi();
                }
                if !self.lte_registered() {
                    let _ = self.attach_lte_for_user();
                }
            }
            ConnectivityPreference::Auto | ConnectivityPreference::Offline => {}
        }
    }

    fn change_preference(&mut self, preference: ConnectivityPreference, now_ms: u64) {
        self.preference = preference;
        self.persist_app(KEY_NET_PREF, |ns| ns.put_int(KEY_NET_PREF, preference.as_raw()));

        self.user_hold.extend(now_ms, self.config.user_hold_ms);
        self.persist_forced(true);
        info!(
            "net: user set preference={} ({}), holding auto-switch, user_forced=1",
            preference.as_raw(),
            preference.label()
        );
        self.suppress_modem_attach(self.config.modem_hold_on_change_ms);

        match preference {
            ConnectivityPreference::WifiOnly => self.enter_wifi_only(),
            ConnectivityPreference::LteOnly => self.enter_lte_only(),
            ConnectivityPreference::Auto | ConnectivityPreference::Offline => {
                self.enter_offline(preference)
            }
        }
    }

    fn enter_wifi_only(&mut self) {
        if !self.has_primary_credentials() {
            info!("net: WiFi selected but no saved credentials; waiting for provisioning");
            return;
        }

        info!("net: user chose WiFi, connecting from saved credentials");
        self.release_lte_session(self.config.gprs_settle_ms);
        if self.connect_wifi_from_prefs(self.config.user_wifi_timeout_ms) {
            info!("net: WiFi connected per user request");
        } else {
            warn!(
                "net: WiFi connect from saved credentials failed; staying put until the user retries or provisions"
            );
        }
    }

    fn enter_lte_only(&mut self) {
        info!("net: user chose LTE-only mode (remote operation)");
        self.power_off_wifi();

        if self.attach_lte_for_user() {
            info!("net: LTE-only mode active, no local web interface");
        } else {
            warn!("net: LTE requested but attach failed");
        }

        // LTE-only needs no protection from auto-switching.
        self.persist_forced(false);
    }

    fn enter_offline(&mut self, preference: ConnectivityPreference) {
        self.wifi_retry.reset();
        self.lte_retry.reset();
        self.active = ActiveRadio::None;

        if self.wifi_connected() {
            if let Err(err) = self.wifi.disconnect(true) {
                warn!("wifi: disconnect failed: {:?}", err);
            }
            if let Err(err) = self.wifi.set_mode(WifiMode::Off) {
                warn!("wifi: power off failed: {:?}", err);
            }
        }
        if self.lte_registered()
            && let Err(err) = self.modem.gprs_disconnect()
        {
            warn!("lte: GPRS disconnect failed: {:?}", err);
        }

        info!("net: network set to {} by user, radios down", preference.label());
        self.persist_forced(false);
    }
}
