impl<S, W, M, P> NetworkManager<S, W, M, P>
where
    S: PreferenceStore,
    W: WifiRadio,
    M: CellularModem,
    P: NetworkPlatform,
{
    /// One automatic reconciliation pass. Call periodically from the main
    /// loop. Never changes the preference.
    pub fn reconcile(&mut self) {
        let now_ms = self.platform.now_ms();

        if self.user_hold.is_active(now_ms) {
            debug!(
                "net: reconcile held by user action (remaining={}ms)",
                self.user_hold.remaining_ms(now_ms)
            );
            return;
        }

        self.refresh_active_radio();

        if self.modem_hold.is_active(now_ms) {
            debug!(
                "net: reconcile with modem attach suppressed (remaining={}ms)",
                self.modem_hold.remaining_ms(now_ms)
            );
            if self.preference == ConnectivityPreference::WifiOnly {
                self.retry_wifi(now_ms, "modem hold");
            }
            return;
        }

        if self.forced && self.preference == ConnectivityPreference::WifiOnly {
            self.retry_wifi(now_ms, "forced WiFi");
            return;
        }

        match self.preference {
            ConnectivityPreference::WifiOnly => self.retry_wifi(now_ms, "WiFi preference"),
            ConnectivityPreference::LteOnly => self.retry_lte(now_ms),
            ConnectivityPreference::Auto | ConnectivityPreference::Offline => {
                self.reconcile_fallback(now_ms)
            }
        }
    }

    /// Demotes an active radio whose link went away.
    fn refresh_active_radio(&mut self) {
        let active = self.active;
        match active {
            ActiveRadio::Wifi if !self.wifi_connected() => {
                info!("net: WiFi link lost");
                self.active = ActiveRadio::None;
            }
            ActiveRadio::Lte if !self.lte_registered() => {
                info!("net: LTE registration lost");
                self.active = ActiveRadio::None;
            }
            _ => {}
        }
    }

    fn retry_wifi(&mut self, now_ms: u64, reason: &str) {
        if self.active == ActiveRadio::Wifi {
            return;
        }
        if self.wifi_connected() {
            info!("net: {}: WiFi already associated, adopting it", reason);
            self.active = ActiveRadio::Wifi;
            return;
        }
        if !self.wifi_retry.try_claim(now_ms, self.config.wifi_retry_ms) {
            return;
        }
        info!("net: {}: trying WiFi only", reason);
        let _ = self.connect_wifi_from_prefs(self.config.auto_wifi_timeout_ms);
    }

    fn retry_lte(&mut self, now_ms: u64) {
        if self.active == ActiveRadio::Lte {
            return;
        }
        if !self.lte_retry.try_claim(now_ms, self.config.lte_retry_ms) {
            return;
        }
        info!("net: LTE preference: retrying attach");
        let _ = self.try_start_lte();
    }

    /// AUTO/OFFLINE path: WiFi wins whenever it is up, LTE covers the gaps.
    fn reconcile_fallback(&mut self, now_ms: u64) {
        if self.wifi_connected() {
            if self.active != ActiveRadio::Wifi {
                info!("net: WiFi is up, adopting it and releasing LTE");
                self.active = ActiveRadio::Wifi;
                self.release_lte_session(0);
                self.platform.delay_ms(self.config.radio_settle_ms);
            }
            return;
        }

        if self.active != ActiveRadio::Lte {
            if self
                .lte_retry
                .try_claim(now_ms, self.config.fallback_lte_retry_ms)
                && self.try_start_lte()
            {
                return;
            }
            // No LTE session to fall back on: keep retrying the saved networks.
            if self
                .wifi_retry
                .try_claim(now_ms, self.config.fallback_wifi_probe_ms)
                && self.connect_wifi_from_prefs(self.config.wifi_probe_timeout_ms)
            {
                info!("net: WiFi reachable without LTE, adopting it");
            }
            return;
        }

        if self
            .wifi_retry
            .try_claim(now_ms, self.config.fallback_wifi_probe_ms)
            && self.connect_wifi_from_prefs(self.config.wifi_probe_timeout_ms)
        {
            info!("net: WiFi reachable again, tearing down LTE");
            self.release_lte_session(0);
            self.platform.delay_ms(self.config.radio_settle_ms);
        }
    }
}
