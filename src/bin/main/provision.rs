use hivemon_core::{
    network::{KEY_WIFI_PSK, KEY_WIFI_SSID, WIFI_NAMESPACE},
    prefs::{Access, Namespace, PreferenceStore},
    radio::{ApnConfig, SSID_MAX},
};
use log::{info, warn};

const WIFI_SSID: Option<&str> = option_env!("HIVEMON_WIFI_SSID");
const WIFI_PASSWORD: Option<&str> = option_env!("HIVEMON_WIFI_PASSWORD");
const MODEM_APN: Option<&str> = option_env!("HIVEMON_MODEM_APN");
const MODEM_APN_USER: Option<&str> = option_env!("HIVEMON_MODEM_APN_USER");
const MODEM_APN_PASSWORD: Option<&str> = option_env!("HIVEMON_MODEM_APN_PASSWORD");

/// Writes the build-time network into the primary slot when no network was
/// provisioned yet.
pub(super) fn seed_wifi_credentials<S: PreferenceStore>(store: &mut S) {
    let Some(ssid) = WIFI_SSID.filter(|ssid| !ssid.is_empty()) else {
        return;
    };

    let mut ns = Namespace::open(store, WIFI_NAMESPACE, Access::ReadWrite);
    if !ns.string_or::<SSID_MAX>(KEY_WIFI_SSID[0], "").is_empty() {
        return;
    }

    let result = ns
        .put_string(KEY_WIFI_SSID[0], ssid)
        .and_then(|()| ns.put_string(KEY_WIFI_PSK[0], WIFI_PASSWORD.unwrap_or("")))
        .and_then(|()| ns.close());
    match result {
        Ok(()) => info!("prefs: seeded primary WiFi network {} from build env", ssid),
        Err(err) => warn!("prefs: seeding WiFi credentials failed: {:?}", err),
    }
}

pub(super) fn modem_apn() -> Option<ApnConfig> {
    let apn = MODEM_APN.filter(|apn| !apn.is_empty())?;
    let config = ApnConfig::new(
        apn,
        MODEM_APN_USER.unwrap_or(""),
        MODEM_APN_PASSWORD.unwrap_or(""),
    );
    if config.is_none() {
        warn!("lte: HIVEMON_MODEM_APN settings too long, LTE disabled");
    }
    config
}
