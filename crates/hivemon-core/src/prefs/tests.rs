use super::*;

const NS: &str = "beehive_app";

#[test]
fn missing_keys_fall_back_to_defaults() {
    let mut store = MemoryStore::<8>::new();
    let mut ns = Namespace::open(&mut store, NS, Access::ReadOnly);

    assert_eq!(ns.int_or("net_pref", 0), 0);
    assert!(!ns.bool_or("net_forced", false));
    assert_eq!(ns.string_or::<32>("wifi_ssid1", "").as_str(), "");
    assert!(ns.close().is_ok());
}

#[test]
fn read_only_session_rejects_writes() {
    let mut store = MemoryStore::<8>::new();
    let mut ns = Namespace::open(&mut store, NS, Access::ReadOnly);

    assert_eq!(ns.put_int("net_pref", 2), Err(PrefsError::ReadOnly));
    assert_eq!(ns.remove("net_pref"), Err(PrefsError::ReadOnly));
    drop(ns);

    assert!(store.is_empty());
    assert_eq!(store.commit_count(), 0);
}

#[test]
fn close_commits_only_when_something_changed() {
    let mut store = MemoryStore::<8>::new();

    let ns = Namespace::open(&mut store, NS, Access::ReadWrite);
    assert!(ns.close().is_ok());
    assert_eq!(store.commit_count(), 0);

    let mut ns = Namespace::open(&mut store, NS, Access::ReadWrite);
    ns.put_int("net_pref", 1).unwrap();
    ns.put_bool("net_forced", true).unwrap();
    assert!(ns.close().is_ok());
    assert_eq!(store.commit_count(), 1);

    let mut ns = Namespace::open(&mut store, NS, Access::ReadOnly);
    assert_eq!(ns.int_or("net_pref", 0), 1);
    assert!(ns.bool_or("net_forced", false));
}

#[test]
fn dropping_a_dirty_session_still_commits() {
    let mut store = MemoryStore::<8>::new();
    {
        let mut ns = Namespace::open(&mut store, NS, Access::ReadWrite);
        ns.put_string("wifi_ssid1", "apiary").unwrap();
    }
    assert_eq!(store.commit_count(), 1);
}

#[test]
fn namespaces_do_not_share_keys() {
    let mut store = MemoryStore::<8>::new();
    let mut app = Namespace::open(&mut store, "beehive_app", Access::ReadWrite);
    app.put_int("slot", 7).unwrap();
    app.close().unwrap();

    let mut wifi = Namespace::open(&mut store, "beehive", Access::ReadOnly);
    assert_eq!(wifi.int_or("slot", -1), -1);
}

#[test]
fn type_mismatch_returns_default() {
    let mut store = MemoryStore::<8>::new();
    let mut ns = Namespace::open(&mut store, NS, Access::ReadWrite);
    ns.put_string("net_pref", "wifi").unwrap();

    assert_eq!(ns.int_or("net_pref", 0), 0);
    assert!(ns.contains("net_pref"));
}

#[test]
fn string_longer_than_caller_buffer_uses_default() {
    let mut store = MemoryStore::<8>::new();
    let mut ns = Namespace::open(&mut store, "beehive", Access::ReadWrite);
    ns.put_string("wifi_ssid1", "a-rather-long-network-name").unwrap();

    assert_eq!(ns.string_or::<8>("wifi_ssid1", "none").as_str(), "none");
    assert_eq!(
        ns.string_or::<32>("wifi_ssid1", "").as_str(),
        "a-rather-long-network-name"
    );
}

#[test]
fn oversized_values_and_keys_are_refused() {
    let mut store = MemoryStore::<1>::new();
    let long_value = "x".repeat(STRING_VALUE_MAX + 1);
    let mut ns = Namespace::open(&mut store, NS, Access::ReadWrite);

    assert_eq!(
        ns.put_string("wifi_psk1", &long_value),
        Err(PrefsError::ValueTooLong)
    );
    assert_eq!(
        ns.put_int("a_key_that_is_far_too_long", 1),
        Err(PrefsError::Backend(MemoryStoreError::KeyTooLong))
    );
    ns.put_int("net_pref", 1).unwrap();
    assert_eq!(
        ns.put_int("net_forced", 1),
        Err(PrefsError::Backend(MemoryStoreError::Full))
    );
}

#[test]
fn remove_reports_presence() {
    let mut store = MemoryStore::<4>::new();
    let mut ns = Namespace::open(&mut store, NS, Access::ReadWrite);
    ns.put_int("net_pref", 3).unwrap();

    assert_eq!(ns.remove("net_pref"), Ok(true));
    assert_eq!(ns.remove("net_pref"), Ok(false));
    assert_eq!(ns.int_or("net_pref", 0), 0);
}
