//! Time windows and guards shared by explicit and automatic network actions.

use super::ConnectivityPreference;

/// Absolute monotonic deadline. The window is open while `now < until`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Deadline {
    until_ms: u64,
}

impl Deadline {
    pub const fn expired() -> Self {
        Self { until_ms: 0 }
    }

    pub const fn until_ms(self) -> u64 {
        self.until_ms
    }

    pub const fn is_active(self, now_ms: u64) -> bool {
        now_ms < self.until_ms
    }

    pub const fn remaining_ms(self, now_ms: u64) -> u64 {
        self.until_ms.saturating_sub(now_ms)
    }

    /// Moves the deadline to `now_ms + duration_ms` unless it already ends
    /// later. Returns `true` when the deadline moved.
    pub fn extend(&mut self, now_ms: u64, duration_ms: u32) -> bool {
        let candidate = now_ms.saturating_add(duration_ms as u64);
        if candidate > self.until_ms {
            self.until_ms = candidate;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.until_ms = 0;
    }
}

/// Last attempt timestamp for one radio.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RetryTimer {
    last_attempt_ms: Option<u64>,
}

impl RetryTimer {
    pub const fn new() -> Self {
        Self {
            last_attempt_ms: None,
        }
    }

    pub const fn last_attempt_ms(self) -> Option<u64> {
        self.last_attempt_ms
    }

    /// An attempt is due when none was made yet or strictly more than
    /// `interval_ms` has passed since the last one.
    pub fn is_due(self, now_ms: u64, interval_ms: u32) -> bool {
        self.last_attempt_ms
            .is_none_or(|last| now_ms.saturating_sub(last) > interval_ms as u64)
    }

    /// Records an attempt at `now_ms` if one is due.
    pub fn try_claim(&mut self, now_ms: u64, interval_ms: u32) -> bool {
        if !self.is_due(now_ms, interval_ms) {
            return false;
        }
        self.last_attempt_ms = Some(now_ms);
        true
    }

    /// Records an attempt made outside the throttle.
    pub fn mark(&mut self, now_ms: u64) {
        self.last_attempt_ms = Some(now_ms);
    }

    pub fn reset(&mut self) {
        self.last_attempt_ms = None;
    }
}

/// Why an LTE attach is not allowed right now.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LteBlock {
    ModemHold { remaining_ms: u64 },
    ForcedWifi,
}

/// Evaluates both LTE attach guards. The modem hold is reported first.
pub const fn lte_block(
    preference: ConnectivityPreference,
    forced: bool,
    now_ms: u64,
    modem_hold: Deadline,
) -> Option<LteBlock> {
    if modem_hold.is_active(now_ms) {
        return Some(LteBlock::ModemHold {
            remaining_ms: modem_hold.remaining_ms(now_ms),
        });
    }
    if forced && matches!(preference, ConnectivityPreference::WifiOnly) {
        return Some(LteBlock::ForcedWifi);
    }
    None
}

/// `true` when an automatic LTE attach must not be attempted.
pub const fn should_suppress_lte(
    preference: ConnectivityPreference,
    forced: bool,
    now_ms: u64,
    suppress_until_ms: u64,
) -> bool {
    lte_block(
        preference,
        forced,
        now_ms,
        Deadline {
            until_ms: suppress_until_ms,
        },
    )
    .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_only_moves_forward() {
        let mut hold = Deadline::expired();
        assert!(hold.extend(1_000, 120_000));
        assert_eq!(hold.until_ms(), 121_000);

        assert!(!hold.extend(2_000, 60_000));
        assert_eq!(hold.until_ms(), 121_000);

        assert!(hold.extend(100_000, 60_000));
        assert_eq!(hold.until_ms(), 160_000);
    }

    #[test]
    fn deadline_window_is_half_open() {
        let mut hold = Deadline::expired();
        hold.extend(0, 500);
        assert!(hold.is_active(499));
        assert!(!hold.is_active(500));
        assert_eq!(hold.remaining_ms(200), 300);
        assert_eq!(hold.remaining_ms(900), 0);

        hold.clear();
        assert!(!hold.is_active(0));
    }

    #[test]
    fn retry_timer_requires_strictly_more_than_interval() {
        let mut timer = RetryTimer::new();
        assert!(timer.try_claim(5_000, 10_000));
        assert!(!timer.try_claim(14_999, 10_000));
        assert!(!timer.try_claim(15_000, 10_000));
        assert!(timer.try_claim(15_001, 10_000));
        assert_eq!(timer.last_attempt_ms(), Some(15_001));

        timer.reset();
        assert!(timer.is_due(15_002, 10_000));
    }

    #[test]
    fn forced_wifi_suppresses_lte_regardless_of_window() {
        assert!(should_suppress_lte(
            ConnectivityPreference::WifiOnly,
            true,
            1_000_000,
            0
        ));
        assert!(!should_suppress_lte(
            ConnectivityPreference::WifiOnly,
            false,
            1_000_000,
            0
        ));
        assert!(!should_suppress_lte(
            ConnectivityPreference::LteOnly,
            true,
            1_000_000,
            0
        ));
    }

    #[test]
    fn modem_window_suppresses_every_preference() {
        for preference in [
            ConnectivityPreference::Auto,
            ConnectivityPreference::LteOnly,
            ConnectivityPreference::WifiOnly,
            ConnectivityPreference::Offline,
        ] {
            assert!(should_suppress_lte(preference, false, 10, 11));
        }
        assert!(!should_suppress_lte(
            ConnectivityPreference::Auto,
            false,
            11,
            11
        ));
    }

    #[test]
    fn modem_hold_is_reported_before_forced_wifi() {
        let mut hold = Deadline::expired();
        hold.extend(0, 1_000);
        assert_eq!(
            lte_block(ConnectivityPreference::WifiOnly, true, 400, hold),
            Some(LteBlock::ModemHold { remaining_ms: 600 })
        );
        assert_eq!(
            lte_block(ConnectivityPreference::WifiOnly, true, 1_000, hold),
            Some(LteBlock::ForcedWifi)
        );
    }
}
