//! Line-level helpers for SIM7080-class AT responses.

/// Longest response line the driver buffers.
pub const LINE_MAX: usize = 128;
/// Longest command the driver formats, terminator excluded.
pub const COMMAND_MAX: usize = 160;
/// `AT+CSQ` value meaning "not known or not detectable".
pub const CSQ_UNKNOWN: u8 = 99;

/// Terminal result of one command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FinalResult {
    Ok,
    Error,
    CmeError(u16),
}

/// `<stat>` field of `+CEREG` / `+CGREG`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Registration {
    NotRegistered,
    Home,
    Searching,
    Denied,
    Unknown,
    Roaming,
}

impl Registration {
    pub const fn from_stat(stat: u8) -> Option<Self> {
        match stat {
            0 => Some(Self::NotRegistered),
            1 => Some(Self::Home),
            2 => Some(Self::Searching),
            3 => Some(Self::Denied),
            4 => Some(Self::Unknown),
            5 => Some(Self::Roaming),
            _ => None,
        }
    }

    pub const fn is_registered(self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

/// Classifies a line as a final result code, if it is one.
pub fn final_result(line: &str) -> Option<FinalResult> {
    match line {
        "OK" => Some(FinalResult::Ok),
        "ERROR" => Some(FinalResult::Error),
        _ => {
            let code = payload(line, "+CME ERROR:")?;
            Some(FinalResult::CmeError(code.parse().unwrap_or(0)))
        }
    }
}

/// Parses `+CEREG: <n>,<stat>[,...]` or `+CGREG: <n>,<stat>[,...]`.
pub fn parse_registration(line: &str) -> Option<Registration> {
    let fields = payload(line, "+CEREG:").or_else(|| payload(line, "+CGREG:"))?;
    let stat = fields.split(',').nth(1)?.trim().parse().ok()?;
    Registration::from_stat(stat)
}

/// Parses the `<rssi>` field of `+CSQ: <rssi>,<ber>`.
pub fn parse_csq(line: &str) -> Option<u8> {
    payload(line, "+CSQ:")?.split(',').next()?.trim().parse().ok()
}

/// `AT+CSQ` rssi to dBm: 0 is -113 dBm or less, 31 is -51 dBm or more.
pub const fn csq_to_dbm(rssi: u8) -> Option<i16> {
    if rssi > 31 {
        return None;
    }
    Some(-113 + 2 * rssi as i16)
}

/// Parses `+CNACT: <pdpidx>,<statusx>[,"<address>"]` into index and state.
pub fn parse_cnact(line: &str) -> Option<(u8, bool)> {
    let mut fields = payload(line, "+CNACT:")?.split(',');
    let index = fields.next()?.trim().parse().ok()?;
    let status: u8 = fields.next()?.trim().parse().ok()?;
    Some((index, status == 1))
}

fn payload<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).map(str::trim)
}
