use std::{collections::VecDeque, vec::Vec};

use embedded_io::{ErrorType, Read, ReadReady, Write};

use super::*;

/// UART that answers each terminated command with the next scripted reply.
struct ScriptedUart {
    script: VecDeque<(&'static str, &'static str)>,
    pending_tx: Vec<u8>,
    rx: VecDeque<u8>,
    reply_noise: Vec<u8>,
    stuck_ready: bool,
    sent: Vec<std::string::String>,
}

impl ScriptedUart {
    fn new(script: &[(&'static str, &'static str)]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            pending_tx: Vec::new(),
            rx: VecDeque::new(),
            reply_noise: Vec::new(),
            stuck_ready: false,
            sent: Vec::new(),
        }
    }

    fn with_stale_input(mut self, stale: &str) -> Self {
        self.rx.extend(stale.bytes());
        self
    }

    /// Raw bytes delivered ahead of the next scripted reply.
    fn with_reply_noise(mut self, noise: &[u8]) -> Self {
        self.reply_noise.extend_from_slice(noise);
        self
    }

    /// Reports data ready even when a read yields nothing.
    fn stuck_ready(mut self) -> Self {
        self.stuck_ready = true;
        self
    }
}

impl ErrorType for ScriptedUart {
    type Error = core::convert::Infallible;
}

impl Write for ScriptedUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.pending_tx.extend_from_slice(buf);
        while let Some(end) = self.pending_tx.windows(2).position(|w| w == b"\r\n") {
            let command: Vec<u8> = self.pending_tx.drain(..end + 2).collect();
            let command = std::string::String::from_utf8(command[..end].to_vec()).unwrap();
            let (expected, reply) = self
                .script
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected command {command}"));
            assert_eq!(command, expected);
            self.rx.extend(self.reply_noise.drain(..));
            self.rx.extend(reply.bytes());
            self.sent.push(command);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Read for ScriptedUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            let Some(byte) = self.rx.pop_front() else {
                break;
            };
            buf[count] = byte;
            count += 1;
        }
        Ok(count)
    }
}

impl ReadReady for ScriptedUart {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.stuck_ready || !self.rx.is_empty())
    }
}

#[derive(Default)]
struct CountingDelay {
    elapsed_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}

fn modem(script: &[(&'static str, &'static str)]) -> AtModem<ScriptedUart, CountingDelay> {
    AtModem::new(
        ScriptedUart::new(script),
        CountingDelay::default(),
        Config::default(),
    )
}

fn finish(modem: AtModem<ScriptedUart, CountingDelay>) -> (ScriptedUart, CountingDelay) {
    let (uart, delay) = modem.release();
    assert!(uart.script.is_empty(), "unused script: {:?}", uart.script);
    (uart, delay)
}

#[test]
fn probe_skips_echo_and_accepts_ok() {
    let mut modem = modem(&[("AT", "AT\r\r\nOK\r\n")]);
    assert_eq!(modem.probe(), Ok(()));
    finish(modem);
}

#[test]
fn stale_bytes_are_discarded_before_sending() {
    let uart = ScriptedUart::new(&[("AT+CSQ", "\r\n+CSQ: 20,99\r\n\r\nOK\r\n")])
        .with_stale_input("\r\n+CPIN: READY\r\nOK\r\n");
    let mut modem = AtModem::new(uart, CountingDelay::default(), Config::default());

    assert_eq!(modem.rssi_dbm(), Ok(Some(-73)));
    finish(modem);
}

#[test]
fn unknown_signal_is_none() {
    let mut modem = modem(&[("AT+CSQ", "+CSQ: 99,99\r\nOK\r\n")]);
    assert_eq!(modem.rssi_dbm(), Ok(None));
    finish(modem);
}

#[test]
fn eps_registration_short_circuits() {
    let mut modem = modem(&[("AT+CEREG?", "+CEREG: 0,5\r\nOK\r\n")]);
    assert_eq!(modem.registration(), Ok(Registration::Roaming));
    finish(modem);
}

#[test]
fn gprs_registration_is_consulted_when_eps_is_not_registered() {
    let mut modem = modem(&[
        ("AT+CEREG?", "+CEREG: 0,2\r\nOK\r\n"),
        ("AT+CGREG?", "+CGREG: 0,1\r\nOK\r\n"),
    ]);
    assert_eq!(modem.is_network_registered(), Ok(true));
    finish(modem);
}

#[test]
fn unregistered_on_both_reports_false() {
    let mut modem = modem(&[
        ("AT+CEREG?", "+CEREG: 0,0\r\nOK\r\n"),
        ("AT+CGREG?", "+CGREG: 0,3\r\nOK\r\n"),
    ]);
    assert_eq!(modem.is_network_registered(), Ok(false));
    finish(modem);
}

#[test]
fn missing_status_line_is_a_parse_error() {
    let mut modem = modem(&[("AT+CEREG?", "OK\r\n")]);
    assert_eq!(modem.registration(), Err(Error::Parse));
    finish(modem);
}

#[test]
fn activation_configures_apn_without_waiting() {
    let mut modem = modem(&[
        ("AT+CGDCONT=1,\"IP\",\"iot.1nce.net\"", "OK\r\n"),
        ("AT+CNCFG=0,1,\"iot.1nce.net\"", "OK\r\n"),
        ("AT+CNACT=0,1", "OK\r\n"),
    ]);

    assert_eq!(modem.activate_pdp("iot.1nce.net", "", ""), Ok(()));
    let (_, delay) = finish(modem);
    assert_eq!(delay.elapsed_ns, 0);
}

#[test]
fn pdp_state_follows_configured_context() {
    let mut modem = modem(&[
        ("AT+CNACT?", "+CNACT: 0,0,\"0.0.0.0\"\r\n+CNACT: 1,1,\"10.0.0.3\"\r\nOK\r\n"),
        ("AT+CNACT?", "+CNACT: 0,1,\"10.64.12.7\"\r\n+CNACT: 1,0,\"0.0.0.0\"\r\nOK\r\n"),
    ]);

    assert_eq!(modem.is_pdp_active(), Ok(false));
    assert_eq!(modem.is_pdp_active(), Ok(true));
    finish(modem);
}

#[test]
fn attach_with_credentials_uses_chap_or_pap() {
    let mut modem = modem(&[
        ("AT+CGDCONT=1,\"IP\",\"hologram\"", "OK\r\n"),
        ("AT+CNCFG=0,1,\"hologram\",\"hive\",\"s3cret\",3", "OK\r\n"),
        ("AT+CNACT=0,1", "OK\r\n"),
    ]);

    assert_eq!(modem.activate_pdp("hologram", "hive", "s3cret"), Ok(()));
    finish(modem);
}

#[test]
fn cme_error_stops_attach() {
    let mut modem = modem(&[("AT+CGDCONT=1,\"IP\",\"iot\"", "+CME ERROR: 30\r\n")]);
    assert_eq!(modem.activate_pdp("iot", "", ""), Err(Error::CmeError(30)));
    finish(modem);
}

#[test]
fn detach_reports_plain_error() {
    let mut modem = modem(&[("AT+CNACT=0,0", "ERROR\r\n")]);
    assert_eq!(modem.gprs_disconnect(), Err(Error::CommandFailed));
    finish(modem);
}

#[test]
fn silent_modem_times_out() {
    let mut modem = modem(&[("AT", "")]);
    assert_eq!(modem.probe(), Err(Error::Timeout));
    let (_, delay) = finish(modem);
    assert_eq!(delay.elapsed_ns, 2_000 * 1_000_000);
}

#[test]
fn undecodable_line_is_skipped() {
    let uart = ScriptedUart::new(&[("AT+CSQ", "+CSQ: 17,99\r\nOK\r\n")])
        .with_reply_noise(&[0xFF, 0xFE, 0x00, b'\r', b'\n']);
    let mut modem = AtModem::new(uart, CountingDelay::default(), Config::default());

    assert_eq!(modem.signal_quality(), Ok(17));
    finish(modem);
}

#[test]
fn empty_reads_count_towards_the_timeout() {
    let uart = ScriptedUart::new(&[("AT", "")]).stuck_ready();
    let mut modem = AtModem::new(uart, CountingDelay::default(), Config::default());

    assert_eq!(modem.probe(), Err(Error::Timeout));
    let (_, delay) = finish(modem);
    assert_eq!(delay.elapsed_ns, 2_000 * 1_000_000);
}

#[test]
fn overlong_apn_overflows_command_buffer() {
    let apn = "a".repeat(200);
    let mut modem = modem(&[]);
    assert_eq!(modem.activate_pdp(&apn, "", ""), Err(Error::Overflow));
    finish(modem);
}

#[test]
fn overlong_response_line_overflows() {
    let reply: &'static str = Box::leak(format!("+CSQ: {}\r\nOK\r\n", "9".repeat(200)).into_boxed_str());
    let mut modem = modem(&[("AT+CSQ", reply)]);
    assert_eq!(modem.signal_quality(), Err(Error::Overflow));
}
