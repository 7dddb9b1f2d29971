#![cfg_attr(not(test), no_std)]

//! Blocking AT command driver for SIM7080-class LTE-M/NB-IoT modems.
//!
//! Covers the subset the hive monitor needs: liveness probe, network
//! registration, PDP context attach/detach and signal quality.

pub mod protocol;

#[cfg(test)]
mod tests;

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use heapless::{String, Vec};
use log::{debug, warn};

use protocol::{COMMAND_MAX, FinalResult, LINE_MAX, Registration};

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Upper bound for a plain command to reach its final result.
    pub command_timeout_ms: u32,
    /// PDP context index used for the data session.
    pub pdp_index: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_ms: 2_000,
            pdp_index: 0,
        }
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<E> {
    /// UART transfer failed.
    Io(E),
    /// No final result within the allowed time.
    Timeout,
    /// Modem answered `+CME ERROR: <code>`.
    CmeError(u16),
    /// Modem answered `ERROR`.
    CommandFailed,
    /// Response line was not valid or not understood.
    Parse,
    /// Command or response line exceeded the driver buffers.
    Overflow,
}

pub type DriverResult<T, E> = Result<T, Error<E>>;

/// SIM7080 driver over a byte stream and a delay source.
#[derive(Debug)]
pub struct AtModem<U, D> {
    uart: U,
    delay: D,
    config: Config,
}

impl<U, D> AtModem<U, D>
where
    U: Read + Write + ReadReady,
    D: DelayNs,
{
    /// Creates a new driver instance. Sends nothing.
    pub fn new(uart: U, delay: D, config: Config) -> Self {
        Self {
            uart,
            delay,
            config,
        }
    }

    /// Releases the owned UART and delay.
    pub fn release(self) -> (U, D) {
        (self.uart, self.delay)
    }

    /// Sends bare `AT` and expects `OK`.
    pub fn probe(&mut self) -> DriverResult<(), U::Error> {
        self.command("AT", self.config.command_timeout_ms, |_| {})
    }

    /// EPS registration first, then GPRS; the first registered answer wins.
    pub fn registration(&mut self) -> DriverResult<Registration, U::Error> {
        let eps = self.query_registration("AT+CEREG?")?;
        if eps.is_registered() {
            return Ok(eps);
        }
        self.query_registration("AT+CGREG?")
    }

    pub fn is_network_registered(&mut self) -> DriverResult<bool, U::Error> {
        Ok(self.registration()?.is_registered())
    }

    /// Configures the APN and requests PDP context activation. Activation
    /// completes asynchronously; poll [`AtModem::is_pdp_active`].
    pub fn activate_pdp(
        &mut self,
        apn: &str,
        user: &str,
        password: &str,
    ) -> DriverResult<(), U::Error> {
        let timeout_ms = self.config.command_timeout_ms;
        let index = self.config.pdp_index;

        let mut cmd: String<COMMAND_MAX> = String::new();
        write!(cmd, "AT+CGDCONT=1,\"IP\",\"{}\"", apn).map_err(|_| Error::Overflow)?;
        self.command(&cmd, timeout_ms, |_| {})?;

        cmd.clear();
        let written = if user.is_empty() {
            write!(cmd, "AT+CNCFG={},1,\"{}\"", index, apn)
        } else {
            // Auth 3: PAP or CHAP.
            write!(
                cmd,
                "AT+CNCFG={},1,\"{}\",\"{}\",\"{}\",3",
                index, apn, user, password
            )
        };
        written.map_err(|_| Error::Overflow)?;
        self.command(&cmd, timeout_ms, |_| {})?;

        cmd.clear();
        write!(cmd, "AT+CNACT={},1", index).map_err(|_| Error::Overflow)?;
        self.command(&cmd, timeout_ms, |_| {})?;
        debug!("lte: PDP context {} activation requested", index);
        Ok(())
    }

    /// Deactivates the PDP context.
    pub fn gprs_disconnect(&mut self) -> DriverResult<(), U::Error> {
        let mut cmd: String<COMMAND_MAX> = String::new();
        write!(cmd, "AT+CNACT={},0", self.config.pdp_index).map_err(|_| Error::Overflow)?;
        self.command(&cmd, self.config.command_timeout_ms, |_| {})
    }

    /// `true` when the configured PDP context reports active.
    pub fn is_pdp_active(&mut self) -> DriverResult<bool, U::Error> {
        let index = self.config.pdp_index;
        let mut active = false;
        self.command("AT+CNACT?", self.config.command_timeout_ms, |line| {
            if let Some((ctx, up)) = protocol::parse_cnact(line)
                && ctx == index
            {
                active = up;
            }
        })?;
        Ok(active)
    }

    /// Raw `AT+CSQ` rssi, 0..=31 or 99.
    pub fn signal_quality(&mut self) -> DriverResult<u8, U::Error> {
        let mut rssi = None;
        self.command("AT+CSQ", self.config.command_timeout_ms, |line| {
            if let Some(value) = protocol::parse_csq(line) {
                rssi = Some(value);
            }
        })?;
        rssi.ok_or(Error::Parse)
    }

    /// Signal strength in dBm, `None` when the modem does not know.
    pub fn rssi_dbm(&mut self) -> DriverResult<Option<i16>, U::Error> {
        Ok(protocol::csq_to_dbm(self.signal_quality()?))
    }

    fn query_registration(&mut self, cmd: &str) -> DriverResult<Registration, U::Error> {
        let mut status = None;
        self.command(cmd, self.config.command_timeout_ms, |line| {
            if let Some(parsed) = protocol::parse_registration(line) {
                status = Some(parsed);
            }
        })?;
        status.ok_or(Error::Parse)
    }

    /// Sends `cmd` and feeds every intermediate line to `on_line` until a
    /// final result code arrives. The command echo is skipped.
    pub fn command(
        &mut self,
        cmd: &str,
        timeout_ms: u32,
        mut on_line: impl FnMut(&str),
    ) -> DriverResult<(), U::Error> {
        self.discard_pending()?;

        self.uart.write_all(cmd.as_bytes()).map_err(Error::Io)?;
        self.uart.write_all(b"\r\n").map_err(Error::Io)?;
        self.uart.flush().map_err(Error::Io)?;

        let mut line: Vec<u8, LINE_MAX> = Vec::new();
        let mut waited_ms = 0u32;
        loop {
            let mut byte = [0u8; 1];
            let received = if self.uart.read_ready().map_err(Error::Io)? {
                self.uart.read(&mut byte).map_err(Error::Io)?
            } else {
                0
            };
            if received == 0 {
                if waited_ms >= timeout_ms {
                    warn!("lte: {} timed out after {}ms", cmd, waited_ms);
                    return Err(Error::Timeout);
                }
                self.delay.delay_ms(1);
                waited_ms += 1;
                continue;
            }

            match byte[0] {
                b'\r' => {}
                b'\n' => {
                    match core::str::from_utf8(&line) {
                        Ok(text) if !text.is_empty() && text != cmd => {
                            match protocol::final_result(text) {
                                Some(FinalResult::Ok) => return Ok(()),
                                Some(FinalResult::Error) => return Err(Error::CommandFailed),
                                Some(FinalResult::CmeError(code)) => {
                                    return Err(Error::CmeError(code));
                                }
                                None => on_line(text),
                            }
                        }
                        Ok(_) => {}
                        Err(_) => debug!("lte: dropped {} undecodable bytes", line.len()),
                    }
                    line.clear();
                }
                other => line.push(other).map_err(|_| Error::Overflow)?,
            }
        }
    }

    fn discard_pending(&mut self) -> DriverResult<(), U::Error> {
        let mut scratch = [0u8; 32];
        while self.uart.read_ready().map_err(Error::Io)? {
            if self.uart.read(&mut scratch).map_err(Error::Io)? == 0 {
                break;
            }
        }
        Ok(())
    }
}
