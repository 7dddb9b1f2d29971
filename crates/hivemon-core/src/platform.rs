//! Runtime hooks the connectivity manager needs from the surrounding firmware.

/// Clock, delay and cooperative yield points supplied by the board loop.
pub trait NetworkPlatform {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Blocks the caller for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Gives foreground services (web mirror, provisioning endpoints) a chance
    /// to run. Called from every wait loop that can block for longer than a
    /// few tens of milliseconds.
    fn service_clients(&mut self);

    /// Stops the local key-serving HTTP routes. LTE-only operation has no
    /// local web UI.
    fn stop_key_server(&mut self);
}
