#![no_std]

//! ESP32-S3 board adapters for the hive monitor: flash-backed preferences,
//! esp-radio WiFi, the SIM7080 modem link and the runtime hooks of the
//! connectivity manager.

pub mod network;
pub mod platform;
pub mod storage;
