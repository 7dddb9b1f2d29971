#![cfg_attr(not(test), no_std)]

//! Hardware-independent core of the hive monitor firmware.
//!
//! The connectivity manager in [`network`] decides which radio (WiFi or the
//! cellular modem) should carry traffic. Everything it touches is reached
//! through the seams in [`prefs`], [`radio`] and [`platform`] so the state
//! machine runs unchanged on the board and in host tests.

pub mod network;
pub mod platform;
pub mod prefs;
pub mod radio;
