pub mod flash_prefs;

pub use flash_prefs::{FlashPreferenceStore, FlashPrefsError};
