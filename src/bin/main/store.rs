use hivemon_core::prefs::{MemoryStore, PrefValue, PreferenceStore};
use hivemon_hal_esp32s3::storage::{FlashPreferenceStore, FlashPrefsError};
use log::info;

const VOLATILE_SLOTS: usize = 16;

/// Flash when a preferences partition exists, RAM otherwise.
pub(super) enum BoardStore {
    Flash(FlashPreferenceStore),
    Volatile(MemoryStore<VOLATILE_SLOTS>),
}

impl BoardStore {
    pub(super) fn open() -> Self {
        match FlashPreferenceStore::new() {
            Ok(store) => Self::Flash(store),
            Err(err) => {
                info!(
                    "prefs: flash storage unavailable ({:?}); preferences will be volatile",
                    err
                );
                Self::Volatile(MemoryStore::new())
            }
        }
    }
}

impl PreferenceStore for BoardStore {
    type Error = FlashPrefsError;

    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<PrefValue>, Self::Error> {
        match self {
            Self::Flash(store) => store.get(namespace, key),
            Self::Volatile(store) => Ok(store.get(namespace, key)?),
        }
    }

    fn put(&mut self, namespace: &str, key: &str, value: PrefValue) -> Result<(), Self::Error> {
        match self {
            Self::Flash(store) => store.put(namespace, key, value),
            Self::Volatile(store) => Ok(store.put(namespace, key, value)?),
        }
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<bool, Self::Error> {
        match self {
            Self::Flash(store) => store.remove(namespace, key),
            Self::Volatile(store) => Ok(store.remove(namespace, key)?),
        }
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        match self {
            Self::Flash(store) => store.commit(),
            Self::Volatile(store) => Ok(store.commit()?),
        }
    }
}
