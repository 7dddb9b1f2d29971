use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use hivemon_core::prefs::{
    MemoryStore, MemoryStoreError, PrefValue, PreferenceStore,
    table::{self, TableError},
};
use log::{info, warn};

const FLASH_SECTOR_SIZE: u32 = 4096;
const DEFAULT_FLASH_CAPACITY_BYTES: usize = 16 * 1024 * 1024;

/// Entry slots kept in RAM and on flash.
pub const PREF_SLOTS: usize = 16;
/// Worst case: 16 entries of 15-byte namespace, 15-byte key and 64-byte string.
const TABLE_IMAGE_BYTES: usize = 1600;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlashPrefsError {
    PartitionTable,
    PrefsPartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    Corrupted,
    Unsupported,
    KeyTooLong,
    Full,
}

impl From<MemoryStoreError> for FlashPrefsError {
    fn from(err: MemoryStoreError) -> Self {
        match err {
            MemoryStoreError::KeyTooLong => Self::KeyTooLong,
            MemoryStoreError::Full => Self::Full,
        }
    }
}

impl From<TableError> for FlashPrefsError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::BufferTooSmall | TableError::Full => Self::Full,
            TableError::Corrupted => Self::Corrupted,
        }
    }
}

#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn new() -> Result<Self, FlashPrefsError> {
        let rc = unsafe { esp_rom_spiflash_unlock() };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashPrefsError::FlashOpFailed(rc));
        }
        Ok(Self)
    }

    fn erase_sector(&mut self, sector_addr: u32) -> Result<(), FlashPrefsError> {
        if !sector_addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FlashPrefsError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_erase_sector(sector_addr / FLASH_SECTOR_SIZE) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashPrefsError::FlashOpFailed(rc));
        }
        Ok(())
    }

    fn read_word(&mut self, addr: u32) -> Result<u32, FlashPrefsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashPrefsError::Unsupported);
        }

        let mut word = 0u32;
        let rc = unsafe { esp_rom_spiflash_read(addr, &mut word as *mut u32 as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashPrefsError::FlashOpFailed(rc));
        }
        Ok(word)
    }

    fn write_word(&mut self, addr: u32, word: u32) -> Result<(), FlashPrefsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashPrefsError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_write(addr, &word as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashPrefsError::FlashOpFailed(rc));
        }
        Ok(())
    }

    /// Word-aligned reads only; the image always starts on a sector.
    fn read_aligned(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FlashPrefsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashPrefsError::Unsupported);
        }
        for (i, chunk) in out.chunks_mut(4).enumerate() {
            let word = self.read_word(addr + (i as u32) * 4)?.to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }

    /// Programs `data` into erased flash, padding the last word with 0xFF.
    fn write_erased(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashPrefsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashPrefsError::Unsupported);
        }
        for (i, chunk) in data.chunks(4).enumerate() {
            let mut word = [0xFFu8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.write_word(addr + (i as u32) * 4, u32::from_le_bytes(word))?;
        }
        Ok(())
    }
}

impl ReadStorage for RawFlash {
    type Error = FlashPrefsError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_aligned(offset, bytes)
    }

    fn capacity(&self) -> usize {
        DEFAULT_FLASH_CAPACITY_BYTES
    }
}

impl Storage for RawFlash {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FlashPrefsError::Unsupported)
    }
}

/// Preference store persisted in the last sector of the first writable data
/// partition.
///
/// The whole table lives in RAM; `commit` rewrites the sector only when
/// something changed since the last commit.
#[derive(Debug)]
pub struct FlashPreferenceStore {
    flash: RawFlash,
    sector_addr: u32,
    table: MemoryStore<PREF_SLOTS>,
    dirty: bool,
}

impl FlashPreferenceStore {
    pub fn new() -> Result<Self, FlashPrefsError> {
        let mut flash = RawFlash::new()?;
        let sector_addr = locate_prefs_sector(&mut flash)?;

        let mut image = [0u8; TABLE_IMAGE_BYTES];
        flash.read_aligned(sector_addr, &mut image)?;
        let table = match table::decode::<PREF_SLOTS>(&image) {
            Ok(Some(table)) => {
                info!("prefs: loaded {} entries from flash", table.len());
                table
            }
            Ok(None) => {
                info!("prefs: no stored table, starting empty");
                MemoryStore::new()
            }
            Err(err) => {
                warn!("prefs: stored table unreadable ({:?}), starting empty", err);
                MemoryStore::new()
            }
        };

        Ok(Self {
            flash,
            sector_addr,
            table,
            dirty: false,
        })
    }

    fn write_table(&mut self) -> Result<(), FlashPrefsError> {
        let mut image = [0xFFu8; TABLE_IMAGE_BYTES];
        let len = table::encode(&self.table, &mut image)?;

        self.flash.erase_sector(self.sector_addr)?;
        self.flash.write_erased(self.sector_addr, &image[..len])
    }
}

impl PreferenceStore for FlashPreferenceStore {
    type Error = FlashPrefsError;

    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<PrefValue>, Self::Error> {
        Ok(self.table.get(namespace, key)?)
    }

    fn put(&mut self, namespace: &str, key: &str, value: PrefValue) -> Result<(), Self::Error> {
        if self.table.get(namespace, key)?.as_ref() == Some(&value) {
            return Ok(());
        }
        self.table.put(namespace, key, value)?;
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<bool, Self::Error> {
        let removed = self.table.remove(namespace, key)?;
        self.dirty |= removed;
        Ok(removed)
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        if !self.dirty {
            return Ok(());
        }
        self.write_table()?;
        self.dirty = false;
        Ok(())
    }
}

fn locate_prefs_sector(flash: &mut RawFlash) -> Result<u32, FlashPrefsError> {
    let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
    let table = read_partition_table(flash, &mut table_buf)
        .map_err(|_| FlashPrefsError::PartitionTable)?;

    let mut data_undefined: Option<(u32, u32)> = None;
    let mut fallback_nvs: Option<(u32, u32)> = None;

    for entry in table.iter() {
        if entry.is_read_only() || entry.len() < FLASH_SECTOR_SIZE {
            continue;
        }

        match entry.partition_type() {
            PartitionType::Data(DataPartitionSubType::Undefined) => {
                data_undefined = Some((entry.offset(), entry.len()));
                break;
            }
            PartitionType::Data(DataPartitionSubType::Nvs) if fallback_nvs.is_none() => {
                fallback_nvs = Some((entry.offset(), entry.len()));
            }
            _ => {}
        }
    }

    let (offset, len) = data_undefined
        .or(fallback_nvs)
        .ok_or(FlashPrefsError::PrefsPartitionMissing)?;
    if len < FLASH_SECTOR_SIZE {
        return Err(FlashPrefsError::PartitionTooSmall);
    }

    Ok(offset + len - FLASH_SECTOR_SIZE)
}
