//! Flat binary image of a [`MemoryStore`], as kept in one flash sector.
//!
//! Layout, little endian:
//! - `u32` magic, `u8` version, `u8` entry count, `u16` payload length
//! - per entry: `u8` namespace length + bytes, `u8` key length + bytes,
//!   `u8` tag, then `i32` (tag 0), `u8` (tag 1) or `u8` length + bytes (tag 2)
//! - `u32` FNV-1a checksum over header and payload

use heapless::String;

use super::{MemoryStore, MemoryStoreError, PrefValue, PreferenceStore};

pub const TABLE_MAGIC: u32 = 0x3150_5648; // "HVP1"
pub const TABLE_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 8;
pub const CHECKSUM_LEN: usize = 4;

const TAG_I32: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_STR: u8 = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TableError {
    /// Output buffer cannot hold the encoded table.
    BufferTooSmall,
    /// Checksum mismatch or malformed entry.
    Corrupted,
    /// More entries than the target store holds.
    Full,
}

/// Serializes every entry of `store` into `out`, returning the image length.
pub fn encode<const N: usize>(store: &MemoryStore<N>, out: &mut [u8]) -> Result<usize, TableError> {
    if out.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(TableError::BufferTooSmall);
    }
    let mut writer = Writer { out, at: HEADER_LEN };
    let mut count = 0u8;

    for (namespace, key, value) in store.iter() {
        writer.short_bytes(namespace.as_bytes())?;
        writer.short_bytes(key.as_bytes())?;
        match value {
            PrefValue::I32(value) => {
                writer.bytes(&[TAG_I32])?;
                writer.bytes(&value.to_le_bytes())?;
            }
            PrefValue::Bool(value) => writer.bytes(&[TAG_BOOL, *value as u8])?,
            PrefValue::Str(value) => {
                writer.bytes(&[TAG_STR])?;
                writer.short_bytes(value.as_bytes())?;
            }
        }
        count = count.checked_add(1).ok_or(TableError::Full)?;
    }

    let payload_len = u16::try_from(writer.at - HEADER_LEN).map_err(|_| TableError::BufferTooSmall)?;
    let end = writer.at;
    let out = writer.out;
    out[0..4].copy_from_slice(&TABLE_MAGIC.to_le_bytes());
    out[4] = TABLE_VERSION;
    out[5] = count;
    out[6..8].copy_from_slice(&payload_len.to_le_bytes());

    let checksum = checksum32(&out[..end]);
    out.get_mut(end..end + CHECKSUM_LEN)
        .ok_or(TableError::BufferTooSmall)?
        .copy_from_slice(&checksum.to_le_bytes());
    Ok(end + CHECKSUM_LEN)
}

/// Rebuilds a store from an image.
///
/// Blank flash, a foreign magic or an unknown version decode as `None`.
pub fn decode<const N: usize>(bytes: &[u8]) -> Result<Option<MemoryStore<N>>, TableError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Ok(None);
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != TABLE_MAGIC || bytes[4] != TABLE_VERSION {
        return Ok(None);
    }

    let count = bytes[5];
    let payload_len = u16::from_le_bytes([bytes[6], bytes[7]]) as usize;
    let end = HEADER_LEN + payload_len;
    let stored = bytes
        .get(end..end + CHECKSUM_LEN)
        .ok_or(TableError::Corrupted)?;
    let expected = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
    if checksum32(&bytes[..end]) != expected {
        return Err(TableError::Corrupted);
    }

    let mut reader = Reader {
        bytes: &bytes[..end],
        at: HEADER_LEN,
    };
    let mut store = MemoryStore::new();
    for _ in 0..count {
        let namespace = reader.short_str()?;
        let key = reader.short_str()?;
        let value = match reader.byte()? {
            TAG_I32 => {
                let raw = reader.take(4)?;
                PrefValue::I32(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            TAG_BOOL => PrefValue::Bool(reader.byte()? != 0),
            TAG_STR => {
                let mut value = String::new();
                value
                    .push_str(reader.short_str()?)
                    .map_err(|_| TableError::Corrupted)?;
                PrefValue::Str(value)
            }
            _ => return Err(TableError::Corrupted),
        };
        store.put(namespace, key, value).map_err(|err| match err {
            MemoryStoreError::KeyTooLong => TableError::Corrupted,
            MemoryStoreError::Full => TableError::Full,
        })?;
    }
    if reader.at != end {
        return Err(TableError::Corrupted);
    }

    Ok(Some(store))
}

/// FNV-1a, 32 bit.
pub fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

struct Writer<'a> {
    out: &'a mut [u8],
    at: usize,
}

impl Writer<'_> {
    fn bytes(&mut self, data: &[u8]) -> Result<(), TableError> {
        let end = self.at + data.len();
        self.out
            .get_mut(self.at..end)
            .ok_or(TableError::BufferTooSmall)?
            .copy_from_slice(data);
        self.at = end;
        Ok(())
    }

    fn short_bytes(&mut self, data: &[u8]) -> Result<(), TableError> {
        let len = u8::try_from(data.len()).map_err(|_| TableError::BufferTooSmall)?;
        self.bytes(&[len])?;
        self.bytes(data)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], TableError> {
        let chunk = self
            .bytes
            .get(self.at..self.at + len)
            .ok_or(TableError::Corrupted)?;
        self.at += len;
        Ok(chunk)
    }

    fn byte(&mut self) -> Result<u8, TableError> {
        Ok(self.take(1)?[0])
    }

    fn short_str(&mut self) -> Result<&'a str, TableError> {
        let len = self.byte()? as usize;
        core::str::from_utf8(self.take(len)?).map_err(|_| TableError::Corrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStore<8> {
        let mut store = MemoryStore::new();
        store.put("beehive_app", "net_pref", PrefValue::I32(2)).unwrap();
        store.put("beehive_app", "net_forced", PrefValue::Bool(true)).unwrap();
        let mut ssid = String::new();
        ssid.push_str("apiary").unwrap();
        store.put("beehive", "wifi_ssid1", PrefValue::Str(ssid)).unwrap();
        store
    }

    #[test]
    fn image_restores_all_entries() {
        let mut buf = [0xFFu8; 256];
        let len = encode(&sample(), &mut buf).unwrap();

        let mut restored: MemoryStore<8> = decode(&buf[..len]).unwrap().unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(
            restored.get("beehive_app", "net_pref").unwrap(),
            Some(PrefValue::I32(2))
        );
        assert_eq!(
            restored.get("beehive_app", "net_forced").unwrap(),
            Some(PrefValue::Bool(true))
        );
        match restored.get("beehive", "wifi_ssid1").unwrap() {
            Some(PrefValue::Str(ssid)) => assert_eq!(ssid.as_str(), "apiary"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn erased_sector_decodes_as_empty() {
        let buf = [0xFFu8; 64];
        assert!(decode::<8>(&buf).unwrap().is_none());
    }

    #[test]
    fn trailing_erased_bytes_are_ignored() {
        let mut buf = [0xFFu8; 256];
        encode(&sample(), &mut buf).unwrap();
        assert_eq!(decode::<8>(&buf).unwrap().map(|store| store.len()), Some(3));
    }

    #[test]
    fn flipped_bit_is_detected() {
        let mut buf = [0xFFu8; 256];
        let len = encode(&sample(), &mut buf).unwrap();
        buf[HEADER_LEN + 3] ^= 0x01;
        assert_eq!(decode::<8>(&buf[..len]).unwrap_err(), TableError::Corrupted);
    }

    #[test]
    fn small_buffer_is_rejected() {
        let mut buf = [0u8; 24];
        assert_eq!(encode(&sample(), &mut buf), Err(TableError::BufferTooSmall));
    }

    #[test]
    fn empty_store_into_tiny_buffer_is_rejected() {
        let empty = MemoryStore::<4>::new();
        let mut buf = [0u8; 4];
        assert_eq!(encode(&empty, &mut buf), Err(TableError::BufferTooSmall));

        let mut exact = [0u8; HEADER_LEN + CHECKSUM_LEN];
        assert_eq!(encode(&empty, &mut exact), Ok(HEADER_LEN + CHECKSUM_LEN));
    }

    #[test]
    fn smaller_store_reports_full() {
        let mut buf = [0xFFu8; 256];
        let len = encode(&sample(), &mut buf).unwrap();
        assert_eq!(decode::<2>(&buf[..len]).unwrap_err(), TableError::Full);
    }
}
