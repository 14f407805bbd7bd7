//! Serialized data file header (§6.1) and the one-time, double-checked load
//! path (§5) shared by [`crate::properties::PropertiesStore`] and
//! [`crate::normalize::NormalizationStore`].
//!
//! Grounded on `icu4c/source/common/uchar.c`'s `loadPropsData`: a flag is
//! read without the lock, and only a thread that observes it unset takes the
//! lock, re-checks, loads, publishes the pointers, and sets the flag last.
//! Here that shape is the idiomatic Rust equivalent: a single [`OnceLock`]
//! around the published value, which gives the same "read without lock, take
//! lock only to initialize, publish happens-before readers see it" behavior
//! without hand-rolling the release/acquire barrier.

use std::sync::OnceLock;

use crate::error::{Error, Result};

/// `dataFormat` tag (§6.1): identifies which of the two data images this is.
pub const FORMAT_PROPERTIES: [u8; 4] = *b"UPro";
pub const FORMAT_NORMALIZATION: [u8; 4] = *b"Norm";

const FILE_MAGIC: u16 = 0xDA27;

/// Where the serialized image for a store comes from (§6.3): either a path
/// to read once at load time, or an in-memory byte slice the caller already
/// owns. No environment-variable lookups happen anywhere in this core.
#[derive(Debug, Clone)]
pub enum DataSource {
    Path(std::path::PathBuf),
    Bytes(&'static [u8]),
}

impl DataSource {
    fn read(&self) -> Result<Vec<u8>> {
        match self {
            DataSource::Path(path) => std::fs::read(path).map_err(|_| {
                Error::invalid_format("could not read data file at the configured path")
            }),
            DataSource::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// The fixed header every serialized image begins with (§6.1): header size,
/// magic, and a `UDataInfo`-equivalent block declaring endianness, the data
/// format tag, the format version (which folds in the trie shift constants),
/// and the Unicode data version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataHeader {
    pub data_format: [u8; 4],
    pub format_version: [u8; 4],
    pub data_version: [u8; 4],
}

impl DataHeader {
    pub const ENCODED_LEN: usize = 2 + 2 + 4 + 4 + 4;

    pub fn new(data_format: [u8; 4], format_version: [u8; 4], data_version: [u8; 4]) -> Self {
        DataHeader {
            data_format,
            format_version,
            data_version,
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(Self::ENCODED_LEN as u16).to_le_bytes());
        out.extend_from_slice(&FILE_MAGIC.to_le_bytes());
        out.extend_from_slice(&self.data_format);
        out.extend_from_slice(&self.format_version);
        out.extend_from_slice(&self.data_version);
    }

    pub fn read(bytes: &[u8], expected_format: [u8; 4]) -> Result<(Self, &[u8])> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(Error::invalid_format("data file shorter than its header"));
        }
        let header_size = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        let magic = u16::from_le_bytes([bytes[2], bytes[3]]);
        if magic != FILE_MAGIC {
            return Err(Error::invalid_format("bad data file magic"));
        }
        let mut data_format = [0u8; 4];
        data_format.copy_from_slice(&bytes[4..8]);
        if data_format != expected_format {
            return Err(Error::invalid_format("data file has the wrong dataFormat tag"));
        }
        let mut format_version = [0u8; 4];
        format_version.copy_from_slice(&bytes[8..12]);
        let mut data_version = [0u8; 4];
        data_version.copy_from_slice(&bytes[12..16]);
        if bytes.len() < header_size {
            return Err(Error::invalid_format("data file truncated before header end"));
        }
        let header = DataHeader {
            data_format,
            format_version,
            data_version,
        };
        Ok((header, &bytes[header_size..]))
    }
}

/// A one-time, read-many slot for a store built from a [`DataSource`].
/// `get_or_load` is the double-checked entry point: the fast path is a
/// single atomic load once `OnceLock` is populated; only the very first
/// caller pays the cost of reading and parsing the data file.
pub struct OnceStore<T> {
    cell: OnceLock<T>,
}

impl<T> OnceStore<T> {
    pub const fn new() -> Self {
        OnceStore { cell: OnceLock::new() }
    }

    pub fn get_or_load(&self, source: &DataSource, build: impl FnOnce(&[u8]) -> Result<T>) -> Result<&T> {
        if let Some(existing) = self.cell.get() {
            return Ok(existing);
        }
        let bytes = source.read()?;
        let built = build(&bytes)?;
        // OnceLock::set races harmlessly: if another thread won, our `built`
        // value (the loser's data) is simply dropped here rather than published.
        match self.cell.set(built) {
            Ok(()) => {
                tracing::debug!("loaded data store from {:?}", source);
                Ok(self.cell.get().expect("just set"))
            }
            Err(_) => Ok(self.cell.get().expect("a racing writer published first")),
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Path(p) => write!(f, "DataSource::Path({})", p.display()),
            DataSource::Bytes(b) => write!(f, "DataSource::Bytes(len={})", b.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = DataHeader::new(FORMAT_PROPERTIES, [0, 6, 6, 0], [15, 0, 0, 0]);
        let mut bytes = Vec::new();
        header.write(&mut bytes);
        bytes.extend_from_slice(&[1, 2, 3]);
        let (read_back, rest) = DataHeader::read(&bytes, FORMAT_PROPERTIES).unwrap();
        assert_eq!(read_back, header);
        assert_eq!(rest, &[1, 2, 3]);
    }

    #[test]
    fn wrong_format_tag_is_rejected() {
        let header = DataHeader::new(FORMAT_PROPERTIES, [0, 6, 6, 0], [15, 0, 0, 0]);
        let mut bytes = Vec::new();
        header.write(&mut bytes);
        assert!(DataHeader::read(&bytes, FORMAT_NORMALIZATION).is_err());
    }

    #[test]
    fn once_store_loads_exactly_once_in_content() {
        let store: OnceStore<u32> = OnceStore::new();
        let source = DataSource::Bytes(&[1, 2, 3, 4]);
        let a = *store.get_or_load(&source, |b| Ok(b.len() as u32)).unwrap();
        let b = *store.get_or_load(&source, |_| Ok(999)).unwrap();
        assert_eq!(a, 4);
        assert_eq!(b, 4);
    }
}
