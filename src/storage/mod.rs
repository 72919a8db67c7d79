//! Non-volatile storage backends for the configuration region.
//!
//! The config store operates on one fixed 256-byte region. This module
//! abstracts where that region lives:
//!
//! - [`MemoryEeprom`] - in-memory region for tests and throwaway runs
//! - [`FileEeprom`] - file-backed region for host (development) builds
//! - [`NvsEeprom`] - ESP32 NVS-backed region (`esp32` feature)
//!
//! Backends expose whole-region reads and writes; field offsets are the
//! config store's concern, not the backend's.

use std::fmt;

mod memory;
pub use memory::MemoryEeprom;

#[cfg(not(feature = "esp32"))]
mod file;
#[cfg(not(feature = "esp32"))]
pub use file::{default_region_path, FileEeprom};

#[cfg(feature = "esp32")]
mod nvs;
#[cfg(feature = "esp32")]
pub use nvs::NvsEeprom;

/// Size of the reserved configuration region in bytes.
///
/// Only the first ~132 bytes are structurally used; the rest is headroom
/// so the layout can grow without moving the region.
pub const REGION_SIZE: usize = 256;

/// A non-volatile home for the 256-byte configuration region.
///
/// `write_region` makes the new contents durable no later than the
/// following `commit`. Reads of a region that was never written must
/// yield erased bytes (0xFF), not an error.
pub trait ConfigStorage {
    /// Read the whole region into `buf`.
    fn read_region(&mut self, buf: &mut [u8; REGION_SIZE]) -> Result<(), StorageError>;

    /// Replace the whole region.
    fn write_region(&mut self, buf: &[u8; REGION_SIZE]) -> Result<(), StorageError>;

    /// Flush any buffered write to persistent media.
    fn commit(&mut self) -> Result<(), StorageError>;
}

/// Errors from a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// Generic I/O error (file backend).
    Io(std::io::Error),
    /// ESP-IDF error (NVS backend).
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "storage I/O error: {}", e),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "NVS error: {:?}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "esp32")]
            Self::Esp(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for StorageError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}
