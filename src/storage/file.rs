//! File-backed configuration region for host (development) builds.
//!
//! Stores the 256-byte region in a file so configuration survives restarts
//! of the host binary the same way it survives reboots on the device.
//! Uses `~/.zero2-node/eeprom.bin` by default.

use super::{ConfigStorage, StorageError, REGION_SIZE};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Get the default region file path.
///
/// Returns `~/.zero2-node/eeprom.bin`.
pub fn default_region_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".zero2-node").join("eeprom.bin"))
}

/// Configuration region persisted to a file.
pub struct FileEeprom {
    path: PathBuf,
}

impl FileEeprom {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the region at the default path.
    pub fn open_default() -> io::Result<Self> {
        Ok(Self::new(default_region_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStorage for FileEeprom {
    /// Read the region file. A missing or short file reads as erased
    /// (0xFF) for the bytes it does not cover, matching factory-fresh
    /// flash on the device.
    fn read_region(&mut self, buf: &mut [u8; REGION_SIZE]) -> Result<(), StorageError> {
        buf.fill(0xFF);
        match fs::read(&self.path) {
            Ok(bytes) => {
                let len = bytes.len().min(REGION_SIZE);
                buf[..len].copy_from_slice(&bytes[..len]);
                debug!("read {} region bytes from {:?}", len, self.path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no region file at {:?}, reading as erased", self.path);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_region(&mut self, buf: &[u8; REGION_SIZE]) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, buf)?;
        info!("region saved to {:?}", self.path);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        // write_region is already durable; nothing buffered to flush.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Counter to ensure unique test files even in parallel execution
    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_region_path() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let pid = std::process::id();
        env::temp_dir().join(format!("zero2-region-{}-{}.bin", pid, id))
    }

    #[test]
    fn test_missing_file_reads_as_erased() {
        let mut eeprom = FileEeprom::new(unique_region_path());
        let mut buf = [0u8; REGION_SIZE];
        eeprom.read_region(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_region_round_trip() {
        let path = unique_region_path();
        let mut eeprom = FileEeprom::new(&path);

        let mut data = [0u8; REGION_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = i as u8;
        }
        eeprom.write_region(&data).unwrap();
        eeprom.commit().unwrap();

        let mut reopened = FileEeprom::new(&path);
        let mut buf = [0u8; REGION_SIZE];
        reopened.read_region(&mut buf).unwrap();
        assert_eq!(buf, data);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_short_file_padded_with_erased_bytes() {
        let path = unique_region_path();
        fs::write(&path, [0x11u8; 10]).unwrap();

        let mut eeprom = FileEeprom::new(&path);
        let mut buf = [0u8; REGION_SIZE];
        eeprom.read_region(&mut buf).unwrap();
        assert!(buf[..10].iter().all(|&b| b == 0x11));
        assert!(buf[10..].iter().all(|&b| b == 0xFF));

        let _ = fs::remove_file(&path);
    }
}
