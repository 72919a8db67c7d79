//! In-memory configuration region.
//!
//! Simulates the EEPROM region for unit tests and host runs that do not
//! need persistence. Fill-pattern constructors cover the states real flash
//! can be in: factory-erased (0xFF), zeroed, or arbitrary leftovers.

use super::{ConfigStorage, StorageError, REGION_SIZE};

/// In-memory EEPROM region.
///
/// # Example
///
/// ```
/// use zero2_node::storage::{ConfigStorage, MemoryEeprom, REGION_SIZE};
///
/// let mut eeprom = MemoryEeprom::filled(0xFF);
/// let mut buf = [0u8; REGION_SIZE];
/// eeprom.read_region(&mut buf).unwrap();
/// assert!(buf.iter().all(|&b| b == 0xFF));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    region: [u8; REGION_SIZE],
}

impl MemoryEeprom {
    /// Create a factory-erased region (all 0xFF).
    pub fn new() -> Self {
        Self::filled(0xFF)
    }

    /// Create a region filled with `byte`.
    pub fn filled(byte: u8) -> Self {
        Self {
            region: [byte; REGION_SIZE],
        }
    }

    /// Create a region with exact contents (for corruption tests).
    pub fn with_contents(region: [u8; REGION_SIZE]) -> Self {
        Self { region }
    }

    /// Raw region contents (for test verification).
    pub fn contents(&self) -> &[u8; REGION_SIZE] {
        &self.region
    }
}

impl Default for MemoryEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStorage for MemoryEeprom {
    fn read_region(&mut self, buf: &mut [u8; REGION_SIZE]) -> Result<(), StorageError> {
        buf.copy_from_slice(&self.region);
        Ok(())
    }

    fn write_region(&mut self, buf: &[u8; REGION_SIZE]) -> Result<(), StorageError> {
        self.region.copy_from_slice(buf);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_erased() {
        let mut eeprom = MemoryEeprom::new();
        let mut buf = [0u8; REGION_SIZE];
        eeprom.read_region(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_write_then_read() {
        let mut eeprom = MemoryEeprom::new();
        let mut data = [0u8; REGION_SIZE];
        data[0] = 0x5A;
        data[REGION_SIZE - 1] = 0xA5;

        eeprom.write_region(&data).unwrap();
        eeprom.commit().unwrap();

        let mut buf = [0u8; REGION_SIZE];
        eeprom.read_region(&mut buf).unwrap();
        assert_eq!(buf, data);
    }
}
