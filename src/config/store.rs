//! Fixed-layout persistence for [`DeviceConfig`].
//!
//! The configuration lives in a 256-byte non-volatile region with fixed,
//! contiguous field offsets. Devices already in the field depend on this
//! layout, so the offsets and sizes must never change silently (there is
//! no schema version byte):
//!
//! | Offset | Field          | Size |
//! |--------|----------------|------|
//! | 0      | network name   | 32   |
//! | 32     | network secret | 32   |
//! | 64     | broker host    | 32   |
//! | 96     | broker port    | 4    |
//! | 100    | device name    | 32   |
//!
//! Bytes past the device name are headroom and are preserved by [`save`].
//!
//! There is no corruption detection: [`load`] forces the last byte of each
//! text block to NUL and accepts whatever is left, so never-written or
//! half-written storage degrades to (at worst) empty strings and an
//! arbitrary port value rather than an error.

use super::DeviceConfig;
use crate::storage::{ConfigStorage, StorageError, REGION_SIZE};
use log::debug;

/// First byte of the configuration region.
pub const START_ADDR: usize = 0;

/// Bytes reserved for each text field (31 significant + terminator).
pub const BLOCK_SIZE: usize = 32;

const PORT_SIZE: usize = core::mem::size_of::<i32>();

/// Offset of the network name block.
pub const NETWORK_NAME_ADDR: usize = START_ADDR;
/// Offset of the network secret block.
pub const NETWORK_SECRET_ADDR: usize = START_ADDR + BLOCK_SIZE;
/// Offset of the broker host block.
pub const BROKER_HOST_ADDR: usize = START_ADDR + 2 * BLOCK_SIZE;
/// Offset of the broker port (little-endian `i32`).
pub const BROKER_PORT_ADDR: usize = START_ADDR + 3 * BLOCK_SIZE;
/// Offset of the device name block, immediately after the port.
pub const DEVICE_NAME_ADDR: usize = BROKER_PORT_ADDR + PORT_SIZE;

/// Read the configuration region and decode it.
///
/// Uninitialized storage (all-0x00 or all-0xFF) decodes to empty strings;
/// the port field is taken verbatim from the raw bytes with no validation.
pub fn load<S: ConfigStorage>(storage: &mut S) -> Result<DeviceConfig, StorageError> {
    let mut region = [0u8; REGION_SIZE];
    storage.read_region(&mut region)?;

    let mut config = DeviceConfig::default();
    config.set_network_name(&decode_text(&region, NETWORK_NAME_ADDR));
    config.set_network_secret(&decode_text(&region, NETWORK_SECRET_ADDR));
    config.set_broker_host(&decode_text(&region, BROKER_HOST_ADDR));
    config.set_broker_port(decode_port(&region));
    config.set_device_name(&decode_text(&region, DEVICE_NAME_ADDR));

    debug!(
        "loaded config: ssid={:?} host={:?} port={} name={:?}",
        config.network_name(),
        config.broker_host(),
        config.broker_port(),
        config.device_name()
    );
    Ok(config)
}

/// Encode the configuration into the region and commit it.
///
/// This is a read-modify-write: headroom bytes beyond the device name keep
/// whatever value they already had. The broker host is cut down to the same
/// 31-character block as every other text field here, even though the
/// in-memory field holds up to 40 characters; hosts longer than 31
/// characters lose their tail on the next reboot. Kept for layout
/// compatibility with deployed devices.
///
/// The write is synchronous with no partial-failure recovery; a power loss
/// mid-commit leaves the region in whatever state the backend got to, and
/// the next [`load`] takes the bytes as they are.
pub fn save<S: ConfigStorage>(storage: &mut S, config: &DeviceConfig) -> Result<(), StorageError> {
    let mut region = [0u8; REGION_SIZE];
    storage.read_region(&mut region)?;

    encode_text(&mut region, NETWORK_NAME_ADDR, config.network_name());
    encode_text(&mut region, NETWORK_SECRET_ADDR, config.network_secret());
    encode_text(&mut region, BROKER_HOST_ADDR, config.broker_host());
    region[BROKER_PORT_ADDR..BROKER_PORT_ADDR + PORT_SIZE]
        .copy_from_slice(&config.broker_port().to_le_bytes());
    encode_text(&mut region, DEVICE_NAME_ADDR, config.device_name());

    storage.write_region(&region)?;
    storage.commit()
}

/// Decode one 32-byte text block, forcing termination on its last byte.
fn decode_text(region: &[u8; REGION_SIZE], offset: usize) -> String {
    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(&region[offset..offset + BLOCK_SIZE]);
    // Last byte is always treated as the terminator, so a corrupted block
    // can never be read past its 32 bytes.
    block[BLOCK_SIZE - 1] = 0;
    let len = block.iter().position(|&b| b == 0).unwrap_or(BLOCK_SIZE - 1);
    String::from_utf8_lossy(&block[..len]).into_owned()
}

/// Encode one text field as a NUL-padded 32-byte block.
fn encode_text(region: &mut [u8; REGION_SIZE], offset: usize, value: &str) {
    let block = &mut region[offset..offset + BLOCK_SIZE];
    block.fill(0);
    let mut end = value.len().min(BLOCK_SIZE - 1);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    block[..end].copy_from_slice(&value.as_bytes()[..end]);
}

fn decode_port(region: &[u8; REGION_SIZE]) -> i32 {
    let mut bytes = [0u8; PORT_SIZE];
    bytes.copy_from_slice(&region[BROKER_PORT_ADDR..BROKER_PORT_ADDR + PORT_SIZE]);
    i32::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TEXT_LEN;
    use crate::storage::MemoryEeprom;

    fn sample_config() -> DeviceConfig {
        let mut config = DeviceConfig::default();
        config.set_network_name("HomeNet");
        config.set_network_secret("correct horse battery");
        config.set_broker_host("broker.local");
        config.set_broker_port(1883);
        config.set_device_name("zero2-livingroom");
        config
    }

    #[test]
    fn test_layout_is_pinned() {
        // Deployed devices depend on these exact offsets.
        assert_eq!(NETWORK_NAME_ADDR, 0);
        assert_eq!(NETWORK_SECRET_ADDR, 32);
        assert_eq!(BROKER_HOST_ADDR, 64);
        assert_eq!(BROKER_PORT_ADDR, 96);
        assert_eq!(DEVICE_NAME_ADDR, 100);
        assert_eq!(REGION_SIZE, 256);
    }

    #[test]
    fn test_round_trip() {
        let mut eeprom = MemoryEeprom::new();
        let config = sample_config();

        save(&mut eeprom, &config).unwrap();
        let loaded = load(&mut eeprom).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_round_trip_at_capacity() {
        let mut eeprom = MemoryEeprom::new();
        let mut config = DeviceConfig::default();
        config.set_network_name(&"n".repeat(MAX_TEXT_LEN));
        config.set_network_secret(&"s".repeat(MAX_TEXT_LEN));
        config.set_broker_host(&"h".repeat(MAX_TEXT_LEN));
        config.set_device_name(&"d".repeat(MAX_TEXT_LEN));
        config.set_broker_port(i32::MIN);

        save(&mut eeprom, &config).unwrap();
        let loaded = load(&mut eeprom).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_broker_host_truncated_to_31_on_save() {
        let mut eeprom = MemoryEeprom::new();
        let mut config = DeviceConfig::default();
        let host = "h".repeat(35);
        config.set_broker_host(&host);
        assert_eq!(config.broker_host().len(), 35, "fits in memory");

        save(&mut eeprom, &config).unwrap();
        let loaded = load(&mut eeprom).unwrap();
        assert_eq!(loaded.broker_host().len(), 31);
        assert_eq!(loaded.broker_host(), &host[..31]);
    }

    #[test]
    fn test_load_all_zero_region() {
        let mut eeprom = MemoryEeprom::filled(0x00);
        let config = load(&mut eeprom).unwrap();
        assert_eq!(config, DeviceConfig::default());
    }

    #[test]
    fn test_load_all_ff_region() {
        // Factory-fresh flash reads as 0xFF everywhere. Every text field
        // must still come back as a terminated string of at most 31 chars.
        let mut eeprom = MemoryEeprom::filled(0xFF);
        let config = load(&mut eeprom).unwrap();
        for field in [
            config.network_name(),
            config.network_secret(),
            config.broker_host(),
            config.device_name(),
        ] {
            assert!(field.chars().count() <= MAX_TEXT_LEN);
            assert!(!field.contains('\0'));
        }
        assert_eq!(config.broker_port(), -1); // 0xFFFFFFFF as i32
    }

    #[test]
    fn test_load_garbage_region_terminates() {
        // No NUL anywhere: the forced terminator on byte 31 of each block
        // caps every field.
        let mut pattern = [0u8; REGION_SIZE];
        for (i, b) in pattern.iter_mut().enumerate() {
            *b = (i % 251) as u8 + 1;
        }
        let mut eeprom = MemoryEeprom::with_contents(pattern);
        let config = load(&mut eeprom).unwrap();
        for field in [
            config.network_name(),
            config.network_secret(),
            config.broker_host(),
            config.device_name(),
        ] {
            assert!(field.chars().count() <= MAX_TEXT_LEN);
        }
    }

    #[test]
    fn test_save_preserves_headroom() {
        let mut eeprom = MemoryEeprom::filled(0xA5);
        save(&mut eeprom, &sample_config()).unwrap();

        let contents = eeprom.contents();
        // Everything past the device name block is untouched headroom.
        assert!(contents[DEVICE_NAME_ADDR + BLOCK_SIZE..]
            .iter()
            .all(|&b| b == 0xA5));
    }

    #[test]
    fn test_port_stored_little_endian() {
        let mut eeprom = MemoryEeprom::new();
        let mut config = DeviceConfig::default();
        config.set_broker_port(0x0102_0304);
        save(&mut eeprom, &config).unwrap();

        let contents = eeprom.contents();
        assert_eq!(
            &contents[BROKER_PORT_ADDR..BROKER_PORT_ADDR + 4],
            &[0x04, 0x03, 0x02, 0x01]
        );
    }

    #[test]
    fn test_saved_text_blocks_are_nul_padded() {
        let mut eeprom = MemoryEeprom::filled(0xFF);
        save(&mut eeprom, &sample_config()).unwrap();

        let contents = eeprom.contents();
        let name = b"HomeNet";
        assert_eq!(&contents[..name.len()], &name[..]);
        assert!(contents[name.len()..BLOCK_SIZE].iter().all(|&b| b == 0));
    }
}
