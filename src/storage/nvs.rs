//! NVS-backed configuration region for ESP32 builds.
//!
//! The whole 256-byte region is kept as one blob in Non-Volatile Storage,
//! so the fixed field offsets inside the region are preserved exactly as
//! the config store lays them out.

use super::{ConfigStorage, StorageError, REGION_SIZE};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_sys::EspError;
use log::debug;

/// NVS namespace for the device configuration.
const NVS_NAMESPACE: &str = "zero2cfg";

/// NVS key holding the region blob.
const REGION_KEY: &str = "region";

/// Configuration region stored in ESP32 NVS.
pub struct NvsEeprom {
    nvs: EspNvs<NvsDefault>,
}

impl NvsEeprom {
    /// Open the configuration namespace on the default NVS partition.
    ///
    /// Must be called before any other NVS user takes the partition.
    pub fn new() -> Result<Self, EspError> {
        let partition = EspNvsPartition::<NvsDefault>::take()?;
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        Ok(Self { nvs })
    }
}

impl ConfigStorage for NvsEeprom {
    /// Read the region blob. A missing or short blob reads as erased
    /// (0xFF) for the bytes it does not cover, like factory-fresh flash.
    fn read_region(&mut self, buf: &mut [u8; REGION_SIZE]) -> Result<(), StorageError> {
        buf.fill(0xFF);
        let mut raw = [0u8; REGION_SIZE];
        match self.nvs.get_raw(REGION_KEY, &mut raw)? {
            Some(bytes) => {
                let len = bytes.len().min(REGION_SIZE);
                buf[..len].copy_from_slice(&bytes[..len]);
                debug!("read {} region bytes from NVS", len);
            }
            None => {
                debug!("no region blob in NVS, reading as erased");
            }
        }
        Ok(())
    }

    fn write_region(&mut self, buf: &[u8; REGION_SIZE]) -> Result<(), StorageError> {
        self.nvs.set_raw(REGION_KEY, buf)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        // set_raw commits to flash before returning; nothing left to flush.
        Ok(())
    }
}
