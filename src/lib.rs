//! Zero2 node firmware library.
//!
//! Persistent device configuration and network bootstrap for the Zero2
//! node: Wi-Fi credentials, MQTT endpoint and device name live in a fixed
//! 256-byte non-volatile region; at boot the device joins the configured
//! network or falls back to hosting its own access point, then serves a
//! small web portal for editing the configuration and an entry point for
//! over-the-network firmware updates.
//!
//! Everything platform-independent builds and tests on the host machine;
//! the `esp32` cargo feature adds the ESP-IDF backed storage, Wi-Fi and
//! OTA implementations.

pub mod bootstrap;
pub mod config;
pub mod portal;
pub mod storage;
pub mod update;

// Re-export commonly used items
pub use bootstrap::{bootstrap, bootstrap_with, NetMode, PollPolicy, WifiDriver};
pub use config::DeviceConfig;
pub use portal::{LatchRestart, Portal, RestartHandle};
pub use storage::{ConfigStorage, MemoryEeprom, StorageError};
pub use update::{NullUpdater, UpdateService};
