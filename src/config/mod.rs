//! Device configuration data structures.
//!
//! This module contains the platform-independent configuration held by the
//! node for its whole power-on lifetime: Wi-Fi credentials, the MQTT broker
//! endpoint and the device name. The types here can be tested on the host
//! machine; persistence lives in [`store`].
//!
//! # Example
//!
//! ```
//! use zero2_node::config::DeviceConfig;
//!
//! let mut config = DeviceConfig::default();
//! config.set_network_name("HomeNet");
//! config.set_broker_port(1883);
//! assert_eq!(config.network_name(), "HomeNet");
//! ```

use zeroize::Zeroize;

/// Maximum significant characters for a persisted text field.
/// Each field occupies a 32-byte block; the last byte is the terminator.
pub const MAX_TEXT_LEN: usize = 31;

/// In-memory capacity of the broker host field.
///
/// The original deployment kept 40 bytes in RAM but only ever persisted a
/// 32-byte block, so hosts of 32-40 characters survive until the next
/// reboot and then come back truncated to 31. The layout is kept for
/// compatibility with flashed devices; see [`store`] for the write path.
pub const BROKER_HOST_MEM_LEN: usize = 40;

/// Device configuration (Wi-Fi credentials, broker endpoint, device name).
///
/// There is exactly one instance per boot. It is populated from storage at
/// startup, optionally overwritten by the config portal, and written back
/// just before a restart. Setters enforce field capacities and cut at the
/// first interior NUL, so any value held here fits its storage block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    network_name: String,
    network_secret: String,
    broker_host: String,
    broker_port: i32,
    device_name: String,
}

impl DeviceConfig {
    /// Wi-Fi SSID of the primary network.
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    /// Wi-Fi secret of the primary network (shown in clear by the portal).
    pub fn network_secret(&self) -> &str {
        &self.network_secret
    }

    /// MQTT broker hostname or address.
    pub fn broker_host(&self) -> &str {
        &self.broker_host
    }

    /// MQTT broker port. Range is not enforced; callers own validity.
    pub fn broker_port(&self) -> i32 {
        self.broker_port
    }

    /// Device name, doubling as the network hostname.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn set_network_name(&mut self, value: &str) {
        self.network_name = clamp_field(value, MAX_TEXT_LEN);
    }

    /// Replace the Wi-Fi secret, zeroing the old value first.
    pub fn set_network_secret(&mut self, value: &str) {
        self.network_secret.zeroize();
        self.network_secret = clamp_field(value, MAX_TEXT_LEN);
    }

    pub fn set_broker_host(&mut self, value: &str) {
        self.broker_host = clamp_field(value, BROKER_HOST_MEM_LEN);
    }

    pub fn set_broker_port(&mut self, value: i32) {
        self.broker_port = value;
    }

    pub fn set_device_name(&mut self, value: &str) {
        self.device_name = clamp_field(value, MAX_TEXT_LEN);
    }
}

/// Truncate `value` to at most `cap` bytes, stopping at the first NUL.
///
/// Truncation lands on a `char` boundary, so multi-byte input may lose up
/// to three extra bytes rather than split a character.
fn clamp_field(value: &str, cap: usize) -> String {
    let value = match value.find('\0') {
        Some(i) => &value[..i],
        None => value,
    };
    if value.len() <= cap {
        return value.to_string();
    }
    let mut end = cap;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

pub mod store;
