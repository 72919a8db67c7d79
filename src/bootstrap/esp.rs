//! ESP32 Wi-Fi driver.
//!
//! Wraps the ESP-IDF Wi-Fi driver behind [`WifiDriver`]. Association is
//! started non-blocking and completion is observed by the bootstrap poll
//! loop, so the 250 ms / 30 s policy lives in one place for all platforms.

use super::WifiDriver;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::handle::RawHandle;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
};
use esp_idf_sys::EspError;
use log::info;
use std::ffi::CString;
use std::fmt;

/// ESP-IDF backed Wi-Fi driver.
pub struct EspWifiDriver<'a> {
    wifi: EspWifi<'a>,
}

impl<'a> EspWifiDriver<'a> {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, None)?;
        Ok(Self { wifi })
    }
}

impl WifiDriver for EspWifiDriver<'_> {
    type Error = EspWifiError;

    fn set_hostname(&mut self, name: &str) -> Result<(), EspWifiError> {
        if name.is_empty() {
            // Keep the default hostname rather than advertising nothing.
            return Ok(());
        }
        let name = CString::new(name).map_err(|_| EspWifiError::InvalidField("hostname"))?;
        let handle = self.wifi.sta_netif().handle();
        // Must happen before DHCP starts on the station netif.
        esp_idf_sys::esp!(unsafe { esp_idf_sys::esp_netif_set_hostname(handle, name.as_ptr()) })?;
        Ok(())
    }

    fn begin_station(&mut self, ssid: &str, secret: &str) -> Result<(), EspWifiError> {
        let auth_method = if secret.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| EspWifiError::InvalidField("ssid"))?,
            password: secret
                .try_into()
                .map_err(|_| EspWifiError::InvalidField("secret"))?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&config)?;
        self.wifi.start()?;
        // Non-blocking: issues the association attempt and returns. The
        // bootstrap loop polls is_associated for the outcome.
        self.wifi.connect()?;
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
            && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn start_access_point(&mut self, ssid: &str) -> Result<(), EspWifiError> {
        // Abandoning the station attempt is best-effort; the driver may
        // never have gotten far enough for there to be anything to stop.
        let _ = self.wifi.disconnect();

        let config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| EspWifiError::InvalidField("ap ssid"))?,
            auth_method: AuthMethod::None,
            max_connections: 4,
            ..Default::default()
        });
        self.wifi.set_configuration(&config)?;
        self.wifi.start()?;

        if let Ok(ip_info) = self.wifi.ap_netif().get_ip_info() {
            info!("access point {:?} up, IP {}", ssid, ip_info.ip);
        }
        Ok(())
    }
}

/// Errors from the ESP32 Wi-Fi driver.
#[derive(Debug)]
pub enum EspWifiError {
    /// ESP-IDF error.
    Esp(EspError),
    /// A configured value does not fit the driver's representation.
    InvalidField(&'static str),
}

impl From<EspError> for EspWifiError {
    fn from(e: EspError) -> Self {
        Self::Esp(e)
    }
}

impl fmt::Display for EspWifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
            Self::InvalidField(field) => write!(f, "invalid {}", field),
        }
    }
}

impl std::error::Error for EspWifiError {}
