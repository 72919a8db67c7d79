//! Update-delivery boundary.
//!
//! Firmware updates arrive over the same network stack the portal uses,
//! but the delivery mechanism itself is a collaborator: the portal only
//! registers it under `/update` and hands requests over untouched.

use log::warn;
use tiny_http::{Request, Response};

/// Opaque update-delivery service registered under `/update`.
pub trait UpdateService: Send {
    /// Take full ownership of the request, including responding to it.
    fn handle(&mut self, request: Request);
}

/// Update service for builds with no delivery mechanism (host runs).
pub struct NullUpdater;

impl UpdateService for NullUpdater {
    fn handle(&mut self, request: Request) {
        warn!("update requested but this build has no update delivery");
        let _ = request.respond(
            Response::from_string("update delivery is not available in this build")
                .with_status_code(503),
        );
    }
}

#[cfg(feature = "esp32")]
mod ota {
    use super::UpdateService;
    use crate::portal::RESTART_DELAY;
    use esp_idf_svc::io::Write as _;
    use esp_idf_svc::ota::EspOta;
    use esp_idf_sys::EspError;
    use log::{error, info};
    use std::fmt;
    use std::io::Read;
    use tiny_http::{Method, Request, Response};

    const UPLOAD_FORM: &str = "<!DOCTYPE html><html><body><h2>OTA Update</h2>\
        <form action=\"/update\" method=\"post\" enctype=\"application/octet-stream\">\
        <input type=\"file\" name=\"firmware\"><br><br>\
        <input type=\"submit\" value=\"Flash\"></form></body></html>";

    /// OTA updater: streams a posted firmware image into the inactive
    /// slot and reboots into it.
    pub struct OtaUpdater;

    impl OtaUpdater {
        pub fn new() -> Self {
            Self
        }

        fn apply(&mut self, request: &mut Request) -> Result<u64, OtaError> {
            let mut ota = EspOta::new()?;
            let mut update = ota.initiate_update()?;

            let mut written = 0u64;
            let mut buf = [0u8; 4096];
            let reader = request.as_reader();
            loop {
                let n = reader.read(&mut buf).map_err(OtaError::Io)?;
                if n == 0 {
                    break;
                }
                update.write_all(&buf[..n]).map_err(|e| OtaError::Esp(e.0))?;
                written += n as u64;
            }
            update.complete()?;
            Ok(written)
        }
    }

    impl Default for OtaUpdater {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UpdateService for OtaUpdater {
        fn handle(&mut self, mut request: Request) {
            match request.method() {
                Method::Get => {
                    let _ = request.respond(Response::from_string(UPLOAD_FORM));
                }
                Method::Post => match self.apply(&mut request) {
                    Ok(written) => {
                        info!("OTA image applied ({} bytes), rebooting", written);
                        let _ = request
                            .respond(Response::from_string("Update applied. Rebooting…"));
                        std::thread::sleep(RESTART_DELAY);
                        unsafe { esp_idf_sys::esp_restart() }
                    }
                    Err(e) => {
                        error!("OTA update failed: {}", e);
                        let _ = request.respond(
                            Response::from_string(format!("update failed: {}", e))
                                .with_status_code(500),
                        );
                    }
                },
                _ => {
                    let _ = request
                        .respond(Response::from_string("Method Not Allowed").with_status_code(405));
                }
            }
        }
    }

    /// Errors while applying an OTA image.
    #[derive(Debug)]
    pub enum OtaError {
        Esp(EspError),
        Io(std::io::Error),
    }

    impl From<EspError> for OtaError {
        fn from(e: EspError) -> Self {
            Self::Esp(e)
        }
    }

    impl fmt::Display for OtaError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Esp(e) => write!(f, "ESP error: {:?}", e),
                Self::Io(e) => write!(f, "I/O error: {}", e),
            }
        }
    }

    impl std::error::Error for OtaError {}
}

#[cfg(feature = "esp32")]
pub use ota::OtaUpdater;
