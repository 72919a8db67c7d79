//! Web config portal.
//!
//! Serves the configuration form once the network bootstrap has reached a
//! terminal mode, on whichever network stack is active (station or the
//! fallback AP). Routes:
//!
//! - `GET /` - editable form over the live configuration
//! - `POST /save` - persist edited fields, confirm, then restart
//! - `/update` - handed untouched to the registered update service
//!
//! The portal is driven on the caller's thread by a single polling
//! dispatch loop; there is exactly one request in flight at a time, which
//! is what makes the unlocked access to the configuration and storage
//! sound.

mod html;

use crate::config::{store, DeviceConfig};
use crate::storage::ConfigStorage;
use crate::update::UpdateService;
use log::{error, info, warn};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

/// Pause between the save confirmation and the restart, long enough for
/// the response to reach the browser.
pub const RESTART_DELAY: Duration = Duration::from_millis(1200);

/// Dispatch poll interval for the serve loop.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Requests a device restart. The portal calls this once, after a saved
/// configuration has been committed and confirmed.
pub trait RestartHandle {
    fn restart(&mut self);
}

/// Restart handle for host builds and tests: latches the request and lets
/// the serve loop wind down instead of rebooting anything.
#[derive(Debug, Clone, Default)]
pub struct LatchRestart {
    requested: Arc<AtomicBool>,
}

impl LatchRestart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

impl RestartHandle for LatchRestart {
    fn restart(&mut self) {
        self.requested.store(true, Ordering::Release);
    }
}

/// Restart handle for the device: reboots immediately and never returns.
#[cfg(feature = "esp32")]
#[derive(Debug, Default)]
pub struct DeviceRestart;

#[cfg(feature = "esp32")]
impl RestartHandle for DeviceRestart {
    fn restart(&mut self) {
        unsafe { esp_idf_sys::esp_restart() }
    }
}

/// The config portal server.
///
/// Owns the live [`DeviceConfig`] and its storage for the rest of the
/// boot; both come back out of [`Portal::run`] when the serve loop ends
/// (host builds only — on the device a restart ends the loop the hard
/// way).
pub struct Portal<S: ConfigStorage, R: RestartHandle> {
    server: Server,
    config: DeviceConfig,
    storage: S,
    updater: Box<dyn UpdateService>,
    restart: R,
}

impl<S: ConfigStorage, R: RestartHandle> Portal<S, R> {
    /// Bind the portal to `addr` (e.g. `0.0.0.0:80`).
    pub fn bind(
        addr: &str,
        config: DeviceConfig,
        storage: S,
        updater: Box<dyn UpdateService>,
        restart: R,
    ) -> Result<Self, std::io::Error> {
        let server = Server::http(addr).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::AddrInUse, format!("{}", e))
        })?;
        Ok(Self {
            server,
            config,
            storage,
            updater,
            restart,
        })
    }

    /// The bound address, once known (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until a restart is requested.
    ///
    /// Returns the final configuration and the storage backend so the
    /// caller can inspect or reuse them after shutdown.
    pub fn run(mut self) -> (DeviceConfig, S) {
        if let Some(addr) = self.local_addr() {
            info!("config portal listening on http://{}/", addr);
        }
        loop {
            match self.server.recv_timeout(POLL_TIMEOUT) {
                Ok(Some(request)) => {
                    if self.handle(request) {
                        info!("config portal shutting down for restart");
                        break;
                    }
                }
                Ok(None) => {
                    // Poll timeout; nothing pending.
                }
                Err(e) => {
                    error!("config portal error: {}", e);
                    break;
                }
            }
        }
        (self.config, self.storage)
    }

    /// Dispatch one request. Returns true once a restart was requested.
    fn handle(&mut self, request: tiny_http::Request) -> bool {
        let method = request.method().clone();
        let path = request.url().split('?').next().unwrap_or("").to_string();

        if path == "/update" || path.starts_with("/update/") {
            self.updater.handle(request);
            return false;
        }

        match (method, path.as_str()) {
            (Method::Get, "/") => {
                let response = Response::from_string(html::index_page(&self.config))
                    .with_header(html_content_type())
                    .with_status_code(200);
                if let Err(e) = request.respond(response) {
                    warn!("failed to send form: {}", e);
                }
                false
            }
            (Method::Post, "/save") => self.handle_save(request),
            (_, "/") | (_, "/save") => {
                let allow = Header::from_bytes(&b"Allow"[..], &b"GET, POST"[..])
                    .expect("static header");
                let response = Response::from_string("Method Not Allowed")
                    .with_status_code(405)
                    .with_header(allow);
                let _ = request.respond(response);
                false
            }
            _ => {
                let _ = request.respond(Response::from_string("Not Found").with_status_code(404));
                false
            }
        }
    }

    /// Apply the posted fields, persist, confirm, then restart.
    ///
    /// The persistence write finishes before the restart fires, and the
    /// restart always follows a successful save — the next run must load
    /// the new values, never observe them half-applied.
    fn handle_save(&mut self, mut request: tiny_http::Request) -> bool {
        let mut body = String::new();
        if let Err(e) = request.as_reader().read_to_string(&mut body) {
            warn!("unreadable save request: {}", e);
            let _ = request.respond(Response::from_string("Bad Request").with_status_code(400));
            return false;
        }

        apply_form(&mut self.config, &body);

        if let Err(e) = store::save(&mut self.storage, &self.config) {
            error!("failed to persist configuration: {}", e);
            let _ = request.respond(
                Response::from_string("Failed to persist configuration").with_status_code(500),
            );
            return false;
        }

        let response = Response::from_string(html::saved_page())
            .with_header(html_content_type())
            .with_status_code(200);
        if let Err(e) = request.respond(response) {
            warn!("failed to send confirmation: {}", e);
        }

        info!("configuration saved, restarting in {:?}", RESTART_DELAY);
        thread::sleep(RESTART_DELAY);
        self.restart.restart();
        true
    }
}

fn html_content_type() -> Header {
    Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
        .expect("static header")
}

/// Map posted form fields onto the configuration.
///
/// Field names follow the form: `s` SSID, `p` secret, `h` broker host,
/// `o` broker port, `n` device name. Unknown fields are ignored; text is
/// clamped by the setters; a non-numeric port degrades to 0 with no
/// feedback, matching the device's forgiving input handling.
fn apply_form(config: &mut DeviceConfig, body: &str) {
    for (key, value) in form_fields(body) {
        match key.as_str() {
            "s" => config.set_network_name(&value),
            "p" => config.set_network_secret(&value),
            "h" => config.set_broker_host(&value),
            "o" => config.set_broker_port(parse_port(&value)),
            "n" => config.set_device_name(&value),
            _ => {}
        }
    }
}

fn form_fields(body: &str) -> impl Iterator<Item = (String, String)> + '_ {
    body.split('&').filter_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        Some((url_decode(key), url_decode(value)))
    })
}

/// Decode one application/x-www-form-urlencoded token.
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    out.push((hi * 16 + lo) as u8);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a port field the way the device always has: leading integer,
/// anything else is 0. Out-of-range values clamp to the `i32` limits.
fn parse_port(s: &str) -> i32 {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(10) else { break };
        seen_digit = true;
        value = value.saturating_mul(10).saturating_add(d as i64);
        if value > i32::MAX as i64 + 1 {
            value = i32::MAX as i64 + 1;
        }
    }
    if !seen_digit {
        return 0;
    }

    let value = if negative { -value } else { value };
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
