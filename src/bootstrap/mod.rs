//! Network bootstrap: station connect with access-point fallback.
//!
//! At startup the device tries to join the configured network as a
//! station. Association status is polled every 250 ms for up to 30
//! seconds; if the ceiling is reached the device gives up on the primary
//! network and hosts its own open access point under a fixed SSID instead.
//!
//! Both outcomes are terminal for the current boot: there is no retry of
//! the primary network once the fallback starts. Recovery happens by
//! restarting, which the config portal does after a successful save.
//!
//! The wait is deliberately blocking. Bootstrap runs once, before request
//! serving begins, on the single thread of control, so nothing else is
//! starved by it.

#[cfg(feature = "esp32")]
mod esp;
#[cfg(not(feature = "esp32"))]
mod host;

#[cfg(feature = "esp32")]
pub use esp::EspWifiDriver;
#[cfg(not(feature = "esp32"))]
pub use host::HostWifi;

use crate::config::DeviceConfig;
use log::{debug, info, warn};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// How often association status is polled while connecting.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long to keep trying before falling back to access-point mode.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// SSID of the fallback access point (open network, fixed identity).
pub const FALLBACK_AP_SSID: &str = "Zero2-Setup";

/// Resulting connectivity mode after bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetMode {
    /// Joined the configured network as a station.
    Station,
    /// Hosting the fallback access point.
    AccessPoint,
}

impl fmt::Display for NetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Station => write!(f, "station"),
            Self::AccessPoint => write!(f, "access-point"),
        }
    }
}

/// Poll interval and ceiling for the connecting phase.
///
/// The defaults are the production values; tests scale them down without
/// changing the decision procedure.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            timeout: CONNECT_TIMEOUT,
        }
    }
}

/// Platform Wi-Fi driver used by the bootstrap state machine.
pub trait WifiDriver {
    type Error: fmt::Debug + fmt::Display;

    /// Advertise `name` as the device hostname. Called before association
    /// begins.
    fn set_hostname(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Start associating to `ssid` with `secret`. Returns once the attempt
    /// is underway, not once it succeeds.
    fn begin_station(&mut self, ssid: &str, secret: &str) -> Result<(), Self::Error>;

    /// Whether the station is associated and has a usable address.
    fn is_associated(&mut self) -> bool;

    /// Stop station mode and host an open access point under `ssid`.
    fn start_access_point(&mut self, ssid: &str) -> Result<(), Self::Error>;
}

/// Run the bootstrap state machine with production timing.
pub fn bootstrap<D: WifiDriver>(
    driver: &mut D,
    config: &DeviceConfig,
) -> Result<NetMode, D::Error> {
    bootstrap_with(driver, config, PollPolicy::default())
}

/// Run the bootstrap state machine with an explicit poll policy.
///
/// Timeout is not an error: it resolves to [`NetMode::AccessPoint`]. An
/// `Err` here means the driver itself failed to carry out a transition.
pub fn bootstrap_with<D: WifiDriver>(
    driver: &mut D,
    config: &DeviceConfig,
    policy: PollPolicy,
) -> Result<NetMode, D::Error> {
    driver.set_hostname(config.device_name())?;
    info!(
        "joining {:?} as {:?}",
        config.network_name(),
        config.device_name()
    );
    driver.begin_station(config.network_name(), config.network_secret())?;

    let deadline = Instant::now() + policy.timeout;
    loop {
        if driver.is_associated() {
            info!("station associated to {:?}", config.network_name());
            return Ok(NetMode::Station);
        }
        if Instant::now() >= deadline {
            break;
        }
        debug!("waiting for association");
        thread::sleep(policy.interval);
    }

    warn!(
        "station association timed out after {:?}, starting fallback AP {:?}",
        policy.timeout, FALLBACK_AP_SSID
    );
    driver.start_access_point(FALLBACK_AP_SSID)?;
    Ok(NetMode::AccessPoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    /// Scripted driver recording every call in order.
    #[derive(Default)]
    struct FakeDriver {
        /// Become associated after this many status polls (None = never).
        associate_after: Option<usize>,
        polls: usize,
        hostname: Option<String>,
        station: Option<(String, String)>,
        ap_ssid: Option<String>,
        calls: Vec<&'static str>,
    }

    impl WifiDriver for FakeDriver {
        type Error = Infallible;

        fn set_hostname(&mut self, name: &str) -> Result<(), Infallible> {
            self.calls.push("hostname");
            self.hostname = Some(name.to_string());
            Ok(())
        }

        fn begin_station(&mut self, ssid: &str, secret: &str) -> Result<(), Infallible> {
            self.calls.push("station");
            self.station = Some((ssid.to_string(), secret.to_string()));
            Ok(())
        }

        fn is_associated(&mut self) -> bool {
            self.polls += 1;
            match self.associate_after {
                Some(n) => self.polls > n,
                None => false,
            }
        }

        fn start_access_point(&mut self, ssid: &str) -> Result<(), Infallible> {
            self.calls.push("ap");
            self.ap_ssid = Some(ssid.to_string());
            Ok(())
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(2),
            timeout: Duration::from_millis(60),
        }
    }

    fn sample_config() -> DeviceConfig {
        let mut config = DeviceConfig::default();
        config.set_network_name("HomeNet");
        config.set_network_secret("hunter22");
        config.set_device_name("zero2-hall");
        config
    }

    #[test]
    fn test_production_timing_constants() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_success_reaches_station_without_fallback() {
        let mut driver = FakeDriver {
            associate_after: Some(3),
            ..Default::default()
        };
        let mode = bootstrap_with(&mut driver, &sample_config(), fast_policy()).unwrap();

        assert_eq!(mode, NetMode::Station);
        assert!(driver.ap_ssid.is_none(), "fallback must not start");
        assert_eq!(
            driver.station,
            Some(("HomeNet".to_string(), "hunter22".to_string()))
        );
    }

    #[test]
    fn test_immediate_association_skips_waiting() {
        let mut driver = FakeDriver {
            associate_after: Some(0),
            ..Default::default()
        };
        let started = Instant::now();
        let mode = bootstrap_with(&mut driver, &sample_config(), fast_policy()).unwrap();

        assert_eq!(mode, NetMode::Station);
        assert_eq!(driver.polls, 1);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_timeout_falls_back_to_access_point() {
        let mut driver = FakeDriver::default();
        let policy = fast_policy();
        let started = Instant::now();
        let mode = bootstrap_with(&mut driver, &sample_config(), policy).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(mode, NetMode::AccessPoint);
        assert_eq!(driver.ap_ssid.as_deref(), Some(FALLBACK_AP_SSID));
        assert!(elapsed >= policy.timeout, "ceiling not reached: {:?}", elapsed);
        // Bounded: ceiling plus at most a few poll intervals of slack.
        assert!(elapsed < policy.timeout + Duration::from_millis(500));
    }

    #[test]
    fn test_poll_count_matches_policy() {
        let mut driver = FakeDriver::default();
        let policy = fast_policy();
        bootstrap_with(&mut driver, &sample_config(), policy).unwrap();

        let max_polls =
            policy.timeout.as_millis() / policy.interval.as_millis().max(1) + 2;
        assert!(driver.polls >= 2);
        assert!(
            driver.polls as u128 <= max_polls,
            "{} polls exceeds ceiling/interval budget {}",
            driver.polls,
            max_polls
        );
    }

    #[test]
    fn test_hostname_set_before_association_begins() {
        let mut driver = FakeDriver {
            associate_after: Some(0),
            ..Default::default()
        };
        bootstrap_with(&mut driver, &sample_config(), fast_policy()).unwrap();

        assert_eq!(driver.calls, vec!["hostname", "station"]);
        assert_eq!(driver.hostname.as_deref(), Some("zero2-hall"));
    }

    #[test]
    fn test_fallback_ap_is_open_and_fixed() {
        let mut driver = FakeDriver::default();
        let mut config = sample_config();
        config.set_network_name("NoSuchNetwork");
        bootstrap_with(&mut driver, &config, fast_policy()).unwrap();

        // The fallback identity never derives from configuration.
        assert_eq!(driver.ap_ssid.as_deref(), Some("Zero2-Setup"));
    }
}
