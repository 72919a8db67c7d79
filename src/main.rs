//! Zero2 node firmware binary.
//!
//! Boot flow on both platforms: load the configuration from storage,
//! bootstrap the network (station or fallback AP), then hand the thread
//! to the config portal until it requests a restart.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use zero2_node::bootstrap::{self, EspWifiDriver};
    use zero2_node::config::store;
    use zero2_node::portal::{DeviceRestart, Portal};
    use zero2_node::storage::NvsEeprom;
    use zero2_node::update::OtaUpdater;

    log::info!("=== Zero2 node starting ===");

    let peripherals = Peripherals::take().expect("peripherals already taken");
    let sysloop = EspSystemEventLoop::take().expect("system event loop");

    let mut storage = NvsEeprom::new().expect("NVS init failed");
    let config = store::load(&mut storage).expect("config load failed");

    let mut wifi =
        EspWifiDriver::new(peripherals.modem, sysloop).expect("Wi-Fi driver init failed");
    let mode = bootstrap::bootstrap(&mut wifi, &config).expect("network bootstrap failed");
    log::info!("network up in {} mode", mode);

    let portal = Portal::bind(
        "0.0.0.0:80",
        config,
        storage,
        Box::new(OtaUpdater::new()),
        DeviceRestart,
    )
    .expect("portal bind failed");

    // Serves until a saved configuration reboots the device.
    let _ = portal.run();
}

#[cfg(not(feature = "esp32"))]
fn main() {
    env_logger::init();

    if let Err(e) = run_host() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

/// Host (development) flow: same boot sequence against the file-backed
/// region and the OS network, portal on port 8080.
#[cfg(not(feature = "esp32"))]
fn run_host() -> Result<(), Box<dyn std::error::Error>> {
    use zero2_node::bootstrap::{self, HostWifi};
    use zero2_node::config::store;
    use zero2_node::portal::{LatchRestart, Portal};
    use zero2_node::storage::FileEeprom;
    use zero2_node::update::NullUpdater;

    let mut storage = FileEeprom::open_default()?;
    let config = store::load(&mut storage)?;

    let mut wifi = HostWifi::new();
    let mode = bootstrap::bootstrap(&mut wifi, &config)?;
    log::info!("network up in {} mode", mode);

    let latch = LatchRestart::new();
    let portal = Portal::bind(
        "0.0.0.0:8080",
        config,
        storage,
        Box::new(NullUpdater),
        latch,
    )?;

    let _ = portal.run();
    log::info!("restart requested; exiting so a fresh run reloads the config");
    Ok(())
}
