//! Desktop simulator for the aeropi barometer display.
//!
//! Runs the real MPL115A2 and JHD1313M1 drivers against simulated devices on
//! a shared bus. The sensor poller and the display refresh loop run
//! concurrently; the panel contents are printed to the log after every
//! refresh.
//!
//! ```text
//! aeropi-simulator [settings.toml]
//! ```
//!
//! Set `RUST_LOG=debug` to see injected faults and discarded reads.

mod devices;
mod settings;

use std::path::Path;

use aeropi_core::async_i2c_bus::{BusMutex, SharedBus};
use aeropi_core::bus::BusTransport;
use aeropi_core::display::{DisplayError, JHD1313M1Display, format_reading};
use aeropi_core::events::{SensorEvent, SensorEventChannel, SensorEventSubscriber};
use aeropi_core::metrics::QualityLevel;
use aeropi_core::sensors::{MPL115A2Sensor, SensorShared};
use embassy_futures::block_on;
use embassy_futures::join::join;
use embassy_time::{Delay, Timer};
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use devices::SimulatedBoard;
use settings::{Settings, SimulatorSettings};

const SENSOR_NAME: &str = "MPL115A2";

/// Backlight colour while the sensor is reporting bus errors.
const FAULT_RGB: (u8, u8, u8) = (255, 0, 0);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting aeropi simulator");

    let settings = match std::env::args().nth(1) {
        Some(path) => match Settings::load(Path::new(&path)) {
            Ok(settings) => {
                info!("Loaded settings from {}", path);
                settings
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    block_on(run(&settings));
    info!("Simulator exiting");
}

async fn run(settings: &Settings) {
    let config = settings.config();
    let bus = BusMutex::new(SimulatedBoard::new(config, settings.simulator.faults()));
    let shared = SensorShared::new();
    let events = SensorEventChannel::new();

    let (Ok(publisher), Ok(mut subscriber)) = (events.publisher(), events.subscriber()) else {
        error!("Sensor event channel has no free slots");
        return;
    };

    let sensor = MPL115A2Sensor::new(
        SharedBus::new(&bus),
        Delay,
        config.sensor,
        &shared,
        publisher,
    );
    let mut display =
        JHD1313M1Display::new(SharedBus::new(&bus), Delay, config.display).with_name("LCD");

    // Both devices initialise concurrently; the bus mutex keeps their transfers apart
    let (sensor, display_started) = join(sensor.start(), display.start()).await;

    if let Err(e) = display_started {
        error!("{} failed to start: {}", display.name(), e);
        return;
    }
    info!("{} ready", display.name());

    let poller = match sensor {
        Ok(poller) => poller,
        Err(e) => {
            error!("Sensor failed to start: {}", e);
            if let Err(e) = show_offline(&mut display).await {
                error!("{}", e);
            }
            return;
        }
    };

    let sim = &settings.simulator;
    let ui = async {
        let refreshed = refresh(&mut display, &shared, &mut subscriber, &bus, sim).await;
        if let Err(e) = shared
            .halt(SENSOR_NAME, &mut Delay, sim.halt_timeout_ms)
            .await
        {
            warn!("{}", e);
        }
        refreshed
    };

    let ((), refreshed) = join(poller.run(), ui).await;
    if let Err(e) = refreshed {
        error!("{} refresh failed: {}", display.name(), e);
    }

    if let Err(e) = display.halt().await {
        warn!("{}", e);
    }
}

async fn refresh<B, D>(
    display: &mut JHD1313M1Display<B, D>,
    shared: &SensorShared,
    events: &mut SensorEventSubscriber<'_>,
    board: &BusMutex<SimulatedBoard>,
    sim: &SimulatorSettings,
) -> Result<(), DisplayError>
where
    B: BusTransport,
    D: DelayNs,
{
    for update in 1..=sim.updates {
        Timer::after_millis(sim.update_interval_ms).await;

        let mut faulted = false;
        while let Some(event) = events.try_next_message_pure() {
            warn!("Sensor event: {:?}", event);
            faulted |= matches!(event, SensorEvent::BusError { .. });
        }

        match shared.latest() {
            Some(reading) => {
                display.show(&format_reading(&reading)).await?;
                let quality = QualityLevel::assess(reading.temperature);
                let (r, g, b) = if faulted {
                    FAULT_RGB
                } else {
                    quality.backlight()
                };
                display.set_rgb(r, g, b).await?;
                info!(
                    "Update {}/{}: {:.2} C ({}), {:.2} kPa",
                    update,
                    sim.updates,
                    reading.temperature.celsius(),
                    quality.label(),
                    reading.pressure.kilopascals()
                );
            }
            None => {
                display.clear().await?;
                display.write("waiting...").await?;
                info!("Update {}/{}: no reading yet", update, sim.updates);
            }
        }

        info!("\n{}", board.lock().await.snapshot());
    }
    Ok(())
}

async fn show_offline<B, D>(display: &mut JHD1313M1Display<B, D>) -> Result<(), DisplayError>
where
    B: BusTransport,
    D: DelayNs,
{
    display.clear().await?;
    display.write("sensor offline").await?;
    let (r, g, b) = FAULT_RGB;
    display.set_rgb(r, g, b).await
}
