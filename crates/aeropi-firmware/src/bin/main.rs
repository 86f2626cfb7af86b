#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use aeropi_core::async_i2c_bus::SharedBus;
use aeropi_core::config::Config;
use aeropi_core::display::{DisplayError, JHD1313M1Display, format_reading};
use aeropi_core::events::{SensorEvent, SensorEventChannel, SensorEventSubscriber};
use aeropi_core::metrics::QualityLevel;
use aeropi_core::sensors::{MPL115A2Sensor, SensorShared};
use aeropi_firmware::hardware::{self, Display, Poller};
use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Backlight colour while the sensor is reporting bus errors.
const FAULT_RGB: (u8, u8, u8) = (255, 0, 0);

static SENSOR_STATE: SensorShared = SensorShared::new();
static SENSOR_EVENTS: SensorEventChannel = SensorEventChannel::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn sensor_task(poller: Poller) {
    poller.run().await;
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let esp_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(esp_config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let config = Config::default();
    let i2c0 = hardware::create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11)
        .expect("Failed to configure I2C0");
    let bus = hardware::share_bus(i2c0);

    let mut display =
        JHD1313M1Display::new(SharedBus::new(bus), Delay, config.display).with_name("LCD");
    match display.start().await {
        Ok(()) => info!("{} ready", display.name()),
        Err(e) => error!("{} failed to start: {}", display.name(), e),
    }

    let publisher = SENSOR_EVENTS
        .publisher()
        .expect("Sensor event publisher already taken");
    let mut subscriber = SENSOR_EVENTS
        .subscriber()
        .expect("Sensor event subscriber already taken");

    let sensor = MPL115A2Sensor::new(
        SharedBus::new(bus),
        Delay,
        config.sensor,
        &SENSOR_STATE,
        publisher,
    );

    match sensor.start().await {
        Ok(poller) => {
            spawner.spawn(sensor_task(poller).expect("Failed to spawn sensor task"));
            info!("Sensor task spawned");
        }
        Err(e) => {
            error!("Sensor failed to start: {}", e);
            if let Err(e) = show_offline(&mut display).await {
                error!("{}", e);
            }
        }
    }

    loop {
        if let Err(e) = refresh(&mut display, &mut subscriber).await {
            warn!("{} refresh failed: {}", display.name(), e);
        }
        Timer::after(REFRESH_INTERVAL).await;
    }
}

/// Draw the latest reading and tint the backlight by comfort level.
async fn refresh(
    display: &mut Display,
    events: &mut SensorEventSubscriber<'static>,
) -> Result<(), DisplayError> {
    let mut faulted = false;
    while let Some(event) = events.try_next_message_pure() {
        warn!("Sensor event: {:?}", event);
        faulted |= matches!(event, SensorEvent::BusError { .. });
    }

    let Some(reading) = SENSOR_STATE.latest() else {
        return Ok(());
    };

    display.show(&format_reading(&reading)).await?;
    let (r, g, b) = if faulted {
        FAULT_RGB
    } else {
        QualityLevel::assess(reading.temperature).backlight()
    };
    display.set_rgb(r, g, b).await
}

async fn show_offline(display: &mut Display) -> Result<(), DisplayError> {
    display.clear().await?;
    display.write("sensor offline").await?;
    let (r, g, b) = FAULT_RGB;
    display.set_rgb(r, g, b).await
}
