//! MPL115A2 barometer driver
//!
//! The sensor stores four calibration coefficients in ROM. They are read once
//! in [`MPL115A2Sensor::start`], after which a [`SensorPoller`] repeatedly
//! triggers a conversion, reads the raw ADC words and publishes a compensated
//! reading through [`SensorShared`].

use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, trace, warn};

use super::{CalibratedReading, SensorError, SensorShared};
use crate::bus::BusTransport;
use crate::config::SensorConfig;
use crate::events::{SensorEvent, SensorEventPublisher};
use crate::protocol::mpl115a2::*;
use crate::units::{Pressure, Temperature};

const SENSOR_NAME: &str = "MPL115A2";

/// Scaled calibration coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub a0: f32,
    pub b1: f32,
    pub b2: f32,
    pub c12: f32,
}

impl Calibration {
    /// Decode the coefficient block: four big-endian signed words in the
    /// order a0, b1, b2, c12.
    pub fn from_bytes(bytes: &[u8; COEFFICIENT_BLOCK_LEN]) -> Self {
        let word = |i: usize| i16::from_be_bytes([bytes[i], bytes[i + 1]]);

        Self {
            a0: word(0) as f32 / A0_DIVISOR,
            b1: word(2) as f32 / B1_DIVISOR,
            b2: word(4) as f32 / B2_DIVISOR,
            c12: (word(6) >> C12_SHIFT) as f32 / C12_DIVISOR,
        }
    }

    /// Apply the compensation polynomial to one raw reading.
    pub fn compensate(&self, raw: RawReading) -> CalibratedReading {
        let padc = raw.pressure as f32;
        let tadc = raw.temperature as f32;

        let pressure_comp = self.a0 + (self.b1 + self.c12 * tadc) * padc + self.b2 * tadc;
        let pressure = PRESSURE_SCALE * pressure_comp + PRESSURE_OFFSET_KPA;
        let temperature = ((tadc - TEMPERATURE_ADC_AT_REFERENCE) / TEMPERATURE_COUNTS_PER_DEGREE)
            + TEMPERATURE_REFERENCE_C;

        CalibratedReading {
            temperature: Temperature::from_celsius(temperature),
            pressure: Pressure::from_kilopascals(pressure),
        }
    }
}

/// 10-bit pressure and temperature ADC values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub pressure: u16,
    pub temperature: u16,
}

impl RawReading {
    /// Decode the pressure/temperature block: two big-endian words, left aligned.
    pub fn from_bytes(bytes: &[u8; READING_BLOCK_LEN]) -> Self {
        Self {
            pressure: u16::from_be_bytes([bytes[0], bytes[1]]) >> ADC_SHIFT,
            temperature: u16::from_be_bytes([bytes[2], bytes[3]]) >> ADC_SHIFT,
        }
    }
}

/// What a single polling cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// A new reading was stored.
    Updated(CalibratedReading),
    /// A bus transaction failed; an event was published.
    BusError { operation: &'static str },
    /// The read came back short and was discarded.
    ShortRead { got: usize },
}

fn bus_error<E: Debug>(operation: &'static str) -> impl FnOnce(E) -> SensorError {
    move |e| {
        error!("{} {} failed: {:?}", SENSOR_NAME, operation, e);
        SensorError::Bus {
            sensor: SENSOR_NAME,
            operation,
        }
    }
}

/// Idle MPL115A2 driver. Construction performs no bus I/O.
pub struct MPL115A2Sensor<'a, B, D> {
    bus: B,
    delay: D,
    config: SensorConfig,
    shared: &'a SensorShared,
    publisher: SensorEventPublisher<'a>,
}

impl<'a, B, D> MPL115A2Sensor<'a, B, D>
where
    B: BusTransport,
    D: DelayNs,
{
    pub fn new(
        bus: B,
        delay: D,
        config: SensorConfig,
        shared: &'a SensorShared,
        publisher: SensorEventPublisher<'a>,
    ) -> Self {
        Self {
            bus,
            delay,
            config,
            shared,
            publisher,
        }
    }

    /// Open the device and load its calibration coefficients.
    ///
    /// Returns the armed poller without waiting for a first reading. The
    /// caller runs [`SensorPoller::run`] as its own task. A [`SensorShared`]
    /// left stopped by an earlier poller is rearmed here.
    pub async fn start(mut self) -> Result<SensorPoller<'a, B, D>, SensorError> {
        let address = self.config.address;
        self.shared.rearm();

        self.bus
            .start(address)
            .await
            .map_err(bus_error("start"))?;
        self.bus
            .write(address, &[REG_A0_COEFF_MSB])
            .await
            .map_err(bus_error("select coefficients"))?;

        let mut buf = [0u8; COEFFICIENT_BLOCK_LEN];
        let got = self
            .bus
            .read(address, &mut buf)
            .await
            .map_err(bus_error("read coefficients"))?;
        if got != COEFFICIENT_BLOCK_LEN {
            error!(
                "{} coefficient read returned {} of {} bytes",
                SENSOR_NAME, got, COEFFICIENT_BLOCK_LEN
            );
            return Err(SensorError::ShortRead {
                sensor: SENSOR_NAME,
                operation: "read coefficients",
                expected: COEFFICIENT_BLOCK_LEN,
                got,
            });
        }

        let calibration = Calibration::from_bytes(&buf);
        info!(
            "{}: calibration a0={} b1={} b2={} c12={}",
            SENSOR_NAME, calibration.a0, calibration.b1, calibration.b2, calibration.c12
        );

        Ok(SensorPoller {
            sensor: self,
            calibration,
            cycles: 0,
        })
    }
}

/// A started MPL115A2 driving the background polling loop.
pub struct SensorPoller<'a, B, D> {
    sensor: MPL115A2Sensor<'a, B, D>,
    calibration: Calibration,
    cycles: u32,
}

impl<'a, B, D> SensorPoller<'a, B, D>
where
    B: BusTransport,
    D: DelayNs,
{
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Completed polling cycles, successful or not.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Run polling cycles until a stop is requested through [`SensorShared`].
    ///
    /// Bus faults never end the loop; they are published as events.
    pub async fn run(mut self) {
        info!(
            "{}: polling every {} ms",
            SENSOR_NAME, self.sensor.config.poll_interval_ms
        );

        while !self.sensor.shared.stop_requested() {
            self.poll_once().await;
            self.sensor
                .delay
                .delay_ms(self.sensor.config.poll_interval_ms)
                .await;
        }

        info!("{}: stopped after {} cycles", SENSOR_NAME, self.cycles);
        self.sensor.shared.mark_stopped();
    }

    /// One polling cycle, without the trailing interval wait.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let outcome = self.measure().await;
        self.cycles = self.cycles.wrapping_add(1);

        match outcome {
            CycleOutcome::Updated(reading) => {
                trace!(
                    "{}: {} C, {} kPa",
                    SENSOR_NAME,
                    reading.temperature.celsius(),
                    reading.pressure.kilopascals()
                );
                self.sensor.shared.store(reading);
            }
            CycleOutcome::BusError { operation } => {
                self.sensor
                    .publisher
                    .publish_immediate(SensorEvent::BusError { operation });
            }
            CycleOutcome::ShortRead { got } => {
                debug!(
                    "{}: discarding short read ({} of {} bytes)",
                    SENSOR_NAME, got, READING_BLOCK_LEN
                );
                if self.sensor.config.report_malformed_reads {
                    self.sensor
                        .publisher
                        .publish_immediate(SensorEvent::MalformedRead {
                            expected: READING_BLOCK_LEN,
                            got,
                        });
                }
            }
        }

        outcome
    }

    async fn measure(&mut self) -> CycleOutcome {
        let sensor = &mut self.sensor;
        let address = sensor.config.address;

        if let Err(e) = sensor
            .bus
            .write(address, &[REG_START_CONVERSION, 0x00])
            .await
        {
            warn!("{} start conversion failed: {:?}", SENSOR_NAME, e);
            return CycleOutcome::BusError {
                operation: "start conversion",
            };
        }

        sensor.delay.delay_ms(CONVERSION_DELAY_MS).await;

        if let Err(e) = sensor.bus.write(address, &[REG_PRESSURE_MSB]).await {
            warn!("{} select readings failed: {:?}", SENSOR_NAME, e);
            return CycleOutcome::BusError {
                operation: "select readings",
            };
        }

        let mut buf = [0u8; READING_BLOCK_LEN];
        match sensor.bus.read(address, &mut buf).await {
            Ok(READING_BLOCK_LEN) => {
                CycleOutcome::Updated(self.calibration.compensate(RawReading::from_bytes(&buf)))
            }
            Ok(got) => CycleOutcome::ShortRead { got },
            Err(e) => {
                warn!("{} read readings failed: {:?}", SENSOR_NAME, e);
                CycleOutcome::BusError {
                    operation: "read readings",
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SensorEventChannel;
    use crate::mock::{MockBus, Transfer, TransferLog, ms};
    use embassy_futures::{block_on, join::join, yield_now};

    /// Coefficient block from the MPL115A2 application note worked example.
    const APP_NOTE_COEFFICIENTS: [u8; 8] = [0x3E, 0xCE, 0xB3, 0xF9, 0xC5, 0x17, 0x33, 0xC8];
    /// Padc = 0x6680 >> 6 = 410, Tadc = 0x7EC0 >> 6 = 507.
    const APP_NOTE_READING: [u8; 4] = [0x66, 0x80, 0x7E, 0xC0];

    fn conversions(log: &TransferLog) -> usize {
        log.writes()
            .into_iter()
            .filter(|(_, bytes)| bytes[..] == [0x12u8, 0x00][..])
            .count()
    }

    fn close(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }

    fn sensor<'a>(
        bus: MockBus,
        config: SensorConfig,
        shared: &'a SensorShared,
        channel: &'a SensorEventChannel,
    ) -> MPL115A2Sensor<'a, MockBus, crate::mock::MockDelay<'static>> {
        let delay = bus.delay();
        MPL115A2Sensor::new(bus, delay, config, shared, channel.publisher().unwrap())
    }

    #[test]
    fn test_coefficient_scaling() {
        // a0 = 400, b1 = 8192, b2 = -16384, c12 = 16 (pre-shift)
        let bytes = [0x01, 0x90, 0x20, 0x00, 0xC0, 0x00, 0x00, 0x10];

        let calibration = Calibration::from_bytes(&bytes);

        assert_eq!(calibration.a0, 50.0);
        assert_eq!(calibration.b1, 1.0);
        assert_eq!(calibration.b2, -1.0);
        assert!(close(calibration.c12, 4.0 / 4194304.0, 1e-12));
    }

    #[test]
    fn test_negative_c12_shifts_arithmetically() {
        let bytes = [0, 0, 0, 0, 0, 0, 0xFF, 0xF0]; // c12 = -16

        let calibration = Calibration::from_bytes(&bytes);

        assert!(close(calibration.c12, -4.0 / 4194304.0, 1e-12));
    }

    #[test]
    fn test_raw_reading_drops_padding_bits() {
        let raw = RawReading::from_bytes(&APP_NOTE_READING);

        assert_eq!(
            raw,
            RawReading {
                pressure: 410,
                temperature: 507
            }
        );
    }

    #[test]
    fn test_compensation_center_point() {
        let calibration = Calibration {
            a0: 0.0,
            b1: 0.0,
            b2: 0.0,
            c12: 0.0,
        };

        let reading = calibration.compensate(RawReading {
            pressure: 512,
            temperature: 498,
        });

        assert_eq!(reading.pressure.kilopascals(), 50.0);
        assert_eq!(reading.temperature.celsius(), 25.0);
    }

    #[test]
    fn test_compensation_matches_app_note() {
        let calibration = Calibration::from_bytes(&APP_NOTE_COEFFICIENTS);

        let reading = calibration.compensate(RawReading::from_bytes(&APP_NOTE_READING));

        assert!(close(calibration.a0, 2009.75, 1e-3));
        assert!(close(calibration.b1, -2.37585, 1e-4));
        assert!(close(calibration.b2, -0.92047, 1e-4));
        assert!(close(reading.pressure.kilopascals(), 96.59, 0.01));
        assert!(close(reading.temperature.celsius(), 23.318, 1e-3));
    }

    #[test]
    fn test_start_reads_coefficient_block() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let bus = MockBus::new().respond(&APP_NOTE_COEFFICIENTS);
        let log = bus.log();

        let poller =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();

        assert_eq!(
            log.transfers(),
            vec![
                Transfer::Start(0x77),
                Transfer::Write(0x77, vec![0x04]),
                Transfer::Read(0x77, 8),
            ]
        );
        assert_eq!(
            poller.calibration(),
            Calibration::from_bytes(&APP_NOTE_COEFFICIENTS)
        );
        assert_eq!(shared.latest(), None);
    }

    #[test]
    fn test_start_fails_when_device_absent() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let bus = MockBus::new().absent(0x77);
        let log = bus.log();

        let result = block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start());

        assert!(matches!(
            result,
            Err(SensorError::Bus {
                operation: "start",
                ..
            })
        ));
        assert_eq!(log.transfers(), vec![Transfer::Start(0x77)]);
    }

    #[test]
    fn test_start_rejects_short_coefficient_read() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let bus = MockBus::new().respond(&APP_NOTE_COEFFICIENTS[..5]);

        let result = block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start());

        assert!(matches!(
            result,
            Err(SensorError::ShortRead {
                expected: 8,
                got: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_poll_cycle_sequence_and_update() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let bus = MockBus::new()
            .respond(&APP_NOTE_COEFFICIENTS)
            .respond(&APP_NOTE_READING);
        let log = bus.log();

        let mut poller =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();
        log.clear();
        let outcome = block_on(poller.poll_once());

        assert_eq!(
            log.transfers(),
            vec![
                Transfer::Write(0x77, vec![0x12, 0x00]),
                ms(5),
                Transfer::Write(0x77, vec![0x00]),
                Transfer::Read(0x77, 4),
            ]
        );
        let CycleOutcome::Updated(reading) = outcome else {
            panic!("expected an update, got {outcome:?}");
        };
        assert_eq!(shared.latest(), Some(reading));
        assert!(close(reading.pressure.kilopascals(), 96.59, 0.01));
        assert_eq!(poller.cycles(), 1);
    }

    #[test]
    fn test_transient_bus_error_keeps_previous_reading() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let mut events = channel.subscriber().unwrap();
        // read 0 is the coefficient block, read 2 is the second cycle
        let bus = MockBus::new()
            .respond(&APP_NOTE_COEFFICIENTS)
            .respond(&APP_NOTE_READING)
            .fail_read(2)
            .respond(&[0x80, 0x00, 0x7C, 0x80]);

        let mut poller =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();

        let first = block_on(poller.poll_once());
        let CycleOutcome::Updated(first) = first else {
            panic!("expected an update, got {first:?}");
        };

        let second = block_on(poller.poll_once());
        assert_eq!(
            second,
            CycleOutcome::BusError {
                operation: "read readings"
            }
        );
        assert_eq!(shared.latest(), Some(first));
        assert_eq!(
            events.try_next_message_pure(),
            Some(SensorEvent::BusError {
                operation: "read readings"
            })
        );
        assert_eq!(events.try_next_message_pure(), None);

        // The loop recovers on the next cycle
        let third = block_on(poller.poll_once());
        assert!(matches!(third, CycleOutcome::Updated(r) if r != first));
        assert_eq!(events.try_next_message_pure(), None);
    }

    #[test]
    fn test_failed_start_conversion_skips_rest_of_cycle() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let mut events = channel.subscriber().unwrap();
        let bus = MockBus::new()
            .respond(&APP_NOTE_COEFFICIENTS)
            .fail_write(&[0x12, 0x00], 1);
        let log = bus.log();

        let mut poller =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();
        log.clear();
        let outcome = block_on(poller.poll_once());

        assert_eq!(
            outcome,
            CycleOutcome::BusError {
                operation: "start conversion"
            }
        );
        assert_eq!(
            log.transfers(),
            vec![Transfer::Write(0x77, vec![0x12, 0x00])]
        );
        assert_eq!(
            events.try_next_message_pure(),
            Some(SensorEvent::BusError {
                operation: "start conversion"
            })
        );
    }

    #[test]
    fn test_short_read_is_silent_by_default() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let mut events = channel.subscriber().unwrap();
        let bus = MockBus::new()
            .respond(&APP_NOTE_COEFFICIENTS)
            .respond(&APP_NOTE_READING[..2]);

        let mut poller =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();
        let outcome = block_on(poller.poll_once());

        assert_eq!(outcome, CycleOutcome::ShortRead { got: 2 });
        assert_eq!(shared.latest(), None);
        assert_eq!(events.try_next_message_pure(), None);
    }

    #[test]
    fn test_short_read_reported_when_enabled() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let mut events = channel.subscriber().unwrap();
        let bus = MockBus::new()
            .respond(&APP_NOTE_COEFFICIENTS)
            .respond(&APP_NOTE_READING[..3]);
        let config = SensorConfig {
            report_malformed_reads: true,
            ..SensorConfig::default()
        };

        let mut poller = block_on(sensor(bus, config, &shared, &channel).start()).unwrap();
        block_on(poller.poll_once());

        assert_eq!(
            events.try_next_message_pure(),
            Some(SensorEvent::MalformedRead {
                expected: 4,
                got: 3
            })
        );
    }

    #[test]
    fn test_run_stops_at_top_of_cycle_and_signals_halt() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let bus = MockBus::new().respond(&APP_NOTE_COEFFICIENTS);
        let log = bus.log();
        let config = SensorConfig {
            poll_interval_ms: 250,
            ..SensorConfig::default()
        };

        let mut interval_waits = 0;
        let delay = bus.delay().with_hook(|ns| {
            if ns == 250_000_000 {
                interval_waits += 1;
                if interval_waits == 3 {
                    shared.request_stop();
                }
            }
        });
        let sensor = MPL115A2Sensor::new(bus, delay, config, &shared, channel.publisher().unwrap());

        let poller = block_on(sensor.start()).unwrap();
        block_on(poller.run());

        assert_eq!(conversions(&log), 3);
        assert!(shared.latest().is_some());

        let mut halt_delay = MockBus::new().delay();
        assert!(block_on(shared.halt(SENSOR_NAME, &mut halt_delay, 10)).is_ok());
    }

    #[test]
    fn test_halt_stops_a_running_poller() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let bus = MockBus::new().respond(&APP_NOTE_COEFFICIENTS);
        let log = bus.log();
        let mut halt_delay = MockBus::new().delay().yielding(64);

        let poller =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();

        let ((), halted) = block_on(join(poller.run(), async {
            while shared.latest().is_none() {
                yield_now().await;
            }
            shared.halt(SENSOR_NAME, &mut halt_delay, 1000).await
        }));

        assert_eq!(halted, Ok(()));
        assert!(conversions(&log) >= 1);

        // No more cycles once halted
        let after = log.transfers().len();
        assert!(block_on(shared.halt(SENSOR_NAME, &mut halt_delay, 1000)).is_ok());
        assert_eq!(log.transfers().len(), after);
    }

    #[test]
    fn test_restart_after_halt_polls_again() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();

        let first = block_on(
            sensor(
                MockBus::new().respond(&APP_NOTE_COEFFICIENTS),
                SensorConfig::default(),
                &shared,
                &channel,
            )
            .start(),
        )
        .unwrap();
        shared.request_stop();
        block_on(first.run());
        let mut halt_delay = MockBus::new().delay().yielding(64);
        assert!(block_on(shared.halt(SENSOR_NAME, &mut halt_delay, 10)).is_ok());

        let bus = MockBus::new()
            .respond(&APP_NOTE_COEFFICIENTS)
            .respond(&APP_NOTE_READING);
        let log = bus.log();
        let second =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();
        assert!(!shared.stop_requested());

        let ((), halted) = block_on(join(second.run(), async {
            while shared.latest().is_none() {
                yield_now().await;
            }
            shared.halt(SENSOR_NAME, &mut halt_delay, 1000).await
        }));

        assert_eq!(halted, Ok(()));
        assert!(conversions(&log) >= 1);
        let reading = shared.latest().unwrap();
        assert!(close(reading.pressure.kilopascals(), 96.59, 0.01));
    }

    #[test]
    fn test_run_honours_stop_requested_before_start() {
        let shared = SensorShared::new();
        let channel = SensorEventChannel::new();
        let bus = MockBus::new().respond(&APP_NOTE_COEFFICIENTS);
        let log = bus.log();

        let poller =
            block_on(sensor(bus, SensorConfig::default(), &shared, &channel).start()).unwrap();
        log.clear();
        shared.request_stop();
        block_on(poller.run());

        assert!(log.transfers().is_empty());
        assert_eq!(shared.latest(), None);
    }
}
