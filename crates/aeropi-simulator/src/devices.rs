//! Simulated bus devices
//!
//! A software MPL115A2 and JHD1313M1 answering on one [`BusTransport`], so
//! the real drivers can run on a desktop. Faults can be injected into the
//! barometer to exercise the error paths of the polling loop.

use std::fmt;
use std::time::Instant;

use aeropi_core::bus::BusTransport;
use aeropi_core::config::Config;
use aeropi_core::protocol::{jhd1313m1, mpl115a2};
use aeropi_core::sensors::{Calibration, RawReading};
use log::{debug, trace};
use thiserror_no_std::Error;

/// Coefficient ROM from the MPL115A2 application note example.
const COEFFICIENTS: [u8; mpl115a2::COEFFICIENT_BLOCK_LEN] =
    [0x3E, 0xCE, 0xB3, 0xF9, 0xC5, 0x17, 0x33, 0xC8];

/// Characters per DDRAM line on the HD44780-style controller.
const DDRAM_LINE_LEN: usize = 40;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedBusError {
    #[error("no device acknowledged address {0:#04x}")]
    NoAcknowledge(u8),
    #[error("injected fault on address {0:#04x}")]
    InjectedFault(u8),
}

/// Fault injection settings for the barometer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// NACK every Nth start-conversion command, 0 disables
    pub fail_every: u32,
    /// Truncate every Nth reading block, 0 disables
    pub short_read_every: u32,
}

fn nth(counter: u32, every: u32) -> bool {
    every != 0 && counter % every == 0
}

/// MPL115A2 register file with a synthetic environment behind the ADC.
struct Barometer {
    pointer: u8,
    adc: [u8; mpl115a2::READING_BLOCK_LEN],
    calibration: Calibration,
    epoch: Instant,
    conversions: u32,
    reading_reads: u32,
}

impl Barometer {
    fn new() -> Self {
        Self {
            pointer: 0,
            adc: [0; mpl115a2::READING_BLOCK_LEN],
            calibration: Calibration::from_bytes(&COEFFICIENTS),
            epoch: Instant::now(),
            conversions: 0,
            reading_reads: 0,
        }
    }

    /// Latch a new ADC sample from slowly drifting conditions.
    fn convert(&mut self) {
        let t = self.epoch.elapsed().as_secs_f32();
        let celsius = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
        let kilopascals = 101.3 + 1.5 * (t / 300.0).sin() + 0.2 * (t / 17.0).cos();

        let raw = adc_for(&self.calibration, celsius, kilopascals);
        self.adc[..2].copy_from_slice(&(raw.pressure << mpl115a2::ADC_SHIFT).to_be_bytes());
        self.adc[2..].copy_from_slice(&(raw.temperature << mpl115a2::ADC_SHIFT).to_be_bytes());
        trace!(
            "barometer: converted {:.2} C, {:.2} kPa -> {:?}",
            celsius, kilopascals, raw
        );
    }

    fn register(&self, reg: usize) -> u8 {
        match reg {
            0..=3 => self.adc[reg],
            4..=11 => COEFFICIENTS[reg - 4],
            _ => 0,
        }
    }

    fn write(&mut self, bytes: &[u8], faults: &Faults) -> Result<(), SimulatedBusError> {
        match bytes {
            [mpl115a2::REG_START_CONVERSION, ..] => {
                self.conversions += 1;
                if nth(self.conversions, faults.fail_every) {
                    debug!("barometer: injecting fault on conversion {}", self.conversions);
                    return Err(SimulatedBusError::InjectedFault(mpl115a2::ADDRESS));
                }
                self.convert();
                Ok(())
            }
            [reg, ..] => {
                self.pointer = *reg;
                Ok(())
            }
            [] => Ok(()),
        }
    }

    fn read(&mut self, buf: &mut [u8], faults: &Faults) -> usize {
        let mut len = buf.len();
        if self.pointer == mpl115a2::REG_PRESSURE_MSB {
            self.reading_reads += 1;
            if nth(self.reading_reads, faults.short_read_every) {
                debug!("barometer: truncating read {}", self.reading_reads);
                len = len.min(2);
            }
        }

        for (i, byte) in buf[..len].iter_mut().enumerate() {
            *byte = self.register(self.pointer as usize + i);
        }
        len
    }
}

/// Raw ADC words that compensate back to the given conditions.
fn adc_for(calibration: &Calibration, celsius: f32, kilopascals: f32) -> RawReading {
    let tadc = (mpl115a2::TEMPERATURE_ADC_AT_REFERENCE
        + (celsius - mpl115a2::TEMPERATURE_REFERENCE_C) * mpl115a2::TEMPERATURE_COUNTS_PER_DEGREE)
        .round()
        .clamp(0.0, 1023.0);

    let pressure_comp = (kilopascals - mpl115a2::PRESSURE_OFFSET_KPA) / mpl115a2::PRESSURE_SCALE;
    let slope = calibration.b1 + calibration.c12 * tadc;
    let padc = ((pressure_comp - calibration.a0 - calibration.b2 * tadc) / slope)
        .round()
        .clamp(0.0, 1023.0);

    RawReading {
        pressure: padc as u16,
        temperature: tadc as u16,
    }
}

/// Character controller state: two DDRAM lines, address counter and display shift.
struct CharacterLcd {
    ddram: [[u8; DDRAM_LINE_LEN]; 2],
    row: usize,
    col: usize,
    shift: usize,
    display_on: bool,
}

impl CharacterLcd {
    fn new() -> Self {
        Self {
            ddram: [[b' '; DDRAM_LINE_LEN]; 2],
            row: 0,
            col: 0,
            shift: 0,
            display_on: false,
        }
    }

    fn command(&mut self, cmd: u8) {
        match cmd {
            jhd1313m1::LCD_SETDDRAMADDR.. => {
                let addr = cmd & 0x7F;
                self.row = usize::from(addr >= 0x40);
                self.col = usize::from(addr & 0x3F) % DDRAM_LINE_LEN;
            }
            jhd1313m1::LCD_FUNCTIONSET.. => {}
            jhd1313m1::LCD_CURSORSHIFT.. => {
                if cmd & jhd1313m1::LCD_DISPLAYMOVE != 0 {
                    self.shift = if cmd & jhd1313m1::LCD_MOVERIGHT != 0 {
                        (self.shift + DDRAM_LINE_LEN - 1) % DDRAM_LINE_LEN
                    } else {
                        (self.shift + 1) % DDRAM_LINE_LEN
                    };
                }
            }
            jhd1313m1::LCD_DISPLAYCONTROL.. => {
                self.display_on = cmd & jhd1313m1::LCD_DISPLAYON != 0;
            }
            jhd1313m1::LCD_ENTRYMODESET.. => {}
            jhd1313m1::LCD_RETURNHOME.. => {
                self.row = 0;
                self.col = 0;
                self.shift = 0;
            }
            jhd1313m1::LCD_CLEARDISPLAY => {
                self.ddram = [[b' '; DDRAM_LINE_LEN]; 2];
                self.row = 0;
                self.col = 0;
                self.shift = 0;
            }
            _ => {}
        }
    }

    fn data(&mut self, code: u8) {
        self.ddram[self.row][self.col] = code;
        self.col += 1;
        if self.col == DDRAM_LINE_LEN {
            self.col = 0;
            self.row ^= 1;
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        for pair in bytes.chunks_exact(2) {
            match pair[0] {
                jhd1313m1::LCD_CMD => self.command(pair[1]),
                jhd1313m1::LCD_DATA => self.data(pair[1]),
                other => debug!("lcd: ignoring control byte {:#04x}", other),
            }
        }
    }

    fn visible_line(&self, row: usize) -> String {
        if !self.display_on {
            return " ".repeat(jhd1313m1::COLUMNS);
        }
        (0..jhd1313m1::COLUMNS)
            .map(|i| glyph(self.ddram[row][(self.shift + i) % DDRAM_LINE_LEN]))
            .collect()
    }
}

/// Map a character ROM code back to something a terminal can print.
fn glyph(code: u8) -> char {
    match code {
        0xDF => '°',
        0x20..=0x7E => char::from(code),
        _ => '?',
    }
}

/// What the panel currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSnapshot {
    pub lines: [String; 2],
    pub rgb: (u8, u8, u8),
}

impl fmt::Display for PanelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "-".repeat(jhd1313m1::COLUMNS);
        writeln!(f, "+{}+", border)?;
        for line in &self.lines {
            writeln!(f, "|{}|", line)?;
        }
        let (r, g, b) = self.rgb;
        write!(f, "+{}+ rgb({}, {}, {})", border, r, g, b)
    }
}

/// Every simulated device, answering on its configured address.
pub struct SimulatedBoard {
    config: Config,
    faults: Faults,
    barometer: Barometer,
    lcd: CharacterLcd,
    backlight: [u8; 16],
}

impl SimulatedBoard {
    pub fn new(config: Config, faults: Faults) -> Self {
        Self {
            config,
            faults,
            barometer: Barometer::new(),
            lcd: CharacterLcd::new(),
            backlight: [0; 16],
        }
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            lines: [self.lcd.visible_line(0), self.lcd.visible_line(1)],
            rgb: (
                self.backlight[usize::from(jhd1313m1::REG_RED)],
                self.backlight[usize::from(jhd1313m1::REG_GREEN)],
                self.backlight[usize::from(jhd1313m1::REG_BLUE)],
            ),
        }
    }

    fn is_present(&self, address: u8) -> bool {
        address == self.config.sensor.address
            || address == self.config.display.address
            || address == self.config.display.backlight_address
    }
}

impl BusTransport for SimulatedBoard {
    type Error = SimulatedBusError;

    async fn start(&mut self, address: u8) -> Result<(), Self::Error> {
        if self.is_present(address) {
            Ok(())
        } else {
            Err(SimulatedBusError::NoAcknowledge(address))
        }
    }

    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        if address == self.config.sensor.address {
            self.barometer.write(bytes, &self.faults)
        } else if address == self.config.display.address {
            self.lcd.write(bytes);
            Ok(())
        } else if address == self.config.display.backlight_address {
            if let [reg, value] = bytes {
                self.backlight[usize::from(*reg & 0x0F)] = *value;
            }
            Ok(())
        } else {
            Err(SimulatedBusError::NoAcknowledge(address))
        }
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if address == self.config.sensor.address {
            Ok(self.barometer.read(buf, &self.faults))
        } else if self.is_present(address) {
            Ok(0)
        } else {
            Err(SimulatedBusError::NoAcknowledge(address))
        }
    }
}
