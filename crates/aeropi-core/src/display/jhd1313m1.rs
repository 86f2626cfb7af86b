//! JHD1313M1 character LCD driver
//!
//! The module answers on two bus addresses: an HD44780-compatible character
//! controller and a separate RGB backlight controller. Every controller write
//! is a control byte (`LCD_CMD` or `LCD_DATA`) followed by one payload byte.

use core::fmt::Debug;
use core::iter;

use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use super::{DisplayError, LcdArray, Line, rom_code};
use crate::bus::BusTransport;
use crate::config::DisplayConfig;
use crate::protocol::jhd1313m1::*;

const DEFAULT_NAME: &str = "JHD1313M1";

fn bus_error<E: Debug>(
    display: &'static str,
    operation: &'static str,
) -> impl FnOnce(E) -> DisplayError {
    move |e| {
        warn!("{} {} failed: {:?}", display, operation, e);
        DisplayError::Bus { display, operation }
    }
}

/// 16x2 RGB-backlit character display.
pub struct JHD1313M1Display<B, D> {
    bus: B,
    delay: D,
    config: DisplayConfig,
    name: &'static str,
}

impl<B, D> JHD1313M1Display<B, D>
where
    B: BusTransport,
    D: DelayNs,
{
    /// Create an idle driver. No bus I/O happens until [`start`](Self::start).
    pub fn new(bus: B, delay: D, config: DisplayConfig) -> Self {
        Self {
            bus,
            delay,
            config,
            name: DEFAULT_NAME,
        }
    }

    /// Name used in logs and errors.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Power-up initialisation of the character controller and the backlight.
    ///
    /// Not atomic: a failure part way leaves the earlier steps applied.
    pub async fn start(&mut self) -> Result<(), DisplayError> {
        let name = self.name;
        let lcd = self.config.address;

        self.bus
            .start(lcd)
            .await
            .map_err(bus_error(name, "start display"))?;
        self.bus
            .start(self.config.backlight_address)
            .await
            .map_err(bus_error(name, "start backlight"))?;

        self.delay.delay_us(POWER_UP_DELAY_US).await;

        // The first command after power-up is occasionally not acknowledged
        let function_set = [LCD_CMD, LCD_FUNCTIONSET | LCD_2LINE];
        if let Err(e) = self.bus.write(lcd, &function_set).await {
            warn!("{}: function set failed ({:?}), retrying", name, e);
            self.bus
                .write(lcd, &function_set)
                .await
                .map_err(bus_error(name, "function set"))?;
        }

        self.delay.delay_us(COMMAND_DELAY_US).await;
        self.command(LCD_DISPLAYCONTROL | LCD_DISPLAYON, "display control")
            .await?;

        self.delay.delay_us(COMMAND_DELAY_US).await;
        self.clear().await?;

        self.command(
            LCD_ENTRYMODESET | LCD_ENTRYLEFT | LCD_ENTRYSHIFTDECREMENT,
            "entry mode",
        )
        .await?;

        self.set_reg(REG_MODE1, 0x00, "backlight mode1").await?;
        self.set_reg(REG_MODE2, 0x00, "backlight mode2").await?;
        self.set_reg(REG_OUTPUT, OUTPUT_PWM_ALL, "backlight output")
            .await?;

        self.set_rgb(255, 255, 255).await?;

        info!("{}: started", name);
        Ok(())
    }

    /// Set the backlight colour, one PWM duty byte per channel.
    pub async fn set_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<(), DisplayError> {
        self.set_reg(REG_RED, r, "set red").await?;
        self.set_reg(REG_GREEN, g, "set green").await?;
        self.set_reg(REG_BLUE, b, "set blue").await
    }

    pub async fn clear(&mut self) -> Result<(), DisplayError> {
        self.command(LCD_CLEARDISPLAY, "clear").await
    }

    /// Move the cursor to the origin. Always waits afterwards, even on failure,
    /// so a following clear is not lost.
    pub async fn home(&mut self) -> Result<(), DisplayError> {
        let result = self.command(LCD_RETURNHOME, "return home").await;
        self.delay.delay_ms(HOME_DELAY_MS).await;
        result
    }

    /// Write text at the cursor. `'\n'` jumps to the start of the second line.
    ///
    /// Characters are mapped with [`rom_code`]. Stops at the first failed
    /// write; characters already sent stay on the display.
    pub async fn write(&mut self, text: &str) -> Result<(), DisplayError> {
        self.write_codes(text.chars().map(rom_code)).await
    }

    /// Like [`write`](Self::write) but with raw character ROM codes.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.write_codes(bytes.iter().copied()).await
    }

    /// Replace the whole screen with `lines`.
    pub async fn show(&mut self, lines: &LcdArray) -> Result<(), DisplayError> {
        self.clear().await?;
        self.home().await?;

        let codes = lines
            .line(Line::First)
            .iter()
            .copied()
            .chain(iter::once(b'\n'))
            .chain(lines.line(Line::Second).iter().copied());
        self.write_codes(codes).await
    }

    /// Move the cursor. 0..=15 is the first line, 16..=31 the second.
    pub async fn set_position(&mut self, pos: u8) -> Result<(), DisplayError> {
        if pos > MAX_POSITION {
            return Err(DisplayError::InvalidPosition(pos));
        }

        let columns = COLUMNS as u8;
        let offset = if pos >= columns {
            (pos - columns) | LCD_2NDLINEOFFSET
        } else {
            pos
        };

        self.command(LCD_SETDDRAMADDR | offset, "set position").await
    }

    /// Shift the whole display one column.
    pub async fn scroll(&mut self, left_to_right: bool) -> Result<(), DisplayError> {
        let direction = if left_to_right {
            LCD_MOVELEFT
        } else {
            LCD_MOVERIGHT
        };
        self.command(LCD_CURSORSHIFT | LCD_DISPLAYMOVE | direction, "scroll")
            .await
    }

    /// The controller has no power-down sequence.
    pub async fn halt(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    async fn write_codes(
        &mut self,
        codes: impl Iterator<Item = u8>,
    ) -> Result<(), DisplayError> {
        // Gives a preceding clear time to finish
        self.delay.delay_ms(WRITE_DELAY_MS).await;

        for code in codes {
            if code == b'\n' {
                self.set_position(COLUMNS as u8).await?;
                continue;
            }
            self.bus
                .write(self.config.address, &[LCD_DATA, code])
                .await
                .map_err(bus_error(self.name, "write data"))?;
        }
        Ok(())
    }

    async fn command(&mut self, command: u8, operation: &'static str) -> Result<(), DisplayError> {
        self.bus
            .write(self.config.address, &[LCD_CMD, command])
            .await
            .map_err(bus_error(self.name, operation))
    }

    async fn set_reg(
        &mut self,
        register: u8,
        value: u8,
        operation: &'static str,
    ) -> Result<(), DisplayError> {
        self.bus
            .write(self.config.backlight_address, &[register, value])
            .await
            .map_err(bus_error(self.name, operation))
    }
}
