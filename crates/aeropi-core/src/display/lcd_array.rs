//! Two-line text buffer for the 16x2 display
//!
//! A convenience container for composing screen contents before pushing them
//! with [`JHD1313M1Display::show`](super::JHD1313M1Display::show). It is not
//! a mirror of the controller's DDRAM.

use core::fmt::Write;

use super::rom_code;
use crate::protocol::jhd1313m1::{COLUMNS, ROWS};
use crate::sensors::CalibratedReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    First,
    Second,
}

impl Line {
    const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Screen contents as character ROM codes, space padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcdArray {
    lines: [[u8; COLUMNS]; ROWS],
}

impl LcdArray {
    pub const fn new() -> Self {
        Self {
            lines: [[b' '; COLUMNS]; ROWS],
        }
    }

    /// Replace a line. Content past 16 characters is cut off and newlines become spaces.
    pub fn set_line(&mut self, line: Line, content: &str) {
        let row = &mut self.lines[line.index()];
        row.fill(b' ');
        for (cell, c) in row.iter_mut().zip(content.chars()) {
            *cell = match c {
                '\n' => b' ',
                c => rom_code(c),
            };
        }
    }

    pub fn line(&self, line: Line) -> &[u8; COLUMNS] {
        &self.lines[line.index()]
    }
}

impl Default for LcdArray {
    fn default() -> Self {
        Self::new()
    }
}

/// Lay out a reading as `23.3°C` over `96.59 kPa`.
pub fn format_reading(reading: &CalibratedReading) -> LcdArray {
    let mut lines = LcdArray::new();
    let mut text: heapless::String<32> = heapless::String::new();

    // An overflowing value just leaves the line short.
    let _ = write!(text, "{:.1}°C", reading.temperature.celsius());
    lines.set_line(Line::First, &text);

    text.clear();
    let _ = write!(text, "{:.2} kPa", reading.pressure.kilopascals());
    lines.set_line(Line::Second, &text);

    lines
}
