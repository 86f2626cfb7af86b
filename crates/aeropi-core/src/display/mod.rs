mod jhd1313m1;
mod lcd_array;

use thiserror_no_std::Error;

pub use jhd1313m1::JHD1313M1Display;
pub use lcd_array::{LcdArray, Line, format_reading};

use crate::protocol::jhd1313m1::UNPRINTABLE;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("{display}: bus error during {operation}")]
    Bus {
        display: &'static str,
        operation: &'static str,
    },
    #[error("invalid display position {0} (expected 0..=31)")]
    InvalidPosition(u8),
}

/// Map a character to the controller's character ROM (A00 table).
///
/// ASCII and Latin-1 pass through unchanged, except the degree sign which the
/// ROM keeps at 0xDF. Anything else becomes `?`.
pub fn rom_code(c: char) -> u8 {
    match c {
        '°' => 0xDF,
        c => u8::try_from(c).unwrap_or(UNPRINTABLE),
    }
}
