//! Device protocol constants
//!
//! Register addresses, command bytes, scaling divisors and timing for both
//! devices, defined once so the drivers and the datasheets can be checked
//! against a single table.

/// MPL115A2 barometer (digital pressure + temperature, I²C).
pub mod mpl115a2 {
    /// Default 7-bit bus address.
    pub const ADDRESS: u8 = 0x77;

    /// Pressure ADC MSB. The pressure/temperature block is four bytes from here.
    pub const REG_PRESSURE_MSB: u8 = 0x00;
    /// First coefficient register. The coefficient block is eight bytes from here.
    pub const REG_A0_COEFF_MSB: u8 = 0x04;
    /// Writing `[REG_START_CONVERSION, 0x00]` starts a pressure + temperature conversion.
    pub const REG_START_CONVERSION: u8 = 0x12;

    pub const COEFFICIENT_BLOCK_LEN: usize = 8;
    pub const READING_BLOCK_LEN: usize = 4;

    /// ADC words are left aligned; the low six bits are padding.
    pub const ADC_SHIFT: u32 = 6;

    pub const A0_DIVISOR: f32 = 8.0;
    pub const B1_DIVISOR: f32 = 8192.0;
    pub const B2_DIVISOR: f32 = 16384.0;
    /// c12 carries two unused low bits, dropped before scaling.
    pub const C12_SHIFT: u32 = 2;
    pub const C12_DIVISOR: f32 = 4194304.0;

    /// kPa per compensated count over the 50..115 kPa range.
    pub const PRESSURE_SCALE: f32 = 65.0 / 1023.0;
    pub const PRESSURE_OFFSET_KPA: f32 = 50.0;

    /// Temperature ADC count at the reference temperature.
    pub const TEMPERATURE_ADC_AT_REFERENCE: f32 = 498.0;
    /// ADC counts per °C (negative slope).
    pub const TEMPERATURE_COUNTS_PER_DEGREE: f32 = -5.35;
    pub const TEMPERATURE_REFERENCE_C: f32 = 25.0;

    /// Maximum conversion time after a start-conversion command.
    pub const CONVERSION_DELAY_MS: u32 = 5;
    pub const DEFAULT_POLL_INTERVAL_MS: u32 = 10;
}

/// JHD1313M1 16x2 character LCD with a PCA9633-style RGB backlight controller.
pub mod jhd1313m1 {
    /// Default 7-bit bus address of the character controller.
    pub const LCD_ADDRESS: u8 = 0x3E;
    /// Default 7-bit bus address of the backlight controller.
    pub const RGB_ADDRESS: u8 = 0x62;

    pub const COLUMNS: usize = 16;
    pub const ROWS: usize = 2;
    /// Highest valid position for `set_position`; 16 and up are the second line.
    pub const MAX_POSITION: u8 = 31;

    // Control byte prefixes
    pub const LCD_CMD: u8 = 0x80;
    pub const LCD_DATA: u8 = 0x40;

    // Commands
    pub const LCD_CLEARDISPLAY: u8 = 0x01;
    pub const LCD_RETURNHOME: u8 = 0x02;
    pub const LCD_ENTRYMODESET: u8 = 0x04;
    pub const LCD_DISPLAYCONTROL: u8 = 0x08;
    pub const LCD_CURSORSHIFT: u8 = 0x10;
    pub const LCD_FUNCTIONSET: u8 = 0x20;
    pub const LCD_SETDDRAMADDR: u8 = 0x80;

    // Entry mode flags
    pub const LCD_ENTRYLEFT: u8 = 0x02;
    pub const LCD_ENTRYSHIFTDECREMENT: u8 = 0x00;

    // Display control flags
    pub const LCD_DISPLAYON: u8 = 0x04;

    // Cursor/display shift flags
    pub const LCD_DISPLAYMOVE: u8 = 0x08;
    pub const LCD_MOVERIGHT: u8 = 0x04;
    pub const LCD_MOVELEFT: u8 = 0x00;

    // Function set flags
    pub const LCD_2LINE: u8 = 0x08;

    /// DDRAM address bit selecting the second line.
    pub const LCD_2NDLINEOFFSET: u8 = 0x40;

    // Backlight controller registers
    pub const REG_MODE1: u8 = 0x00;
    pub const REG_MODE2: u8 = 0x01;
    pub const REG_BLUE: u8 = 0x02;
    pub const REG_GREEN: u8 = 0x03;
    pub const REG_RED: u8 = 0x04;
    pub const REG_OUTPUT: u8 = 0x08;
    /// All LED outputs driven by their individual PWM registers.
    pub const OUTPUT_PWM_ALL: u8 = 0xAA;

    /// Power-up settle time before the first command.
    pub const POWER_UP_DELAY_US: u32 = 50_000;
    /// Settle time between the initial configuration commands.
    pub const COMMAND_DELAY_US: u32 = 100;
    /// Return-home completes slowly; back-to-back clear/home races without this.
    pub const HOME_DELAY_MS: u32 = 2;
    /// Lead-in before data writes so a preceding clear has finished.
    pub const WRITE_DELAY_MS: u32 = 1;

    /// Written in place of characters the controller ROM cannot address.
    pub const UNPRINTABLE: u8 = b'?';
}
