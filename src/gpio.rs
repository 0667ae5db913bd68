//! Digital input line access.
//!
//! The run loop only needs "read a level from a numbered line", expressed by
//! [`InputLine`]. On Linux the line is requested from the GPIO character
//! device (`/dev/gpiochipN`); line offsets on a Raspberry Pi's `gpiochip0`
//! are the BCM pin numbers.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Consumer label shown by `gpioinfo` for the requested line.
#[cfg(target_os = "linux")]
const CONSUMER: &str = "wake";

/// Instantaneous state of an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLevel {
    High,
    Low,
}

impl From<u8> for InputLevel {
    fn from(value: u8) -> Self {
        if value == 0 {
            InputLevel::Low
        } else {
            InputLevel::High
        }
    }
}

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("failed to open GPIO chip {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("failed to request GPIO line {pin} as input: {message}")]
    Request { pin: u32, message: String },

    #[error("failed to read GPIO line {pin}: {message}")]
    Read { pin: u32, message: String },

    #[cfg(not(target_os = "linux"))]
    #[error("GPIO access is only supported on Linux")]
    Unsupported,
}

/// Source of input levels polled by the run loop.
pub trait InputLine {
    fn read_level(&mut self) -> Result<InputLevel, GpioError>;
}

/// An input line requested from a GPIO character device. The line is
/// released when this value is dropped.
#[cfg(target_os = "linux")]
pub struct CdevInputLine {
    pin: u32,
    handle: linux_embedded_hal::gpio_cdev::LineHandle,
}

#[cfg(target_os = "linux")]
impl CdevInputLine {
    pub fn open(chip: &Path, pin: u32) -> Result<Self, GpioError> {
        use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};

        let mut chip = Chip::new(chip).map_err(|e| GpioError::Open {
            path: chip.to_path_buf(),
            message: e.to_string(),
        })?;
        let request_err = |e: linux_embedded_hal::gpio_cdev::Error| GpioError::Request {
            pin,
            message: e.to_string(),
        };
        let handle = chip
            .get_line(pin)
            .map_err(request_err)?
            .request(LineRequestFlags::INPUT, 0, CONSUMER)
            .map_err(request_err)?;

        tracing::debug!(pin, "GPIO line requested as input");
        Ok(Self { pin, handle })
    }
}

#[cfg(target_os = "linux")]
impl InputLine for CdevInputLine {
    fn read_level(&mut self) -> Result<InputLevel, GpioError> {
        self.handle
            .get_value()
            .map(InputLevel::from)
            .map_err(|e| GpioError::Read {
                pin: self.pin,
                message: e.to_string(),
            })
    }
}

#[cfg(target_os = "linux")]
impl Drop for CdevInputLine {
    fn drop(&mut self) {
        tracing::debug!(pin = self.pin, "releasing GPIO line");
    }
}

#[cfg(not(target_os = "linux"))]
pub struct CdevInputLine;

#[cfg(not(target_os = "linux"))]
impl CdevInputLine {
    pub fn open(_chip: &Path, _pin: u32) -> Result<Self, GpioError> {
        Err(GpioError::Unsupported)
    }
}

#[cfg(not(target_os = "linux"))]
impl InputLine for CdevInputLine {
    fn read_level(&mut self) -> Result<InputLevel, GpioError> {
        Err(GpioError::Unsupported)
    }
}
