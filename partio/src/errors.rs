// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for sector IO operations.
pub type SectorIOResult<T = ()> = core::result::Result<T, SectorIOError>;

/// Error type for sector IO operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorIOError {
    /// No device is registered under this disk number (or it went away).
    DeviceUnavailable(u32),
    OutOfBounds,
    Unsupported,
    Other(&'static str),
}

impl SectorIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            SectorIOError::DeviceUnavailable(_) => "Device unavailable",
            SectorIOError::OutOfBounds => "Out of bounds",
            SectorIOError::Unsupported => "Unsupported operation",
            SectorIOError::Other(msg) => msg,
        }
    }
}

impl From<&'static str> for SectorIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        SectorIOError::Other(msg)
    }
}

impl fmt::Display for SectorIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorIOError::DeviceUnavailable(disk) => write!(f, "{} (disk {disk})", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}
