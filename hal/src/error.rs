//! Error types reported by Register Access Layer implementations

use core::fmt;

/// Failures reported by the peripheral beneath the driver.
///
/// The driver core passes these through unchanged; it never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Register value or argument rejected by the peripheral
    InvalidParameter,
    /// Combination of settings the silicon cannot produce
    ConfigurationError,
    /// Peripheral has not been initialized
    NotInitialized,
    /// Conversion still in progress
    Busy,
    /// Conversion did not complete in time
    Timeout,
    /// Bus fault while accessing peripheral registers
    BusFault,
    /// Vendor-specific error code
    VendorError(i32),
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::ConfigurationError => write!(f, "configuration error"),
            Self::NotInitialized => write!(f, "peripheral not initialized"),
            Self::Busy => write!(f, "conversion in progress"),
            Self::Timeout => write!(f, "conversion timeout"),
            Self::BusFault => write!(f, "bus fault"),
            Self::VendorError(code) => write!(f, "vendor error code: {}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidParameter => defmt::write!(fmt, "InvalidParameter"),
            Self::ConfigurationError => defmt::write!(fmt, "ConfigurationError"),
            Self::NotInitialized => defmt::write!(fmt, "NotInitialized"),
            Self::Busy => defmt::write!(fmt, "Busy"),
            Self::Timeout => defmt::write!(fmt, "Timeout"),
            Self::BusFault => defmt::write!(fmt, "BusFault"),
            Self::VendorError(code) => defmt::write!(fmt, "VendorError({})", code),
        }
    }
}

/// Result type for Register Access Layer operations
pub type HalResult<T> = Result<T, HalError>;
