//! Driver error type.

use hal::{DeviceId, HalError};
use thiserror::Error;

/// Errors reported by [`AdcController`](crate::AdcController) and
/// [`AdcChannel`](crate::AdcChannel).
///
/// Precondition violations are detected before the peripheral is touched.
/// [`AdcError::Hardware`] carries the peripheral's own failure unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdcError {
    #[error("{0} already has an open controller")]
    AlreadyOpen(DeviceId),

    #[error("channel {index} out of range, device has {count} channels")]
    InvalidChannel { index: u8, count: u8 },

    #[error("unsupported configuration: {0}")]
    Unsupported(&'static str),

    #[error("channel {0} is already open")]
    ChannelInUse(u8),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("continuous sampling is already running")]
    AlreadyRunning,

    #[error("continuous sampling is not running")]
    NotRunning,

    #[error("single conversion requested while continuous sampling is running")]
    ConcurrentOperation,

    #[error("channel or controller has been disposed")]
    Disposed,

    #[error("hardware error: {0}")]
    Hardware(#[from] HalError),
}

/// Result type for driver operations
pub type AdcResult<T> = Result<T, AdcError>;

#[cfg(feature = "defmt")]
impl defmt::Format for AdcError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            AdcError::AlreadyOpen(device) => defmt::write!(fmt, "AlreadyOpen({})", device),
            AdcError::InvalidChannel { index, count } => {
                defmt::write!(fmt, "InvalidChannel({}/{})", index, count)
            }
            AdcError::Unsupported(what) => defmt::write!(fmt, "Unsupported({})", what),
            AdcError::ChannelInUse(index) => defmt::write!(fmt, "ChannelInUse({})", index),
            AdcError::InvalidArgument(what) => defmt::write!(fmt, "InvalidArgument({})", what),
            AdcError::AlreadyRunning => defmt::write!(fmt, "AlreadyRunning"),
            AdcError::NotRunning => defmt::write!(fmt, "NotRunning"),
            AdcError::ConcurrentOperation => defmt::write!(fmt, "ConcurrentOperation"),
            AdcError::Disposed => defmt::write!(fmt, "Disposed"),
            AdcError::Hardware(err) => defmt::write!(fmt, "Hardware({})", err),
        }
    }
}
