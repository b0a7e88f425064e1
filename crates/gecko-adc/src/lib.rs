//! # gecko-adc
//!
//! Driver core for the Silicon Labs Giant Gecko analog-to-digital converter.
//! Register programming is delegated to an [`AdcPeripheral`] implementation
//! from a vendor crate (or `hal-sim` on the host); this crate owns the
//! lifecycle and access rules on top of it.
//!
//! ## Module Overview
//! - [`registry`]   – One live controller per device.
//! - [`controller`] – Controller state machine and continuous sampling.
//! - [`channel`]    – Single and averaged conversions on one input.
//! - [`buffer`]     – Scan channel set and last-sample buffer.
//! - [`error`]      – Driver error type.
//!
//! ## Example
//! ```
//! use gecko_adc::{AdcController, ChannelConfig};
//! use hal::DeviceId;
//! use hal_sim::{SimConfig, Signal, SimulatedAdc};
//!
//! let adc = SimulatedAdc::new(SimConfig::new(DeviceId(3)));
//! adc.probe().set_signal(0, Signal::Constant(2048));
//!
//! let controller = AdcController::open_default(adc)?;
//! let channel = controller.open_channel(0, ChannelConfig::default())?;
//! assert_eq!(channel.read_value()?, 2048);
//!
//! controller.start_continuous_sampling(&[0, 2], ChannelConfig::default(), 4)?;
//! assert_eq!(controller.last_samples()?.len(), 2);
//! controller.stop_continuous_sampling()?;
//! # Ok::<(), gecko_adc::AdcError>(())
//! ```

pub mod buffer;
pub mod channel;
pub mod controller;
pub mod error;
pub mod registry;

pub use buffer::{ScanChannels, MAX_SCAN_CHANNELS};
pub use channel::AdcChannel;
pub use controller::{AdcController, ControllerState};
pub use error::{AdcError, AdcResult};
pub use hal::adc::{
    AcquisitionTime, AdcPeripheral, Capabilities, ChannelConfig, ChannelMode, ControllerConfig,
    DeviceId, LowpassFilterMode, OversampleRate, PrsTrigger, ReferenceVoltage, ResolutionSet,
    SampleRange, SampleResolution, SingleSampleInput, WarmUpMode,
};
pub use hal::HalError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests;
