//! Simulated HAL implementation
//!
//! Host-side implementation of the Giant Gecko ADC Register Access Layer.
//! Inputs are driven by scriptable [`Signal`] sources and conversions are
//! fully deterministic, so driver behavior can be tested without silicon.
//!
//! ## Example
//! ```
//! use hal::adc::AdcPeripheral;
//! use hal::{ControllerConfig, ChannelConfig, DeviceId};
//! use hal_sim::{SimConfig, Signal, SimulatedAdc};
//!
//! let mut adc = SimulatedAdc::new(SimConfig::new(DeviceId(7)));
//! adc.probe().set_signal(0, Signal::Constant(1234));
//! adc.init(&ControllerConfig::default()).unwrap();
//! adc.open_channel(0, &ChannelConfig::default()).unwrap();
//! assert_eq!(adc.read_single(0, 1).unwrap(), 1234);
//! ```

pub mod adc;
pub mod signal;

// Re-export commonly used types
pub use adc::{SimCall, SimConfig, SimProbe, SimulatedAdc};
pub use signal::{mean_truncated, Signal};
