//! Hardware Abstraction Layer (HAL) for the Giant Gecko ADC
//!
//! This crate provides the Register Access Layer contract that the
//! `gecko-adc` driver core is built on, together with the configuration
//! vocabulary of the converter. Vendor crates implement [`adc::AdcPeripheral`]
//! against real registers; `hal-sim` implements it for host testing.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

pub mod adc;
pub mod error;

// Re-export commonly used types
pub use adc::{AdcPeripheral, ChannelConfig, ControllerConfig, DeviceId, ScanSequence};
pub use error::{HalError, HalResult};
