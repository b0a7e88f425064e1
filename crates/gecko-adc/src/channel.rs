//! Single-conversion channel handle.

use core::fmt;
use std::sync::Weak;

use hal::adc::SingleSampleInput;
use hal::{AdcPeripheral, ChannelConfig, DeviceId};
use log::trace;
use parking_lot::Mutex;

use crate::controller::Shared;
use crate::error::{AdcError, AdcResult};

/// Input channel opened on an [`AdcController`](crate::AdcController)
///
/// The channel does not keep its controller alive. Once the controller is
/// closed every read fails with [`AdcError::Disposed`]. Each operation holds
/// the channel's own lock, so one handle can be shared between threads.
/// Dropping the handle disposes it.
pub struct AdcChannel<P: AdcPeripheral> {
    controller: Weak<Shared<P>>,
    device: DeviceId,
    index: u8,
    config: ChannelConfig,
    disposed: Mutex<bool>,
}

impl<P: AdcPeripheral> AdcChannel<P> {
    pub(crate) fn new(
        controller: Weak<Shared<P>>,
        device: DeviceId,
        index: u8,
        config: ChannelConfig,
    ) -> Self {
        Self {
            controller,
            device,
            index,
            config,
            disposed: Mutex::new(false),
        }
    }

    /// Channel number on the device
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Configuration the channel was opened with
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Multiplexer input the channel converts
    pub fn input(&self) -> Option<SingleSampleInput> {
        SingleSampleInput::from_code(self.index, self.config.mode)
    }

    /// Device of the controller that opened this channel
    pub fn controller_device(&self) -> DeviceId {
        self.device
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.lock()
    }

    /// Convert once and return the digital value
    pub fn read_value(&self) -> AdcResult<i32> {
        self.convert(1)
    }

    /// Convert `count` times and return the mean, truncated toward zero
    pub fn read_value_averaged(&self, count: u32) -> AdcResult<i32> {
        self.convert(count)
    }

    /// Convert once and scale the result to `[0.0, 1.0]`
    ///
    /// Only available on fixed-resolution devices; configurable-resolution
    /// devices return [`AdcError::Unsupported`].
    pub fn read_ratio(&self) -> AdcResult<f64> {
        self.transact(|hw, index| {
            let range = hw
                .fixed_range()
                .ok_or(AdcError::Unsupported("ratio needs a fixed-resolution device"))?;
            let value = hw.read_single(index, 1)?;
            if range.max <= 0 {
                return Ok(0.0);
            }
            Ok((value as f64 / range.max as f64).clamp(0.0, 1.0))
        })
    }

    /// Release the channel at the peripheral
    ///
    /// Calling this more than once is a no-op, as is disposing after the
    /// controller was closed.
    pub fn dispose(&self) {
        let mut disposed = self.disposed.lock();
        if *disposed {
            return;
        }
        *disposed = true;
        if let Some(shared) = self.controller.upgrade() {
            shared.release_channel(self.index);
        }
    }

    fn convert(&self, count: u32) -> AdcResult<i32> {
        self.transact(|hw, index| {
            if count == 0 {
                return Err(AdcError::InvalidArgument("average count must be at least 1"));
            }
            let value = hw.read_single(index, count)?;
            trace!("channel {} read {} (x{})", index, value, count);
            Ok(value)
        })
    }

    fn transact<T>(&self, f: impl FnOnce(&mut P, u8) -> AdcResult<T>) -> AdcResult<T> {
        let disposed = self.disposed.lock();
        if *disposed {
            return Err(AdcError::Disposed);
        }
        let shared = self.controller.upgrade().ok_or(AdcError::Disposed)?;
        let result = shared.with_converter(|hw| f(hw, self.index));
        drop(disposed);
        result
    }
}

impl<P: AdcPeripheral> Drop for AdcChannel<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: AdcPeripheral> fmt::Debug for AdcChannel<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdcChannel")
            .field("device", &self.device)
            .field("index", &self.index)
            .field("config", &self.config)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
