//! ADC controller: device ownership, channel bookkeeping and continuous sampling.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::BTreeSet;
use std::sync::Arc;

use hal::adc::{Capabilities, ChannelMode, ResolutionSet, SampleRange, SingleSampleInput};
use hal::{AdcPeripheral, ChannelConfig, ControllerConfig, DeviceId, ScanSequence};
use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::buffer::{SampleBuffer, ScanChannels};
use crate::channel::AdcChannel;
use crate::error::{AdcError, AdcResult};
use crate::registry::{self, DeviceLease};

/// Lifecycle state of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Initialized, single conversions allowed
    Ready,
    /// Continuous sampling running, single conversions rejected
    Sampling,
    /// Peripheral powered down, every operation rejected
    Closed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Ready => write!(f, "ready"),
            ControllerState::Sampling => write!(f, "sampling"),
            ControllerState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControllerState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ControllerState::Ready => defmt::write!(fmt, "Ready"),
            ControllerState::Sampling => defmt::write!(fmt, "Sampling"),
            ControllerState::Closed => defmt::write!(fmt, "Closed"),
        }
    }
}

/// Bookkeeping guarded by the controller lock
#[derive(Debug)]
struct Inner {
    state: ControllerState,
    open_channels: BTreeSet<u8>,
    scan_config: Option<ChannelConfig>,
    buffer: SampleBuffer,
}

impl Inner {
    fn ensure_open(&self) -> AdcResult<()> {
        match self.state {
            ControllerState::Closed => Err(AdcError::Disposed),
            _ => Ok(()),
        }
    }
}

/// State shared between a controller and the channels it opened.
///
/// Lock order is channel lock, then `inner`, then `hw`. Channel reads skip
/// `inner` and consult the atomic flags while holding `hw`.
pub(crate) struct Shared<P> {
    device: DeviceId,
    config: ControllerConfig,
    inner: Mutex<Inner>,
    hw: Mutex<P>,
    sampling: AtomicBool,
    closed: AtomicBool,
}

impl<P: AdcPeripheral> Shared<P> {
    /// Run a single-conversion transaction against the peripheral
    ///
    /// Fails if the controller is closed or a scan owns the converter.
    pub(crate) fn with_converter<T>(
        &self,
        f: impl FnOnce(&mut P) -> AdcResult<T>,
    ) -> AdcResult<T> {
        let mut hw = self.hw.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(AdcError::Disposed);
        }
        if self.sampling.load(Ordering::Acquire) {
            return Err(AdcError::ConcurrentOperation);
        }
        f(&mut *hw)
    }

    /// Release `channel` after its handle was disposed
    pub(crate) fn release_channel(&self, channel: u8) {
        let mut inner = self.inner.lock();
        if inner.state == ControllerState::Closed || !inner.open_channels.remove(&channel) {
            return;
        }
        if let Err(err) = self.hw.lock().close_channel(channel) {
            warn!("{}: closing channel {} failed: {}", self.device, channel, err);
        }
        debug!("{}: channel {} closed", self.device, channel);
    }

    fn shutdown(&self) -> AdcResult<()> {
        let mut inner = self.inner.lock();
        if inner.state == ControllerState::Closed {
            return Ok(());
        }

        let mut hw = self.hw.lock();
        let mut result = Ok(());
        if inner.state == ControllerState::Sampling {
            result = hw.stop_scan().map_err(AdcError::from);
        }
        self.sampling.store(false, Ordering::Release);
        if let Err(err) = hw.deinit() {
            result = result.and(Err(err.into()));
        }
        self.closed.store(true, Ordering::Release);
        drop(hw);

        inner.state = ControllerState::Closed;
        inner.open_channels.clear();
        inner.scan_config = None;
        inner.buffer.disarm();
        debug!("{}: controller closed", self.device);
        result
    }
}

/// Owner of one ADC peripheral
///
/// Only one controller may exist per device at a time; see
/// [`registry`](crate::registry). Dropping the controller stops any running
/// scan, powers the converter down and releases the device.
///
/// All methods take `&self`, so a controller can be shared between threads
/// behind an [`Arc`].
pub struct AdcController<P: AdcPeripheral> {
    shared: Arc<Shared<P>>,
    lease: DeviceLease,
}

impl<P: AdcPeripheral> AdcController<P> {
    /// Claim and initialize `peripheral`
    ///
    /// Fails with [`AdcError::AlreadyOpen`] if the device already has a live
    /// controller. If initialization fails the device stays available.
    pub fn open(mut peripheral: P, config: ControllerConfig) -> AdcResult<Self> {
        let device = peripheral.device_id();
        let lease = registry::acquire(device)?;
        peripheral.init(&config)?;
        debug!("{}: controller open ({} channels)", device, peripheral.channel_count());

        let shared = Shared {
            device,
            config,
            inner: Mutex::new(Inner {
                state: ControllerState::Ready,
                open_channels: BTreeSet::new(),
                scan_config: None,
                buffer: SampleBuffer::default(),
            }),
            hw: Mutex::new(peripheral),
            sampling: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };
        Ok(Self {
            shared: Arc::new(shared),
            lease,
        })
    }

    /// Claim and initialize `peripheral` with the default configuration
    pub fn open_default(peripheral: P) -> AdcResult<Self> {
        Self::open(peripheral, ControllerConfig::default())
    }

    /// Device this controller owns
    pub fn device_id(&self) -> DeviceId {
        self.lease.device()
    }

    /// Configuration the converter was initialized with
    pub fn config(&self) -> &ControllerConfig {
        &self.shared.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> ControllerState {
        self.shared.inner.lock().state
    }

    /// Check whether continuous sampling is running
    pub fn is_sampling(&self) -> bool {
        self.shared.sampling.load(Ordering::Acquire)
    }

    /// Number of input channels on the device
    pub fn channel_count(&self) -> u8 {
        self.shared.hw.lock().channel_count()
    }

    /// Resolutions the converter can be configured for
    pub fn supported_resolutions(&self) -> ResolutionSet {
        self.shared.hw.lock().supported_resolutions()
    }

    /// Check whether channels can be opened in `mode`
    pub fn is_channel_mode_supported(&self, mode: ChannelMode) -> bool {
        self.shared.hw.lock().is_channel_mode_supported(mode)
    }

    /// Optional features of the peripheral
    pub fn capabilities(&self) -> Capabilities {
        self.shared.hw.lock().capabilities()
    }

    /// Largest conversion result, on fixed-resolution devices only
    pub fn max_value(&self) -> Option<i32> {
        self.fixed_range().map(|range| range.max)
    }

    /// Smallest conversion result, on fixed-resolution devices only
    pub fn min_value(&self) -> Option<i32> {
        self.fixed_range().map(|range| range.min)
    }

    /// Bits per conversion result, on fixed-resolution devices only
    pub fn resolution_in_bits(&self) -> Option<u8> {
        self.fixed_range().map(|range| {
            let span = range.max.abs_diff(range.min);
            (u32::BITS - span.leading_zeros()) as u8
        })
    }

    fn fixed_range(&self) -> Option<SampleRange> {
        self.shared.hw.lock().fixed_range()
    }

    /// Open `index` for single conversions
    ///
    /// The configuration is copied into the channel; later changes to the
    /// caller's value have no effect. Opening is allowed while sampling.
    pub fn open_channel(&self, index: u8, config: ChannelConfig) -> AdcResult<AdcChannel<P>> {
        let mut inner = self.shared.inner.lock();
        inner.ensure_open()?;

        let mut hw = self.shared.hw.lock();
        check_channel(&*hw, index)?;
        check_config(&*hw, &config)?;
        if inner.open_channels.contains(&index) {
            return Err(AdcError::ChannelInUse(index));
        }
        hw.open_channel(index, &config)?;
        drop(hw);

        inner.open_channels.insert(index);
        debug!("{}: channel {} open ({:?})", self.shared.device, index, config.resolution);
        Ok(AdcChannel::new(
            Arc::downgrade(&self.shared),
            self.shared.device,
            index,
            config,
        ))
    }

    /// Open a multiplexer input by name
    ///
    /// The channel mode in `config` is replaced by the one `input` needs.
    pub fn open_input(
        &self,
        input: SingleSampleInput,
        config: ChannelConfig,
    ) -> AdcResult<AdcChannel<P>> {
        self.open_channel(input.code(), config.mode(input.mode()))
    }

    /// Open `index` with the default channel configuration
    pub fn open_channel_default(&self, index: u8) -> AdcResult<AdcChannel<P>> {
        self.open_channel(index, ChannelConfig::default())
    }

    /// Start scanning `channels` continuously
    ///
    /// With `average_count` N above 1, each buffer slot holds the rolling
    /// mean of the last N conversions of its channel, truncated toward zero.
    /// Slot order follows `channels`.
    pub fn start_continuous_sampling(
        &self,
        channels: &[u8],
        config: ChannelConfig,
        average_count: u32,
    ) -> AdcResult<()> {
        let mut inner = self.shared.inner.lock();
        inner.ensure_open()?;
        if inner.state == ControllerState::Sampling {
            return Err(AdcError::AlreadyRunning);
        }
        if average_count == 0 {
            return Err(AdcError::InvalidArgument("average count must be at least 1"));
        }
        let scan = scan_channels(channels)?;

        let mut hw = self.shared.hw.lock();
        if !hw.capabilities().continuous_sampling {
            return Err(AdcError::Unsupported("continuous sampling"));
        }
        for &index in &scan {
            check_channel(&*hw, index)?;
        }
        check_config(&*hw, &config)?;

        let sequence = ScanSequence {
            channels: &scan,
            config: &config,
            average_count,
        };
        hw.start_scan(&sequence)?;
        self.shared.sampling.store(true, Ordering::Release);
        debug!(
            "{}: scan started, mask {:#010x}, average {}",
            self.shared.device,
            sequence.input_mask(),
            average_count
        );
        drop(hw);

        inner.state = ControllerState::Sampling;
        inner.scan_config = Some(config);
        inner.buffer.arm(scan, average_count);
        Ok(())
    }

    /// Start scanning `channels` with the default configuration and raw samples
    pub fn start_continuous_sampling_default(&self, channels: &[u8]) -> AdcResult<()> {
        self.start_continuous_sampling(channels, ChannelConfig::default(), 1)
    }

    /// Stop the running scan; the sample buffer becomes invalid
    pub fn stop_continuous_sampling(&self) -> AdcResult<()> {
        let mut inner = self.shared.inner.lock();
        inner.ensure_open()?;
        if inner.state != ControllerState::Sampling {
            return Err(AdcError::NotRunning);
        }

        let mut hw = self.shared.hw.lock();
        hw.stop_scan()?;
        self.shared.sampling.store(false, Ordering::Release);
        drop(hw);

        inner.state = ControllerState::Ready;
        inner.scan_config = None;
        inner.buffer.disarm();
        debug!("{}: scan stopped", self.shared.device);
        Ok(())
    }

    /// Snapshot of the latest scan values, one per scanned channel
    pub fn last_samples(&self) -> AdcResult<Vec<i32>> {
        let mut inner = self.shared.inner.lock();
        inner.ensure_open()?;
        let mut hw = self.shared.hw.lock();
        let samples = inner
            .buffer
            .refresh(&mut *hw)
            .ok_or(AdcError::NotRunning)?
            .to_vec();
        trace!("{}: last samples {:?}", self.shared.device, samples);
        Ok(samples)
    }

    /// Latest scan value for `channel`
    pub fn last_sample_for(&self, channel: u8) -> AdcResult<i32> {
        let mut inner = self.shared.inner.lock();
        inner.ensure_open()?;
        if !inner.buffer.is_armed() {
            return Err(AdcError::NotRunning);
        }
        let slot = inner
            .buffer
            .slot_of(channel)
            .ok_or(AdcError::InvalidArgument("channel is not part of the scan"))?;
        let mut hw = self.shared.hw.lock();
        let samples = inner.buffer.refresh(&mut *hw).ok_or(AdcError::NotRunning)?;
        Ok(samples[slot])
    }

    /// Channels of the running scan, in buffer order
    pub fn scan_channels(&self) -> Option<ScanChannels> {
        self.shared.inner.lock().buffer.channels().cloned()
    }

    /// Averaging window of the running scan
    pub fn scan_average_count(&self) -> Option<u32> {
        self.shared.inner.lock().buffer.average_count()
    }

    /// Channel configuration of the running scan
    pub fn scan_config(&self) -> Option<ChannelConfig> {
        self.shared.inner.lock().scan_config.clone()
    }

    /// Channels currently open for single conversions
    pub fn open_channels(&self) -> Vec<u8> {
        self.shared.inner.lock().open_channels.iter().copied().collect()
    }

    /// Stop any running scan, power the converter down and release the device
    ///
    /// Unlike dropping, errors from the peripheral are returned. The device
    /// is released either way.
    pub fn close(self) -> AdcResult<()> {
        self.shared.shutdown()
    }
}

impl<P: AdcPeripheral> Drop for AdcController<P> {
    fn drop(&mut self) {
        if let Err(err) = self.shared.shutdown() {
            warn!("{}: shutdown failed: {}", self.shared.device, err);
        }
    }
}

impl<P: AdcPeripheral> fmt::Debug for AdcController<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdcController")
            .field("device", &self.shared.device)
            .field("state", &self.state())
            .finish()
    }
}

fn check_channel<P: AdcPeripheral + ?Sized>(hw: &P, index: u8) -> AdcResult<()> {
    let count = hw.channel_count();
    if index < count {
        Ok(())
    } else {
        Err(AdcError::InvalidChannel { index, count })
    }
}

fn check_config<P: AdcPeripheral + ?Sized>(hw: &P, config: &ChannelConfig) -> AdcResult<()> {
    if !hw.supported_resolutions().contains(config.resolution) {
        return Err(AdcError::Unsupported("sample resolution"));
    }
    if !hw.is_channel_mode_supported(config.mode) {
        return Err(AdcError::Unsupported("channel mode"));
    }
    Ok(())
}

fn scan_channels(channels: &[u8]) -> AdcResult<ScanChannels> {
    if channels.is_empty() {
        return Err(AdcError::InvalidArgument("scan needs at least one channel"));
    }
    let scan = ScanChannels::from_slice(channels)
        .map_err(|_| AdcError::InvalidArgument("too many channels in scan"))?;
    for (i, ch) in scan.iter().enumerate() {
        if scan[..i].contains(ch) {
            return Err(AdcError::InvalidArgument("duplicate channel in scan"));
        }
    }
    Ok(scan)
}
