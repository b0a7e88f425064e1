//! Simulated ADC peripheral

use std::collections::BTreeMap;
use std::sync::Arc;

use hal::adc::{
    AdcPeripheral, Capabilities, ChannelConfig, ChannelMode, ControllerConfig, DeviceId,
    ResolutionSet, SampleRange, SampleResolution, ScanSequence, SingleSampleInput,
};
use hal::error::{HalError, HalResult};
use log::trace;
use parking_lot::Mutex;

use crate::signal::{mean_truncated, RollingWindow, Signal};

/// Single-ended input mux of the EFM32GG ADC0: eight pins and eight
/// internal sources
pub const DEFAULT_CHANNEL_COUNT: u8 = SingleSampleInput::SINGLE_ENDED_COUNT;

/// Static description of the simulated silicon
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub device: DeviceId,
    pub channel_count: u8,
    pub resolutions: ResolutionSet,
    pub capabilities: Capabilities,
    pub fixed_range: Option<SampleRange>,
    pub differential: bool,
}

impl SimConfig {
    /// Full-featured Giant Gecko ADC with the complete input mux
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            channel_count: DEFAULT_CHANNEL_COUNT,
            resolutions: ResolutionSet::ALL,
            capabilities: Capabilities::FULL,
            fixed_range: None,
            differential: true,
        }
    }

    /// Legacy converter with a single fixed resolution and no scan support
    pub fn fixed_resolution(device: DeviceId, resolution: SampleResolution) -> Self {
        Self {
            resolutions: ResolutionSet::only(resolution),
            capabilities: Capabilities {
                configurable_resolution: false,
                continuous_sampling: false,
            },
            fixed_range: Some(SampleRange {
                min: 0,
                max: resolution.max_value(),
            }),
            ..Self::new(device)
        }
    }

    pub fn channel_count(mut self, count: u8) -> Self {
        self.channel_count = count;
        self
    }

    pub fn resolutions(mut self, resolutions: ResolutionSet) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn differential(mut self, supported: bool) -> Self {
        self.differential = supported;
        self
    }
}

/// Register Access Layer call, as recorded by the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    Init,
    Deinit,
    OpenChannel(u8),
    CloseChannel(u8),
    ReadSingle { channel: u8, average_count: u32 },
    StartScan { input_mask: u32, average_count: u32 },
    StopScan,
}

#[derive(Debug)]
struct ScanState {
    channels: Vec<u8>,
    resolution: SampleResolution,
    mode: ChannelMode,
    windows: Vec<RollingWindow>,
}

#[derive(Debug, Default)]
struct SimState {
    config: Option<ControllerConfig>,
    open: BTreeMap<u8, ChannelConfig>,
    signals: BTreeMap<u8, Signal>,
    conversions: BTreeMap<u8, u64>,
    scan: Option<ScanState>,
    fail_next: Option<HalError>,
    calls: Vec<SimCall>,
}

impl SimState {
    fn take_fault(&mut self) -> HalResult<()> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn ensure_initialized(&self) -> HalResult<()> {
        if self.config.is_some() {
            Ok(())
        } else {
            Err(HalError::NotInitialized)
        }
    }

    fn convert(
        &mut self,
        sim: &SimConfig,
        channel: u8,
        resolution: SampleResolution,
        mode: ChannelMode,
    ) -> i32 {
        let n = self.conversions.entry(channel).or_insert(0);
        let raw = match self.signals.get(&channel) {
            Some(signal) => signal.sample(*n),
            None => unwired_level(channel, mode, resolution),
        };
        *n += 1;

        let (min, max) = match (sim.fixed_range, mode) {
            (Some(range), _) => (range.min, range.max),
            (None, ChannelMode::SingleEnded) => (0, resolution.max_value()),
            (None, ChannelMode::Differential) => {
                let half = (resolution.max_value() + 1) / 2;
                (-half, half - 1)
            }
        };
        raw.clamp(min, max)
    }

    fn tick(&mut self, sim: &SimConfig) {
        let Some(mut scan) = self.scan.take() else {
            return;
        };
        for (slot, &channel) in scan.channels.iter().enumerate() {
            let sample = self.convert(sim, channel, scan.resolution, scan.mode);
            scan.windows[slot].push(sample);
        }
        self.scan = Some(scan);
    }
}

/// Reading of an input with no programmed signal. Pins float at 0; the
/// supply taps report their nominal share of full scale.
fn unwired_level(channel: u8, mode: ChannelMode, resolution: SampleResolution) -> i32 {
    let full = resolution.max_value();
    match SingleSampleInput::from_code(channel, mode) {
        Some(SingleSampleInput::Vdd) => full,
        Some(SingleSampleInput::VddDiv3) => full / 3,
        Some(SingleSampleInput::VrefDiv2) => (full + 1) / 2,
        _ => 0,
    }
}

/// Handle for observing and driving a [`SimulatedAdc`] after it has been
/// moved into a driver.
#[derive(Clone)]
pub struct SimProbe {
    sim: Arc<SimConfig>,
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    /// Wire `signal` to input `channel`
    pub fn set_signal(&self, channel: u8, signal: Signal) {
        self.state.lock().signals.insert(channel, signal);
    }

    /// Make the next fallible peripheral call return `err`
    pub fn fail_next(&self, err: HalError) {
        self.state.lock().fail_next = Some(err);
    }

    /// Run one conversion pass over the scan sequence, as the scan-complete
    /// interrupt would.
    pub fn tick(&self) {
        self.state.lock().tick(&self.sim);
    }

    /// Run `count` conversion passes
    pub fn tick_n(&self, count: usize) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.tick(&self.sim);
        }
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().calls.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().config.is_some()
    }

    /// Configuration last passed to `init`
    pub fn controller_config(&self) -> Option<ControllerConfig> {
        self.state.lock().config.clone()
    }

    /// Configuration `channel` was opened with, if it is open
    pub fn channel_config(&self, channel: u8) -> Option<ChannelConfig> {
        self.state.lock().open.get(&channel).cloned()
    }

    pub fn open_channels(&self) -> Vec<u8> {
        self.state.lock().open.keys().copied().collect()
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().scan.is_some()
    }

    /// Number of conversions performed on `channel` so far
    pub fn conversions(&self, channel: u8) -> u64 {
        self.state.lock().conversions.get(&channel).copied().unwrap_or(0)
    }
}

/// Simulated Giant Gecko ADC instance
pub struct SimulatedAdc {
    sim: Arc<SimConfig>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedAdc {
    pub fn new(config: SimConfig) -> Self {
        Self {
            sim: Arc::new(config),
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    pub fn probe(&self) -> SimProbe {
        SimProbe {
            sim: Arc::clone(&self.sim),
            state: Arc::clone(&self.state),
        }
    }

    fn check_channel(&self, channel: u8) -> HalResult<()> {
        if channel < self.sim.channel_count {
            Ok(())
        } else {
            Err(HalError::InvalidParameter)
        }
    }
}

impl AdcPeripheral for SimulatedAdc {
    fn device_id(&self) -> DeviceId {
        self.sim.device
    }

    fn init(&mut self, config: &ControllerConfig) -> HalResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::Init);
        state.take_fault()?;
        trace!("{}: init {:?}", self.sim.device, config);
        state.config = Some(config.clone());
        Ok(())
    }

    fn deinit(&mut self) -> HalResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::Deinit);
        state.take_fault()?;
        state.config = None;
        state.scan = None;
        state.open.clear();
        Ok(())
    }

    fn open_channel(&mut self, channel: u8, config: &ChannelConfig) -> HalResult<()> {
        self.check_channel(channel)?;
        let mut state = self.state.lock();
        state.calls.push(SimCall::OpenChannel(channel));
        state.take_fault()?;
        state.ensure_initialized()?;
        if !self.sim.resolutions.contains(config.resolution) {
            return Err(HalError::ConfigurationError);
        }
        if SingleSampleInput::from_code(channel, config.mode).is_none() {
            return Err(HalError::InvalidParameter);
        }
        state.open.insert(channel, config.clone());
        Ok(())
    }

    fn close_channel(&mut self, channel: u8) -> HalResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::CloseChannel(channel));
        state.take_fault()?;
        state.open.remove(&channel);
        Ok(())
    }

    fn read_single(&mut self, channel: u8, average_count: u32) -> HalResult<i32> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::ReadSingle {
            channel,
            average_count,
        });
        state.take_fault()?;
        state.ensure_initialized()?;
        if state.scan.is_some() {
            return Err(HalError::Busy);
        }
        let config = state
            .open
            .get(&channel)
            .cloned()
            .ok_or(HalError::InvalidParameter)?;

        let count = average_count.max(1);
        let samples =
            (0..count).map(|_| state.convert(&self.sim, channel, config.resolution, config.mode));
        let value = mean_truncated(samples).unwrap_or(0);
        trace!("{}: channel {} read {} (x{})", self.sim.device, channel, value, count);
        Ok(value)
    }

    fn start_scan(&mut self, sequence: &ScanSequence<'_>) -> HalResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::StartScan {
            input_mask: sequence.input_mask(),
            average_count: sequence.average_count,
        });
        state.take_fault()?;
        state.ensure_initialized()?;
        if !self.sim.capabilities.continuous_sampling {
            return Err(HalError::ConfigurationError);
        }
        if state.scan.is_some() {
            return Err(HalError::Busy);
        }
        for &channel in sequence.channels {
            self.check_channel(channel)?;
        }

        state.scan = Some(ScanState {
            channels: sequence.channels.to_vec(),
            resolution: sequence.config.resolution,
            mode: sequence.config.mode,
            windows: sequence
                .channels
                .iter()
                .map(|_| RollingWindow::new(sequence.average_count))
                .collect(),
        });
        // First pass completes before the start call returns.
        state.tick(&self.sim);
        Ok(())
    }

    fn stop_scan(&mut self) -> HalResult<()> {
        let mut state = self.state.lock();
        state.calls.push(SimCall::StopScan);
        state.take_fault()?;
        state.scan = None;
        Ok(())
    }

    fn read_scan_buffer(&mut self, out: &mut [i32]) {
        let state = self.state.lock();
        match &state.scan {
            Some(scan) => {
                for (slot, window) in out.iter_mut().zip(&scan.windows) {
                    *slot = window.average();
                }
            }
            None => out.fill(0),
        }
    }

    fn channel_count(&self) -> u8 {
        self.sim.channel_count
    }

    fn supported_resolutions(&self) -> ResolutionSet {
        self.sim.resolutions
    }

    fn is_channel_mode_supported(&self, mode: ChannelMode) -> bool {
        match mode {
            ChannelMode::SingleEnded => true,
            ChannelMode::Differential => self.sim.differential,
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.sim.capabilities
    }

    fn fixed_range(&self) -> Option<SampleRange> {
        self.sim.fixed_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(config: SimConfig) -> (SimulatedAdc, SimProbe) {
        let mut adc = SimulatedAdc::new(config);
        let probe = adc.probe();
        adc.init(&ControllerConfig::default()).unwrap();
        (adc, probe)
    }

    #[test]
    fn single_read_clamps_to_resolution() {
        let (mut adc, probe) = ready(SimConfig::new(DeviceId(1)));
        probe.set_signal(2, Signal::Constant(5000));
        adc.open_channel(2, &ChannelConfig::default().resolution(SampleResolution::Bits8))
            .unwrap();

        assert_eq!(adc.read_single(2, 1).unwrap(), 255);
    }

    #[test]
    fn large_average_count_does_not_buffer_samples() {
        let (mut adc, probe) = ready(SimConfig::new(DeviceId(1)));
        probe.set_signal(0, Signal::Constant(1500));
        adc.open_channel(0, &ChannelConfig::default()).unwrap();

        assert_eq!(adc.read_single(0, 1_000_000).unwrap(), 1500);
        assert_eq!(probe.conversions(0), 1_000_000);
    }

    #[test]
    fn supply_taps_read_nominal_levels() {
        let (mut adc, _probe) = ready(SimConfig::new(DeviceId(1)));
        let config = ChannelConfig::default();
        for input in [
            SingleSampleInput::Vdd,
            SingleSampleInput::VddDiv3,
            SingleSampleInput::VrefDiv2,
            SingleSampleInput::Vss,
        ] {
            adc.open_channel(input.code(), &config).unwrap();
        }

        assert_eq!(adc.read_single(SingleSampleInput::Vdd.code(), 1).unwrap(), 4095);
        assert_eq!(adc.read_single(SingleSampleInput::VddDiv3.code(), 1).unwrap(), 1365);
        assert_eq!(adc.read_single(SingleSampleInput::VrefDiv2.code(), 1).unwrap(), 2048);
        assert_eq!(adc.read_single(SingleSampleInput::Vss.code(), 1).unwrap(), 0);
    }

    #[test]
    fn differential_mux_has_five_inputs() {
        let (mut adc, _probe) = ready(SimConfig::new(DeviceId(1)));
        let config = ChannelConfig::default().mode(ChannelMode::Differential);

        adc.open_channel(SingleSampleInput::Differential0.code(), &config).unwrap();
        assert_eq!(adc.open_channel(5, &config), Err(HalError::InvalidParameter));
    }

    #[test]
    fn unopened_channel_is_rejected() {
        let (mut adc, _probe) = ready(SimConfig::new(DeviceId(1)));
        assert_eq!(adc.read_single(0, 1), Err(HalError::InvalidParameter));
    }

    #[test]
    fn injected_fault_is_consumed_once() {
        let (mut adc, probe) = ready(SimConfig::new(DeviceId(1)));
        adc.open_channel(0, &ChannelConfig::default()).unwrap();
        probe.fail_next(HalError::Timeout);

        assert_eq!(adc.read_single(0, 1), Err(HalError::Timeout));
        assert!(adc.read_single(0, 1).is_ok());
    }

    #[test]
    fn scan_buffer_tracks_rolling_average() {
        let (mut adc, probe) = ready(SimConfig::new(DeviceId(1)));
        probe.set_signal(1, Signal::Ramp { start: 0, step: 10 });
        let config = ChannelConfig::default();
        adc.start_scan(&ScanSequence {
            channels: &[1],
            config: &config,
            average_count: 2,
        })
        .unwrap();

        let mut out = [0; 1];
        adc.read_scan_buffer(&mut out);
        assert_eq!(out, [0]);

        probe.tick_n(3);
        adc.read_scan_buffer(&mut out);
        // window holds the last two conversions: (20 + 30) / 2
        assert_eq!(out, [25]);
    }

    #[test]
    fn fixed_resolution_device_has_no_scan() {
        let (mut adc, _probe) =
            ready(SimConfig::fixed_resolution(DeviceId(1), SampleResolution::Bits12));
        let config = ChannelConfig::default();
        let result = adc.start_scan(&ScanSequence {
            channels: &[0],
            config: &config,
            average_count: 1,
        });
        assert_eq!(result, Err(HalError::ConfigurationError));
        assert_eq!(adc.fixed_range(), Some(SampleRange { min: 0, max: 4095 }));
    }
}
