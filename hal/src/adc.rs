//! ADC (Analog-to-Digital Converter) abstraction
//!
//! Configuration vocabulary for the Giant Gecko ADC and the [`AdcPeripheral`]
//! contract that register-level implementations provide to the driver core.

use core::fmt;

use crate::error::HalResult;

/// Identity of a physical ADC instance (ADC0, ADC1, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub u16);

impl DeviceId {
    /// First ADC instance
    pub const ADC0: DeviceId = DeviceId(0);

    /// Get the raw instance number
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADC{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "ADC{}", self.0);
    }
}

/// Oversample rate select
///
/// Only has an effect when a channel samples with [`SampleResolution::Oversampling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversampleRate {
    #[default]
    Samples2,
    Samples4,
    Samples8,
    Samples16,
    Samples32,
    Samples64,
    Samples128,
    Samples256,
    Samples512,
    Samples1024,
    Samples2048,
    Samples4096,
}

impl OversampleRate {
    /// Number of raw samples accumulated per conversion result
    pub const fn samples(self) -> u32 {
        2 << (self as u32)
    }

    /// Register field encoding
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Low-pass or decoupling capacitor filter on the ADC input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LowpassFilterMode {
    /// No filter or decoupling capacitor
    #[default]
    Bypass,
    /// On-chip RC filter
    RcFilter,
    /// On-chip decoupling capacitor
    DecouplingCapacitor,
}

/// ADC warm-up mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarmUpMode {
    /// ADC shut down after each conversion
    #[default]
    Normal,
    /// Do not warm up bandgap references
    FastBandgap,
    /// Reference selected for scan mode kept warm
    KeepScanRefWarm,
    /// ADC and scan reference kept warm, allowing continuous conversion
    KeepAdcWarm,
}

/// Peripheral Reflex System signal used to trigger a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PrsTrigger {
    #[default]
    Disabled,
    Channel0,
    Channel1,
    Channel2,
    Channel3,
    Channel4,
    Channel5,
    Channel6,
    Channel7,
    Channel8,
    Channel9,
    Channel10,
    Channel11,
}

impl PrsTrigger {
    const CHANNELS: [PrsTrigger; 12] = [
        PrsTrigger::Channel0,
        PrsTrigger::Channel1,
        PrsTrigger::Channel2,
        PrsTrigger::Channel3,
        PrsTrigger::Channel4,
        PrsTrigger::Channel5,
        PrsTrigger::Channel6,
        PrsTrigger::Channel7,
        PrsTrigger::Channel8,
        PrsTrigger::Channel9,
        PrsTrigger::Channel10,
        PrsTrigger::Channel11,
    ];

    /// Trigger for PRS channel `channel`, if the channel exists
    pub fn from_channel(channel: u8) -> Option<Self> {
        Self::CHANNELS.get(channel as usize).copied()
    }

    /// PRS channel number, or `None` when triggering is disabled
    pub const fn channel(self) -> Option<u8> {
        match self {
            PrsTrigger::Disabled => None,
            other => Some(other as u8 - 1),
        }
    }
}

/// Acquisition time in ADC clock cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionTime {
    Cycles1,
    Cycles2,
    Cycles3,
    Cycles4,
    #[default]
    Cycles8,
    Cycles16,
    Cycles32,
    Cycles64,
    Cycles128,
    Cycles256,
}

impl AcquisitionTime {
    /// Number of ADC clock cycles spent acquiring the input
    pub const fn cycles(self) -> u16 {
        match self {
            AcquisitionTime::Cycles1 => 1,
            AcquisitionTime::Cycles2 => 2,
            AcquisitionTime::Cycles3 => 3,
            AcquisitionTime::Cycles4 => 4,
            AcquisitionTime::Cycles8 => 8,
            AcquisitionTime::Cycles16 => 16,
            AcquisitionTime::Cycles32 => 32,
            AcquisitionTime::Cycles64 => 64,
            AcquisitionTime::Cycles128 => 128,
            AcquisitionTime::Cycles256 => 256,
        }
    }
}

/// Single and scan mode voltage references
///
/// External references require the calibration register to be set by the
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ReferenceVoltage {
    /// Internal 1.25 V reference
    #[default]
    Internal1V25 = 0,
    /// Internal 2.5 V reference
    Internal2V5 = 1,
    /// Buffered VDD
    BufferedVdd = 2,
    /// Internal differential 5 V reference
    InternalDifferential5V = 3,
    /// Single-ended external reference from pin 6
    SingleEndedExternalPin6 = 4,
    /// Differential external reference from pins 6 and 7
    DifferentialExternalPin6And7 = 5,
    /// Unbuffered 2xVDD
    Unbuffered2Vdd = 6,
    /// Internal bandgap reference, custom VFS
    InternalBandgap = 128,
    /// Scaled AVDD: AVDD * VREFATT
    ScaledAvdd = 129,
    /// Scaled single-ended external reference from pin 6: VREFP * VREFATT
    ScaledSingleEndedExternalPin6 = 130,
    /// Raw single-ended external reference from pin 6
    RawSingleEndedExternalPin6 = 131,
    /// Special mode for entropy generation
    EntropyGeneration = 132,
    /// Scaled differential external reference from pins 6 and 7
    ScaledExternalPin6And7 = 133,
    /// Raw differential external reference from pins 6 and 7: VREFP - VREFN
    RawExternalPin6And7 = 134,
}

impl ReferenceVoltage {
    /// Register encoding
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether the reference is taken from the external VREF pins
    pub const fn is_external(self) -> bool {
        matches!(
            self,
            ReferenceVoltage::SingleEndedExternalPin6
                | ReferenceVoltage::DifferentialExternalPin6And7
                | ReferenceVoltage::ScaledSingleEndedExternalPin6
                | ReferenceVoltage::RawSingleEndedExternalPin6
                | ReferenceVoltage::ScaledExternalPin6And7
                | ReferenceVoltage::RawExternalPin6And7
        )
    }
}

/// Sample resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleResolution {
    #[default]
    Bits12,
    Bits8,
    Bits6,
    /// Oversampled 16-bit result, see [`OversampleRate`]
    Oversampling,
}

impl SampleResolution {
    const ALL: [SampleResolution; 4] = [
        SampleResolution::Bits12,
        SampleResolution::Bits8,
        SampleResolution::Bits6,
        SampleResolution::Oversampling,
    ];

    /// Number of significant bits in a conversion result
    pub const fn bits(self) -> u8 {
        match self {
            SampleResolution::Bits12 => 12,
            SampleResolution::Bits8 => 8,
            SampleResolution::Bits6 => 6,
            SampleResolution::Oversampling => 16,
        }
    }

    /// Largest single-ended conversion result
    pub const fn max_value(self) -> i32 {
        (1 << self.bits()) - 1
    }

    const fn flag(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of sample resolutions, as reported by a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolutionSet(u8);

impl ResolutionSet {
    /// No resolution
    pub const EMPTY: ResolutionSet = ResolutionSet(0);
    /// Every resolution the Giant Gecko ADC can produce
    pub const ALL: ResolutionSet = ResolutionSet(0b1111);

    /// Set holding exactly `resolution`
    pub const fn only(resolution: SampleResolution) -> Self {
        ResolutionSet(resolution.flag())
    }

    /// Return a copy of this set with `resolution` added
    pub const fn with(self, resolution: SampleResolution) -> Self {
        ResolutionSet(self.0 | resolution.flag())
    }

    /// Check whether `resolution` is a member
    pub const fn contains(self, resolution: SampleResolution) -> bool {
        self.0 & resolution.flag() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate members from highest to lowest standard resolution
    pub fn iter(self) -> impl Iterator<Item = SampleResolution> {
        SampleResolution::ALL
            .into_iter()
            .filter(move |r| self.contains(*r))
    }
}

impl FromIterator<SampleResolution> for ResolutionSet {
    fn from_iter<I: IntoIterator<Item = SampleResolution>>(iter: I) -> Self {
        iter.into_iter().fold(ResolutionSet::EMPTY, ResolutionSet::with)
    }
}

/// Input configuration of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Value of a single pin against ground
    #[default]
    SingleEnded,
    /// Difference between two pins
    Differential,
}

/// Input multiplexer selection for single conversions
///
/// A channel index is the INPUTSEL code of the input; the same code selects
/// a different input in differential mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleSampleInput {
    Channel0,
    Channel1,
    Channel2,
    Channel3,
    Channel4,
    Channel5,
    Channel6,
    Channel7,
    /// On-chip temperature sensor
    TemperatureReference,
    VddDiv3,
    Vdd,
    Vss,
    VrefDiv2,
    DacOutput0,
    DacOutput1,
    /// Analog test bus
    Atest,
    Positive0Negative1,
    Positive2Negative3,
    Positive4Negative5,
    Positive6Negative7,
    /// Differential zero, for offset calibration
    Differential0,
}

impl SingleSampleInput {
    /// Inputs selectable in single-ended mode
    pub const SINGLE_ENDED_COUNT: u8 = 16;
    /// Inputs selectable in differential mode
    pub const DIFFERENTIAL_COUNT: u8 = 5;

    const SINGLE_ENDED: [SingleSampleInput; 16] = [
        SingleSampleInput::Channel0,
        SingleSampleInput::Channel1,
        SingleSampleInput::Channel2,
        SingleSampleInput::Channel3,
        SingleSampleInput::Channel4,
        SingleSampleInput::Channel5,
        SingleSampleInput::Channel6,
        SingleSampleInput::Channel7,
        SingleSampleInput::TemperatureReference,
        SingleSampleInput::VddDiv3,
        SingleSampleInput::Vdd,
        SingleSampleInput::Vss,
        SingleSampleInput::VrefDiv2,
        SingleSampleInput::DacOutput0,
        SingleSampleInput::DacOutput1,
        SingleSampleInput::Atest,
    ];

    const DIFFERENTIAL: [SingleSampleInput; 5] = [
        SingleSampleInput::Positive0Negative1,
        SingleSampleInput::Positive2Negative3,
        SingleSampleInput::Positive4Negative5,
        SingleSampleInput::Positive6Negative7,
        SingleSampleInput::Differential0,
    ];

    /// Input selected by INPUTSEL `code` under `mode`
    pub fn from_code(code: u8, mode: ChannelMode) -> Option<Self> {
        let table: &[SingleSampleInput] = match mode {
            ChannelMode::SingleEnded => &Self::SINGLE_ENDED,
            ChannelMode::Differential => &Self::DIFFERENTIAL,
        };
        table.get(code as usize).copied()
    }

    /// INPUTSEL register code, used as the channel index
    pub const fn code(self) -> u8 {
        let raw = self as u8;
        if raw < Self::SINGLE_ENDED_COUNT {
            raw
        } else {
            raw - Self::SINGLE_ENDED_COUNT
        }
    }

    /// Mode the input has to be converted in
    pub const fn mode(self) -> ChannelMode {
        if (self as u8) < Self::SINGLE_ENDED_COUNT {
            ChannelMode::SingleEnded
        } else {
            ChannelMode::Differential
        }
    }

    /// Check whether the input is an on-chip source rather than a pin
    pub const fn is_internal(self) -> bool {
        matches!(self as u8, 8..=15)
    }
}

/// Optional features a peripheral may lack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Resolution can be chosen per channel
    pub configurable_resolution: bool,
    /// Scan sequences with continuous conversion are available
    pub continuous_sampling: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities {
        configurable_resolution: true,
        continuous_sampling: true,
    };
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::FULL
    }
}

/// Output range of a fixed-resolution peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    pub min: i32,
    pub max: i32,
}

/// Device-wide ADC configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub oversample_rate: OversampleRate,
    pub lowpass_filter: LowpassFilterMode,
    pub warm_up_mode: WarmUpMode,
    /// Select N to give N+1 peripheral clock cycles of warm-up timebase
    pub warm_up_timebase: u32,
    /// ADC clock = HFPERCLK / (prescale + 1)
    pub prescale: u32,
    pub tailgating: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            oversample_rate: OversampleRate::Samples2,
            lowpass_filter: LowpassFilterMode::Bypass,
            warm_up_mode: WarmUpMode::Normal,
            warm_up_timebase: 1,
            prescale: 0,
            tailgating: false,
        }
    }
}

impl ControllerConfig {
    pub fn oversample_rate(mut self, rate: OversampleRate) -> Self {
        self.oversample_rate = rate;
        self
    }

    pub fn lowpass_filter(mut self, mode: LowpassFilterMode) -> Self {
        self.lowpass_filter = mode;
        self
    }

    pub fn warm_up_mode(mut self, mode: WarmUpMode) -> Self {
        self.warm_up_mode = mode;
        self
    }

    pub fn warm_up_timebase(mut self, timebase: u32) -> Self {
        self.warm_up_timebase = timebase;
        self
    }

    pub fn prescale(mut self, prescale: u32) -> Self {
        self.prescale = prescale;
        self
    }

    pub fn tailgating(mut self, enabled: bool) -> Self {
        self.tailgating = enabled;
        self
    }
}

/// Per-channel sampling configuration, shared by single conversions and scans
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelConfig {
    pub prs_trigger: PrsTrigger,
    pub acquisition_time: AcquisitionTime,
    pub reference: ReferenceVoltage,
    pub resolution: SampleResolution,
    pub mode: ChannelMode,
    /// Left-adjust conversion results in the data register
    pub left_adjust: bool,
}

impl ChannelConfig {
    /// Whether conversions are triggered from the Peripheral Reflex System
    pub fn is_prs_enabled(&self) -> bool {
        self.prs_trigger != PrsTrigger::Disabled
    }

    pub fn prs_trigger(mut self, trigger: PrsTrigger) -> Self {
        self.prs_trigger = trigger;
        self
    }

    pub fn acquisition_time(mut self, time: AcquisitionTime) -> Self {
        self.acquisition_time = time;
        self
    }

    pub fn reference(mut self, reference: ReferenceVoltage) -> Self {
        self.reference = reference;
        self
    }

    pub fn resolution(mut self, resolution: SampleResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn mode(mut self, mode: ChannelMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn left_adjust(mut self, enabled: bool) -> Self {
        self.left_adjust = enabled;
        self
    }
}

/// Scan sequence handed to [`AdcPeripheral::start_scan`]
#[derive(Debug, Clone, Copy)]
pub struct ScanSequence<'a> {
    /// Channels in buffer order
    pub channels: &'a [u8],
    pub config: &'a ChannelConfig,
    /// Rolling average window per channel, 1 for raw samples
    pub average_count: u32,
}

impl ScanSequence<'_> {
    /// SCANCTRL input mask with one bit per scanned channel
    pub fn input_mask(&self) -> u32 {
        self.channels
            .iter()
            .filter(|&&ch| ch < 32)
            .fold(0u32, |mask, &ch| mask | (1 << ch))
    }
}

/// Register Access Layer for one ADC instance
///
/// Implementations program the real peripheral; the driver core serializes
/// all calls, so methods take `&mut self` and need not lock internally.
pub trait AdcPeripheral: Send {
    /// Identity used to enforce one controller per device
    fn device_id(&self) -> DeviceId;

    /// Power up and configure the converter
    fn init(&mut self, config: &ControllerConfig) -> HalResult<()>;

    /// Power down the converter
    fn deinit(&mut self) -> HalResult<()>;

    /// Route and configure the input for `channel`
    fn open_channel(&mut self, channel: u8, config: &ChannelConfig) -> HalResult<()>;

    /// Release the input routing for `channel`
    fn close_channel(&mut self, channel: u8) -> HalResult<()>;

    /// Run `average_count` conversions on `channel` and return their mean
    fn read_single(&mut self, channel: u8, average_count: u32) -> HalResult<i32>;

    /// Start continuous conversion of a scan sequence
    fn start_scan(&mut self, sequence: &ScanSequence<'_>) -> HalResult<()>;

    /// Stop the running scan sequence
    fn stop_scan(&mut self) -> HalResult<()>;

    /// Copy the latest scan results into `out`, one slot per scanned channel
    fn read_scan_buffer(&mut self, out: &mut [i32]);

    /// Number of input channels
    fn channel_count(&self) -> u8;

    /// Resolutions the converter supports
    fn supported_resolutions(&self) -> ResolutionSet;

    /// Whether the converter supports `mode`
    fn is_channel_mode_supported(&self, mode: ChannelMode) -> bool;

    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }

    /// Output range, for peripherals with a fixed resolution only
    fn fixed_range(&self) -> Option<SampleRange> {
        None
    }
}
