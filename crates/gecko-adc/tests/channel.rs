//! Single and averaged conversions.

mod common;

use gecko_adc::{
    AdcController, AdcError, ChannelConfig, ChannelMode, HalError, PrsTrigger, SampleResolution,
    SingleSampleInput,
};
use hal_sim::{SimCall, SimConfig, Signal};

use common::{controller, fresh_device, sim_with};

#[test]
fn read_value_is_within_configured_resolution() {
    let (controller, probe) = controller();
    probe.set_signal(0, Signal::Ramp { start: 4000, step: 50 });
    let channel = controller.open_channel_default(0).unwrap();

    for _ in 0..5 {
        let value = channel.read_value().unwrap();
        assert!((0..=4095).contains(&value), "{value} out of 12-bit range");
    }

    let eight_bit = controller
        .open_channel(1, ChannelConfig::default().resolution(SampleResolution::Bits8))
        .unwrap();
    probe.set_signal(1, Signal::Constant(1000));
    assert_eq!(eight_bit.read_value().unwrap(), 255);
}

#[test]
fn averaging_one_sample_is_identity() {
    let (controller, probe) = controller();
    probe.set_signal(3, Signal::Constant(1717));
    let channel = controller.open_channel_default(3).unwrap();

    assert_eq!(channel.read_value_averaged(1).unwrap(), channel.read_value().unwrap());
}

#[test]
fn averaged_read_truncates_toward_zero() {
    let (controller, probe) = controller();
    probe.set_signal(0, Signal::Sequence(vec![10, 11, 11, 11]));
    let channel = controller.open_channel_default(0).unwrap();

    // (10 + 11 + 11 + 11) / 4 = 10.75
    assert_eq!(channel.read_value_averaged(4).unwrap(), 10);
    assert!(probe.calls().contains(&SimCall::ReadSingle {
        channel: 0,
        average_count: 4
    }));
    assert_eq!(probe.conversions(0), 4);
}

#[test]
fn differential_channel_reads_negative_values() {
    let (controller, probe) = controller();
    probe.set_signal(4, Signal::Constant(-300));
    let channel = controller
        .open_channel(4, ChannelConfig::default().mode(ChannelMode::Differential))
        .unwrap();

    assert_eq!(channel.read_value().unwrap(), -300);
}

#[test]
fn zero_average_count_is_rejected() {
    let (controller, probe) = controller();
    let channel = controller.open_channel_default(0).unwrap();

    assert!(matches!(
        channel.read_value_averaged(0),
        Err(AdcError::InvalidArgument(_))
    ));
    assert_eq!(probe.conversions(0), 0);
}

#[test]
fn dispose_is_idempotent_and_blocks_reads() {
    let (controller, probe) = controller();
    let channel = controller.open_channel_default(1).unwrap();

    channel.dispose();
    channel.dispose();

    assert!(channel.is_disposed());
    assert_eq!(channel.read_value(), Err(AdcError::Disposed));
    assert_eq!(channel.read_value_averaged(8), Err(AdcError::Disposed));
    let closes = probe
        .calls()
        .iter()
        .filter(|c| **c == SimCall::CloseChannel(1))
        .count();
    assert_eq!(closes, 1);
}

#[test]
fn dispose_failure_is_swallowed() {
    let (controller, probe) = controller();
    let channel = controller.open_channel_default(1).unwrap();
    probe.fail_next(HalError::BusFault);

    channel.dispose();

    assert!(channel.is_disposed());
    assert!(controller.open_channels().is_empty());
}

#[test]
fn closed_controller_disposes_its_channels() {
    let (controller, _probe) = controller();
    let channel = controller.open_channel_default(0).unwrap();

    controller.close().unwrap();

    assert_eq!(channel.read_value(), Err(AdcError::Disposed));
    channel.dispose();
}

#[test]
fn hardware_error_passes_through_unchanged() {
    let (controller, probe) = controller();
    let channel = controller.open_channel_default(0).unwrap();
    probe.fail_next(HalError::Timeout);

    assert_eq!(channel.read_value(), Err(AdcError::Hardware(HalError::Timeout)));
    assert!(channel.read_value().is_ok());
}

#[test]
fn configuration_is_copied_at_open() {
    let (controller, probe) = controller();
    let mut config = ChannelConfig::default()
        .prs_trigger(PrsTrigger::Channel5)
        .resolution(SampleResolution::Bits8);
    let channel = controller.open_channel(2, config.clone()).unwrap();

    config.resolution = SampleResolution::Bits6;
    config.prs_trigger = PrsTrigger::Disabled;

    assert_eq!(channel.config().resolution, SampleResolution::Bits8);
    assert!(channel.config().is_prs_enabled());
    assert_eq!(
        probe.channel_config(2).map(|c| c.resolution),
        Some(SampleResolution::Bits8)
    );
}

#[test]
fn read_ratio_scales_fixed_resolution_values() {
    let (adc, probe) = sim_with(SimConfig::fixed_resolution(fresh_device(), SampleResolution::Bits12));
    probe.set_signal(0, Signal::Constant(4095));
    let controller = AdcController::open_default(adc).unwrap();
    let channel = controller.open_channel_default(0).unwrap();

    assert_eq!(channel.read_ratio().unwrap(), 1.0);

    probe.set_signal(0, Signal::Constant(0));
    assert_eq!(channel.read_ratio().unwrap(), 0.0);
}

#[test]
fn read_ratio_needs_fixed_resolution() {
    let (controller, _probe) = controller();
    let channel = controller.open_channel_default(0).unwrap();

    assert!(matches!(channel.read_ratio(), Err(AdcError::Unsupported(_))));
}

#[test]
fn channel_reports_its_identity() {
    let (controller, _probe) = controller();
    let channel = controller.open_channel_default(6).unwrap();

    assert_eq!(channel.index(), 6);
    assert_eq!(channel.controller_device(), controller.device_id());
}

#[test]
fn internal_inputs_share_the_channel_index_space() {
    let (controller, _probe) = controller();
    assert_eq!(controller.channel_count(), SingleSampleInput::SINGLE_ENDED_COUNT);

    let vdd = controller.open_input(SingleSampleInput::Vdd, ChannelConfig::default()).unwrap();
    let vss = controller.open_input(SingleSampleInput::Vss, ChannelConfig::default()).unwrap();
    let half = controller
        .open_input(SingleSampleInput::VrefDiv2, ChannelConfig::default())
        .unwrap();

    assert_eq!(vdd.index(), 10);
    assert_eq!(vdd.input(), Some(SingleSampleInput::Vdd));
    assert!(SingleSampleInput::Vdd.is_internal());
    assert_eq!(vdd.read_value().unwrap(), 4095);
    assert_eq!(vss.read_value().unwrap(), 0);
    assert_eq!(half.read_value().unwrap(), 2048);
    assert_eq!(
        controller.open_channel_default(SingleSampleInput::Vdd.code()).unwrap_err(),
        AdcError::ChannelInUse(10)
    );
}

#[test]
fn temperature_reference_reads_programmed_signal() {
    let (controller, probe) = controller();
    let code = SingleSampleInput::TemperatureReference.code();
    probe.set_signal(code, Signal::Constant(1830));

    let sensor = controller
        .open_input(SingleSampleInput::TemperatureReference, ChannelConfig::default())
        .unwrap();
    assert_eq!(code, 8);
    assert_eq!(sensor.read_value().unwrap(), 1830);
}

#[test]
fn differential_pair_forces_differential_mode() {
    let (controller, _probe) = controller();

    let pair = controller
        .open_input(SingleSampleInput::Positive2Negative3, ChannelConfig::default())
        .unwrap();

    assert_eq!(pair.index(), 1);
    assert_eq!(pair.config().mode, ChannelMode::Differential);
    assert_eq!(pair.input(), Some(SingleSampleInput::Positive2Negative3));
    assert!(!SingleSampleInput::Positive2Negative3.is_internal());
}

#[test]
fn input_codes_round_trip_per_mode() {
    assert_eq!(
        SingleSampleInput::from_code(4, ChannelMode::Differential),
        Some(SingleSampleInput::Differential0)
    );
    assert_eq!(
        SingleSampleInput::from_code(4, ChannelMode::SingleEnded),
        Some(SingleSampleInput::Channel4)
    );
    assert_eq!(SingleSampleInput::from_code(5, ChannelMode::Differential), None);
    assert_eq!(SingleSampleInput::from_code(16, ChannelMode::SingleEnded), None);
}

#[test]
fn large_average_count_completes() {
    let (controller, probe) = controller();
    probe.set_signal(3, Signal::Constant(777));
    let channel = controller.open_channel_default(3).unwrap();

    assert_eq!(channel.read_value_averaged(1_000_000).unwrap(), 777);
}
