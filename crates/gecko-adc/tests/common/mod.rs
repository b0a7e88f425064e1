//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, Ordering};

use gecko_adc::{AdcController, DeviceId};
use hal_sim::{SimConfig, SimProbe, SimulatedAdc};

static NEXT_DEVICE: AtomicU16 = AtomicU16::new(1);

/// Device id not used by any other test in this binary
pub fn fresh_device() -> DeviceId {
    DeviceId(NEXT_DEVICE.fetch_add(1, Ordering::Relaxed))
}

/// Full-featured simulated ADC on a fresh device
pub fn sim() -> (SimulatedAdc, SimProbe) {
    sim_with(SimConfig::new(fresh_device()))
}

pub fn sim_with(config: SimConfig) -> (SimulatedAdc, SimProbe) {
    let adc = SimulatedAdc::new(config);
    let probe = adc.probe();
    (adc, probe)
}

/// Open controller with default configuration on a fresh simulated device
pub fn controller() -> (AdcController<SimulatedAdc>, SimProbe) {
    let (adc, probe) = sim();
    let controller = AdcController::open_default(adc).expect("open controller");
    (controller, probe)
}
