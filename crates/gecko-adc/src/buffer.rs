//! Last-sample buffer for continuous sampling.

use hal::AdcPeripheral;
use heapless::Vec as BoundedVec;

/// Upper bound on channels in one scan sequence (width of the scan input mask)
pub const MAX_SCAN_CHANNELS: usize = 32;

/// Channel indices of a scan sequence, in buffer order
pub type ScanChannels = BoundedVec<u8, MAX_SCAN_CHANNELS>;

/// Slot-per-channel buffer filled by the peripheral while a scan runs
///
/// Slot `i` holds the latest value for `channels[i]`. Outside of a scan the
/// buffer is disarmed and yields nothing.
#[derive(Debug, Default)]
pub(crate) struct SampleBuffer {
    channels: ScanChannels,
    average_count: u32,
    slots: Vec<i32>,
    armed: bool,
}

impl SampleBuffer {
    /// Reserve one slot per channel for a new scan
    pub(crate) fn arm(&mut self, channels: ScanChannels, average_count: u32) {
        self.slots.clear();
        self.slots.resize(channels.len(), 0);
        self.channels = channels;
        self.average_count = average_count;
        self.armed = true;
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
        self.channels.clear();
        self.slots.clear();
        self.average_count = 0;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed
    }

    pub(crate) fn channels(&self) -> Option<&ScanChannels> {
        self.armed.then_some(&self.channels)
    }

    pub(crate) fn average_count(&self) -> Option<u32> {
        self.armed.then_some(self.average_count)
    }

    /// Slot holding `channel`, if it is part of the scan
    pub(crate) fn slot_of(&self, channel: u8) -> Option<usize> {
        if !self.armed {
            return None;
        }
        self.channels.iter().position(|&ch| ch == channel)
    }

    /// Pull the latest values from the peripheral
    ///
    /// Slots are not read atomically as a group; the peripheral may update
    /// them between reads.
    pub(crate) fn refresh<P: AdcPeripheral + ?Sized>(&mut self, hw: &mut P) -> Option<&[i32]> {
        if !self.armed {
            return None;
        }
        hw.read_scan_buffer(&mut self.slots);
        Some(&self.slots)
    }
}
