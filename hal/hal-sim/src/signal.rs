//! Analog input sources for simulated channels

use std::collections::VecDeque;

/// Voltage source wired to a simulated input, expressed in raw counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Same value on every conversion
    Constant(i32),
    /// `start + step * n` for the n-th conversion
    Ramp { start: i32, step: i32 },
    /// Values replayed in order, wrapping around
    Sequence(Vec<i32>),
}

impl Default for Signal {
    fn default() -> Self {
        Signal::Constant(0)
    }
}

impl Signal {
    /// Value presented to the `n`-th conversion on this input
    pub fn sample(&self, n: u64) -> i32 {
        match self {
            Signal::Constant(value) => *value,
            Signal::Ramp { start, step } => {
                let value = *start as i64 + *step as i64 * n as i64;
                value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
            }
            Signal::Sequence(values) if values.is_empty() => 0,
            Signal::Sequence(values) => values[(n % values.len() as u64) as usize],
        }
    }
}

/// Arithmetic mean truncated toward zero, as the data register reports it
pub fn mean_truncated<I: IntoIterator<Item = i32>>(samples: I) -> Option<i32> {
    let (sum, count) = samples
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), s| (sum + s as i64, count + 1));
    if count == 0 {
        None
    } else {
        Some((sum / count) as i32)
    }
}

/// Last `capacity` conversions of one scanned channel
#[derive(Debug, Clone)]
pub(crate) struct RollingWindow {
    samples: VecDeque<i32>,
    capacity: usize,
}

impl RollingWindow {
    pub(crate) fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1) as usize;
        Self {
            samples: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, sample: i32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Mean of the samples seen so far, 0 before the first conversion
    pub(crate) fn average(&self) -> i32 {
        mean_truncated(self.samples.iter().copied()).unwrap_or(0)
    }
}
