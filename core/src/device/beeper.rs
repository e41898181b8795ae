//! One-bit speaker.
//!
//! The system toggles the speaker level; the beeper box-filters that level
//! over each output sample period and hands full buffers to the registered
//! audio callback.

use crate::core::machine::AudioCallback;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_BUFFER_LEN: usize = 512;

/// Fixed-point fraction bits of the tick-per-sample counter.
const FRAC_BITS: u32 = 16;

pub struct Beeper {
    state: bool,
    pub volume: f32,
    /// Clock ticks per sample, 16.16 fixed point.
    period: u64,
    counter: u64,
    acc: u32,
    acc_ticks: u32,
    samples: Vec<f32>,
    buffer_len: usize,
    callback: Option<AudioCallback>,
}

impl Beeper {
    pub fn new(clock_hz: u32, sample_rate: u32) -> Self {
        let period = ((clock_hz as u64) << FRAC_BITS) / sample_rate.max(1) as u64;
        Self {
            state: false,
            volume: 0.5,
            period,
            counter: period,
            acc: 0,
            acc_ticks: 0,
            samples: Vec::with_capacity(DEFAULT_BUFFER_LEN),
            buffer_len: DEFAULT_BUFFER_LEN,
            callback: None,
        }
    }

    pub fn set_callback(&mut self, callback: AudioCallback) {
        self.callback = Some(callback);
    }

    pub fn set(&mut self, state: bool) {
        self.state = state;
    }

    pub fn toggle(&mut self) {
        self.state = !self.state;
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// One clock tick. Returns true when a sample was produced.
    pub fn tick(&mut self) -> bool {
        self.acc += self.state as u32;
        self.acc_ticks += 1;
        self.counter = self.counter.saturating_sub(1 << FRAC_BITS);
        if self.counter >= 1 << FRAC_BITS {
            return false;
        }
        self.counter += self.period;
        let level = self.acc as f32 / self.acc_ticks as f32;
        self.acc = 0;
        self.acc_ticks = 0;
        self.samples.push((level * 2.0 - 1.0) * self.volume);
        if self.samples.len() >= self.buffer_len {
            if let Some(callback) = self.callback.as_mut() {
                callback(&self.samples);
            }
            self.samples.clear();
        }
        true
    }

    /// Samples produced since the last flush.
    pub fn pending(&self) -> &[f32] {
        &self.samples
    }
}
