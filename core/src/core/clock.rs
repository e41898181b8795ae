//! Frame-time to clock-tick conversion for the frontends.

/// Longest host frame honoured. Slower frames are cut short instead of
/// piling up ever larger tick budgets.
pub const MAX_FRAME_MICROS: u32 = 24_000;

/// Turns wall-clock frame durations into tick budgets for one clock domain.
///
/// The fractional tick left over after each conversion is carried into the
/// next frame. CPUs only stop at instruction boundaries, so a frame usually
/// runs a few ticks long; that overrun is taken off the following budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameClock {
    pub freq_hz: u32,
    /// Leftover in units of tick-microseconds (`freq_hz * micros`).
    remainder: u64,
    overrun: u32,
    budget: u32,
}

impl FrameClock {
    pub fn new(freq_hz: u32) -> Self {
        Self {
            freq_hz,
            remainder: 0,
            overrun: 0,
            budget: 0,
        }
    }

    /// Ticks to run for a frame that took `micros` of host time.
    pub fn ticks_to_run(&mut self, micros: u32) -> u32 {
        let micros = micros.min(MAX_FRAME_MICROS);
        let total = self.freq_hz as u64 * micros as u64 + self.remainder;
        self.remainder = total % 1_000_000;
        let ticks = (total / 1_000_000) as u32;
        let budget = ticks.saturating_sub(self.overrun);
        self.overrun = self.overrun.saturating_sub(ticks);
        self.budget = budget;
        budget
    }

    /// Report how many ticks the last budget actually took.
    pub fn ticks_executed(&mut self, ticks: u32) {
        self.overrun += ticks.saturating_sub(self.budget);
        self.budget = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_carries_between_frames() {
        // 1 MHz-ish clock that does not divide evenly
        let mut clock = FrameClock::new(2_457_600);
        let mut total = 0u64;
        for _ in 0..1000 {
            let ticks = clock.ticks_to_run(20_000);
            clock.ticks_executed(ticks);
            total += ticks as u64;
        }
        // 20 seconds of emulated time, no drift
        assert_eq!(total, 2_457_600 * 20);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut clock = FrameClock::new(1_000_000);
        assert_eq!(clock.ticks_to_run(500_000), 24_000);
    }

    #[test]
    fn overrun_shortens_next_frame() {
        let mut clock = FrameClock::new(1_000_000);
        assert_eq!(clock.ticks_to_run(10_000), 10_000);
        clock.ticks_executed(10_007);
        assert_eq!(clock.ticks_to_run(10_000), 9_993);
        clock.ticks_executed(9_993);
        assert_eq!(clock.ticks_to_run(10_000), 10_000);
    }
}
