use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Where a frame's `dt` comes from.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum TimeStep {
    /// Wall-clock time between ticks, clamped.
    #[default]
    Measured,
    /// The same `dt` (seconds) every frame. Makes runs reproducible.
    Fixed(f32),
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Measured delta time is clamped to avoid pathological values when the process is
/// paused by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    step: TimeStep,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new(step: TimeStep) -> Self {
        Self {
            step,
            last: Instant::now(),
            frame_index: 0,
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
        }
    }

    /// Resets the measurement baseline, e.g. right before the first frame.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Number of ticks so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = match self.step {
            TimeStep::Fixed(dt) => dt,
            TimeStep::Measured => now
                .saturating_duration_since(self.last)
                .clamp(self.dt_min, self.dt_max)
                .as_secs_f32(),
        };
        self.last = now;

        let ft = FrameTime {
            dt,
            frame_index: self.frame_index,
        };
        self.frame_index += 1;
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(TimeStep::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_is_constant() {
        let mut clock = FrameClock::new(TimeStep::Fixed(0.5));
        assert_eq!(clock.tick().dt, 0.5);
        assert_eq!(clock.tick().dt, 0.5);
    }

    #[test]
    fn frame_index_counts_ticks() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick().frame_index, 0);
        assert_eq!(clock.tick().frame_index, 1);
        assert_eq!(clock.frame_index(), 2);
    }

    #[test]
    fn measured_dt_is_clamped() {
        let mut clock = FrameClock::new(TimeStep::Measured);
        let dt = clock.tick().dt;
        assert!((0.0001..=0.25).contains(&dt));
    }

    #[test]
    fn default_step_is_measured() {
        assert_eq!(TimeStep::default(), TimeStep::Measured);
    }
}
