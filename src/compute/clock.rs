//! Wall-clock frame timing.
//!
//! An external animation callback supplies a timestamp once per display
//! refresh; the clock turns consecutive timestamps into the `dt` of the
//! next simulated frame.

use log::warn;

use crate::schema::ClockConfig;

/// Converts animation-callback timestamps into per-frame time steps.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
    max_dt: Option<f32>,
}

impl FrameClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            last: None,
            max_dt: config.max_dt,
        }
    }

    /// Record a timestamp in seconds and return the elapsed time since the
    /// previous one. The first tick returns `0.0`.
    pub fn tick(&mut self, now: f64) -> f32 {
        let Some(last) = self.last.replace(now) else {
            return 0.0;
        };

        let elapsed = (now - last) as f32;
        if elapsed.is_nan() || elapsed < 0.0 {
            warn!("Frame clock went backwards by {:.6}s, using dt = 0", -elapsed);
            return 0.0;
        }

        match self.max_dt {
            Some(max_dt) if elapsed > max_dt => {
                warn!("Frame dt {:.4}s clamped to {:.4}s", elapsed, max_dt);
                max_dt
            }
            _ => elapsed,
        }
    }

    /// Same as [`FrameClock::tick`] for millisecond timestamps, as supplied by
    /// browser animation callbacks.
    pub fn tick_millis(&mut self, now_ms: f64) -> f32 {
        self.tick(now_ms / 1000.0)
    }

    /// Forget the previous timestamp so the next tick starts a fresh run.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_is_zero() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(12.5), 0.0);
    }

    #[test]
    fn test_deltas() {
        let mut clock = FrameClock::default();
        clock.tick(1.0);
        assert!((clock.tick(1.25) - 0.25).abs() < 1e-6);
        assert!((clock.tick(1.5) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_millis() {
        let mut clock = FrameClock::default();
        clock.tick_millis(1000.0);
        assert!((clock.tick_millis(1016.0) - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_backwards_clock_yields_zero() {
        let mut clock = FrameClock::default();
        clock.tick(2.0);
        assert_eq!(clock.tick(1.0), 0.0);
        // Deltas resume from the latest timestamp.
        assert!((clock.tick(1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_clamp() {
        let mut clock = FrameClock::new(&ClockConfig { max_dt: Some(0.05) });
        clock.tick(0.0);
        assert_eq!(clock.tick(3.0), 0.05);
        assert!((clock.tick(3.01) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut clock = FrameClock::default();
        clock.tick(1.0);
        clock.reset();
        assert_eq!(clock.tick(5.0), 0.0);
    }
}
