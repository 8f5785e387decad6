//! Time-based tweening of a single numeric property.
//!
//! A [`Transition`] knows nothing about what it animates; the surface's frame
//! scheduler samples it and applies the value to an arc.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    CubicInOut,
}

impl Easing {
    /// Maps normalized time in `[0, 1]` to normalized progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicInOut => {
                let t = t * 2.0;
                if t <= 1.0 {
                    t * t * t / 2.0
                } else {
                    let t = t - 2.0;
                    (t * t * t + 2.0) / 2.0
                }
            }
        }
    }
}

/// Linear interpolation that lands exactly on `to` at `t == 1`.
pub fn interpolate(from: f64, to: f64, t: f64) -> f64 {
    from * (1.0 - t) + to * t
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    from: f64,
    to: f64,
    duration: Duration,
    easing: Easing,
    elapsed: Duration,
}

impl Transition {
    pub fn new(from: f64, to: f64, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            easing: Easing::Linear,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Fraction of the duration that has elapsed.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            1.0
        } else {
            (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        }
    }

    pub fn value(&self) -> f64 {
        interpolate(self.from, self.to, self.easing.apply(self.progress()))
    }

    /// Steps the clock and returns the value for the new frame.
    pub fn advance(&mut self, dt: Duration) -> f64 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.value()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_transition_midpoint_and_end() {
        let mut transition = Transition::new(0.0, 300.0, Duration::from_millis(2000));
        assert_eq!(transition.value(), 0.0);

        assert_eq!(transition.advance(Duration::from_millis(500)), 75.0);
        assert_eq!(transition.advance(Duration::from_millis(500)), 150.0);
        assert!(!transition.is_finished());

        assert_eq!(transition.advance(Duration::from_millis(5000)), 300.0);
        assert!(transition.is_finished());
        assert_eq!(transition.progress(), 1.0);
    }

    #[test]
    fn test_zero_duration_finishes_immediately() {
        let transition = Transition::new(0.0, 42.0, Duration::ZERO);
        assert!(transition.is_finished());
        assert_eq!(transition.value(), 42.0);
    }

    #[test]
    fn test_nan_target_stays_nan() {
        let mut transition = Transition::new(0.0, f64::NAN, Duration::from_millis(10));
        assert!(transition.advance(Duration::from_millis(5)).is_nan());
    }

    #[test]
    fn test_cubic_in_out_is_symmetric() {
        let easing = Easing::CubicInOut;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(0.5), 0.5);
        assert_eq!(easing.apply(1.0), 1.0);
        assert!(easing.apply(0.25) < 0.25);
        assert!((easing.apply(0.25) + easing.apply(0.75) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_eased_transition_lands_on_target() {
        let mut transition =
            Transition::new(10.0, 20.0, Duration::from_millis(100)).with_easing(Easing::CubicInOut);
        assert_eq!(transition.advance(Duration::from_millis(100)), 20.0);
    }
}
