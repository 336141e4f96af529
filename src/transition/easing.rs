use std::f32::consts::PI;
use std::time::Duration;

use web_time::Instant;

/// Cosine ease-in-out of `t` in `[0, 1]`.
#[inline]
pub fn ease_in_out_cos(t: f32) -> f32 {
    0.5 - (t * PI).cos() / 2.0
}

/// One sample of a [`ProgressAnimation`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnimationStep {
    pub value: f32,
    /// Whether the target was reached. Later samples keep returning the target.
    pub finished: bool,
}

/// Eases a value from its current state to a target over a fixed duration.
///
/// The clock starts at the first sample, so an animation created between two
/// frames starts on the next one.
#[derive(Copy, Clone, Debug)]
pub struct ProgressAnimation {
    from: f32,
    to: f32,
    duration: Duration,
    start: Option<Instant>,
}

impl ProgressAnimation {
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        ProgressAnimation {
            from,
            to,
            duration,
            start: None,
        }
    }

    #[inline]
    pub fn from(&self) -> f32 {
        self.from
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.to
    }

    /// The value at `now`, snapped to the target once it is reached or passed.
    pub fn sample(&mut self, now: Instant) -> AnimationStep {
        let start = *self.start.get_or_insert(now);
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (now.saturating_duration_since(start).as_secs_f32() / self.duration.as_secs_f32())
                .clamp(0.0, 1.0)
        };

        let value = self.from + ease_in_out_cos(t) * (self.to - self.from);
        let passed = if self.to > self.from {
            value >= self.to
        } else {
            value <= self.to
        };

        if passed || t >= 1.0 {
            AnimationStep {
                value: self.to,
                finished: true,
            }
        } else {
            AnimationStep {
                value,
                finished: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_endpoints() {
        assert_eq!(ease_in_out_cos(0.0), 0.0);
        assert!((ease_in_out_cos(0.5) - 0.5).abs() < 1.0e-6);
        assert_eq!(ease_in_out_cos(1.0), 1.0);
    }

    #[test]
    fn monotonic_and_finishes_at_target() {
        let start = Instant::now();
        let mut animation = ProgressAnimation::new(0.3, 1.0, Duration::from_millis(600));

        let mut last = animation.sample(start);
        assert!(!last.finished);
        assert!((last.value - 0.3).abs() < 1.0e-6);

        for ms in (20..=600).step_by(20) {
            let step = animation.sample(start + Duration::from_millis(ms));
            assert!(step.value >= last.value);
            last = step;
        }
        assert!(last.finished);
        assert_eq!(last.value, 1.0);
    }

    #[test]
    fn decreasing_animation() {
        let start = Instant::now();
        let mut animation = ProgressAnimation::new(1.0, 0.0, Duration::from_millis(100));
        let _ = animation.sample(start);
        let mid = animation.sample(start + Duration::from_millis(50));
        assert!(mid.value < 1.0 && mid.value > 0.0);
        let end = animation.sample(start + Duration::from_millis(150));
        assert_eq!(
            end,
            AnimationStep {
                value: 0.0,
                finished: true
            }
        );
    }

    #[test]
    fn already_at_target_finishes_immediately() {
        let mut animation = ProgressAnimation::new(0.5, 0.5, Duration::from_millis(600));
        assert!(animation.sample(Instant::now()).finished);
    }
}
