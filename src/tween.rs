//! Time-indexed interpolation.
//!
//! A [`Tween`] is a pure function of time: given a start time, optional
//! delay, duration and easing it answers [`Tween::value_at`] and
//! [`Tween::is_complete`] for any timeline position. Nothing advances
//! internally, so evaluating the same time twice always gives the same value.
//!
//! Before the tween begins it yields its `from` value; after it ends it
//! yields `to`.
//!
//! ```ignore
//! let fade = Tween::new(1.0, 0.0, 2.0)
//!     .starting_at(timeline.time())
//!     .with_easing(Easing::Power1InOut);
//!
//! material.opacity = fade.value_at(timeline.time());
//! if fade.is_complete(timeline.time()) { /* state transition */ }
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Easing curves.
///
/// The `Power1` family is the quadratic curve set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    Power1In,
    /// Default for tweens that don't name an easing.
    #[default]
    Power1Out,
    Power1InOut,
}

impl Easing {
    /// Map linear progress in \[0, 1\] to eased progress.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Power1In => t * t,
            Easing::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::Power1InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u / 2.0
                }
            }
        }
    }
}

/// Values that can be interpolated.
pub trait Lerp: Copy {
    fn lerp_to(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self.lerp(to, t)
    }
}

/// Interpolation from one value to another over a span of timeline time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween<T: Lerp> {
    pub from: T,
    pub to: T,
    /// Timeline time the tween was issued at.
    pub start: f32,
    /// Wait after `start` before interpolation begins.
    pub delay: f32,
    pub duration: f32,
    pub easing: Easing,
}

impl<T: Lerp> Tween<T> {
    /// Tween from `from` to `to` over `duration` seconds, starting at time 0.
    pub fn new(from: T, to: T, duration: f32) -> Self {
        Self {
            from,
            to,
            start: 0.0,
            delay: 0.0,
            duration: duration.max(0.0),
            easing: Easing::default(),
        }
    }

    /// A zero-length tween that jumps to `value` at `time`.
    pub fn set(value: T, time: f32) -> Self {
        Self::new(value, value, 0.0).starting_at(time)
    }

    pub fn starting_at(mut self, time: f32) -> Self {
        self.start = time;
        self
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Timeline time interpolation begins (start + delay).
    #[inline]
    pub fn begins_at(&self) -> f32 {
        self.start + self.delay
    }

    #[inline]
    pub fn ends_at(&self) -> f32 {
        self.begins_at() + self.duration
    }

    /// Linear progress in \[0, 1\] at `time`.
    pub fn progress(&self, time: f32) -> f32 {
        if self.duration <= 0.0 {
            return if time >= self.begins_at() { 1.0 } else { 0.0 };
        }
        ((time - self.begins_at()) / self.duration).clamp(0.0, 1.0)
    }

    /// Interpolated value at `time`.
    pub fn value_at(&self, time: f32) -> T {
        let eased = self.easing.apply(self.progress(time));
        self.from.lerp_to(self.to, eased)
    }

    /// Whether the tween has reached its end at `time`.
    #[inline]
    pub fn is_complete(&self, time: f32) -> bool {
        time >= self.ends_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::Power1In,
            Easing::Power1Out,
            Easing::Power1InOut,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
    }

    #[test]
    fn test_in_out_is_symmetric() {
        let e = Easing::Power1InOut;
        assert!((e.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-6);
        assert!((e.apply(0.25) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_value_before_during_after() {
        let tween = Tween::new(10.0f32, 0.0, 3.0)
            .starting_at(2.0)
            .with_easing(Easing::Linear);

        assert_eq!(tween.value_at(0.0), 10.0);
        assert!((tween.value_at(3.5) - 5.0).abs() < 1e-5);
        assert_eq!(tween.value_at(5.0), 0.0);
        assert_eq!(tween.value_at(100.0), 0.0);
        assert!(!tween.is_complete(4.99));
        assert!(tween.is_complete(5.0));
    }

    #[test]
    fn test_delay_shifts_window() {
        let tween = Tween::new(0.0f32, 1.0, 2.0).starting_at(1.0).with_delay(3.0);
        assert_eq!(tween.begins_at(), 4.0);
        assert_eq!(tween.ends_at(), 6.0);
        assert_eq!(tween.value_at(3.9), 0.0);
        assert_eq!(tween.value_at(6.0), 1.0);
    }

    #[test]
    fn test_set_jumps_at_its_time() {
        let set = Tween::set(4.0f32, 1.0);
        assert!(set.is_complete(1.0));
        assert_eq!(set.value_at(1.0), 4.0);
        assert_eq!(set.progress(0.5), 0.0);
    }

    #[test]
    fn test_vec3_tween() {
        let tween = Tween::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0), 2.0)
            .with_easing(Easing::Linear);
        assert!((tween.value_at(1.0) - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let tween = Tween::new(1.0f32, 0.0, 2.0).with_easing(Easing::Power1InOut);
        let a = tween.value_at(1.5);
        let _ = tween.value_at(0.0);
        assert_eq!(tween.value_at(1.5), a);
    }
}
