//! Entities that can be revealed and hidden.
//!
//! A [`Revealable`] entity reacts to `reveal_animation` / `hide_animation` by
//! putting tweens on its property [`Track`]s, starting at the current
//! timeline time. `update` evaluates the tracks at the timeline cursor,
//! writes the values into the scene and advances [`RevealState`] once the
//! relevant tweens have finished.
//!
//! Each animated property has its own track, so a new call replaces the
//! tween on the properties it touches and leaves the others running.

use log::trace;

use crate::debug::DebugFolder;
use crate::scene::Scene;
use crate::time::Tick;
use crate::timeline::Timeline;
use crate::tween::{Lerp, Tween};

/// Where an entity is in its reveal/hide cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RevealState {
    #[default]
    NotRevealed,
    Revealing,
    Revealed,
    Hiding,
    Hidden,
}

impl RevealState {
    /// A reveal restarts the reveal chain from any state.
    pub fn on_reveal(self) -> Self {
        RevealState::Revealing
    }

    /// A hide restarts the hide chain from any state.
    pub fn on_hide(self) -> Self {
        RevealState::Hiding
    }

    /// Finish an in-flight transition once its tweens are done.
    pub fn settle(self, finished: bool) -> Self {
        match (self, finished) {
            (RevealState::Revealing, true) => RevealState::Revealed,
            (RevealState::Hiding, true) => RevealState::Hidden,
            (state, _) => state,
        }
    }

    pub fn is_transitioning(self) -> bool {
        matches!(self, RevealState::Revealing | RevealState::Hiding)
    }
}

/// The active tween on one animated property.
#[derive(Clone, Copy, Debug)]
pub struct Track<T: Lerp> {
    tween: Option<Tween<T>>,
}

impl<T: Lerp> Track<T> {
    pub const fn new() -> Self {
        Self { tween: None }
    }

    /// Replace whatever was running.
    pub fn start(&mut self, tween: Tween<T>) {
        self.tween = Some(tween);
    }

    /// Stop animating; the property keeps whatever it was last set to.
    pub fn clear(&mut self) {
        self.tween = None;
    }

    /// Value at `time`, or `None` with no tween.
    pub fn sample(&self, time: f32) -> Option<T> {
        self.tween.map(|t| t.value_at(time))
    }

    /// Whether there is no tween or it has finished by `time`.
    pub fn is_complete(&self, time: f32) -> bool {
        self.tween.map_or(true, |t| t.is_complete(time))
    }

    pub fn ends_at(&self) -> Option<f32> {
        self.tween.map(|t| t.ends_at())
    }

    pub fn is_active(&self) -> bool {
        self.tween.is_some()
    }
}

impl<T: Lerp> Default for Track<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An entity with reveal and hide animations.
pub trait Revealable {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Start revealing at the timeline's current time.
    fn reveal_animation(&mut self, timeline: &Timeline);

    /// Start hiding at the timeline's current time.
    fn hide_animation(&mut self, timeline: &Timeline);

    /// Apply tracks at the timeline cursor and do per-frame work.
    fn update(&mut self, scene: &mut Scene, timeline: &Timeline, tick: &Tick);

    fn reveal_state(&self) -> RevealState;

    fn as_debug(&self) -> &dyn DebugFolder;

    fn as_debug_mut(&mut self) -> &mut dyn DebugFolder;
}

/// Log a state change, if there was one.
pub(crate) fn log_transition(name: &str, from: RevealState, to: RevealState) {
    if from != to {
        trace!("{}: {:?} -> {:?}", name, from, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::Easing;

    #[test]
    fn test_reveal_chain() {
        let state = RevealState::NotRevealed.on_reveal();
        assert_eq!(state, RevealState::Revealing);
        assert_eq!(state.settle(false), RevealState::Revealing);
        assert_eq!(state.settle(true), RevealState::Revealed);
    }

    #[test]
    fn test_hide_chain() {
        let state = RevealState::Revealed.on_hide();
        assert_eq!(state, RevealState::Hiding);
        assert_eq!(state.settle(true), RevealState::Hidden);
        assert_eq!(RevealState::Hidden.settle(true), RevealState::Hidden);
    }

    #[test]
    fn test_settle_leaves_resting_states() {
        for state in [RevealState::NotRevealed, RevealState::Revealed, RevealState::Hidden] {
            assert_eq!(state.settle(true), state);
            assert!(!state.is_transitioning());
        }
    }

    #[test]
    fn test_track_last_write_wins() {
        let mut track = Track::new();
        assert_eq!(track.sample(1.0), None);
        assert!(track.is_complete(0.0));

        track.start(Tween::new(0.0f32, 1.0, 2.0).with_easing(Easing::Linear));
        track.start(
            Tween::new(1.0f32, 0.0, 2.0)
                .starting_at(1.0)
                .with_easing(Easing::Linear),
        );

        assert_eq!(track.sample(2.0), Some(0.5));
        assert_eq!(track.ends_at(), Some(3.0));
        assert!(!track.is_complete(2.9));

        track.clear();
        assert!(!track.is_active());
    }
}
