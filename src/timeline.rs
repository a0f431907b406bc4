//! The master timeline and tween sequencing.
//!
//! [`Timeline`] is the single time cursor every entity evaluates its tweens
//! against. The orchestrator scrubs it to the clock's elapsed time on every
//! tick; scrubbing backwards is allowed and reproduces earlier visual state.
//!
//! [`Sequence`] places several tweens relative to each other, the way an
//! animation timeline lays out overlapping segments.

use crate::tween::{Lerp, Tween};

/// Master time cursor, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timeline {
    time: f32,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor position.
    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Move the cursor to an absolute time.
    pub fn seek(&mut self, time: f32) {
        self.time = time;
    }
}

/// Where a tween goes in a [`Sequence`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Position {
    /// Start when everything placed so far has finished.
    AfterPrevious,
    /// Start this many seconds relative to the current end of the sequence.
    /// `RelativeToEnd(-2.0)` overlaps the last two seconds.
    RelativeToEnd(f32),
    /// Start at an absolute offset from the sequence start.
    At(f32),
}

/// Lays out tweens on the timeline relative to a starting time.
#[derive(Clone, Copy, Debug)]
pub struct Sequence {
    start: f32,
    end: f32,
}

impl Sequence {
    /// An empty sequence beginning at `start`.
    pub fn starting_at(start: f32) -> Self {
        Self { start, end: start }
    }

    /// Position `tween` and return it with its start time filled in.
    ///
    /// The tween's own delay is kept on top of the placement.
    pub fn place<T: Lerp>(&mut self, tween: Tween<T>, position: Position) -> Tween<T> {
        let at = match position {
            Position::AfterPrevious => self.end,
            Position::RelativeToEnd(offset) => (self.end + offset).max(self.start),
            Position::At(offset) => self.start + offset,
        };
        let placed = tween.starting_at(at);
        self.end = self.end.max(placed.ends_at());
        placed
    }

    /// Time the whole sequence finishes.
    #[inline]
    pub fn ends_at(&self) -> f32 {
        self.end
    }

    /// Total span from the first placement to the end.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_backwards() {
        let mut timeline = Timeline::new();
        timeline.seek(1.5);
        timeline.seek(0.0);
        assert_eq!(timeline.time(), 0.0);
    }

    #[test]
    fn test_overlap_places_second_tween_alongside_first() {
        let mut seq = Sequence::starting_at(4.0);
        let fade = seq.place(Tween::new(1.0f32, 0.0, 2.0), Position::AfterPrevious);
        let recede = seq.place(Tween::new(0.0f32, -2.0, 2.0), Position::RelativeToEnd(-2.0));

        assert_eq!(fade.start, 4.0);
        assert_eq!(recede.start, 4.0);
        assert_eq!(seq.ends_at(), 6.0);
        assert_eq!(seq.duration(), 2.0);
    }

    #[test]
    fn test_after_previous_chains() {
        let mut seq = Sequence::starting_at(0.0);
        seq.place(Tween::new(0.0f32, 1.0, 1.0), Position::AfterPrevious);
        let second = seq.place(Tween::new(0.0f32, 1.0, 1.0), Position::AfterPrevious);
        let third = seq.place(Tween::new(0.0f32, 1.0, 0.5), Position::At(0.25));

        assert_eq!(second.start, 1.0);
        assert_eq!(third.start, 0.25);
        assert_eq!(seq.ends_at(), 2.0);
    }
}
