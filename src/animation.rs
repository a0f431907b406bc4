//! Keyframe clips and a blending mixer.
//!
//! An [`AnimationClip`] is a set of [`KeyframeTrack`]s, each driving one
//! transform channel of a node found by name. The [`AnimationMixer`] plays any
//! number of clips at once, all looping, and writes the weighted average of
//! every channel into the scene on [`AnimationMixer::update`].
//!
//! ```ignore
//! let mut mixer = AnimationMixer::new(model_root);
//! for clip in &model.clips[..3] {
//!     mixer.play(clip.clone(), &scene);
//! }
//!
//! // Per frame, in seconds:
//! mixer.update(delta_ms * 0.001, &mut scene);
//! ```

use glam::Vec3;
use std::collections::HashMap;

use crate::scene::{NodeId, Scene};

/// Transform channel a track drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackTarget {
    Position,
    /// Euler XYZ, radians.
    Rotation,
    Scale,
}

/// Linear keyframes for one channel of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeTrack {
    pub node: String,
    pub target: TrackTarget,
    times: Vec<f32>,
    values: Vec<Vec3>,
}

impl KeyframeTrack {
    /// Keys are sorted by time; extra times or values beyond the shorter
    /// list are dropped.
    pub fn new(node: &str, target: TrackTarget, times: Vec<f32>, values: Vec<Vec3>) -> Self {
        let mut keys: Vec<(f32, Vec3)> = times.into_iter().zip(values).collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, values) = keys.into_iter().unzip();
        Self {
            node: node.to_string(),
            target,
            times,
            values,
        }
    }

    /// Time of the last key.
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Value at `time`, holding the first/last key outside the keyed range.
    pub fn sample(&self, time: f32) -> Option<Vec3> {
        let first = *self.times.first()?;
        if time <= first {
            return self.values.first().copied();
        }
        let next = self.times.partition_point(|&t| t <= time);
        if next >= self.times.len() {
            return self.values.last().copied();
        }
        let (t0, t1) = (self.times[next - 1], self.times[next]);
        let span = t1 - t0;
        let alpha = if span > 0.0 { (time - t0) / span } else { 1.0 };
        Some(self.values[next - 1].lerp(self.values[next], alpha))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<KeyframeTrack>,
}

impl AnimationClip {
    /// The clip lasts as long as its longest track.
    pub fn new(name: &str, tracks: Vec<KeyframeTrack>) -> Self {
        let duration = tracks
            .iter()
            .map(KeyframeTrack::duration)
            .fold(0.0, f32::max);
        Self {
            name: name.to_string(),
            duration,
            tracks,
        }
    }
}

/// A playing clip.
#[derive(Clone, Debug)]
pub struct ClipAction {
    clip: AnimationClip,
    bindings: Vec<Option<NodeId>>,
    time: f32,
    pub weight: f32,
    pub paused: bool,
}

impl ClipAction {
    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Local time within the clip, in \[0, duration).
    pub fn time(&self) -> f32 {
        self.time
    }
}

/// Plays clips concurrently against a subtree of the scene.
#[derive(Clone, Debug)]
pub struct AnimationMixer {
    root: NodeId,
    actions: Vec<ClipAction>,
    time: f32,
}

impl AnimationMixer {
    /// Tracks resolve their node names below `root`.
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            actions: Vec::new(),
            time: 0.0,
        }
    }

    /// Start looping `clip` at full weight. Returns the action index.
    ///
    /// Tracks whose node can't be found stay unbound and are skipped.
    pub fn play(&mut self, clip: AnimationClip, scene: &Scene) -> usize {
        let bindings = clip
            .tracks
            .iter()
            .map(|track| scene.find_in(self.root, &track.node))
            .collect();
        self.actions.push(ClipAction {
            clip,
            bindings,
            time: 0.0,
            weight: 1.0,
            paused: false,
        });
        self.actions.len() - 1
    }

    pub fn action(&self, index: usize) -> Option<&ClipAction> {
        self.actions.get(index)
    }

    pub fn action_mut(&mut self, index: usize) -> Option<&mut ClipAction> {
        self.actions.get_mut(index)
    }

    pub fn actions(&self) -> &[ClipAction] {
        &self.actions
    }

    /// Total time the mixer has been advanced by.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance every unpaused action by `dt` seconds and apply the blended
    /// pose.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        self.time += dt;

        // (node, channel) -> (weighted sum, total weight)
        let mut blend: HashMap<(NodeId, TrackTarget), (Vec3, f32)> = HashMap::new();
        for action in &mut self.actions {
            if !action.paused && action.clip.duration > 0.0 {
                action.time = (action.time + dt).rem_euclid(action.clip.duration);
            }
            if action.weight <= 0.0 {
                continue;
            }
            for (track, binding) in action.clip.tracks.iter().zip(&action.bindings) {
                let (Some(node), Some(value)) = (binding, track.sample(action.time)) else {
                    continue;
                };
                let entry = blend
                    .entry((*node, track.target))
                    .or_insert((Vec3::ZERO, 0.0));
                entry.0 += value * action.weight;
                entry.1 += action.weight;
            }
        }

        for ((node, target), (sum, weight)) in blend {
            let value = sum / weight;
            let transform = &mut scene.node_mut(node).transform;
            match target {
                TrackTarget::Position => transform.position = value,
                TrackTarget::Rotation => transform.rotation = value,
                TrackTarget::Scale => transform.scale = value,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Node;

    fn track(node: &str, to: f32) -> KeyframeTrack {
        KeyframeTrack::new(
            node,
            TrackTarget::Position,
            vec![0.0, 2.0],
            vec![Vec3::ZERO, Vec3::new(to, 0.0, 0.0)],
        )
    }

    #[test]
    fn test_track_sampling() {
        let t = track("a", 4.0);
        assert_eq!(t.sample(-1.0), Some(Vec3::ZERO));
        assert_eq!(t.sample(1.0), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(t.sample(5.0), Some(Vec3::new(4.0, 0.0, 0.0)));
        assert_eq!(t.duration(), 2.0);
    }

    #[test]
    fn test_unsorted_keys_are_sorted() {
        let t = KeyframeTrack::new(
            "a",
            TrackTarget::Scale,
            vec![1.0, 0.0],
            vec![Vec3::ONE, Vec3::ZERO],
        );
        assert_eq!(t.sample(0.5), Some(Vec3::splat(0.5)));
    }

    #[test]
    fn test_mixer_blends_concurrent_clips() {
        let mut scene = Scene::new();
        let root = scene.root();
        let model = scene.add(root, Node::group("model"));
        let shard = scene.add(model, Node::group("shard"));

        let mut mixer = AnimationMixer::new(model);
        mixer.play(AnimationClip::new("a", vec![track("shard", 4.0)]), &scene);
        mixer.play(AnimationClip::new("b", vec![track("shard", 8.0)]), &scene);

        mixer.update(1.0, &mut scene);
        // (2 + 4) / 2
        assert!((scene.node(shard).transform.position.x - 3.0).abs() < 1e-5);
        assert_eq!(mixer.action(0).unwrap().time(), 1.0);
    }

    #[test]
    fn test_actions_loop() {
        let mut scene = Scene::new();
        let root = scene.root();
        scene.add(root, Node::group("shard"));

        let mut mixer = AnimationMixer::new(root);
        mixer.play(AnimationClip::new("a", vec![track("shard", 4.0)]), &scene);
        mixer.update(2.5, &mut scene);

        assert!((mixer.action(0).unwrap().time() - 0.5).abs() < 1e-5);
        assert!((mixer.time() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_unbound_track_is_skipped() {
        let mut scene = Scene::new();
        let root = scene.root();
        let mut mixer = AnimationMixer::new(root);
        mixer.play(AnimationClip::new("a", vec![track("missing", 1.0)]), &scene);
        mixer.update(0.5, &mut scene);
        assert_eq!(scene.node(root).transform.position, Vec3::ZERO);
    }
}
