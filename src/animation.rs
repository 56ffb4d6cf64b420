//! Per-subtree playback of embedded animation clips.
//!
//! A loaded model may carry animation clips; a driver owns the playback
//! clock for one subtree and is advanced exactly once per rendered frame.
//! The driver holds clip metadata only — the keyframe tracks live on the
//! nodes themselves and are sampled when the pose is applied.

use crate::data_structures::scene_graph::SceneNode;

#[derive(Clone, Debug)]
struct ClipInfo {
    name: String,
    duration: f32,
}

/// Playback state for the clips of one subtree.
pub struct AnimationDriver {
    clips: Vec<ClipInfo>,
    active: Option<usize>,
    time: f32,
}

impl AnimationDriver {
    /// Scan `subtree` for animation tracks and build a driver over them.
    ///
    /// Returns `None` when the subtree carries no clips. Clip durations are
    /// the maximum track duration found for each name.
    pub fn bind(subtree: &dyn SceneNode) -> Option<Self> {
        let mut clips: Vec<ClipInfo> = Vec::new();
        collect_clips(subtree, &mut clips);
        if clips.is_empty() {
            return None;
        }
        Some(Self {
            clips,
            active: None,
            time: 0.0,
        })
    }

    pub fn clip_names(&self) -> Vec<&str> {
        self.clips.iter().map(|clip| clip.name.as_str()).collect()
    }

    /// Start looping playback of one clip from its beginning.
    pub fn play(&mut self, index: usize) {
        if index >= self.clips.len() {
            log::warn!(
                "clip index {} out of range, {} clips bound",
                index,
                self.clips.len()
            );
            return;
        }
        self.active = Some(index);
        self.time = 0.0;
    }

    /// Advance the playback clock by `dt` seconds.
    ///
    /// Call once per rendered frame. A zero delta leaves the clock
    /// unchanged; negative deltas are treated as zero. Time grows
    /// monotonically until the clip duration, then wraps around.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        let Some(active) = self.active else {
            return;
        };
        let duration = self.clips[active].duration;
        if duration > 0.0 {
            self.time = (self.time + dt) % duration;
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn active_clip(&self) -> Option<&str> {
        self.active.map(|idx| self.clips[idx].name.as_str())
    }

    /// Pose `subtree` from the active clip at the current clock.
    pub fn apply(&self, subtree: &mut dyn SceneNode) {
        if let Some(clip) = self.active_clip() {
            // borrow of `self` ends before the mutable walk
            let clip = clip.to_string();
            subtree.pose(&clip, self.time);
        }
    }
}

/// A driver together with the child slot of the subtree it animates, owned
/// by the scene rather than closed over by the render loop.
pub struct BoundDriver {
    pub slot: usize,
    pub driver: AnimationDriver,
}

fn collect_clips(node: &dyn SceneNode, clips: &mut Vec<ClipInfo>) {
    for animation in node.animations() {
        match clips.iter_mut().find(|clip| clip.name == animation.name) {
            Some(clip) => clip.duration = clip.duration.max(animation.duration()),
            None => clips.push(ClipInfo {
                name: animation.name.clone(),
                duration: animation.duration(),
            }),
        }
    }
    for child in node.children() {
        collect_clips(child.as_ref(), clips);
    }
}
