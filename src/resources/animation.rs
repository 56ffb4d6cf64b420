/// One raw keyframe channel as read from a glTF animation.
///
/// Channels of the same clip are merged into per-node tracks by
/// [`merge`](crate::data_structures::scene_graph::merge).
#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
    Other,
}
