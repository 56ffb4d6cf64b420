//! Scene graph and hierarchical scene organisation.
//!
//! Provides traits and structures for building a scene graph: a hierarchical
//! representation of objects in a scene, including animation tracks and
//! renderable geometry. Each node carries a local transform and a derived
//! world transform; world transforms propagate top-down whenever a local
//! transform changes (model attach, animation pose).
//!
//! Nodes deliberately separate their CPU description (name, visibility,
//! transforms, material reference, animation tracks) from their GPU half
//! (mesh buffers), so the tree can be built, post-processed and inspected
//! without a device.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::VectorSpace;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        material::Material,
        model::{Mesh, ModelVertex},
    },
    render::{DrawBatches, DrawItem},
    resources::animation::Keyframes,
};

/// An animation clip: one keyframe channel of a named animation.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub keyframes: Keyframes,
    pub timestamps: Vec<f32>,
}

/// Merged per-node animation tracks for one named animation.
///
/// glTF delivers translation/rotation/scale as separate channels;
/// [`merge`] folds the channels that share a name into one of these. A
/// track left empty means the node's rest value is kept for that component.
#[derive(Clone, Debug, Default)]
pub struct ModelAnimation {
    pub name: String,
    pub timestamps: Vec<f32>,
    pub translations: Vec<cgmath::Vector3<f32>>,
    pub rotations: Vec<cgmath::Quaternion<f32>>,
    pub scales: Vec<cgmath::Vector3<f32>>,
}

impl ModelAnimation {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn duration(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }

    /// Sample the tracks at `time`, starting from `base` for components
    /// without keyframes. Time outside the clip clamps to its ends.
    pub fn sample(&self, base: &Instance, time: f32) -> Instance {
        if self.timestamps.is_empty() {
            return base.clone();
        }
        let time = time.clamp(0.0, self.duration());
        let next = self
            .timestamps
            .iter()
            .position(|&ts| ts >= time)
            .unwrap_or(self.timestamps.len() - 1);
        let prev = next.saturating_sub(1);
        let span = self.timestamps[next] - self.timestamps[prev];
        let alpha = if span > 0.0 {
            (time - self.timestamps[prev]) / span
        } else {
            0.0
        };

        let position = match (self.translations.get(prev), self.translations.get(next)) {
            (Some(a), Some(b)) => a.lerp(*b, alpha),
            (Some(a), None) => *a,
            _ => base.position,
        };
        let rotation = match (self.rotations.get(prev), self.rotations.get(next)) {
            (Some(a), Some(b)) => a.slerp(*b, alpha),
            (Some(a), None) => *a,
            _ => base.rotation,
        };
        let scale = match (self.scales.get(prev), self.scales.get(next)) {
            (Some(a), Some(b)) => a.lerp(*b, alpha),
            (Some(a), None) => *a,
            _ => base.scale,
        };

        Instance {
            position,
            rotation,
            scale,
        }
    }
}

/**
 * Merges keyframe channels with the same name to have all transformations in one place.
 *
 * GLTF:
 * AnimationClip {
 *      name: anim1
 *      keyframes: Scale([..])
 * }
 * AnimationClip {
 *      name: anim1
 *      keyframes: Rotation([..])
 * }
 * ...
 *
 * to
 *
 * ModelAnimation {
 *      name: anim1
 *      translations: [..]
 *      rotations: [..]
 *      scales: [..]
 * }
 */
pub fn merge(clips: Vec<AnimationClip>) -> Vec<ModelAnimation> {
    let mut merged: Vec<ModelAnimation> = Vec::new();
    for clip in clips {
        let animation = match merged.iter_mut().find(|anim| anim.name == clip.name) {
            Some(animation) => animation,
            None => {
                merged.push(ModelAnimation::named(clip.name.clone()));
                merged.last_mut().unwrap()
            }
        };
        match clip.keyframes {
            Keyframes::Translation(translations) => animation.translations = translations,
            Keyframes::Rotation(rotations) => animation.rotations = rotations,
            Keyframes::Scale(scales) => animation.scales = scales,
            Keyframes::Other => {
                log::warn!("skipping unsupported keyframe channel in clip {}", clip.name)
            }
        }
        // in case some tracks have fewer steps than others we want to keep the
        // largest set of timestamps for smooth animations
        if clip.timestamps.len() > animation.timestamps.len() {
            animation.timestamps = clip.timestamps;
        }
    }
    merged
}

// Send because decoded fragments are produced on loader tasks and handed
// to the event-loop thread
pub trait SceneNode: Send {
    fn name(&self) -> &str;

    fn is_visible(&self) -> bool;

    /// Hide or show this node. A hidden node also hides its descendants
    /// from rendering, but they stay in the hierarchy.
    fn set_visible(&mut self, visible: bool);

    fn local_transform(&self) -> &Instance;

    fn set_local_transform(&mut self, instance: Instance);

    fn world_transform(&self) -> &Instance;

    /// Recompute this node's world transform from `parent_world` and
    /// propagate down to all children.
    fn update_world_transforms(&mut self, parent_world: &Instance);

    fn children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    /// The node's material, if it draws geometry.
    fn material(&self) -> Option<&Arc<Material>>;

    /// Replace the node's material. No-op on container nodes.
    fn set_material(&mut self, material: Arc<Material>);

    /// Whether this node is a mesh leaf (the unit the post-processor
    /// evaluates rules against).
    fn is_mesh(&self) -> bool;

    fn animations(&self) -> &[ModelAnimation];

    /// Set local transforms across the subtree from the named clip sampled
    /// at `time`. Nodes without a matching clip keep their pose.
    fn pose(&mut self, clip: &str, time: f32);

    /// Upload the world transforms of the subtree to the GPU.
    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    /// Collect the subtree's visible geometry into per-pipeline batches.
    fn collect_draws<'a>(&'a self, batches: &mut DrawBatches<'a>);
}

/// A node without geometry of its own, grouping children under one
/// transform.
pub struct ContainerNode {
    name: String,
    visible: bool,
    local: Instance,
    world: Instance,
    children: Vec<Box<dyn SceneNode>>,
    animations: Vec<ModelAnimation>,
}

impl ContainerNode {
    pub fn new(name: &str, animations: Vec<ModelAnimation>) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            local: Instance::default(),
            world: Instance::default(),
            children: Vec::new(),
            animations,
        }
    }
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parent_world: &Instance) {
        self.world = parent_world * &self.local;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn material(&self) -> Option<&Arc<Material>> {
        None
    }

    fn set_material(&mut self, _material: Arc<Material>) {}

    fn is_mesh(&self) -> bool {
        false
    }

    fn animations(&self) -> &[ModelAnimation] {
        &self.animations
    }

    fn pose(&mut self, clip: &str, time: f32) {
        if let Some(animation) = self.animations.iter().find(|anim| anim.name == clip) {
            self.local = animation.sample(&self.local, time);
        }
        for child in self.children.iter_mut() {
            child.pose(clip, time);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        for child in self.children.iter_mut() {
            child.write_to_buffers(queue);
        }
    }

    fn collect_draws<'a>(&'a self, batches: &mut DrawBatches<'a>) {
        if !self.visible {
            return;
        }
        for child in &self.children {
            child.collect_draws(batches);
        }
    }
}

/// A mesh leaf: geometry plus a shared material.
///
/// The GPU half (`geometry`, `instance_buffer`) is optional so trees can be
/// built and post-processed before or without upload; a node without it is
/// simply skipped when drawing.
pub struct MeshNode {
    name: String,
    visible: bool,
    local: Instance,
    world: Instance,
    children: Vec<Box<dyn SceneNode>>,
    animations: Vec<ModelAnimation>,
    material: Arc<Material>,
    geometry: Vec<Mesh>,
    instance_buffer: Option<wgpu::Buffer>,
}

impl MeshNode {
    /// A mesh node without GPU geometry yet.
    pub fn new(name: &str, material: Arc<Material>) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            local: Instance::default(),
            world: Instance::default(),
            children: Vec::new(),
            animations: Vec::new(),
            material,
            geometry: Vec::new(),
            instance_buffer: None,
        }
    }

    pub fn with_geometry(
        device: &wgpu::Device,
        name: &str,
        material: Arc<Material>,
        geometry: Vec<Mesh>,
        animations: Vec<ModelAnimation>,
    ) -> Self {
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} instance buffer", name)),
            contents: bytemuck::cast_slice(&[Instance::default().to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            name: name.to_string(),
            visible: true,
            local: Instance::default(),
            world: Instance::default(),
            children: Vec::new(),
            animations,
            material,
            geometry,
            instance_buffer: Some(instance_buffer),
        }
    }
}

impl SceneNode for MeshNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn local_transform(&self) -> &Instance {
        &self.local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.local = instance;
    }

    fn world_transform(&self) -> &Instance {
        &self.world
    }

    fn update_world_transforms(&mut self, parent_world: &Instance) {
        self.world = parent_world * &self.local;
        for child in self.children.iter_mut() {
            child.update_world_transforms(&self.world);
        }
    }

    fn children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn material(&self) -> Option<&Arc<Material>> {
        Some(&self.material)
    }

    fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    fn is_mesh(&self) -> bool {
        true
    }

    fn animations(&self) -> &[ModelAnimation] {
        &self.animations
    }

    fn pose(&mut self, clip: &str, time: f32) {
        if let Some(animation) = self.animations.iter().find(|anim| anim.name == clip) {
            self.local = animation.sample(&self.local, time);
        }
        for child in self.children.iter_mut() {
            child.pose(clip, time);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        if let Some(buffer) = &self.instance_buffer {
            let raw: [InstanceRaw; 1] = [self.world.to_raw()];
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&raw));
        }
        for child in self.children.iter_mut() {
            child.write_to_buffers(queue);
        }
    }

    fn collect_draws<'a>(&'a self, batches: &mut DrawBatches<'a>) {
        if !self.visible {
            return;
        }
        if let Some(instance_buffer) = &self.instance_buffer {
            for mesh in &self.geometry {
                batches.push(DrawItem {
                    mesh,
                    material: &self.material,
                    instance_buffer,
                });
            }
        }
        for child in &self.children {
            child.collect_draws(batches);
        }
    }
}

/// Convert one decoded glTF node (and its descendants) into a scene-graph
/// subtree.
///
/// `materials` are the fragment's imported materials in glTF order;
/// `fallback` is used for primitives without a material index. `animations`
/// maps glTF node indices to the keyframe channels targeting them.
pub fn to_scene_node(
    node: gltf::scene::Node,
    buffer_data: &Vec<Vec<u8>>,
    device: &wgpu::Device,
    materials: &Vec<Arc<Material>>,
    fallback: &Arc<Material>,
    animations: &HashMap<usize, Vec<AnimationClip>>,
) -> Box<dyn SceneNode> {
    let name = node.name().unwrap_or("unnamed").to_string();
    let node_animations = animations
        .get(&node.index())
        .cloned()
        .map(merge)
        .unwrap_or_default();

    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mut geometry = Vec::new();
            let mut material = None;
            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| Some(&buffer_data[buffer.index()]));

                let mut vertices = Vec::new();
                if let Some(positions) = reader.read_positions() {
                    positions.for_each(|position| {
                        vertices.push(ModelVertex {
                            position,
                            tex_coords: Default::default(),
                            normal: Default::default(),
                        })
                    });
                }
                if let Some(normals) = reader.read_normals() {
                    normals.enumerate().for_each(|(i, normal)| {
                        if let Some(vertex) = vertices.get_mut(i) {
                            vertex.normal = normal;
                        }
                    });
                }
                if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                    tex_coords.enumerate().for_each(|(i, tex_coord)| {
                        if let Some(vertex) = vertices.get_mut(i) {
                            vertex.tex_coords = tex_coord;
                        }
                    });
                }

                let mut indices = Vec::new();
                if let Some(indices_raw) = reader.read_indices() {
                    indices.append(&mut indices_raw.into_u32().collect::<Vec<u32>>());
                }

                let mesh_name = mesh.name().unwrap_or(name.as_str());
                geometry.push(Mesh::new(device, mesh_name, &vertices, &indices));

                // first primitive's material stands for the whole node, the
                // post-processor substitutes per node anyway
                if material.is_none() {
                    material = primitive
                        .material()
                        .index()
                        .and_then(|idx| materials.get(idx))
                        .cloned();
                }
            }
            let material = material.unwrap_or_else(|| fallback.clone());
            Box::new(MeshNode::with_geometry(
                device,
                &name,
                material,
                geometry,
                node_animations,
            ))
        }
        None => Box::new(ContainerNode::new(&name, node_animations)),
    };

    let (position, rotation, scale) = node.transform().decomposed();
    scene_node.set_local_transform(Instance {
        position: position.into(),
        rotation: rotation.into(),
        scale: scale.into(),
    });
    for child in node.children() {
        let child_node = to_scene_node(child, buffer_data, device, materials, fallback, animations);
        scene_node.add_child(child_node);
    }

    scene_node
}
